//! Derived fields defined by settings
//!
//! Every variant is built against a registry snapshot that does not yet
//! contain the field being defined, so it can only refer to earlier fields.

use encoding_rs::Encoding;
use regex::Regex;

use super::{AvailableFields, FieldId, FieldValue, Info};
use crate::config::charset_for;
use crate::error::{FieldError, Result};
use crate::settings::{
    split_terms, ParameterizedSetting, Term, TokenFormatter, COMMAND_DELIM, SEARCH_DELIM,
    SEARCH_KEYS,
};

/// A template bound to the fields it references
#[derive(Debug, Clone)]
pub struct TemplateValue {
    formatter: TokenFormatter,
    deps: Vec<(String, FieldId)>,
}

impl TemplateValue {
    /// Bind `template` against the fields currently in `fields`
    pub fn build(template: &str, fields: &AvailableFields) -> Self {
        let formatter = TokenFormatter::parse(template);
        let deps = fields.reader_of(&formatter).into_entries();
        Self { formatter, deps }
    }

    pub fn template(&self) -> &str {
        self.formatter.template()
    }

    /// Names of the fields this template reads
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_static(&self) -> bool {
        self.deps.is_empty()
    }

    pub fn render(&self, info: &Info<'_>) -> Result<String> {
        self.formatter.render(|name| {
            match self.deps.iter().find(|(dep, _)| dep == name) {
                Some((_, id)) => info.value(*id).map(|v| Some(v.text.clone())),
                None => Ok(None),
            }
        })
    }
}

/// A pipeline of command stages, each stage a list of templated terms
#[derive(Debug, Clone)]
pub struct CommandValue {
    stages: Vec<Vec<TemplateValue>>,
}

impl CommandValue {
    /// Parse a `` `prog args | prog args` `` setting
    pub fn parse(setting: &str, fields: &AvailableFields) -> Result<Self> {
        let parsed = ParameterizedSetting::parse(setting, Some(COMMAND_DELIM), &[])?;
        let terms = split_terms(parsed.main_part())
            .map_err(|message| FieldError::config(message, setting))?;

        if terms.is_empty() {
            return Err(FieldError::config("Empty command", setting));
        }

        let mut stages = Vec::new();
        let mut stage = Vec::new();
        for term in terms {
            match term {
                Term::Pipe => {
                    if stage.is_empty() {
                        return Err(FieldError::config("Empty command stage", setting));
                    }
                    stages.push(std::mem::take(&mut stage));
                }
                Term::Word(word) => stage.push(TemplateValue::build(&word, fields)),
            }
        }
        if stage.is_empty() {
            return Err(FieldError::config("Empty command stage", setting));
        }
        stages.push(stage);

        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[Vec<TemplateValue>] {
        &self.stages
    }

    /// Render every term of every stage for one file
    pub fn arguments(&self, info: &Info<'_>) -> Result<Vec<Vec<String>>> {
        self.stages
            .iter()
            .map(|stage| stage.iter().map(|term| term.render(info)).collect())
            .collect()
    }

    fn compute(&self, info: &Info<'_>) -> Result<String> {
        let stages = self.arguments(info)?;
        info.fields().engine().runner.run(&stages)
    }
}

/// Regex extraction from another field or from the file's content
#[derive(Debug, Clone)]
pub struct SearchValue {
    setting: String,
    pattern: TemplateValue,
    compiled: Option<Regex>,
    occurrence: usize,
    groups: usize,
    charset: &'static Encoding,
    source: Option<FieldId>,
}

impl SearchValue {
    /// Parse a `/regex/o=1,g=0,c=UTF-8,f=field` setting
    pub fn parse(setting: &str, fields: &AvailableFields) -> Result<Self> {
        let parsed = ParameterizedSetting::parse(setting, Some(SEARCH_DELIM), SEARCH_KEYS)?;

        let occurrence = parsed.int_param("o", 1, 1, "Occurrence")?;
        let groups = parsed.int_param("g", 0, 0, "Groups")?;
        let charset = match parsed.param("c") {
            Some(name) => charset_for(name).ok_or_else(|| FieldError::config("Charset", setting))?,
            None => fields.engine().default_charset,
        };
        let source = match parsed.param("f") {
            Some(name) => Some(
                fields
                    .id_of(name)
                    .ok_or_else(|| FieldError::config("Field", setting))?,
            ),
            None => None,
        };

        let pattern = TemplateValue::build(parsed.main_part(), fields);
        let compiled = if pattern.is_static() {
            let regex = Regex::new(parsed.main_part())
                .map_err(|e| FieldError::config(format!("Regex ({})", e), setting))?;
            if regex.captures_len() - 1 < groups {
                return Err(FieldError::config("Groups", setting));
            }
            Some(regex)
        } else {
            None
        };

        Ok(Self {
            setting: setting.to_string(),
            pattern,
            compiled,
            occurrence,
            groups,
            charset,
            source,
        })
    }

    pub fn occurrence(&self) -> usize {
        self.occurrence
    }

    pub fn groups(&self) -> usize {
        self.groups
    }

    pub fn charset(&self) -> &'static Encoding {
        self.charset
    }

    fn compute(&self, info: &Info<'_>) -> Result<String> {
        let dynamic;
        let regex = match &self.compiled {
            Some(regex) => regex,
            None => {
                let rendered = self.pattern.render(info)?;
                dynamic = Regex::new(&rendered).map_err(|e| FieldError::Pattern {
                    pattern: rendered.clone(),
                    message: e.to_string(),
                    setting: self.setting.clone(),
                })?;
                &dynamic
            }
        };

        match self.source {
            Some(id) => {
                let text = &info.value(id)?.text;
                Ok(extract(regex, text, self.occurrence, self.groups))
            }
            None => {
                let text = info.content(self.charset)?;
                Ok(extract(regex, &text, self.occurrence, self.groups))
            }
        }
    }
}

/// Take the `occurrence`-th match (1-based)
///
/// `groups == 0` yields the whole match, otherwise capture groups `1..=groups`
/// concatenated. No match yields an empty string.
pub fn extract(regex: &Regex, text: &str, occurrence: usize, groups: usize) -> String {
    let Some(captures) = regex.captures_iter(text).nth(occurrence.saturating_sub(1)) else {
        return String::new();
    };
    if groups == 0 {
        return captures
            .get(0)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
    }
    (1..=groups)
        .filter_map(|i| captures.get(i))
        .map(|m| m.as_str())
        .collect()
}

/// A derived field definition
#[derive(Debug, Clone)]
pub enum DynamicValue {
    Template(TemplateValue),
    Command(CommandValue),
    Search(SearchValue),
}

impl DynamicValue {
    pub fn compute(&self, info: &Info<'_>) -> Result<FieldValue> {
        let text = match self {
            DynamicValue::Template(template) => template.render(info)?,
            DynamicValue::Command(command) => command.compute(info)?,
            DynamicValue::Search(search) => search.compute(info)?,
        };
        Ok(FieldValue::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Engine;
    use crate::fields::PipelineRunner;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::tempdir;

    #[derive(Debug, Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<Vec<Vec<String>>>>,
    }

    impl PipelineRunner for RecordingRunner {
        fn run(&self, stages: &[Vec<String>]) -> Result<String> {
            self.calls.lock().unwrap().push(stages.to_vec());
            Ok(format!("ran {}", stages.len()))
        }
    }

    fn fields() -> AvailableFields {
        AvailableFields::new(Engine::default())
    }

    #[test]
    fn test_extract_occurrence_and_groups() {
        let regex = Regex::new(r"(\d+)").unwrap();
        assert_eq!(extract(&regex, "abc123def456", 1, 1), "123");
        assert_eq!(extract(&regex, "abc123def456", 2, 1), "456");
        assert_eq!(extract(&regex, "abc123def456", 3, 1), "");
        assert_eq!(extract(&regex, "abc123def456", 1, 0), "123");

        let pair = Regex::new(r"(\w)=(\d)").unwrap();
        assert_eq!(extract(&pair, "a=1 b=2", 2, 2), "b2");
        assert_eq!(extract(&pair, "a=1 b=2", 1, 0), "a=1");
    }

    #[test]
    fn test_command_stages() {
        let command = CommandValue::parse("`one | two`", &fields()).unwrap();
        assert_eq!(command.stages().len(), 2);
        assert!(command.stages().iter().all(|stage| stage.len() == 1));

        let command = CommandValue::parse("`wc -c ${path} | tr -d ' '`", &fields()).unwrap();
        let deps: Vec<&str> = command.stages()[0][2].dependencies().collect();
        assert_eq!(deps, vec!["path"]);
    }

    #[test]
    fn test_empty_commands_are_rejected() {
        for setting in ["``", "`   `", "`a |`", "`| b`", "`a | | b`"] {
            let err = CommandValue::parse(setting, &fields()).unwrap_err();
            assert!(err.to_string().contains("Empty command"), "{}", err);
            assert!(err.to_string().ends_with(setting));
        }
        let err = CommandValue::parse("`echo 'oops`", &fields()).unwrap_err();
        assert_eq!(err.to_string(), "Unterminated quote: `echo 'oops`");
    }

    #[test]
    fn test_command_runs_rendered_arguments() {
        let runner = Arc::new(RecordingRunner::default());
        let fields = AvailableFields::new(Engine::default().with_runner(runner.clone()))
            .define("count", "`wc -c ${filename} | cat`")
            .unwrap();
        let info = Info::new("/tmp/x/a.txt", &fields);

        assert_eq!(info.get("count").unwrap(), "ran 2");
        let calls = runner.calls.lock().unwrap();
        assert_eq!(
            calls[0],
            vec![
                vec!["wc".to_string(), "-c".to_string(), "a.txt".to_string()],
                vec!["cat".to_string()],
            ]
        );
    }

    #[test]
    fn test_search_parameter_errors() {
        let f = fields();
        let err = SearchValue::parse("/x/o=0", &f).unwrap_err();
        assert_eq!(err.to_string(), "Occurrence: /x/o=0");
        let err = SearchValue::parse("/x/g=-1", &f).unwrap_err();
        assert_eq!(err.to_string(), "Groups: /x/g=-1");
        let err = SearchValue::parse("/x/c=nonsense", &f).unwrap_err();
        assert_eq!(err.to_string(), "Charset: /x/c=nonsense");
        let err = SearchValue::parse("/x/f=later", &f).unwrap_err();
        assert_eq!(err.to_string(), "Field: /x/f=later");
        let err = SearchValue::parse("/(a/", &f).unwrap_err();
        assert!(err.to_string().starts_with("Regex"));
        let err = SearchValue::parse("/(a)/g=2", &f).unwrap_err();
        assert_eq!(err.to_string(), "Groups: /(a)/g=2");
    }

    #[test]
    fn test_search_over_field() {
        let fields = fields().define("digits", r"/(\d+)/g=1,o=2,f=filename").unwrap();
        let info = Info::new(Path::new("/data/abc123def456.txt"), &fields);
        assert_eq!(info.get("digits").unwrap(), "456");
    }

    #[test]
    fn test_search_over_content_with_charset() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("latin.txt");
        // "café=42" in ISO-8859-1
        std::fs::write(&file, b"caf\xe9=42").unwrap();

        let fields = fields()
            .define("word", r"/^(\w+)=/g=1,c=latin1")
            .unwrap()
            .define("num", r"/=(\d+)/g=1")
            .unwrap();
        let info = Info::new(&file, &fields);
        assert_eq!(info.get("word").unwrap(), "café");
        assert_eq!(info.get("num").unwrap(), "42");
    }

    #[test]
    fn test_search_pattern_with_field_token() {
        let fields = fields()
            .define("stem", r"/^([^.]+)/g=1,f=filename")
            .unwrap()
            .define("after", r"/${stem}-(\w+)/g=1,f=path")
            .unwrap();
        let info = Info::new("/srv/report-final/report.pdf", &fields);
        assert_eq!(info.get("after").unwrap(), "final");
    }

    #[test]
    fn test_bad_rendered_pattern_is_per_file_error() {
        let fields = fields()
            .define("stem", r"/^([^.]+)/g=1,f=filename")
            .unwrap()
            .define("echo", "/${stem}/f=filename")
            .unwrap();

        let info = Info::new("/d/(open.txt", &fields);
        let err = info.get("echo").unwrap_err();
        assert!(matches!(err, FieldError::Pattern { .. }));
        assert!(!err.is_config());

        let fine = Info::new("/d/plain.txt", &fields);
        assert_eq!(fine.get("echo").unwrap(), "plain");
    }
}
