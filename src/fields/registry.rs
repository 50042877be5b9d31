//! The append-only field registry
//!
//! `AvailableFields` is an immutable snapshot: built-in fields first, then one
//! field per directive in registration order. Adding a field returns a new
//! snapshot and leaves the old one usable. A new field is built from the
//! snapshot that precedes it, so it can only reference earlier fields and
//! cycles cannot be expressed.

use std::path::Path;
use std::sync::Arc;

use super::{
    Builtin, CommandValue, DynamicValue, Field, FieldId, FieldKind, FieldSource, Info,
    SearchValue, TemplateValue,
};
use crate::config::Engine;
use crate::error::{FieldError, Result};
use crate::settings::{SettingKind, TokenFormatter};

/// One field definition waiting to be (or already) registered
#[derive(Clone)]
pub enum Directive {
    Template { name: String, setting: String },
    Command { name: String, setting: String },
    Search { name: String, setting: String },
    External { name: String, source: Arc<dyn FieldSource> },
}

impl Directive {
    pub fn name(&self) -> &str {
        match self {
            Directive::Template { name, .. }
            | Directive::Command { name, .. }
            | Directive::Search { name, .. }
            | Directive::External { name, .. } => name,
        }
    }
}

impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                Directive::Template { name: a, setting: x },
                Directive::Template { name: b, setting: y },
            )
            | (
                Directive::Command { name: a, setting: x },
                Directive::Command { name: b, setting: y },
            )
            | (
                Directive::Search { name: a, setting: x },
                Directive::Search { name: b, setting: y },
            ) => a == b && x == y,
            (
                Directive::External { name: a, source: x },
                Directive::External { name: b, source: y },
            ) => a == b && Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Directive::Template { name, setting } => write!(f, "Template({} = {})", name, setting),
            Directive::Command { name, setting } => write!(f, "Command({} = {})", name, setting),
            Directive::Search { name, setting } => write!(f, "Search({} = {})", name, setting),
            Directive::External { name, .. } => write!(f, "External({})", name),
        }
    }
}

/// Ordered directives behind a registry
///
/// Accumulating directives is separate from building fields so an override
/// layer can collect them first and materialize them in one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldParams {
    directives: Vec<Directive>,
}

impl FieldParams {
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// A copy with one more directive
    pub fn with(&self, directive: Directive) -> Self {
        let mut next = self.clone();
        next.directives.push(directive);
        next
    }
}

/// Upstream fields resolved for a reader
#[derive(Debug, Clone, Default)]
pub struct FieldReader {
    entries: Vec<(String, FieldId)>,
}

impl FieldReader {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Current values of every resolved field, through the file's cache
    pub fn read(&self, info: &Info<'_>) -> Result<Vec<String>> {
        self.entries
            .iter()
            .map(|(_, id)| info.value(*id).map(|v| v.text.clone()))
            .collect()
    }

    pub(crate) fn into_entries(self) -> Vec<(String, FieldId)> {
        self.entries
    }
}

/// Immutable snapshot of every known field
#[derive(Debug, Clone)]
pub struct AvailableFields {
    engine: Arc<Engine>,
    fields: Vec<Arc<Field>>,
    params: FieldParams,
}

impl AvailableFields {
    /// A registry holding only the built-in fields
    pub fn new(engine: Engine) -> Self {
        let fields = Builtin::ALL
            .iter()
            .map(|b| {
                Arc::new(Field {
                    name: b.name().to_string(),
                    kind: FieldKind::Builtin(*b),
                })
            })
            .collect();

        Self {
            engine: Arc::new(engine),
            fields,
            params: FieldParams::default(),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn params(&self) -> &FieldParams {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name())
    }

    pub fn id_of(&self, name: &str) -> Option<FieldId> {
        self.fields.iter().position(|f| f.name() == name).map(FieldId)
    }

    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.get(id.0).map(|f| f.as_ref())
    }

    /// Reader over exactly `names`; fails on the first unknown name
    pub fn reader(&self, names: &[&str]) -> Result<FieldReader> {
        let entries = names
            .iter()
            .map(|name| {
                self.id_of(name)
                    .map(|id| (name.to_string(), id))
                    .ok_or_else(|| FieldError::UnknownField(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FieldReader { entries })
    }

    /// Reader over the tokens of `formatter` that name known fields
    pub fn reader_of(&self, formatter: &TokenFormatter) -> FieldReader {
        let entries = formatter
            .used_field_names(self.names())
            .into_iter()
            .filter_map(|name| self.id_of(&name).map(|id| (name, id)))
            .collect();
        FieldReader { entries }
    }

    /// Bind a template against this snapshot
    pub fn template(&self, template: &str) -> TemplateValue {
        TemplateValue::build(template, self)
    }

    /// Start evaluating a file against this snapshot
    pub fn info(&self, path: impl AsRef<Path>) -> Info<'_> {
        Info::new(path, self)
    }

    pub fn with_another_template(&self, name: &str, setting: &str) -> FieldParams {
        self.params.with(Directive::Template {
            name: name.to_string(),
            setting: setting.to_string(),
        })
    }

    pub fn with_another_command(&self, name: &str, setting: &str) -> FieldParams {
        self.params.with(Directive::Command {
            name: name.to_string(),
            setting: setting.to_string(),
        })
    }

    pub fn with_another_search(&self, name: &str, setting: &str) -> FieldParams {
        self.params.with(Directive::Search {
            name: name.to_string(),
            setting: setting.to_string(),
        })
    }

    /// Registry for `params`, keeping every field shared with this snapshot
    ///
    /// Directives common to both (the longest shared prefix) keep their field
    /// objects and ids; the remaining ones are built in order, each against
    /// the snapshot that precedes it.
    pub fn co_caching(&self, params: FieldParams) -> Result<Self> {
        let shared = self
            .params
            .directives
            .iter()
            .zip(&params.directives)
            .take_while(|(a, b)| a == b)
            .count();

        let mut next = Self {
            engine: Arc::clone(&self.engine),
            fields: self.fields[..Builtin::ALL.len() + shared].to_vec(),
            params: FieldParams {
                directives: params.directives[..shared].to_vec(),
            },
        };
        for directive in &params.directives[shared..] {
            next = next.register(directive.clone())?;
        }
        Ok(next)
    }

    /// Add a field, dispatching on the setting's delimiters
    pub fn define(&self, name: &str, setting: &str) -> Result<Self> {
        let params = match SettingKind::of(setting) {
            SettingKind::Command => self.with_another_command(name, setting),
            SettingKind::Search => self.with_another_search(name, setting),
            SettingKind::Template => self.with_another_template(name, setting),
        };
        self.co_caching(params)
    }

    /// Add a field computed by host code
    pub fn with_source(&self, name: &str, source: Arc<dyn FieldSource>) -> Result<Self> {
        self.co_caching(self.params.with(Directive::External {
            name: name.to_string(),
            source,
        }))
    }

    fn register(&self, directive: Directive) -> Result<Self> {
        let name = directive.name().to_string();
        self.check_name(&name)?;

        let kind = match &directive {
            Directive::Template { setting, .. } => {
                FieldKind::Derived(DynamicValue::Template(TemplateValue::build(setting, self)))
            }
            Directive::Command { setting, .. } => {
                FieldKind::Derived(DynamicValue::Command(CommandValue::parse(setting, self)?))
            }
            Directive::Search { setting, .. } => {
                FieldKind::Derived(DynamicValue::Search(SearchValue::parse(setting, self)?))
            }
            Directive::External { source, .. } => FieldKind::External(Arc::clone(source)),
        };

        tracing::debug!(field = %name, directive = ?directive, "Registered field");

        let mut next = self.clone();
        next.fields.push(Arc::new(Field { name, kind }));
        next.params.directives.push(directive);
        Ok(next)
    }

    fn check_name(&self, name: &str) -> Result<()> {
        if name.is_empty()
            || name.chars().any(|c| c.is_whitespace() || c == '{' || c == '}')
        {
            return Err(FieldError::config("Invalid field name", name));
        }
        if self.id_of(name).is_some() {
            return Err(FieldError::config("Duplicate field", name));
        }
        Ok(())
    }
}
