//! Regex filters over file names and rendered templates
//!
//! All patterns must match the whole text, not a substring. A file passes a
//! [`FormatPatternFilter`] only if every inner filter and every pattern agree.
//! Errors while rendering a template reject that one file and are logged.

use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::{FieldError, Result};
use crate::fields::{file_name, AvailableFields, Info, TemplateValue};

/// Regex dialect flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegexOptions {
    pub case_insensitive: bool,
}

/// Compile `pattern` so that it only matches the whole input
fn compile_full(pattern: &str, options: RegexOptions) -> Result<Regex> {
    RegexBuilder::new(&format!("^(?:{})$", pattern))
        .case_insensitive(options.case_insensitive)
        .build()
        .map_err(|e| FieldError::config(format!("Invalid regex ({})", e), pattern))
}

/// Anything that accepts or rejects a file
pub trait FileFilter: Send + Sync {
    fn accept(&self, info: &Info<'_>) -> bool;
}

/// Accepts files whose name matches a regex
#[derive(Debug, Clone)]
pub struct RegexFilter {
    regex: Regex,
}

impl RegexFilter {
    pub fn new(pattern: &str, options: RegexOptions) -> Result<Self> {
        Ok(Self {
            regex: compile_full(pattern, options)?,
        })
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.regex.is_match(&file_name(path))
    }
}

impl FileFilter for RegexFilter {
    fn accept(&self, info: &Info<'_>) -> bool {
        self.matches(info.path())
    }
}

/// A template and a regex its rendering must (or must not) match
#[derive(Debug, Clone)]
pub struct FormatPattern {
    template: TemplateValue,
    regex: Regex,
    include: bool,
}

impl FormatPattern {
    pub fn new(
        template: &str,
        pattern: &str,
        include: bool,
        options: RegexOptions,
        fields: &AvailableFields,
    ) -> Result<Self> {
        Ok(Self {
            template: fields.template(template),
            regex: compile_full(pattern, options)?,
            include,
        })
    }

    pub fn include(&self) -> bool {
        self.include
    }

    /// Whether the file satisfies this pattern
    pub fn matches(&self, info: &Info<'_>) -> Result<bool> {
        let rendered = self.template.render(info)?;
        Ok(self.regex.is_match(&rendered) == self.include)
    }
}

/// Every inner filter and every pattern must accept
#[derive(Default)]
pub struct FormatPatternFilter {
    inner: Vec<Box<dyn FileFilter>>,
    patterns: Vec<FormatPattern>,
}

impl FormatPatternFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also require `filter` to accept
    pub fn over(mut self, filter: impl FileFilter + 'static) -> Self {
        self.inner.push(Box::new(filter));
        self
    }

    pub fn push(&mut self, pattern: FormatPattern) {
        self.patterns.push(pattern);
    }

    pub fn with(mut self, pattern: FormatPattern) -> Self {
        self.push(pattern);
        self
    }

    pub fn patterns(&self) -> &[FormatPattern] {
        &self.patterns
    }

    /// Like [`FileFilter::accept`] but hands back the first rendering error
    pub fn try_accept(&self, info: &Info<'_>) -> Result<bool> {
        if !self.inner.iter().all(|f| f.accept(info)) {
            return Ok(false);
        }
        for pattern in &self.patterns {
            if !pattern.matches(info)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl FileFilter for FormatPatternFilter {
    fn accept(&self, info: &Info<'_>) -> bool {
        match self.try_accept(info) {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::warn!(path = %info.path().display(), error = %e, "Rejecting file");
                false
            }
        }
    }
}

impl std::fmt::Debug for FormatPatternFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormatPatternFilter")
            .field("inner", &self.inner.len())
            .field("patterns", &self.patterns)
            .finish()
    }
}
