//! Field engine
//!
//! A field turns a file into a string. Built-in fields read metadata or
//! stream a digest; derived fields are defined by settings and computed from
//! fields registered before them. Every field lives at a fixed index of an
//! append-only [`AvailableFields`] registry and is evaluated at most once per
//! file through [`Info`].

pub mod builtin;
pub mod dynamic;
pub mod info;
pub mod pipeline;
pub mod registry;

pub use builtin::*;
pub use dynamic::*;
pub use info::*;
pub use pipeline::*;
pub use registry::*;

use std::cmp::Ordering;
use std::fmt;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

/// Position of a field in its registry
///
/// Ids are stable: a registry extended with more fields keeps every existing id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub(crate) usize);

impl FieldId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a value should be ordered by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// Lexical order of the rendered text
    Text,
    /// Numeric order (sizes)
    Number(u64),
    /// Temporal order (timestamps)
    Time(SystemTime),
}

/// A computed field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub text: String,
    pub key: SortKey,
}

impl FieldValue {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            key: SortKey::Text,
        }
    }

    pub fn number(text: impl Into<String>, n: u64) -> Self {
        Self {
            text: text.into(),
            key: SortKey::Number(n),
        }
    }

    pub fn time(text: impl Into<String>, at: SystemTime) -> Self {
        Self {
            text: text.into(),
            key: SortKey::Time(at),
        }
    }

    /// Numbers and times compare by value, everything else by text
    pub fn compare(&self, other: &FieldValue) -> Ordering {
        match (&self.key, &other.key) {
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            (SortKey::Time(a), SortKey::Time(b)) => a.cmp(b),
            _ => self.text.cmp(&other.text),
        }
    }
}

/// A field computed by host code instead of a setting
pub trait FieldSource: Send + Sync {
    fn value(&self, path: &Path) -> Result<String>;
}

/// How a registered field computes its value
#[derive(Clone)]
pub enum FieldKind {
    Builtin(Builtin),
    Derived(DynamicValue),
    External(std::sync::Arc<dyn FieldSource>),
}

impl fmt::Debug for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::Builtin(b) => f.debug_tuple("Builtin").field(b).finish(),
            FieldKind::Derived(d) => f.debug_tuple("Derived").field(d).finish(),
            FieldKind::External(_) => f.write_str("External"),
        }
    }
}

/// A named entry of the registry
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub(crate) fn compute(&self, info: &Info<'_>) -> Result<FieldValue> {
        match &self.kind {
            FieldKind::Builtin(builtin) => builtin.compute(info),
            FieldKind::Derived(value) => value.compute(info),
            FieldKind::External(source) => source.value(info.path()).map(FieldValue::text),
        }
    }
}
