//! Multi-key ordering of files
//!
//! Order specs are sorted by precedence once, when the sorter is built, and
//! compared in that order for every pair. Sizes and times compare by value,
//! other fields by text. Unknown field names contribute nothing. Files whose
//! value cannot be computed sort after the others; [`OrderSpecInfoSorter::check`]
//! lets a caller drop them before sorting.

use std::cmp::Ordering;

use crate::error::Result;
use crate::fields::{AvailableFields, FieldId, Info};

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub field: String,
    /// Lower precedence is compared first
    pub precedence: i32,
    pub desc: bool,
}

impl OrderSpec {
    pub fn new(field: impl Into<String>, precedence: i32, desc: bool) -> Self {
        Self {
            field: field.into(),
            precedence,
            desc,
        }
    }

    /// Parse an order setting such as `"path filename desc size asc"`
    ///
    /// Each word names a field; `asc`/`desc` set the direction of the field
    /// before it. Precedence follows left-to-right position.
    pub fn parse_list(setting: &str) -> Vec<OrderSpec> {
        let mut specs: Vec<OrderSpec> = Vec::new();
        for word in setting.split_whitespace() {
            let direction = match word.to_ascii_lowercase().as_str() {
                "asc" => Some(false),
                "desc" => Some(true),
                _ => None,
            };
            match (direction, specs.last_mut()) {
                (Some(desc), Some(last)) => last.desc = desc,
                (Some(_), None) => {
                    tracing::debug!(word, "Ignoring direction without a field");
                }
                (None, _) => {
                    let precedence = specs.len() as i32;
                    specs.push(OrderSpec::new(word, precedence, false));
                }
            }
        }
        specs
    }
}

/// Compares files by a fixed list of order specs
#[derive(Debug, Clone, Default)]
pub struct OrderSpecInfoSorter {
    keys: Vec<(OrderSpec, Option<FieldId>)>,
}

impl OrderSpecInfoSorter {
    pub fn new(mut specs: Vec<OrderSpec>, fields: &AvailableFields) -> Self {
        specs.sort_by_key(|s| s.precedence);
        let keys = specs
            .into_iter()
            .map(|spec| {
                let id = fields.id_of(&spec.field);
                if id.is_none() {
                    tracing::warn!(field = %spec.field, "Unknown order field, ignoring");
                }
                (spec, id)
            })
            .collect();
        Self { keys }
    }

    /// Specs in the order they are applied
    pub fn specs(&self) -> impl Iterator<Item = &OrderSpec> {
        self.keys.iter().map(|(spec, _)| spec)
    }

    /// Compute every sort key of `info`, handing back the first failure
    pub fn check(&self, info: &Info<'_>) -> Result<()> {
        for id in self.keys.iter().filter_map(|(_, id)| *id) {
            info.value(id)?;
        }
        Ok(())
    }

    pub fn compare(&self, a: &Info<'_>, b: &Info<'_>) -> Ordering {
        for (spec, id) in &self.keys {
            let Some(id) = id else {
                continue;
            };
            // Files whose value fails sort last in either direction
            let ordering = match (a.value(*id), b.value(*id)) {
                (Ok(x), Ok(y)) => {
                    let ordering = x.compare(y);
                    if spec.desc {
                        ordering.reverse()
                    } else {
                        ordering
                    }
                }
                (Ok(_), Err(e)) => {
                    tracing::debug!(field = %spec.field, error = %e, "Value failed, sorting last");
                    Ordering::Less
                }
                (Err(e), Ok(_)) => {
                    tracing::debug!(field = %spec.field, error = %e, "Value failed, sorting last");
                    Ordering::Greater
                }
                (Err(_), Err(_)) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }

    /// Stable sort
    pub fn sort(&self, infos: &mut [Info<'_>]) {
        if self.keys.is_empty() {
            return;
        }
        infos.sort_by(|a, b| self.compare(a, b));
    }
}
