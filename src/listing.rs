//! Filter, order and render a set of files
//!
//! This is the consumption boundary: per-file failures end here as warnings
//! and the file is left out. Nothing is written anywhere; callers get the
//! rendered lines back.

use std::path::{Path, PathBuf};

use crate::fields::{AvailableFields, Info, TemplateValue};
use crate::filter::{FileFilter, FormatPatternFilter};
use crate::order::OrderSpecInfoSorter;

/// One rendered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedFile {
    pub path: PathBuf,
    pub line: String,
}

/// A configured listing
#[derive(Debug)]
pub struct Listing {
    fields: AvailableFields,
    filter: FormatPatternFilter,
    sorter: OrderSpecInfoSorter,
    format: TemplateValue,
}

impl Listing {
    pub fn new(
        fields: AvailableFields,
        filter: FormatPatternFilter,
        sorter: OrderSpecInfoSorter,
        format: TemplateValue,
    ) -> Self {
        Self {
            fields,
            filter,
            sorter,
            format,
        }
    }

    pub fn fields(&self) -> &AvailableFields {
        &self.fields
    }

    /// Filter, sort and render `paths`
    pub fn run<I, P>(&self, paths: I) -> Vec<ListedFile>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut infos: Vec<Info<'_>> = paths
            .into_iter()
            .map(|p| self.fields.info(p))
            .filter(|info| self.filter.accept(info))
            .filter(|info| match self.sorter.check(info) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(path = %info.path().display(), error = %e, "Rejecting file");
                    false
                }
            })
            .collect();

        self.sorter.sort(&mut infos);

        let listed: Vec<ListedFile> = infos
            .iter()
            .filter_map(|info| match self.format.render(info) {
                Ok(line) => Some(ListedFile {
                    path: info.path().to_path_buf(),
                    line,
                }),
                Err(e) => {
                    tracing::warn!(path = %info.path().display(), error = %e, "Skipping file");
                    None
                }
            })
            .collect();

        tracing::debug!(count = listed.len(), "Listing complete");
        listed
    }
}
