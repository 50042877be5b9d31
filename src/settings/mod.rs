//! Parsers for the setting mini-languages
//!
//! A field setting is one of:
//! - `` `cmd arg | cmd2 ${field}` `` a command pipeline
//! - `/regex/o=1,g=1,c=UTF-8,f=field` a regex extraction
//! - anything else, a `${field}` template

pub mod parameterized;
pub mod splitter;
pub mod template;

pub use parameterized::*;
pub use splitter::*;
pub use template::*;

/// Delimiter wrapping command settings
pub const COMMAND_DELIM: char = '`';
/// Delimiter wrapping the regex of search settings
pub const SEARCH_DELIM: char = '/';
/// Parameter keys accepted by search settings
pub const SEARCH_KEYS: &[&str] = &["o", "g", "c", "f"];

/// Which kind of field a setting defines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKind {
    Template,
    Command,
    Search,
}

impl SettingKind {
    /// Classify a raw setting by its delimiters
    ///
    /// A leading `/` only makes a search when what follows the closing `/`
    /// is a valid search parameter list, so `/mnt/${filename}` stays a
    /// template.
    pub fn of(setting: &str) -> Self {
        if ParameterizedSetting::is_main_part_delim(COMMAND_DELIM, setting) {
            SettingKind::Command
        } else if ParameterizedSetting::is_main_part_delim(SEARCH_DELIM, setting)
            && ParameterizedSetting::parse(setting, Some(SEARCH_DELIM), SEARCH_KEYS).is_ok()
        {
            SettingKind::Search
        } else {
            SettingKind::Template
        }
    }
}
