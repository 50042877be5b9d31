//! Error types shared by the field engine
//!
//! Two families matter to callers:
//! - configuration errors, raised while settings are parsed and fields are
//!   registered, always carrying the literal setting text
//! - per-file errors (I/O, command failures, per-file patterns), raised while
//!   a single file's values are computed and swallowed at the filter/listing
//!   boundary
//!
//! Errors are `Clone` so a failed computation can be cached and reported
//! again without redoing the work.

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors produced while configuring or evaluating fields
#[derive(Debug, Clone, Error)]
pub enum FieldError {
    /// A setting could not be parsed or registered
    #[error("{message}: {setting}")]
    Config { message: String, setting: String },

    /// The file behind a field could not be stat'ed or read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A field name was requested that the registry does not know
    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// A command pipeline could not be started or failed
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    /// A pattern rendered for one file is not a valid regex
    #[error("Invalid pattern `{pattern}` ({message}) in {setting}")]
    Pattern {
        pattern: String,
        message: String,
        setting: String,
    },
}

impl FieldError {
    /// Build a configuration error naming the offending setting
    pub fn config(message: impl Into<String>, setting: impl Into<String>) -> Self {
        FieldError::Config {
            message: message.into(),
            setting: setting.into(),
        }
    }

    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FieldError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }

    /// Whether this error belongs to configuration (fatal at load time)
    pub fn is_config(&self) -> bool {
        matches!(self, FieldError::Config { .. })
    }
}

pub type Result<T> = std::result::Result<T, FieldError>;
