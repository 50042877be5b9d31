//! Configuration for the field engine and listings
//!
//! `EngineConfig` carries the values every field computation depends on
//! (date pattern, charset, digest settings). It is validated once and turned
//! into an [`Engine`] that is threaded through registry construction.
//! `ListingConfig` is the full set of settings for one listing run.

use std::sync::Arc;

use chrono::format::{Item, StrftimeItems};
use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};
use crate::fields::{AvailableFields, DuctRunner, HashAlgorithm, PipelineRunner};
use crate::filter::{FormatPattern, FormatPatternFilter, RegexFilter, RegexOptions};
use crate::listing::Listing;
use crate::order::{OrderSpec, OrderSpecInfoSorter};

/// Raw engine settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// strftime pattern used to render the `modified` field
    pub date_format: String,
    /// Render times in UTC instead of the local timezone
    pub utc: bool,
    /// Charset used to decode file bytes for search fields without `c=`
    pub default_charset: String,
    /// Read buffer size for the `hash` field
    pub buffer_size: usize,
    /// Digest used by the `hash` field (MD5, SHA-224, SHA-256, SHA-384, SHA-512)
    pub hash_algorithm: String,
    /// Render digests with upper-case hex digits
    pub uppercase_hex: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            utc: false,
            default_charset: "UTF-8".to_string(),
            buffer_size: 8192,
            hash_algorithm: "SHA-256".to_string(),
            uppercase_hex: false,
        }
    }
}

impl EngineConfig {
    /// Check every value and resolve names into an [`Engine`]
    pub fn validate(&self) -> Result<Engine> {
        if StrftimeItems::new(&self.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(FieldError::config("Date format", &self.date_format));
        }
        let default_charset = charset_for(&self.default_charset)
            .ok_or_else(|| FieldError::config("Charset", &self.default_charset))?;
        let hash = HashAlgorithm::from_name(&self.hash_algorithm)
            .ok_or_else(|| FieldError::config("Unknown hash algorithm", &self.hash_algorithm))?;
        if self.buffer_size == 0 {
            return Err(FieldError::config(
                "Buffer size",
                self.buffer_size.to_string(),
            ));
        }

        Ok(Engine {
            date_format: self.date_format.clone(),
            utc: self.utc,
            default_charset,
            buffer_size: self.buffer_size,
            hash,
            uppercase_hex: self.uppercase_hex,
            runner: Arc::new(DuctRunner),
        })
    }
}

/// Look up a charset by its WHATWG label (`UTF-8`, `latin1`, `windows-1252`, ...)
pub fn charset_for(name: &str) -> Option<&'static Encoding> {
    Encoding::for_label(name.trim().as_bytes())
}

/// Validated engine settings shared by every field of a registry
#[derive(Debug, Clone)]
pub struct Engine {
    pub date_format: String,
    pub utc: bool,
    pub default_charset: &'static Encoding,
    pub buffer_size: usize,
    pub hash: HashAlgorithm,
    pub uppercase_hex: bool,
    pub runner: Arc<dyn PipelineRunner>,
}

impl Engine {
    /// Replace the command pipeline runner
    pub fn with_runner(mut self, runner: Arc<dyn PipelineRunner>) -> Self {
        self.runner = runner;
        self
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            date_format: "%Y-%m-%d %H:%M:%S".to_string(),
            utc: false,
            default_charset: encoding_rs::UTF_8,
            buffer_size: 8192,
            hash: HashAlgorithm::Sha256,
            uppercase_hex: false,
            runner: Arc::new(DuctRunner),
        }
    }
}

/// One derived field definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldSetting {
    pub name: String,
    pub setting: String,
}

/// Template rendered per file and matched in full against `regex`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatternSetting {
    pub template: String,
    pub regex: String,
}

/// Everything needed to build a [`Listing`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ListingConfig {
    pub engine: EngineConfig,
    /// Derived fields, in registration order
    pub fields: Vec<FieldSetting>,
    /// Order setting, e.g. `"path filename desc size"`
    pub order: String,
    pub include: Vec<PatternSetting>,
    pub exclude: Vec<PatternSetting>,
    /// Regexes every file name must match
    pub names: Vec<String>,
    pub ignore_case: bool,
    /// Output template for each listed file
    pub format: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            fields: Vec::new(),
            order: String::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            names: Vec::new(),
            ignore_case: false,
            format: "${filename}".to_string(),
        }
    }
}

impl ListingConfig {
    /// Parse a JSON settings document
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| FieldError::config(format!("Invalid settings ({})", e), text))
    }

    /// Build the listing using the default pipeline runner
    pub fn build(&self) -> Result<Listing> {
        self.build_with(self.engine.validate()?)
    }

    /// Build the listing on an already validated engine
    pub fn build_with(&self, engine: Engine) -> Result<Listing> {
        let mut fields = AvailableFields::new(engine);
        for field in &self.fields {
            fields = fields.define(&field.name, &field.setting)?;
        }

        let options = RegexOptions {
            case_insensitive: self.ignore_case,
        };

        let mut filter = FormatPatternFilter::new();
        for name in &self.names {
            filter = filter.over(RegexFilter::new(name, options)?);
        }
        for p in &self.include {
            filter.push(FormatPattern::new(&p.template, &p.regex, true, options, &fields)?);
        }
        for p in &self.exclude {
            filter.push(FormatPattern::new(&p.template, &p.regex, false, options, &fields)?);
        }

        let sorter = OrderSpecInfoSorter::new(OrderSpec::parse_list(&self.order), &fields);
        let format = fields.template(&self.format);

        Ok(Listing::new(fields, filter, sorter, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let engine = EngineConfig::default().validate().unwrap();
        assert_eq!(engine.hash, HashAlgorithm::Sha256);
        assert_eq!(engine.default_charset, encoding_rs::UTF_8);
        assert_eq!(engine.buffer_size, 8192);
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let bad_date = EngineConfig {
            date_format: "%Y-%".to_string(),
            ..Default::default()
        };
        assert_eq!(bad_date.validate().unwrap_err().to_string(), "Date format: %Y-%");

        let bad_charset = EngineConfig {
            default_charset: "klingon".to_string(),
            ..Default::default()
        };
        assert_eq!(bad_charset.validate().unwrap_err().to_string(), "Charset: klingon");

        let bad_hash = EngineConfig {
            hash_algorithm: "CRC-7".to_string(),
            ..Default::default()
        };
        assert!(bad_hash.validate().unwrap_err().is_config());

        let no_buffer = EngineConfig {
            buffer_size: 0,
            ..Default::default()
        };
        assert!(no_buffer.validate().is_err());
    }

    #[test]
    fn test_listing_config_from_json() {
        let config = ListingConfig::from_json_str(
            r#"{
                "engine": { "hashAlgorithm": "MD5", "uppercaseHex": true },
                "fields": [ { "name": "stem", "setting": "/^([^.]*)/g=1,f=filename" } ],
                "order": "size desc",
                "exclude": [ { "template": "${ext}", "regex": "tmp" } ],
                "format": "${stem}"
            }"#,
        )
        .unwrap();
        assert_eq!(config.engine.hash_algorithm, "MD5");
        assert_eq!(config.engine.date_format, "%Y-%m-%d %H:%M:%S");
        assert_eq!(config.fields.len(), 1);
        assert!(config.include.is_empty());
        config.build().unwrap();
    }

    #[test]
    fn test_listing_config_rejects_bad_field() {
        let config = ListingConfig {
            fields: vec![FieldSetting {
                name: "broken".to_string(),
                setting: "``".to_string(),
            }],
            ..Default::default()
        };
        let err = config.build().unwrap_err();
        assert!(err.to_string().contains("Empty command"));
    }
}
