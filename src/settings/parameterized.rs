//! Settings of the form `<delim>main part<delim>key=value,key=value`
//!
//! Used for command settings (`` `...` ``) and search settings (`/.../o=2,g=1`).
//! The main part ends at the last unescaped delimiter; everything after it is
//! a comma-separated parameter list.

use std::collections::BTreeMap;

use crate::error::{FieldError, Result};

/// A setting split into its main part and trailing parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterizedSetting {
    whole: String,
    main: String,
    params: BTreeMap<String, String>,
}

impl ParameterizedSetting {
    /// Whether `setting` is wrapped by `delim` (opening char plus a later unescaped one)
    pub fn is_main_part_delim(delim: char, setting: &str) -> bool {
        setting.starts_with(delim) && closing_delim(delim, setting).is_some()
    }

    /// Parse a setting
    ///
    /// With `delim == None` the whole string is the main part and there are no
    /// parameters. Parameter keys outside `allowed` are rejected.
    pub fn parse(setting: &str, delim: Option<char>, allowed: &[&str]) -> Result<Self> {
        let Some(delim) = delim else {
            return Ok(Self {
                whole: setting.to_string(),
                main: setting.to_string(),
                params: BTreeMap::new(),
            });
        };

        if !setting.starts_with(delim) {
            return Err(FieldError::config(
                format!("Expected leading {}", delim),
                setting,
            ));
        }
        let end = closing_delim(delim, setting)
            .ok_or_else(|| FieldError::config(format!("Missing closing {}", delim), setting))?;

        let main = unescape_delim(&setting[delim.len_utf8()..end], delim);
        let params = parse_params(&setting[end + delim.len_utf8()..], allowed, setting)?;

        Ok(Self {
            whole: setting.to_string(),
            main,
            params,
        })
    }

    /// Text between the delimiters, with escaped delimiters resolved
    pub fn main_part(&self) -> &str {
        &self.main
    }

    /// The original unmodified setting
    pub fn whole(&self) -> &str {
        &self.whole
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Integer parameter with a default and lower bound
    ///
    /// `label` names the parameter in the error, e.g. `"Occurrence: /x/o=a"`.
    pub fn int_param(&self, key: &str, default: usize, min: usize, label: &str) -> Result<usize> {
        match self.param(key) {
            None => Ok(default),
            Some(raw) => match raw.parse::<usize>() {
                Ok(value) if value >= min => Ok(value),
                _ => Err(FieldError::config(label, &self.whole)),
            },
        }
    }
}

/// Byte offset of the last unescaped `delim` after the opening one
fn closing_delim(delim: char, setting: &str) -> Option<usize> {
    let start = delim.len_utf8();
    setting
        .char_indices()
        .filter(|&(i, c)| i >= start && c == delim && !is_escaped(setting, i))
        .map(|(i, _)| i)
        .last()
}

/// Odd number of backslashes right before `at`
fn is_escaped(text: &str, at: usize) -> bool {
    text[..at].bytes().rev().take_while(|&b| b == b'\\').count() % 2 == 1
}

fn unescape_delim(text: &str, delim: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek() == Some(&delim) {
            continue;
        }
        out.push(c);
    }
    out
}

fn parse_params(
    list: &str,
    allowed: &[&str],
    setting: &str,
) -> Result<BTreeMap<String, String>> {
    let mut params = BTreeMap::new();
    if list.trim().is_empty() {
        return Ok(params);
    }

    for entry in list.split(',') {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| FieldError::config("Malformed parameter", setting))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(FieldError::config("Malformed parameter", setting));
        }
        if !allowed.contains(&key) {
            return Err(FieldError::config(
                format!("Unknown parameter {}", key),
                setting,
            ));
        }
        params.insert(key.to_string(), value.trim().to_string());
    }

    Ok(params)
}
