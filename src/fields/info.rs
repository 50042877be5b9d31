//! Per-file evaluation with memoized field values
//!
//! An `Info` binds one path to one registry snapshot. Each field's value is
//! computed the first time it is asked for and kept for the life of the
//! `Info`, so templates, sorters and filters share a single evaluation.
//! Failures are cached too and handed back as clones of the first error.

use std::cell::OnceCell;
use std::fs::Metadata;
use std::path::{Path, PathBuf};

use encoding_rs::Encoding;

use super::{AvailableFields, FieldId, FieldValue};
use crate::error::{FieldError, Result};

/// One file's view of the registry
///
/// Not meant to be shared across threads; give each file its own `Info`
/// over the same registry instead.
#[derive(Debug)]
pub struct Info<'f> {
    path: PathBuf,
    fields: &'f AvailableFields,
    cache: Vec<OnceCell<Result<FieldValue>>>,
    metadata: OnceCell<Result<Metadata>>,
    content: OnceCell<Result<Vec<u8>>>,
}

impl<'f> Info<'f> {
    pub fn new(path: impl AsRef<Path>, fields: &'f AvailableFields) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            fields,
            cache: (0..fields.len()).map(|_| OnceCell::new()).collect(),
            metadata: OnceCell::new(),
            content: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fields(&self) -> &'f AvailableFields {
        self.fields
    }

    /// Value of a field by name
    pub fn get(&self, name: &str) -> Result<String> {
        self.value_of(name).map(|v| v.text.clone())
    }

    pub fn value_of(&self, name: &str) -> Result<&FieldValue> {
        let id = self
            .fields
            .id_of(name)
            .ok_or_else(|| FieldError::UnknownField(name.to_string()))?;
        self.value(id)
    }

    /// Value of a field, computing it on first use
    pub fn value(&self, id: FieldId) -> Result<&FieldValue> {
        let cell = self
            .cache
            .get(id.0)
            .ok_or_else(|| FieldError::UnknownField(format!("#{}", id.0)))?;
        if let Some(cached) = cell.get() {
            return cached.as_ref().map_err(Clone::clone);
        }

        let field = self
            .fields
            .field(id)
            .ok_or_else(|| FieldError::UnknownField(format!("#{}", id.0)))?;
        // Dependencies live in other cells, so computing cannot re-enter this one
        let computed = field.compute(self);
        match &computed {
            Ok(_) => {
                tracing::trace!(path = %self.path.display(), field = field.name(), "Computed field");
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), field = field.name(), error = %e, "Field failed");
            }
        }
        cell.get_or_init(|| computed).as_ref().map_err(Clone::clone)
    }

    /// File metadata, read once
    pub fn metadata(&self) -> Result<&Metadata> {
        self.metadata
            .get_or_init(|| std::fs::metadata(&self.path).map_err(|e| FieldError::io(&self.path, e)))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// File content decoded with `charset`; the bytes are read once
    pub fn content(&self, charset: &'static Encoding) -> Result<String> {
        let bytes = self
            .content
            .get_or_init(|| std::fs::read(&self.path).map_err(|e| FieldError::io(&self.path, e)))
            .as_ref()
            .map_err(Clone::clone)?;
        let (text, _, _) = charset.decode(bytes);
        Ok(text.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Engine, EngineConfig};
    use crate::fields::FieldSource;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl FieldSource for Counting {
        fn value(&self, path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("seen:{}", path.display()))
        }
    }

    #[derive(Default)]
    struct Failing {
        calls: AtomicUsize,
    }

    impl FieldSource for Failing {
        fn value(&self, _path: &Path) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FieldError::Command {
                command: "false".to_string(),
                message: "exit status 1".to_string(),
            })
        }
    }

    #[test]
    fn test_builtin_values() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "hello").unwrap();

        let fields = AvailableFields::new(Engine::default());
        let info = fields.info(&file);
        assert_eq!(info.get("filename").unwrap(), "notes.txt");
        assert_eq!(info.get("path").unwrap(), dir.path().to_string_lossy());
        assert_eq!(info.get("ext").unwrap(), "txt");
        assert_eq!(info.get("mime").unwrap(), "text/plain");
        assert_eq!(info.get("size").unwrap(), "5");
        assert_eq!(info.get("hsize").unwrap(), "5B");
        assert_eq!(
            info.get("hash").unwrap(),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert!(matches!(info.get("bogus"), Err(FieldError::UnknownField(_))));
    }

    #[test]
    fn test_path_of_bare_name_is_empty() {
        let fields = AvailableFields::new(Engine::default());
        let info = fields.info("alone.md");
        assert_eq!(info.get("path").unwrap(), "");
        assert_eq!(info.get("filename").unwrap(), "alone.md");
    }

    #[test]
    fn test_modified_uses_configured_pattern() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("dated");
        std::fs::write(&file, "x").unwrap();

        let engine = EngineConfig {
            date_format: "%Y".to_string(),
            utc: true,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let fields = AvailableFields::new(engine);
        let year = fields.info(&file).get("modified").unwrap();
        assert_eq!(year.len(), 4);
        assert!(year.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_uppercase_md5() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("abc");
        std::fs::write(&file, "abc").unwrap();

        let engine = EngineConfig {
            hash_algorithm: "MD5".to_string(),
            uppercase_hex: true,
            ..Default::default()
        }
        .validate()
        .unwrap();
        let fields = AvailableFields::new(engine);
        assert_eq!(
            fields.info(&file).get("hash").unwrap(),
            "900150983CD24FB0D6963F7D28E17F72"
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let fields = AvailableFields::new(Engine::default());
        let info = fields.info(dir.path().join("gone.bin"));
        assert!(matches!(info.get("size"), Err(FieldError::Io { .. })));
        assert!(matches!(info.get("hash"), Err(FieldError::Io { .. })));
        // Name fields still work
        assert_eq!(info.get("filename").unwrap(), "gone.bin");
    }

    #[test]
    fn test_each_field_computed_once() {
        let counting = Arc::new(Counting::default());
        let fields = AvailableFields::new(Engine::default())
            .with_source("probe", counting.clone())
            .unwrap()
            .define("twice", "${probe}|${probe}")
            .unwrap()
            .define("again", "${twice}/${probe}")
            .unwrap();

        let info = fields.info("/x/y.txt");
        assert_eq!(info.get("again").unwrap(), "seen:/x/y.txt|seen:/x/y.txt/seen:/x/y.txt");
        info.get("probe").unwrap();
        info.get("twice").unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 1);

        // A fresh Info starts with an empty cache
        fields.info("/x/y.txt").get("probe").unwrap();
        assert_eq!(counting.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failed_field_computed_once() {
        let failing = Arc::new(Failing::default());
        let fields = AvailableFields::new(Engine::default())
            .with_source("bad", failing.clone())
            .unwrap()
            .define("t1", "${bad}")
            .unwrap()
            .define("t2", "${bad}-${bad}")
            .unwrap();

        let info = fields.info("/x/y.txt");
        assert!(matches!(info.get("t1"), Err(FieldError::Command { .. })));
        assert!(matches!(info.get("t2"), Err(FieldError::Command { .. })));
        assert!(matches!(info.get("bad"), Err(FieldError::Command { .. })));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_file_is_stat_once() {
        let dir = tempdir().unwrap();
        let fields = AvailableFields::new(Engine::default());
        let info = fields.info(dir.path().join("gone.bin"));
        assert!(info.metadata().is_err());

        // Creating the file later does not change this Info's view
        std::fs::write(dir.path().join("gone.bin"), "late").unwrap();
        assert!(matches!(info.get("size"), Err(FieldError::Io { .. })));
        assert_eq!(fields.info(dir.path().join("gone.bin")).get("size").unwrap(), "4");
    }
}
