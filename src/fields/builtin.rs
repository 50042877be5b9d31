//! Built-in fields
//!
//! Always registered, in this order, before any derived field. Name and path
//! fields never touch the file system; size and time fields share one stat
//! per file; `hash` streams the file through a fixed-size buffer.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Local, Utc};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use super::{FieldValue, Info};
use crate::error::{FieldError, Result};
use crate::utils::{format_size, to_hex};

/// Fields available without any setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    /// Last path segment
    Filename,
    /// Everything before the last segment, empty if none
    Path,
    /// Extension of the last segment without the dot
    Ext,
    /// MIME type guessed from the extension
    Mime,
    /// Byte count in decimal
    Size,
    /// Human readable byte count
    HumanSize,
    /// Last modification time
    Modified,
    /// Hex digest of the content
    Hash,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Filename,
        Builtin::Path,
        Builtin::Ext,
        Builtin::Mime,
        Builtin::Size,
        Builtin::HumanSize,
        Builtin::Modified,
        Builtin::Hash,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Filename => "filename",
            Builtin::Path => "path",
            Builtin::Ext => "ext",
            Builtin::Mime => "mime",
            Builtin::Size => "size",
            Builtin::HumanSize => "hsize",
            Builtin::Modified => "modified",
            Builtin::Hash => "hash",
        }
    }

    pub(crate) fn compute(self, info: &Info<'_>) -> Result<FieldValue> {
        let path = info.path();
        match self {
            Builtin::Filename => Ok(FieldValue::text(file_name(path))),
            Builtin::Path => Ok(FieldValue::text(
                path.parent()
                    .map(|p| p.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )),
            Builtin::Ext => Ok(FieldValue::text(extension(path))),
            Builtin::Mime => {
                let ext = extension(path);
                let mime = mime_guess::from_ext(&ext)
                    .first()
                    .map(|m| m.to_string())
                    .unwrap_or_default();
                Ok(FieldValue::text(mime))
            }
            Builtin::Size => {
                let len = info.metadata()?.len();
                Ok(FieldValue::number(len.to_string(), len))
            }
            Builtin::HumanSize => {
                let len = info.metadata()?.len();
                Ok(FieldValue::number(format_size(len), len))
            }
            Builtin::Modified => {
                let modified = info
                    .metadata()?
                    .modified()
                    .map_err(|e| FieldError::io(path, e))?;
                let engine = info.fields().engine();
                let text = if engine.utc {
                    DateTime::<Utc>::from(modified)
                        .format(&engine.date_format)
                        .to_string()
                } else {
                    DateTime::<Local>::from(modified)
                        .format(&engine.date_format)
                        .to_string()
                };
                Ok(FieldValue::time(text, modified))
            }
            Builtin::Hash => {
                let engine = info.fields().engine();
                let digest = hash_file(path, engine.hash, engine.buffer_size)
                    .map_err(|e| FieldError::io(path, e))?;
                Ok(FieldValue::text(to_hex(&digest, engine.uppercase_hex)))
            }
        }
    }
}

/// Last path segment as text, also used by name filters
pub fn file_name(path: &Path) -> String {
    path.components()
        .next_back()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .unwrap_or_default()
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Digests supported by the `hash` field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl HashAlgorithm {
    /// Parse a name such as `SHA-256`, `sha256` or `MD5`
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "md5" => Some(HashAlgorithm::Md5),
            "sha224" => Some(HashAlgorithm::Sha224),
            "sha256" => Some(HashAlgorithm::Sha256),
            "sha384" => Some(HashAlgorithm::Sha384),
            "sha512" => Some(HashAlgorithm::Sha512),
            _ => None,
        }
    }
}

/// Digest a file's content, reading through a `buffer_size` buffer
///
/// The file handle is dropped before returning on every path.
pub fn hash_file(path: &Path, algorithm: HashAlgorithm, buffer_size: usize) -> std::io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; buffer_size.max(1)];

    match algorithm {
        HashAlgorithm::Md5 => {
            let mut context = md5::Context::new();
            read_chunks(&mut file, &mut buffer, |chunk| context.consume(chunk))?;
            Ok(context.compute().0.to_vec())
        }
        HashAlgorithm::Sha224 => stream_digest::<Sha224>(&mut file, &mut buffer),
        HashAlgorithm::Sha256 => stream_digest::<Sha256>(&mut file, &mut buffer),
        HashAlgorithm::Sha384 => stream_digest::<Sha384>(&mut file, &mut buffer),
        HashAlgorithm::Sha512 => stream_digest::<Sha512>(&mut file, &mut buffer),
    }
}

fn stream_digest<D: Digest>(file: &mut File, buffer: &mut [u8]) -> std::io::Result<Vec<u8>> {
    let mut hasher = D::new();
    read_chunks(file, buffer, |chunk| hasher.update(chunk))?;
    Ok(hasher.finalize().to_vec())
}

fn read_chunks<F>(file: &mut File, buffer: &mut [u8], mut sink: F) -> std::io::Result<()>
where
    F: FnMut(&[u8]),
{
    loop {
        let bytes_read = file.read(buffer)?;
        if bytes_read == 0 {
            return Ok(());
        }
        sink(&buffer[..bytes_read]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_algorithm_names() {
        assert_eq!(HashAlgorithm::from_name("SHA-256"), Some(HashAlgorithm::Sha256));
        assert_eq!(HashAlgorithm::from_name("sha512"), Some(HashAlgorithm::Sha512));
        assert_eq!(HashAlgorithm::from_name("Md5"), Some(HashAlgorithm::Md5));
        assert_eq!(HashAlgorithm::from_name("whirlpool"), None);
    }

    #[test]
    fn test_known_digests() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("abc.txt");
        std::fs::write(&file, "abc").unwrap();

        let sha = hash_file(&file, HashAlgorithm::Sha256, 2).unwrap();
        assert_eq!(
            to_hex(&sha, false),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        let md5 = hash_file(&file, HashAlgorithm::Md5, 8192).unwrap();
        assert_eq!(to_hex(&md5, false), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_buffer_size_does_not_change_digest() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("big.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&file, &data).unwrap();

        let small = hash_file(&file, HashAlgorithm::Sha512, 7).unwrap();
        let large = hash_file(&file, HashAlgorithm::Sha512, 65536).unwrap();
        assert_eq!(small, large);
    }

    #[test]
    fn test_missing_file_fails() {
        let dir = tempdir().unwrap();
        assert!(hash_file(&dir.path().join("missing"), HashAlgorithm::Sha256, 8192).is_err());
    }

    #[test]
    fn test_name_helpers() {
        assert_eq!(file_name(Path::new("/a/b/c.tar.gz")), "c.tar.gz");
        assert_eq!(extension(Path::new("/a/b/c.tar.gz")), "gz");
        assert_eq!(extension(Path::new("Makefile")), "");
    }
}
