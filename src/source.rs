//! C1: source ingestion — read files, normalize content, derive a stable
//! content hash (spec §3 SourceFile, §4.1 "Normalizes source before
//! hashing").

use crate::error::{SourceError, SourceResult};
use crate::parsing::Language;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Identity: absolute path + language tag. Content is immutable within a
/// build.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    /// Normalized UTF-8 text: CRLF→LF, Unicode NFC.
    pub content: String,
    /// SHA-256 hex digest of the normalized content.
    pub content_hash: String,
}

impl SourceFile {
    /// Read `path` from disk, enforcing `max_file_bytes`, and normalize.
    pub fn read(path: &Path, max_file_bytes: u64) -> SourceResult<Self> {
        let meta = std::fs::metadata(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SourceError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                SourceError::Io {
                    path: path.to_path_buf(),
                    source: e,
                }
            }
        })?;
        if meta.len() > max_file_bytes {
            return Err(SourceError::TooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: max_file_bytes,
            });
        }

        let bytes = std::fs::read(path).map_err(|e| SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let raw = String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8 {
            path: path.to_path_buf(),
        })?;

        let language = Language::from_path(path).unwrap_or(Language::Rust);
        let content = normalize(&raw);
        let content_hash = hash_content(&content);

        Ok(Self {
            path: path.to_path_buf(),
            language,
            content,
            content_hash,
        })
    }

    pub fn from_memory(path: impl Into<PathBuf>, raw: &str, language: Language) -> Self {
        let content = normalize(raw);
        let content_hash = hash_content(&content);
        Self {
            path: path.into(),
            language,
            content,
            content_hash,
        }
    }
}

/// CRLF→LF, then Unicode NFC composition — exactly the two steps spec
/// §4.1 names ("converts line endings, composes Unicode").
pub fn normalize(raw: &str) -> String {
    let lf_only = raw.replace("\r\n", "\n");
    lf_only.nfc().collect()
}

pub fn hash_content(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_converts_crlf() {
        let out = normalize("a\r\nb\r\n");
        assert_eq!(out, "a\nb\n");
    }

    #[test]
    fn content_hash_is_deterministic() {
        let a = hash_content("fn main() {}");
        let b = hash_content("fn main() {}");
        assert_eq!(a, b);
    }

    #[test]
    fn content_hash_differs_on_change() {
        let a = hash_content("fn main() {}");
        let b = hash_content("fn main() { }");
        assert_ne!(a, b);
    }

    #[test]
    fn read_rejects_oversized_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.rs");
        std::fs::write(&path, "x".repeat(100)).unwrap();
        let err = SourceFile::read(&path, 10).unwrap_err();
        assert!(matches!(err, SourceError::TooLarge { .. }));
    }

    #[test]
    fn read_normalizes_and_hashes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        std::fs::write(&path, "def f():\r\n    pass\r\n").unwrap();
        let file = SourceFile::read(&path, 10_000).unwrap();
        assert_eq!(file.content, "def f():\n    pass\n");
        assert_eq!(file.language, Language::Python);
    }
}
