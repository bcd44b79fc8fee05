//! Blob storage for compressed chapter bodies.

pub mod cache;
pub mod codec;
pub mod fs;
pub mod memory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::error::{LibraryError, LibraryResult};

/// HTTP-facing metadata kept alongside each blob
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlobMetadata {
    pub content_type: String,
    pub content_encoding: Option<String>,
}

impl BlobMetadata {
    /// Metadata for gzip-compressed plain text
    pub fn gzip_text() -> Self {
        Self {
            content_type: "text/plain".to_string(),
            content_encoding: Some("gzip".to_string()),
        }
    }
}

/// A blob read back from the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub data: Vec<u8>,
    pub metadata: BlobMetadata,
}

/// Key/value object store holding chapter bodies
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` under `key`, replacing any previous value
    async fn put(&self, key: &str, data: Vec<u8>, metadata: BlobMetadata) -> LibraryResult<()>;

    /// Fetch the blob under `key`, or `None` if absent
    async fn get(&self, key: &str) -> LibraryResult<Option<StoredBlob>>;

    /// Remove the blob under `key`; removing an absent key is not an error
    async fn delete(&self, key: &str) -> LibraryResult<()>;
}

/// Suffix of the filesystem store's metadata sidecars
pub const METADATA_SUFFIX: &str = ".meta.json";
/// Suffix of in-flight filesystem writes
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Keys are relative slash-separated paths without `.` or `..` segments.
/// Names the filesystem store uses for its own files are reserved.
pub fn validate_key(key: &str) -> LibraryResult<()> {
    let bad = key.is_empty()
        || key.ends_with(METADATA_SUFFIX)
        || key.ends_with(PARTIAL_SUFFIX)
        || key.starts_with('/')
        || key.contains('\\')
        || key.contains('\0')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(LibraryError::ValidationError(format!("invalid blob key: {:?}", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("novel/chapter.txt.gz").is_ok());
        assert!(validate_key("flat.txt").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
        assert!(validate_key("a\\b").is_err());
        assert!(validate_key("n/c.txt.gz.meta.json").is_err());
        assert!(validate_key("n/c.partial").is_err());
    }
}
