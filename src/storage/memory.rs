use async_trait::async_trait;
use dashmap::DashMap;

use super::{validate_key, BlobMetadata, BlobStore, StoredBlob};
use crate::core::error::LibraryResult;

/// Process-local blob store, used for tests and throwaway instances
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blobs.contains_key(key)
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, metadata: BlobMetadata) -> LibraryResult<()> {
        validate_key(key)?;
        self.blobs.insert(key.to_string(), StoredBlob { data, metadata });
        Ok(())
    }

    async fn get(&self, key: &str) -> LibraryResult<Option<StoredBlob>> {
        validate_key(key)?;
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> LibraryResult<()> {
        validate_key(key)?;
        self.blobs.remove(key);
        Ok(())
    }
}
