use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, warn};
use uuid::Uuid;

use super::{validate_key, BlobMetadata, BlobStore, StoredBlob};
use crate::core::error::{LibraryError, LibraryResult};

use super::{METADATA_SUFFIX, PARTIAL_SUFFIX};

/// Blob store rooted at a directory; each key maps to a file plus a
/// `.meta.json` sidecar holding its metadata
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub async fn new(root: impl Into<PathBuf>) -> LibraryResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn metadata_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}{}", key, METADATA_SUFFIX))
    }
}

async fn remove_if_present(path: &Path) -> LibraryResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Sibling scratch file, unique per write
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}{}", name, Uuid::new_v4(), PARTIAL_SUFFIX))
}

async fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> LibraryResult<()> {
    tokio::fs::write(tmp, data).await?;
    tokio::fs::rename(tmp, path).await?;
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>, metadata: BlobMetadata) -> LibraryResult<()> {
        validate_key(key)?;
        let path = self.data_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Readers only ever see complete bodies
        let tmp = temp_path(&path);
        if let Err(err) = write_then_rename(&tmp, &path, &data).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(err);
        }
        let sidecar = serde_json::to_vec(&metadata)
            .map_err(|e| LibraryError::StorageError(format!("metadata for {}: {}", key, e)))?;
        tokio::fs::write(self.metadata_path(key), sidecar).await?;

        debug!("Stored blob {} ({} bytes)", key, data.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> LibraryResult<Option<StoredBlob>> {
        validate_key(key)?;
        let data = match tokio::fs::read(self.data_path(key)).await {
            Ok(data) => data,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let metadata = match tokio::fs::read(self.metadata_path(key)).await {
            Ok(raw) => serde_json::from_slice(&raw).unwrap_or_else(|err| {
                warn!("Unreadable metadata for blob {}: {}", key, err);
                BlobMetadata::gzip_text()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => BlobMetadata::gzip_text(),
            Err(err) => return Err(err.into()),
        };

        Ok(Some(StoredBlob { data, metadata }))
    }

    async fn delete(&self, key: &str) -> LibraryResult<()> {
        validate_key(key)?;
        remove_if_present(&self.data_path(key)).await?;
        remove_if_present(&self.metadata_path(key)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_put_creates_nested_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path().join("chapters")).await.unwrap();

        store
            .put("novel-1/chapter-1.txt.gz", b"payload".to_vec(), BlobMetadata::gzip_text())
            .await
            .unwrap();
        assert!(store.root().join("novel-1/chapter-1.txt.gz").exists());

        let blob = store.get("novel-1/chapter-1.txt.gz").await.unwrap().expect("stored");
        assert_eq!(blob.data, b"payload");
        assert_eq!(blob.metadata, BlobMetadata::gzip_text());
    }

    #[actix_web::test]
    async fn test_overwrite_and_delete() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        let meta = BlobMetadata {
            content_type: "application/json".to_string(),
            content_encoding: None,
        };

        store.put("k.bin", b"one".to_vec(), BlobMetadata::gzip_text()).await.unwrap();
        store.put("k.bin", b"two".to_vec(), meta.clone()).await.unwrap();
        let blob = store.get("k.bin").await.unwrap().expect("stored");
        assert_eq!(blob.data, b"two");
        assert_eq!(blob.metadata, meta);

        store.delete("k.bin").await.unwrap();
        assert!(store.get("k.bin").await.unwrap().is_none());
        store.delete("k.bin").await.unwrap();
    }

    #[actix_web::test]
    async fn test_sibling_keys_do_not_share_scratch_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).await.unwrap();

        let (a, b) = tokio::join!(
            store.put("a.txt.gz", b"gzip".to_vec(), BlobMetadata::gzip_text()),
            store.put("a.txt.zip", b"zip".to_vec(), BlobMetadata::gzip_text()),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(store.get("a.txt.gz").await.unwrap().expect("gz").data, b"gzip");
        assert_eq!(store.get("a.txt.zip").await.unwrap().expect("zip").data, b"zip");
        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);
        assert_ne!(temp_path(Path::new("a.txt.gz")), temp_path(Path::new("a.txt.gz")));
    }

    #[actix_web::test]
    async fn test_sidecar_names_are_not_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        store.put("k.bin", b"data".to_vec(), BlobMetadata::gzip_text()).await.unwrap();

        let hijack = store
            .put("k.bin.meta.json", b"{}".to_vec(), BlobMetadata::gzip_text())
            .await;
        assert!(hijack.is_err());
        assert_eq!(
            store.get("k.bin").await.unwrap().expect("stored").metadata,
            BlobMetadata::gzip_text()
        );
    }

    #[actix_web::test]
    async fn test_rejects_escaping_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FsBlobStore::new(dir.path()).await.unwrap();
        assert!(store.put("../outside", vec![], BlobMetadata::gzip_text()).await.is_err());
        assert!(store.get("/abs").await.is_err());
    }
}
