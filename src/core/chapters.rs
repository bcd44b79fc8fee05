//! Chapter lifecycle: rows in the database, gzip bodies in the blob store.

use std::sync::Arc;

use chrono::Utc;
use log::{error, info, warn};

use crate::core::database::Database;
use crate::core::error::{LibraryError, LibraryResult};
use crate::core::ids;
use crate::core::metrics::LibraryMetrics;
use crate::core::models::{word_count, Chapter, ChapterUpdate, DeleteOutcome, NewChapter};
use crate::storage::cache::ChapterCache;
use crate::storage::codec::{gunzip_to_string, gzip_string};
use crate::storage::{validate_key, BlobMetadata, BlobStore, StoredBlob};

/// Coordinates chapter rows with their compressed bodies
pub struct ChapterService {
    db: Arc<Database>,
    blobs: Arc<dyn BlobStore>,
    cache: ChapterCache,
    metrics: LibraryMetrics,
}

impl ChapterService {
    pub fn new(
        db: Arc<Database>,
        blobs: Arc<dyn BlobStore>,
        cache_capacity: usize,
        metrics: LibraryMetrics,
    ) -> Self {
        Self {
            db,
            blobs,
            cache: ChapterCache::new(cache_capacity),
            metrics,
        }
    }

    pub fn metrics(&self) -> &LibraryMetrics {
        &self.metrics
    }

    /// Compress and store `text` under `key`, returning the stored size
    async fn write_body(&self, key: &str, text: &str) -> LibraryResult<usize> {
        let compressed = gzip_string(text)?;
        let size = compressed.len();
        self.blobs
            .put(key, compressed, BlobMetadata::gzip_text())
            .await
            .map_err(|e| {
                error!("Failed to store blob {}: {}", key, e);
                LibraryError::StorageError(format!("save failed: {}", e))
            })?;
        self.cache.invalidate(key);
        self.metrics.compressed_bytes_written.inc_by(size as u64);
        Ok(size)
    }

    async fn read_body(&self, key: &str) -> LibraryResult<Arc<str>> {
        if let Some(body) = self.cache.get(key) {
            self.metrics.cache_hits.inc();
            return Ok(body);
        }
        self.metrics.cache_misses.inc();

        let generation = self.cache.generation();
        let blob = self
            .blobs
            .get(key)
            .await?
            .ok_or_else(|| LibraryError::NotFound("chapter content missing".to_string()))?;
        let body: Arc<str> = Arc::from(gunzip_to_string(&blob.data)?);
        self.cache.insert_if_current(key, body.clone(), generation);
        Ok(body)
    }

    async fn remove_body(&self, key: &str) {
        self.cache.invalidate(key);
        if let Err(e) = self.blobs.delete(key).await {
            warn!("Failed to remove blob {}: {}", key, e);
        }
        self.cache.invalidate(key);
    }

    /// Create a chapter; the body is stored before the row is written
    pub async fn create_chapter(&self, input: &NewChapter) -> LibraryResult<Chapter> {
        input.validate()?;
        self.db.get_novel(&input.novel_id)?;

        let id = ids::chapter_id();
        let key = ids::chapter_blob_key(&input.novel_id, &id);
        self.write_body(&key, &input.content).await?;

        let now = Utc::now();
        let chapter = Chapter {
            id,
            novel_id: input.novel_id.clone(),
            chapter_number: input.chapter_number,
            title: input.title.trim().to_string(),
            content: key.clone(),
            is_free: input.is_free,
            is_published: true,
            word_count: word_count(&input.content),
            view_count: 0,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.db.insert_chapter(&chapter) {
            self.remove_body(&key).await;
            return Err(e);
        }
        self.metrics.chapters_written.inc();
        Ok(chapter)
    }

    /// Chapter with its text; counts a read against the chapter and novel
    pub async fn chapter_content(&self, id: &str) -> LibraryResult<Chapter> {
        let mut chapter = self.db.get_chapter(id)?;
        let body = self.read_body(&chapter.content).await?;

        self.db.record_chapter_view(&chapter.id, &chapter.novel_id)?;
        self.metrics.chapter_reads.inc();

        chapter.view_count += 1;
        chapter.content = body.to_string();
        Ok(chapter)
    }

    /// Chapter with its text, for editing; view counts are left alone
    pub async fn chapter_detail(&self, id: &str) -> LibraryResult<Chapter> {
        let mut chapter = self.db.get_chapter(id)?;
        chapter.content = self.read_body(&chapter.content).await?.to_string();
        Ok(chapter)
    }

    /// Rewrite a chapter's body and fields
    pub async fn update_chapter(&self, id: &str, input: &ChapterUpdate) -> LibraryResult<Chapter> {
        input.validate()?;
        let existing = self.db.get_chapter(id)?;

        self.write_body(&existing.content, &input.content).await?;
        let updated = self
            .db
            .update_chapter(id, input, word_count(&input.content))?;
        self.metrics.chapters_written.inc();
        Ok(updated)
    }

    pub async fn delete_chapter(&self, id: &str) -> LibraryResult<DeleteOutcome> {
        match self.db.delete_chapter(id)? {
            Some(chapter) => {
                self.remove_body(&chapter.content).await;
                Ok(DeleteOutcome::deleted())
            }
            None => Ok(DeleteOutcome::missing("chapter does not exist")),
        }
    }

    /// Delete a novel and drop every chapter body it owned
    pub async fn delete_novel(&self, novel_id: &str) -> LibraryResult<()> {
        let keys = self.db.delete_novel(novel_id)?;
        for key in &keys {
            self.remove_body(key).await;
        }
        info!("Removed {} chapter bodies for novel {}", keys.len(), novel_id);
        Ok(())
    }

    /// Compress `content` and store it under an arbitrary key
    pub async fn store_raw(&self, key: &str, content: &str) -> LibraryResult<usize> {
        validate_key(key)?;
        self.write_body(key, content).await
    }

    /// Raw stored bytes, still compressed
    pub async fn fetch_raw(&self, key: &str) -> LibraryResult<Option<StoredBlob>> {
        validate_key(key)?;
        self.blobs.get(key).await
    }
}
