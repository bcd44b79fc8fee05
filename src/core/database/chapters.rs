use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, OptionalExtension};

use super::{chapter_from_row, to_db_time, Database, CHAPTER_COLUMNS};
use crate::core::error::{LibraryError, LibraryResult};
use crate::core::models::{Chapter, ChapterUpdate};

pub(crate) fn load_chapter(conn: &Connection, id: &str) -> LibraryResult<Option<Chapter>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM chapter WHERE id = ?1", CHAPTER_COLUMNS),
            [id],
            chapter_from_row,
        )
        .optional()?)
}

impl Database {
    /// Insert a chapter row and roll its size into the novel's counters
    pub fn insert_chapter(&self, chapter: &Chapter) -> LibraryResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO chapter (id, novel_id, chapter_number, title, content, is_free,
                                  is_published, word_count, view_count, published_at,
                                  created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                chapter.id,
                chapter.novel_id,
                chapter.chapter_number,
                chapter.title,
                chapter.content,
                chapter.is_free,
                chapter.is_published,
                chapter.word_count,
                chapter.view_count,
                chapter.published_at.as_ref().map(to_db_time),
                to_db_time(&chapter.created_at),
                to_db_time(&chapter.updated_at)
            ],
        )?;
        let changed = tx.execute(
            "UPDATE novel SET chapter_count = chapter_count + 1,
                              word_count = word_count + ?1,
                              updated_at = ?2
             WHERE id = ?3",
            params![chapter.word_count, to_db_time(&chapter.updated_at), chapter.novel_id],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(format!("novel {}", chapter.novel_id)));
        }
        tx.commit()?;

        info!(
            "Created chapter {} ({} words) for novel {}",
            chapter.id, chapter.word_count, chapter.novel_id
        );
        Ok(())
    }

    pub fn find_chapter(&self, id: &str) -> LibraryResult<Option<Chapter>> {
        let conn = self.lock()?;
        load_chapter(&conn, id)
    }

    pub fn get_chapter(&self, id: &str) -> LibraryResult<Chapter> {
        self.find_chapter(id)?
            .ok_or_else(|| LibraryError::NotFound(format!("chapter {}", id)))
    }

    /// Update chapter fields; the novel's word count absorbs the difference
    pub fn update_chapter(
        &self,
        id: &str,
        input: &ChapterUpdate,
        word_count: i64,
    ) -> LibraryResult<Chapter> {
        let now = Utc::now();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let existing = load_chapter(&tx, id)?
            .ok_or_else(|| LibraryError::NotFound(format!("chapter {}", id)))?;
        let is_free = input.is_free.unwrap_or(existing.is_free);

        tx.execute(
            "UPDATE chapter SET chapter_number = ?1, title = ?2, is_free = ?3, word_count = ?4,
                                updated_at = ?5
             WHERE id = ?6",
            params![
                input.chapter_number,
                input.title.trim(),
                is_free,
                word_count,
                to_db_time(&now),
                id
            ],
        )?;

        let diff = word_count - existing.word_count;
        if diff != 0 {
            tx.execute(
                "UPDATE novel SET word_count = word_count + ?1, updated_at = ?2 WHERE id = ?3",
                params![diff, to_db_time(&now), existing.novel_id],
            )?;
        }

        let updated = load_chapter(&tx, id)?
            .ok_or_else(|| LibraryError::NotFound(format!("chapter {}", id)))?;
        tx.commit()?;

        info!("Updated chapter {} (word count change {})", id, diff);
        Ok(updated)
    }

    /// Delete a chapter and the reader rows pointing at it.
    ///
    /// Returns the removed row, or `None` when it did not exist.
    pub fn delete_chapter(&self, id: &str) -> LibraryResult<Option<Chapter>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let chapter = match load_chapter(&tx, id)? {
            Some(chapter) => chapter,
            None => return Ok(None),
        };

        tx.execute("DELETE FROM reading_history WHERE chapter_id = ?1", [id])?;
        tx.execute("DELETE FROM bookmark WHERE chapter_id = ?1", [id])?;
        tx.execute("DELETE FROM chapter WHERE id = ?1", [id])?;
        tx.execute(
            "UPDATE novel SET chapter_count = MAX(chapter_count - 1, 0),
                              word_count = MAX(word_count - ?1, 0),
                              updated_at = ?2
             WHERE id = ?3",
            params![chapter.word_count, to_db_time(&Utc::now()), chapter.novel_id],
        )?;
        tx.commit()?;

        info!("Deleted chapter {} of novel {}", id, chapter.novel_id);
        Ok(Some(chapter))
    }

    /// Count one read of a chapter against the chapter and its novel
    pub fn record_chapter_view(&self, chapter_id: &str, novel_id: &str) -> LibraryResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("UPDATE chapter SET view_count = view_count + 1 WHERE id = ?1", [chapter_id])?;
        tx.execute("UPDATE novel SET view_count = view_count + 1 WHERE id = ?1", [novel_id])?;
        tx.commit()?;
        Ok(())
    }
}
