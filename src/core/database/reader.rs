use chrono::Utc;
use log::info;
use rusqlite::{params, OptionalExtension};

use super::catalog::load_novel;
use super::{chapter_ref_from_row, get_time, novel_columns, novel_from_row, to_db_time, Database,
    NOVEL_COLUMN_COUNT};
use crate::core::error::{LibraryError, LibraryResult};
use crate::core::ids;
use crate::core::models::{
    Bookmark, BookmarkEntry, BookmarkList, ChapterRef, FavoriteEntry, FavoriteList,
    FavoriteToggle, HistoryEntry, HistoryList, NewBookmark, NovelRef, PageRequest,
    ReadingProgress,
};

impl Database {
    /// Favorite the novel, or un-favorite it if it already is
    pub fn toggle_favorite(&self, user_id: &str, novel_id: &str) -> LibraryResult<FavoriteToggle> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        load_novel(&tx, novel_id)?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT id FROM favorite WHERE user_id = ?1 AND novel_id = ?2",
                params![user_id, novel_id],
                |row| row.get(0),
            )
            .optional()?;

        let favorited = match existing {
            Some(id) => {
                tx.execute("DELETE FROM favorite WHERE id = ?1", [&id])?;
                tx.execute(
                    "UPDATE novel SET favorite_count = MAX(favorite_count - 1, 0) WHERE id = ?1",
                    [novel_id],
                )?;
                false
            }
            None => {
                tx.execute(
                    "INSERT INTO favorite (id, user_id, novel_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    params![ids::short_id(), user_id, novel_id, to_db_time(&Utc::now())],
                )?;
                tx.execute(
                    "UPDATE novel SET favorite_count = favorite_count + 1 WHERE id = ?1",
                    [novel_id],
                )?;
                true
            }
        };
        tx.commit()?;

        info!("User {} favorited={} novel {}", user_id, favorited, novel_id);
        Ok(FavoriteToggle { favorited })
    }

    pub fn user_favorites(&self, user_id: &str, page: PageRequest) -> LibraryResult<FavoriteList> {
        page.validate()?;
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM favorite WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT f.created_at, {}
             FROM favorite f JOIN novel n ON n.id = f.novel_id
             WHERE f.user_id = ?1
             ORDER BY f.created_at DESC
             LIMIT ?2 OFFSET ?3",
            novel_columns("n")
        ))?;
        let rows = stmt.query_map(
            params![user_id, page.limit as i64, page.offset() as i64],
            |row| {
                Ok(FavoriteEntry {
                    favorite_at: get_time(row, 0)?,
                    novel: novel_from_row(row, 1)?,
                })
            },
        )?;
        let favorites = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(FavoriteList {
            favorites,
            pagination: page.paginate(total as u64),
        })
    }

    pub fn add_bookmark(&self, user_id: &str, input: &NewBookmark) -> LibraryResult<Bookmark> {
        input.validate()?;
        let conn = self.lock()?;
        let belongs: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM chapter WHERE id = ?1 AND novel_id = ?2",
                params![input.chapter_id, input.novel_id],
                |row| row.get(0),
            )
            .optional()?;
        if belongs.is_none() {
            return Err(LibraryError::NotFound(format!(
                "chapter {} of novel {}",
                input.chapter_id, input.novel_id
            )));
        }

        let bookmark = Bookmark {
            id: ids::short_id(),
            user_id: user_id.to_string(),
            novel_id: input.novel_id.clone(),
            chapter_id: input.chapter_id.clone(),
            position: input.position,
            note: input.note.clone(),
            created_at: Utc::now(),
        };
        conn.execute(
            "INSERT INTO bookmark (id, user_id, novel_id, chapter_id, position, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                bookmark.id,
                bookmark.user_id,
                bookmark.novel_id,
                bookmark.chapter_id,
                bookmark.position,
                bookmark.note,
                to_db_time(&bookmark.created_at)
            ],
        )?;
        Ok(bookmark)
    }

    /// Remove one of the user's bookmarks
    pub fn remove_bookmark(&self, user_id: &str, id: &str) -> LibraryResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM bookmark WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if removed == 0 {
            return Err(LibraryError::NotFound(format!("bookmark {}", id)));
        }
        Ok(())
    }

    pub fn user_bookmarks(
        &self,
        user_id: &str,
        novel_id: Option<&str>,
        page: PageRequest,
    ) -> LibraryResult<BookmarkList> {
        page.validate()?;
        let conn = self.lock()?;
        // `?2 IS NULL` disables the novel filter
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM bookmark WHERE user_id = ?1 AND (?2 IS NULL OR novel_id = ?2)",
            params![user_id, novel_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT b.id, b.user_id, b.novel_id, b.chapter_id, b.position, b.note, b.created_at,
                    c.id, c.chapter_number, c.title, n.id, n.title
             FROM bookmark b
             JOIN novel n ON n.id = b.novel_id
             JOIN chapter c ON c.id = b.chapter_id
             WHERE b.user_id = ?1 AND (?2 IS NULL OR b.novel_id = ?2)
             ORDER BY b.created_at DESC
             LIMIT ?3 OFFSET ?4",
        )?;
        let rows = stmt.query_map(
            params![user_id, novel_id, page.limit as i64, page.offset() as i64],
            |row| {
                Ok(BookmarkEntry {
                    bookmark: Bookmark {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        novel_id: row.get(2)?,
                        chapter_id: row.get(3)?,
                        position: row.get(4)?,
                        note: row.get(5)?,
                        created_at: get_time(row, 6)?,
                    },
                    chapter: ChapterRef {
                        id: row.get(7)?,
                        chapter_number: row.get(8)?,
                        title: row.get(9)?,
                    },
                    novel: NovelRef {
                        id: row.get(10)?,
                        title: row.get(11)?,
                    },
                })
            },
        )?;
        let bookmarks = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(BookmarkList {
            bookmarks,
            pagination: page.paginate(total as u64),
        })
    }

    /// Upsert the user's reading position for a novel
    pub fn record_reading(&self, user_id: &str, input: &ReadingProgress) -> LibraryResult<()> {
        input.validate()?;
        let now = to_db_time(&Utc::now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        load_novel(&tx, &input.novel_id)?;

        if let Some(chapter_id) = &input.chapter_id {
            let belongs: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM chapter WHERE id = ?1 AND novel_id = ?2",
                    params![chapter_id, input.novel_id],
                    |row| row.get(0),
                )
                .optional()?;
            if belongs.is_none() {
                return Err(LibraryError::NotFound(format!("chapter {}", chapter_id)));
            }
        }

        tx.execute(
            "INSERT INTO reading_history (id, user_id, novel_id, chapter_id, progress,
                                          last_read_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)
             ON CONFLICT (user_id, novel_id) DO UPDATE SET
               chapter_id = excluded.chapter_id,
               progress = excluded.progress,
               last_read_at = excluded.last_read_at,
               updated_at = excluded.updated_at",
            params![
                ids::short_id(),
                user_id,
                input.novel_id,
                input.chapter_id,
                input.progress,
                now
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    pub fn reading_history(&self, user_id: &str, page: PageRequest) -> LibraryResult<HistoryList> {
        page.validate()?;
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reading_history WHERE user_id = ?1",
            [user_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {}, c.id, c.chapter_number, c.title, h.progress, h.last_read_at
             FROM reading_history h
             JOIN novel n ON n.id = h.novel_id
             LEFT JOIN chapter c ON c.id = h.chapter_id
             WHERE h.user_id = ?1
             ORDER BY h.last_read_at DESC
             LIMIT ?2 OFFSET ?3",
            novel_columns("n")
        ))?;
        let rows = stmt.query_map(
            params![user_id, page.limit as i64, page.offset() as i64],
            |row| {
                let base = NOVEL_COLUMN_COUNT;
                Ok(HistoryEntry {
                    novel: novel_from_row(row, 0)?,
                    chapter: chapter_ref_from_row(row, base)?,
                    progress: row.get(base + 3)?,
                    last_read_at: get_time(row, base + 4)?,
                })
            },
        )?;
        let history = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(HistoryList {
            history,
            pagination: page.paginate(total as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::test_support;
    use crate::core::models::Chapter;

    fn add_chapter(db: &Database, novel_id: &str, number: i64) -> Chapter {
        let now = Utc::now();
        let id = ids::chapter_id();
        let chapter = Chapter {
            content: ids::chapter_blob_key(novel_id, &id),
            id,
            novel_id: novel_id.to_string(),
            chapter_number: number,
            title: format!("Chapter {}", number),
            is_free: true,
            is_published: true,
            word_count: 10,
            view_count: 0,
            published_at: Some(now),
            created_at: now,
            updated_at: now,
        };
        db.insert_chapter(&chapter).unwrap();
        chapter
    }

    #[test]
    fn test_toggle_favorite_round_trip() {
        let db = test_support::database();
        let novel = test_support::novel(&db, "Loved", None);

        assert!(db.toggle_favorite("u1", &novel.id).unwrap().favorited);
        assert!(db.toggle_favorite("u2", &novel.id).unwrap().favorited);
        assert_eq!(db.get_novel(&novel.id).unwrap().favorite_count, 2);

        assert!(!db.toggle_favorite("u1", &novel.id).unwrap().favorited);
        assert_eq!(db.get_novel(&novel.id).unwrap().favorite_count, 1);

        let list = db.user_favorites("u2", PageRequest::default()).unwrap();
        assert_eq!(list.favorites.len(), 1);
        assert_eq!(list.favorites[0].novel.id, novel.id);
        assert_eq!(db.user_favorites("u1", PageRequest::default()).unwrap().pagination.total, 0);
    }

    #[test]
    fn test_toggle_favorite_unknown_novel() {
        let db = test_support::database();
        assert!(matches!(
            db.toggle_favorite("u1", "missing"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn test_bookmarks_filtered_by_novel() {
        let db = test_support::database();
        let a = test_support::novel(&db, "A", None);
        let b = test_support::novel(&db, "B", None);
        let ch_a = add_chapter(&db, &a.id, 1);
        let ch_b = add_chapter(&db, &b.id, 1);

        db.add_bookmark(
            "u1",
            &NewBookmark {
                novel_id: a.id.clone(),
                chapter_id: ch_a.id.clone(),
                position: 42,
                note: Some("great scene".to_string()),
            },
        )
        .unwrap();
        db.add_bookmark(
            "u1",
            &NewBookmark {
                novel_id: b.id.clone(),
                chapter_id: ch_b.id.clone(),
                position: 0,
                note: None,
            },
        )
        .unwrap();

        let all = db.user_bookmarks("u1", None, PageRequest::default()).unwrap();
        assert_eq!(all.pagination.total, 2);

        let only_a = db.user_bookmarks("u1", Some(&a.id), PageRequest::default()).unwrap();
        assert_eq!(only_a.bookmarks.len(), 1);
        assert_eq!(only_a.bookmarks[0].bookmark.position, 42);
        assert_eq!(only_a.bookmarks[0].novel.title, "A");
        assert_eq!(only_a.bookmarks[0].chapter.chapter_number, 1);
    }

    #[test]
    fn test_bookmark_requires_matching_chapter() {
        let db = test_support::database();
        let a = test_support::novel(&db, "A", None);
        let b = test_support::novel(&db, "B", None);
        let ch_b = add_chapter(&db, &b.id, 1);

        let err = db
            .add_bookmark(
                "u1",
                &NewBookmark {
                    novel_id: a.id,
                    chapter_id: ch_b.id,
                    position: 0,
                    note: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, LibraryError::NotFound(_)));
    }

    #[test]
    fn test_remove_bookmark_only_by_owner() {
        let db = test_support::database();
        let novel = test_support::novel(&db, "A", None);
        let ch = add_chapter(&db, &novel.id, 1);
        let bookmark = db
            .add_bookmark(
                "u1",
                &NewBookmark {
                    novel_id: novel.id.clone(),
                    chapter_id: ch.id.clone(),
                    position: 0,
                    note: None,
                },
            )
            .unwrap();

        assert!(db.remove_bookmark("u2", &bookmark.id).is_err());
        db.remove_bookmark("u1", &bookmark.id).unwrap();
        assert_eq!(db.user_bookmarks("u1", None, PageRequest::default()).unwrap().pagination.total, 0);
    }

    #[test]
    fn test_reading_history_upserts() {
        let db = test_support::database();
        let novel = test_support::novel(&db, "Saga", None);
        let first = add_chapter(&db, &novel.id, 1);
        let second = add_chapter(&db, &novel.id, 2);

        db.record_reading(
            "u1",
            &ReadingProgress {
                novel_id: novel.id.clone(),
                chapter_id: Some(first.id.clone()),
                progress: 0.1,
            },
        )
        .unwrap();
        db.record_reading(
            "u1",
            &ReadingProgress {
                novel_id: novel.id.clone(),
                chapter_id: Some(second.id.clone()),
                progress: 0.5,
            },
        )
        .unwrap();

        let history = db.reading_history("u1", PageRequest::default()).unwrap();
        assert_eq!(history.pagination.total, 1);
        let entry = &history.history[0];
        assert_eq!(entry.novel.id, novel.id);
        assert_eq!(entry.chapter.as_ref().map(|c| c.chapter_number), Some(2));
        assert_eq!(entry.progress, 0.5);
    }

    #[test]
    fn test_history_survives_without_chapter() {
        let db = test_support::database();
        let novel = test_support::novel(&db, "Saga", None);

        db.record_reading(
            "u1",
            &ReadingProgress {
                novel_id: novel.id.clone(),
                chapter_id: None,
                progress: 0.0,
            },
        )
        .unwrap();

        let history = db.reading_history("u1", PageRequest::default()).unwrap();
        assert!(history.history[0].chapter.is_none());
    }

    #[test]
    fn test_deleting_chapter_clears_reader_rows() {
        let db = test_support::database();
        let novel = test_support::novel(&db, "Saga", None);
        let ch = add_chapter(&db, &novel.id, 1);
        db.record_reading(
            "u1",
            &ReadingProgress {
                novel_id: novel.id.clone(),
                chapter_id: Some(ch.id.clone()),
                progress: 0.2,
            },
        )
        .unwrap();
        db.add_bookmark(
            "u1",
            &NewBookmark {
                novel_id: novel.id.clone(),
                chapter_id: ch.id.clone(),
                position: 3,
                note: None,
            },
        )
        .unwrap();

        db.delete_chapter(&ch.id).unwrap();

        assert_eq!(db.reading_history("u1", PageRequest::default()).unwrap().pagination.total, 0);
        assert_eq!(db.user_bookmarks("u1", None, PageRequest::default()).unwrap().pagination.total, 0);
    }
}
