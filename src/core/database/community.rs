use chrono::Utc;
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::catalog::load_novel;
use super::{get_time, to_db_time, Database};
use crate::core::error::{LibraryError, LibraryResult};
use crate::core::ids;
use crate::core::models::{
    Comment, CommentLikeToggle, CommentList, NewComment, NewRating, PageRequest, Rating,
    RatingOutcome,
};

const COMMENT_COLUMNS: &str =
    "id, user_id, novel_id, chapter_id, parent_id, content, like_count, created_at, updated_at";

fn comment_from_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        user_id: row.get(1)?,
        novel_id: row.get(2)?,
        chapter_id: row.get(3)?,
        parent_id: row.get(4)?,
        content: row.get(5)?,
        like_count: row.get(6)?,
        created_at: get_time(row, 7)?,
        updated_at: get_time(row, 8)?,
    })
}

fn load_comment(conn: &Connection, id: &str) -> LibraryResult<Option<Comment>> {
    Ok(conn
        .query_row(
            &format!("SELECT {} FROM comment WHERE id = ?1", COMMENT_COLUMNS),
            [id],
            comment_from_row,
        )
        .optional()?)
}

impl Database {
    /// Store the user's score for a novel and refresh the novel's average
    pub fn rate_novel(
        &self,
        user_id: &str,
        novel_id: &str,
        input: &NewRating,
    ) -> LibraryResult<RatingOutcome> {
        input.validate()?;
        let now = to_db_time(&Utc::now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        load_novel(&tx, novel_id)?;

        tx.execute(
            "INSERT INTO rating (id, user_id, novel_id, score, review, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
             ON CONFLICT (user_id, novel_id) DO UPDATE SET
               score = excluded.score,
               review = excluded.review,
               updated_at = excluded.updated_at",
            params![ids::short_id(), user_id, novel_id, input.score, input.review, now],
        )?;

        let (average, rating_count): (f64, i64) = tx.query_row(
            "SELECT COALESCE(AVG(score), 0), COUNT(*) FROM rating WHERE novel_id = ?1",
            [novel_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        tx.execute(
            "UPDATE novel SET rating = ?1, rating_count = ?2 WHERE id = ?3",
            params![average, rating_count, novel_id],
        )?;

        let rating = tx.query_row(
            "SELECT id, user_id, novel_id, score, review, created_at, updated_at
             FROM rating WHERE user_id = ?1 AND novel_id = ?2",
            params![user_id, novel_id],
            |row| {
                Ok(Rating {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    novel_id: row.get(2)?,
                    score: row.get(3)?,
                    review: row.get(4)?,
                    created_at: get_time(row, 5)?,
                    updated_at: get_time(row, 6)?,
                })
            },
        )?;
        tx.commit()?;

        info!("User {} rated novel {} with {}", user_id, novel_id, input.score);
        Ok(RatingOutcome {
            rating,
            average,
            rating_count,
        })
    }

    pub fn add_comment(
        &self,
        user_id: &str,
        novel_id: &str,
        input: &NewComment,
    ) -> LibraryResult<Comment> {
        input.validate()?;
        let conn = self.lock()?;
        load_novel(&conn, novel_id)?;

        if let Some(chapter_id) = &input.chapter_id {
            let belongs: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM chapter WHERE id = ?1 AND novel_id = ?2",
                    params![chapter_id, novel_id],
                    |row| row.get(0),
                )
                .optional()?;
            if belongs.is_none() {
                return Err(LibraryError::NotFound(format!("chapter {}", chapter_id)));
            }
        }
        if let Some(parent_id) = &input.parent_id {
            match load_comment(&conn, parent_id)? {
                Some(parent) if parent.novel_id == novel_id => {}
                _ => {
                    return Err(LibraryError::ValidationError(format!(
                        "parent comment {} is not on this novel",
                        parent_id
                    )))
                }
            }
        }

        let now = Utc::now();
        let comment = Comment {
            id: ids::short_id(),
            user_id: user_id.to_string(),
            novel_id: novel_id.to_string(),
            chapter_id: input.chapter_id.clone(),
            parent_id: input.parent_id.clone(),
            content: input.content.trim().to_string(),
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        conn.execute(
            &format!(
                "INSERT INTO comment ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                COMMENT_COLUMNS
            ),
            params![
                comment.id,
                comment.user_id,
                comment.novel_id,
                comment.chapter_id,
                comment.parent_id,
                comment.content,
                comment.like_count,
                to_db_time(&now),
                to_db_time(&now)
            ],
        )?;
        Ok(comment)
    }

    /// Comments on a novel, optionally narrowed to one chapter, newest first
    pub fn list_comments(
        &self,
        novel_id: &str,
        chapter_id: Option<&str>,
        page: PageRequest,
    ) -> LibraryResult<CommentList> {
        page.validate()?;
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comment WHERE novel_id = ?1 AND (?2 IS NULL OR chapter_id = ?2)",
            params![novel_id, chapter_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM comment
             WHERE novel_id = ?1 AND (?2 IS NULL OR chapter_id = ?2)
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4",
            COMMENT_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![novel_id, chapter_id, page.limit as i64, page.offset() as i64],
            comment_from_row,
        )?;
        let comments = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(CommentList {
            comments,
            pagination: page.paginate(total as u64),
        })
    }

    /// Delete a comment written by `user_id`
    pub fn delete_comment(&self, user_id: &str, id: &str) -> LibraryResult<()> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM comment WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        if removed == 0 {
            return Err(LibraryError::NotFound(format!("comment {}", id)));
        }
        Ok(())
    }

    pub fn toggle_comment_like(
        &self,
        user_id: &str,
        comment_id: &str,
    ) -> LibraryResult<CommentLikeToggle> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if load_comment(&tx, comment_id)?.is_none() {
            return Err(LibraryError::NotFound(format!("comment {}", comment_id)));
        }

        let removed = tx.execute(
            "DELETE FROM comment_like WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id, comment_id],
        )?;
        let liked = removed == 0;
        if liked {
            tx.execute(
                "INSERT INTO comment_like (id, user_id, comment_id, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![ids::short_id(), user_id, comment_id, to_db_time(&Utc::now())],
            )?;
            tx.execute(
                "UPDATE comment SET like_count = like_count + 1 WHERE id = ?1",
                [comment_id],
            )?;
        } else {
            tx.execute(
                "UPDATE comment SET like_count = MAX(like_count - 1, 0) WHERE id = ?1",
                [comment_id],
            )?;
        }

        let like_count: i64 = tx.query_row(
            "SELECT like_count FROM comment WHERE id = ?1",
            [comment_id],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(CommentLikeToggle { liked, like_count })
    }
}
