use chrono::Utc;
use log::info;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use super::{
    chapter_summary_from_row, encode_tags, get_time, novel_columns, novel_from_row, to_db_time,
    Database, CHAPTER_SUMMARY_COLUMNS,
};
use crate::core::error::{LibraryError, LibraryResult};
use crate::core::ids;
use crate::core::models::{
    AdminStats, Category, CategoryInput, NewNovel, Novel, NovelDetail, NovelFilter, NovelList,
    NovelUpdate, PageRequest, RecentNovel,
};

const RECENT_NOVEL_LIMIT: i64 = 5;

fn category_exists(conn: &Connection, id: &str) -> LibraryResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM category WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn load_novel(conn: &Connection, id: &str) -> LibraryResult<Novel> {
    conn.query_row(
        &format!("SELECT {} FROM novel WHERE novel.id = ?1", novel_columns("novel")),
        [id],
        |row| novel_from_row(row, 0),
    )
    .optional()?
    .ok_or_else(|| LibraryError::NotFound(format!("novel {}", id)))
}

/// Escape LIKE wildcards so the search term matches literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// WHERE clause and its parameters for a novel listing
fn novel_filter_clause(filter: &NovelFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(category_id) = non_blank(&filter.category_id) {
        conditions.push("novel.category_id = ?");
        values.push(Value::Text(category_id.to_string()));
    }
    if let Some(status) = filter.status {
        conditions.push("novel.status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(search) = non_blank(&filter.search) {
        conditions.push("novel.title LIKE ? ESCAPE '\\'");
        values.push(Value::Text(like_pattern(search)));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

impl Database {
    /// All categories ordered by name
    pub fn list_categories(&self) -> LibraryResult<Vec<Category>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, created_at, updated_at FROM category ORDER BY name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
                description: row.get(2)?,
                created_at: get_time(row, 3)?,
                updated_at: get_time(row, 4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_category(&self, input: &CategoryInput) -> LibraryResult<Category> {
        input.validate()?;
        let now = Utc::now();
        let category = Category {
            id: ids::short_id(),
            name: input.name.trim().to_string(),
            description: Some(input.description.clone().unwrap_or_default()),
            created_at: now,
            updated_at: now,
        };

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO category (id, name, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                category.id,
                category.name,
                category.description,
                to_db_time(&now),
                to_db_time(&now)
            ],
        )?;
        info!("Created category {} ({})", category.name, category.id);
        Ok(category)
    }

    pub fn update_category(&self, id: &str, input: &CategoryInput) -> LibraryResult<Category> {
        input.validate()?;
        let now = Utc::now();
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE category SET name = ?1, description = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                input.name.trim(),
                input.description.clone().unwrap_or_default(),
                to_db_time(&now),
                id
            ],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(format!("category {}", id)));
        }

        Ok(conn.query_row(
            "SELECT id, name, description, created_at, updated_at FROM category WHERE id = ?1",
            [id],
            |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    created_at: get_time(row, 3)?,
                    updated_at: get_time(row, 4)?,
                })
            },
        )?)
    }

    /// Delete a category that no novel uses
    pub fn delete_category(&self, id: &str) -> LibraryResult<()> {
        let conn = self.lock()?;
        let in_use: Option<i64> = conn
            .query_row("SELECT 1 FROM novel WHERE category_id = ?1 LIMIT 1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        if in_use.is_some() {
            return Err(LibraryError::ValidationError(
                "cannot delete: category still has novels".to_string(),
            ));
        }

        conn.execute("DELETE FROM category WHERE id = ?1", [id])?;
        info!("Deleted category {}", id);
        Ok(())
    }

    pub fn category_count(&self) -> LibraryResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM category", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    pub fn create_novel(&self, input: &NewNovel) -> LibraryResult<Novel> {
        input.validate()?;
        let category_id = non_blank(&input.category_id).map(ToString::to_string);
        let now = Utc::now();
        let id = ids::short_id();

        let conn = self.lock()?;
        if let Some(category_id) = &category_id {
            if !category_exists(&conn, category_id)? {
                return Err(LibraryError::ValidationError(format!(
                    "unknown category {}",
                    category_id
                )));
            }
        }

        conn.execute(
            "INSERT INTO novel (id, title, author, category_id, cover_image, description, status,
                                tags, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                id,
                input.title.trim(),
                input.author.trim(),
                category_id,
                input.cover_image,
                input.description,
                input.status.as_str(),
                encode_tags(input.tags.as_ref())?,
                to_db_time(&now),
                to_db_time(&now)
            ],
        )?;
        info!("Created novel {} ({})", input.title, id);
        load_novel(&conn, &id)
    }

    pub fn get_novel(&self, id: &str) -> LibraryResult<Novel> {
        let conn = self.lock()?;
        load_novel(&conn, id)
    }

    pub fn update_novel(&self, id: &str, input: &NovelUpdate) -> LibraryResult<Novel> {
        input.validate()?;
        let now = Utc::now();
        let conn = self.lock()?;
        if !category_exists(&conn, &input.category_id)? {
            return Err(LibraryError::ValidationError(format!(
                "unknown category {}",
                input.category_id
            )));
        }

        let changed = conn.execute(
            "UPDATE novel SET title = ?1, author = ?2, category_id = ?3, cover_image = ?4,
                              description = ?5, status = ?6, tags = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                input.title.trim(),
                input.author.trim(),
                input.category_id,
                input.cover_image,
                input.description,
                input.status.as_str(),
                encode_tags(input.tags.as_ref())?,
                to_db_time(&now),
                id
            ],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(format!("novel {}", id)));
        }
        info!("Updated novel {}", id);
        load_novel(&conn, id)
    }

    /// Delete a novel with everything hanging off it.
    ///
    /// Returns the blob keys of the removed chapters so their bodies can be
    /// dropped from the blob store.
    pub fn delete_novel(&self, id: &str) -> LibraryResult<Vec<String>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let blob_keys = {
            let mut stmt = tx.prepare("SELECT content FROM chapter WHERE novel_id = ?1")?;
            let keys = stmt.query_map([id], |row| row.get::<_, String>(0))?;
            keys.collect::<Result<Vec<_>, _>>()?
        };

        tx.execute("DELETE FROM reading_history WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM bookmark WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM favorite WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM rating WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM comment WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM chapter WHERE novel_id = ?1", [id])?;
        tx.execute("DELETE FROM novel WHERE id = ?1", [id])?;
        tx.commit()?;

        info!("Deleted novel {} with {} chapters", id, blob_keys.len());
        Ok(blob_keys)
    }

    /// Filtered, sorted and paginated novel listing
    pub fn list_novels(&self, filter: &NovelFilter, page: PageRequest) -> LibraryResult<NovelList> {
        page.validate()?;
        let (where_clause, mut values) = novel_filter_clause(filter);
        let conn = self.lock()?;

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM novel {}", where_clause),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        values.push(Value::Integer(page.limit as i64));
        values.push(Value::Integer(page.offset() as i64));
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM novel {} ORDER BY {}, novel.id ASC LIMIT ? OFFSET ?",
            novel_columns("novel"),
            where_clause,
            filter.sort_by.order_clause()
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), |row| novel_from_row(row, 0))?;
        let novels = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(NovelList {
            novels,
            pagination: page.paginate(total as u64),
        })
    }

    /// A novel with one page of its chapters, newest chapter first
    pub fn novel_detail(&self, id: &str, page: PageRequest) -> LibraryResult<NovelDetail> {
        if page.page < 1 || page.limit < 1 {
            return Err(LibraryError::ValidationError(
                "page and page size must be at least 1".to_string(),
            ));
        }
        let conn = self.lock()?;
        let novel = load_novel(&conn, id)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM chapter WHERE novel_id = ?1
             ORDER BY chapter_number DESC LIMIT ?2 OFFSET ?3",
            CHAPTER_SUMMARY_COLUMNS
        ))?;
        let rows = stmt.query_map(
            params![id, page.limit as i64, page.offset() as i64],
            chapter_summary_from_row,
        )?;
        let chapters = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(NovelDetail { novel, chapters })
    }

    pub fn admin_stats(&self) -> LibraryResult<AdminStats> {
        let conn = self.lock()?;
        let count = |table: &str| -> LibraryResult<u64> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
            Ok(n as u64)
        };
        let total_novels = count("novel")?;
        let total_chapters = count("chapter")?;
        let total_categories = count("category")?;

        let mut stmt = conn.prepare(
            "SELECT n.id, n.title, n.author, COUNT(c.id), n.created_at
             FROM novel n LEFT JOIN chapter c ON c.novel_id = n.id
             GROUP BY n.id
             ORDER BY n.created_at DESC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([RECENT_NOVEL_LIMIT], |row| {
            Ok(RecentNovel {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                chapter_count: row.get(3)?,
                created_at: get_time(row, 4)?,
            })
        })?;
        let recent_novels = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(AdminStats {
            total_novels,
            total_chapters,
            total_categories,
            recent_novels,
        })
    }
}
