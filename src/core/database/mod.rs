//! SQLite persistence for the novel library.
//!
//! A single connection sits behind a mutex; every public method locks it for
//! the duration of one operation, and operations touching several rows run
//! inside a transaction.

mod catalog;
mod chapters;
mod community;
mod reader;

use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use log::info;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};

use crate::core::error::{LibraryError, LibraryResult};
use crate::core::models::{Chapter, ChapterRef, ChapterSummary, Novel, NovelStatus};

const SCHEMA_SQL: &str = include_str!("../schema.sql");

/// Handle to the library database
#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (creating if needed) the database file at `path`
    pub fn open(path: &Path) -> LibraryResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!("Opened database at {}", path.display());
        Self::with_connection(conn)
    }

    /// Private database that lives as long as the handle
    pub fn open_in_memory() -> LibraryResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> LibraryResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> LibraryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LibraryError::DatabaseError("database mutex poisoned".to_string()))
    }

    /// Run a single statement outside the typed API (seeding, maintenance)
    pub(crate) fn execute_raw<P: rusqlite::Params>(&self, sql: &str, params: P) -> LibraryResult<usize> {
        let conn = self.lock()?;
        Ok(conn.execute(sql, params)?)
    }
}

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
pub(crate) fn to_db_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_time(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

pub(crate) fn get_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_time(idx, &raw)
}

pub(crate) fn get_opt_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| parse_time(idx, &value)).transpose()
}

/// Tags are a JSON array; older rows may carry a comma-separated list
pub(crate) fn decode_tags(raw: Option<String>) -> Vec<String> {
    match raw {
        None => Vec::new(),
        Some(text) if text.trim().is_empty() => Vec::new(),
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|_| {
            text.split(',')
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty())
                .collect()
        }),
    }
}

pub(crate) fn encode_tags(tags: Option<&Vec<String>>) -> LibraryResult<String> {
    let tags: Vec<&String> = tags
        .map(|tags| tags.iter().filter(|tag| !tag.trim().is_empty()).collect())
        .unwrap_or_default();
    Ok(serde_json::to_string(&tags)?)
}

const NOVEL_FIELDS: [&str; 18] = [
    "id",
    "title",
    "author",
    "category_id",
    "cover_image",
    "description",
    "status",
    "tags",
    "is_recommended",
    "chapter_count",
    "word_count",
    "view_count",
    "favorite_count",
    "rating",
    "rating_count",
    "published_at",
    "created_at",
    "updated_at",
];

/// Number of columns produced by [`novel_columns`]
pub(crate) const NOVEL_COLUMN_COUNT: usize = NOVEL_FIELDS.len();

/// Novel column list qualified with a table alias
pub(crate) fn novel_columns(alias: &str) -> String {
    NOVEL_FIELDS
        .iter()
        .map(|field| format!("{}.{}", alias, field))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a novel whose columns start at `start`
pub(crate) fn novel_from_row(row: &Row<'_>, start: usize) -> rusqlite::Result<Novel> {
    let status_raw: String = row.get(start + 6)?;
    let status = status_raw.parse::<NovelStatus>().map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(start + 6, Type::Text, Box::new(err))
    })?;

    Ok(Novel {
        id: row.get(start)?,
        title: row.get(start + 1)?,
        author: row.get(start + 2)?,
        category_id: row.get(start + 3)?,
        cover_image: row.get(start + 4)?,
        description: row.get(start + 5)?,
        status,
        tags: decode_tags(row.get(start + 7)?),
        is_recommended: row.get(start + 8)?,
        chapter_count: row.get(start + 9)?,
        word_count: row.get(start + 10)?,
        view_count: row.get(start + 11)?,
        favorite_count: row.get(start + 12)?,
        rating: row.get(start + 13)?,
        rating_count: row.get(start + 14)?,
        published_at: get_opt_time(row, start + 15)?,
        created_at: get_time(row, start + 16)?,
        updated_at: get_time(row, start + 17)?,
    })
}

pub(crate) const CHAPTER_COLUMNS: &str = "id, novel_id, chapter_number, title, content, is_free, \
     is_published, word_count, view_count, published_at, created_at, updated_at";

pub(crate) fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        chapter_number: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        is_free: row.get(5)?,
        is_published: row.get(6)?,
        word_count: row.get(7)?,
        view_count: row.get(8)?,
        published_at: get_opt_time(row, 9)?,
        created_at: get_time(row, 10)?,
        updated_at: get_time(row, 11)?,
    })
}

pub(crate) const CHAPTER_SUMMARY_COLUMNS: &str =
    "id, novel_id, chapter_number, title, is_free, word_count, published_at";

pub(crate) fn chapter_summary_from_row(row: &Row<'_>) -> rusqlite::Result<ChapterSummary> {
    Ok(ChapterSummary {
        id: row.get(0)?,
        novel_id: row.get(1)?,
        chapter_number: row.get(2)?,
        title: row.get(3)?,
        is_free: row.get(4)?,
        word_count: row.get(5)?,
        published_at: get_opt_time(row, 6)?,
    })
}

/// Chapter reference from three nullable columns starting at `start`
pub(crate) fn chapter_ref_from_row(
    row: &Row<'_>,
    start: usize,
) -> rusqlite::Result<Option<ChapterRef>> {
    let id: Option<String> = row.get(start)?;
    match id {
        Some(id) => Ok(Some(ChapterRef {
            id,
            chapter_number: row.get(start + 1)?,
            title: row.get(start + 2)?,
        })),
        None => Ok(None),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::core::models::{CategoryInput, NewNovel};

    pub fn database() -> Database {
        Database::open_in_memory().expect("in-memory database")
    }

    pub fn category(db: &Database, name: &str) -> String {
        db.create_category(&CategoryInput {
            name: name.to_string(),
            description: Some(format!("{} stories", name)),
        })
        .expect("category")
        .id
    }

    pub fn novel(db: &Database, title: &str, category_id: Option<&str>) -> Novel {
        db.create_novel(&NewNovel {
            title: title.to_string(),
            author: "Tian Can".to_string(),
            category_id: category_id.map(ToString::to_string),
            cover_image: None,
            description: Some(format!("About {}", title)),
            status: NovelStatus::Ongoing,
            tags: Some(vec!["fantasy".to_string()]),
        })
        .expect("novel")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_schema() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("novels.db");

        let db = Database::open(&path).expect("open");
        assert!(path.exists());
        assert!(db.list_categories().expect("categories").is_empty());

        drop(db);
        assert!(Database::open(&path).is_ok());
    }

    #[test]
    fn test_db_time_is_fixed_width() {
        let a = to_db_time(&"2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap());
        let b = to_db_time(&"2024-01-01T00:00:00.5Z".parse::<DateTime<Utc>>().unwrap());
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_decode_tags_accepts_both_formats() {
        assert_eq!(decode_tags(Some(r#"["a","b"]"#.to_string())), vec!["a", "b"]);
        assert_eq!(decode_tags(Some("a, b".to_string())), vec!["a", "b"]);
        assert!(decode_tags(None).is_empty());
        assert!(decode_tags(Some(String::new())).is_empty());
    }
}
