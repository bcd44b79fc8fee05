//! Domain records and operation inputs for the novel library.

use std::fmt::Display;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::error::{LibraryError, LibraryResult};

/// Longest accepted novel or chapter title, in characters
pub const TITLE_MAX_LENGTH: usize = 200;
/// Longest accepted author name, in characters
pub const AUTHOR_MAX_LENGTH: usize = 100;
/// Largest page a list endpoint will return
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Publication state of a novel
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NovelStatus {
    /// Still receiving new chapters
    #[default]
    Ongoing,
    /// Finished
    Completed,
    /// On hiatus
    Paused,
}

impl NovelStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NovelStatus::Ongoing => "ongoing",
            NovelStatus::Completed => "completed",
            NovelStatus::Paused => "paused",
        }
    }
}

impl Display for NovelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for NovelStatus {
    type Err = LibraryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "ongoing" => Ok(NovelStatus::Ongoing),
            "completed" => Ok(NovelStatus::Completed),
            "paused" => Ok(NovelStatus::Paused),
            other => Err(LibraryError::ValidationError(format!(
                "unknown novel status: {}",
                other
            ))),
        }
    }
}

/// Ordering applied to novel listings
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    /// Most recently updated first
    #[default]
    Latest,
    /// Most viewed first
    Popular,
    /// Highest rated first
    Rating,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Latest => "latest",
            SortBy::Popular => "popular",
            SortBy::Rating => "rating",
        }
    }

    /// SQL ORDER BY clause for this ordering
    pub fn order_clause(&self) -> &'static str {
        match self {
            SortBy::Latest => "updated_at DESC",
            SortBy::Popular => "view_count DESC",
            SortBy::Rating => "rating DESC",
        }
    }
}

impl FromStr for SortBy {
    type Err = LibraryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "latest" => Ok(SortBy::Latest),
            "popular" => Ok(SortBy::Popular),
            "rating" => Ok(SortBy::Rating),
            other => Err(LibraryError::ValidationError(format!(
                "unknown sort order: {}",
                other
            ))),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

/// One page of a listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    pub fn validate(&self) -> LibraryResult<()> {
        if self.page < 1 {
            return Err(LibraryError::ValidationError("page must be at least 1".to_string()));
        }
        if self.limit < 1 || self.limit > MAX_PAGE_LIMIT {
            return Err(LibraryError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        (self.page.saturating_sub(1) as u64) * self.limit as u64
    }

    /// Pagination block for a listing with `total` matching rows
    pub fn paginate(&self, total: u64) -> Pagination {
        let limit = self.limit.max(1) as u64;
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: (total + limit - 1) / limit,
        }
    }
}

/// Pagination metadata returned with every listing
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Novel {
    pub id: String,
    pub title: String,
    pub author: String,
    pub category_id: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    pub status: NovelStatus,
    pub tags: Vec<String>,
    pub is_recommended: bool,
    pub chapter_count: i64,
    pub word_count: i64,
    pub view_count: i64,
    pub favorite_count: i64,
    /// Average score, 0 to 5
    pub rating: f64,
    pub rating_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chapter row. `content` holds the blob key until the body is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: String,
    pub novel_id: String,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub is_free: bool,
    pub is_published: bool,
    pub word_count: i64,
    pub view_count: i64,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Chapter listing entry without the body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterSummary {
    pub id: String,
    pub novel_id: String,
    pub chapter_number: i64,
    pub title: String,
    pub is_free: bool,
    pub word_count: i64,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChapterRef {
    pub id: String,
    pub chapter_number: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NovelRef {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelDetail {
    pub novel: Novel,
    pub chapters: Vec<ChapterSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelList {
    pub novels: Vec<Novel>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentNovel {
    pub id: String,
    pub title: String,
    pub author: String,
    pub chapter_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Back-office dashboard figures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_novels: u64,
    pub total_chapters: u64,
    pub total_categories: u64,
    pub recent_novels: Vec<RecentNovel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteEntry {
    pub favorite_at: DateTime<Utc>,
    pub novel: Novel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteList {
    pub favorites: Vec<FavoriteEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FavoriteToggle {
    pub favorited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: String,
    pub user_id: String,
    pub novel_id: String,
    pub chapter_id: String,
    /// Offset inside the chapter
    pub position: i64,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub bookmark: Bookmark,
    pub chapter: ChapterRef,
    pub novel: NovelRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookmarkList {
    pub bookmarks: Vec<BookmarkEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub novel: Novel,
    pub chapter: Option<ChapterRef>,
    /// Fraction of the novel read, 0 to 1
    pub progress: f64,
    pub last_read_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryList {
    pub history: Vec<HistoryEntry>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: String,
    pub user_id: String,
    pub novel_id: String,
    pub chapter_id: Option<String>,
    pub parent_id: Option<String>,
    pub content: String,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentList {
    pub comments: Vec<Comment>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommentLikeToggle {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: String,
    pub user_id: String,
    pub novel_id: String,
    /// 1 to 5
    pub score: i64,
    pub review: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A stored rating and the novel's refreshed aggregate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub average: f64,
    pub rating_count: i64,
}

/// Outcome of a delete that reports absence instead of failing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl DeleteOutcome {
    pub fn deleted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn missing(message: &str) -> Self {
        Self {
            success: false,
            message: Some(message.to_string()),
        }
    }
}

fn require_text(field: &str, value: &str, max_chars: Option<usize>) -> LibraryResult<()> {
    if value.trim().is_empty() {
        return Err(LibraryError::ValidationError(format!("{} must not be empty", field)));
    }
    if let Some(max) = max_chars {
        if value.chars().count() > max {
            return Err(LibraryError::ValidationError(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }
    Ok(())
}

/// Word count of a chapter body: one per Unicode scalar value
pub fn word_count(content: &str) -> i64 {
    content.chars().count() as i64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryInput {
    pub fn validate(&self) -> LibraryResult<()> {
        require_text("category name", &self.name, None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNovel {
    pub title: String,
    pub author: String,
    pub category_id: Option<String>,
    pub cover_image: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub status: NovelStatus,
    pub tags: Option<Vec<String>>,
}

impl NewNovel {
    pub fn validate(&self) -> LibraryResult<()> {
        require_text("title", &self.title, Some(TITLE_MAX_LENGTH))?;
        require_text("author", &self.author, Some(AUTHOR_MAX_LENGTH))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NovelUpdate {
    pub title: String,
    pub author: String,
    pub category_id: String,
    pub cover_image: Option<String>,
    pub description: String,
    #[serde(default)]
    pub status: NovelStatus,
    pub tags: Option<Vec<String>>,
}

impl NovelUpdate {
    pub fn validate(&self) -> LibraryResult<()> {
        require_text("title", &self.title, Some(TITLE_MAX_LENGTH))?;
        require_text("author", &self.author, Some(AUTHOR_MAX_LENGTH))?;
        require_text("description", &self.description, None)?;
        require_text("category", &self.category_id, None)
    }
}

/// Filters for the novel listing. Empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NovelFilter {
    pub category_id: Option<String>,
    pub status: Option<NovelStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort_by: SortBy,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChapter {
    pub novel_id: String,
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    #[serde(default = "default_true")]
    pub is_free: bool,
}

impl NewChapter {
    pub fn validate(&self) -> LibraryResult<()> {
        if self.chapter_number < 1 {
            return Err(LibraryError::ValidationError(
                "chapter number must be at least 1".to_string(),
            ));
        }
        require_text("title", &self.title, Some(TITLE_MAX_LENGTH))?;
        if self.content.is_empty() {
            return Err(LibraryError::ValidationError("content must not be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterUpdate {
    pub chapter_number: i64,
    pub title: String,
    pub content: String,
    pub is_free: Option<bool>,
}

impl ChapterUpdate {
    pub fn validate(&self) -> LibraryResult<()> {
        if self.chapter_number < 1 {
            return Err(LibraryError::ValidationError(
                "chapter number must be at least 1".to_string(),
            ));
        }
        require_text("chapter title", &self.title, Some(TITLE_MAX_LENGTH))?;
        if self.content.is_empty() {
            return Err(LibraryError::ValidationError(
                "chapter content must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBookmark {
    pub novel_id: String,
    pub chapter_id: String,
    #[serde(default)]
    pub position: i64,
    pub note: Option<String>,
}

impl NewBookmark {
    pub fn validate(&self) -> LibraryResult<()> {
        if self.position < 0 {
            return Err(LibraryError::ValidationError(
                "position must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingProgress {
    pub novel_id: String,
    pub chapter_id: Option<String>,
    #[serde(default)]
    pub progress: f64,
}

impl ReadingProgress {
    pub fn validate(&self) -> LibraryResult<()> {
        if !(0.0..=1.0).contains(&self.progress) {
            return Err(LibraryError::ValidationError(
                "progress must be between 0 and 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRating {
    pub score: i64,
    pub review: Option<String>,
}

impl NewRating {
    pub fn validate(&self) -> LibraryResult<()> {
        if !(1..=5).contains(&self.score) {
            return Err(LibraryError::ValidationError(
                "score must be between 1 and 5".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub chapter_id: Option<String>,
    pub parent_id: Option<String>,
    pub content: String,
}

impl NewComment {
    pub fn validate(&self) -> LibraryResult<()> {
        require_text("comment", &self.content, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(1, 20).validate().is_ok());
        assert!(PageRequest::new(0, 20).validate().is_err());
        assert!(PageRequest::new(1, 0).validate().is_err());
        assert!(PageRequest::new(1, 101).validate().is_err());
        assert!(PageRequest::new(3, 100).validate().is_ok());
    }

    #[test]
    fn test_paginate_rounds_total_pages_up() {
        let request = PageRequest::new(2, 20);
        assert_eq!(request.offset(), 20);

        let pagination = request.paginate(41);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(request.paginate(0).total_pages, 0);
        assert_eq!(request.paginate(40).total_pages, 2);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("paused".parse::<NovelStatus>().unwrap(), NovelStatus::Paused);
        assert!("archived".parse::<NovelStatus>().is_err());
        assert_eq!(NovelStatus::default(), NovelStatus::Ongoing);
    }

    #[test]
    fn test_new_novel_validation() {
        let mut novel = NewNovel {
            title: "Stellar Drift".to_string(),
            author: "Lin".to_string(),
            category_id: None,
            cover_image: None,
            description: None,
            status: NovelStatus::Ongoing,
            tags: None,
        };
        assert!(novel.validate().is_ok());

        novel.title = "x".repeat(TITLE_MAX_LENGTH + 1);
        assert!(novel.validate().is_err());

        novel.title = "   ".to_string();
        assert!(novel.validate().is_err());
    }

    #[test]
    fn test_word_count_counts_characters() {
        assert_eq!(word_count("斗破苍穹"), 4);
        assert_eq!(word_count("hello"), 5);
    }

    #[test]
    fn test_new_chapter_defaults_to_free() {
        let chapter: NewChapter = serde_json::from_str(
            r#"{"novel_id":"n1","chapter_number":1,"title":"Start","content":"text"}"#,
        )
        .unwrap();
        assert!(chapter.is_free);
        assert!(chapter.validate().is_ok());
    }

    #[test]
    fn test_rating_and_progress_ranges() {
        assert!(NewRating { score: 5, review: None }.validate().is_ok());
        assert!(NewRating { score: 6, review: None }.validate().is_err());

        let progress = ReadingProgress {
            novel_id: "n".to_string(),
            chapter_id: None,
            progress: 1.5,
        };
        assert!(progress.validate().is_err());
    }
}
