use serde::{Deserialize, Serialize};

use crate::core::error::LibraryResult;
use crate::core::models::{NovelFilter, NovelStatus, PageRequest, SortBy};

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

fn default_page_size() -> u32 {
    10
}

/// Query string for paginated listings
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

impl PageQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

/// Query string for the novel listing. Empty form fields count as absent.
#[derive(Debug, Deserialize)]
pub struct NovelListQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub category_id: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl NovelListQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }

    pub fn filter(&self) -> LibraryResult<NovelFilter> {
        Ok(NovelFilter {
            category_id: non_blank(&self.category_id).map(ToString::to_string),
            status: non_blank(&self.status)
                .map(str::parse::<NovelStatus>)
                .transpose()?,
            search: non_blank(&self.search).map(ToString::to_string),
            sort_by: non_blank(&self.sort_by)
                .map(str::parse::<SortBy>)
                .transpose()?
                .unwrap_or_default(),
        })
    }
}

/// Query string for a novel's chapter page
#[derive(Debug, Deserialize)]
pub struct NovelDetailQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// Query string for the bookmark listing
#[derive(Debug, Deserialize)]
pub struct BookmarkQuery {
    pub novel_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Query string for the comment listing
#[derive(Debug, Deserialize)]
pub struct CommentQuery {
    pub chapter_id: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

/// Raw blob upload; fields are loose so bad input gets a 400 body
#[derive(Debug, Deserialize)]
pub struct FileUploadRequest {
    pub key: Option<String>,
    pub content: Option<serde_json::Value>,
}

/// Generic response
#[derive(Serialize, Deserialize)]
pub struct GenericResponse {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Error response
#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
}
