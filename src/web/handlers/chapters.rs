use actix_web::{web, Responder};

use crate::core::models::{ChapterUpdate, NewChapter};
use crate::web::auth::CurrentUser;
use crate::web::handlers::{created_result, json_result};
use crate::web::server::AppState;

pub async fn create_chapter(
    _user: CurrentUser,
    data: web::Data<AppState>,
    input: web::Json<NewChapter>,
) -> impl Responder {
    created_result(data.chapters.create_chapter(&input).await)
}

/// Chapter text for reading; counts a view
pub async fn get_chapter(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    json_result(data.chapters.chapter_content(&path).await)
}

/// Chapter text for the editor
pub async fn chapter_detail(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    json_result(data.chapters.chapter_detail(&path).await)
}

pub async fn update_chapter(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    input: web::Json<ChapterUpdate>,
) -> impl Responder {
    json_result(data.chapters.update_chapter(&path, &input).await)
}

pub async fn delete_chapter(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    json_result(data.chapters.delete_chapter(&path).await)
}
