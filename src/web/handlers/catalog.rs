use actix_web::{web, Responder};
use log::info;

use crate::core::models::{CategoryInput, NewNovel, NovelUpdate, PageRequest};
use crate::web::auth::CurrentUser;
use crate::web::handlers::{created_result, error_response, json_result, success_result};
use crate::web::models::{NovelDetailQuery, NovelListQuery};
use crate::web::server::AppState;

pub async fn list_categories(data: web::Data<AppState>) -> impl Responder {
    json_result(data.db.list_categories())
}

pub async fn create_category(
    _user: CurrentUser,
    data: web::Data<AppState>,
    input: web::Json<CategoryInput>,
) -> impl Responder {
    created_result(data.db.create_category(&input))
}

pub async fn update_category(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    input: web::Json<CategoryInput>,
) -> impl Responder {
    json_result(data.db.update_category(&path, &input))
}

pub async fn delete_category(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    success_result(data.db.delete_category(&path), "Category deleted")
}

/// Filtered and sorted novel listing
pub async fn list_novels(
    data: web::Data<AppState>,
    query: web::Query<NovelListQuery>,
) -> impl Responder {
    let result = query
        .filter()
        .and_then(|filter| data.db.list_novels(&filter, query.page_request()));
    json_result(result)
}

pub async fn create_novel(
    user: CurrentUser,
    data: web::Data<AppState>,
    input: web::Json<NewNovel>,
) -> impl Responder {
    let result = data.db.create_novel(&input);
    if let Ok(novel) = &result {
        info!("User {} created novel {}", user.id, novel.id);
    }
    created_result(result)
}

/// A novel with one page of chapter summaries
pub async fn get_novel(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<NovelDetailQuery>,
) -> impl Responder {
    let page = PageRequest::new(query.page, query.page_size);
    json_result(data.db.novel_detail(&path, page))
}

pub async fn update_novel(
    _user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    input: web::Json<NovelUpdate>,
) -> impl Responder {
    json_result(data.db.update_novel(&path, &input))
}

pub async fn delete_novel(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    if let Err(e) = data.db.get_novel(&path) {
        return error_response(&e);
    }
    let result = data.chapters.delete_novel(&path).await;
    if result.is_ok() {
        info!("User {} deleted novel {}", user.id, path);
    }
    success_result(result, "Novel deleted")
}
