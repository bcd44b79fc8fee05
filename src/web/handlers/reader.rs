use actix_web::{web, Responder};

use crate::core::models::{NewBookmark, PageRequest, ReadingProgress};
use crate::web::auth::CurrentUser;
use crate::web::handlers::{created_result, json_result, success_result};
use crate::web::models::{BookmarkQuery, PageQuery};
use crate::web::server::AppState;

/// Favorite or unfavorite a novel
pub async fn toggle_favorite(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    json_result(data.db.toggle_favorite(&user.id, &path))
}

pub async fn favorites(
    user: CurrentUser,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    json_result(data.db.user_favorites(&user.id, query.page_request()))
}

pub async fn bookmarks(
    user: CurrentUser,
    data: web::Data<AppState>,
    query: web::Query<BookmarkQuery>,
) -> impl Responder {
    let page = PageRequest::new(query.page, query.limit);
    json_result(
        data.db
            .user_bookmarks(&user.id, query.novel_id.as_deref(), page),
    )
}

pub async fn add_bookmark(
    user: CurrentUser,
    data: web::Data<AppState>,
    input: web::Json<NewBookmark>,
) -> impl Responder {
    created_result(data.db.add_bookmark(&user.id, &input))
}

pub async fn remove_bookmark(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    success_result(data.db.remove_bookmark(&user.id, &path), "Bookmark removed")
}

pub async fn history(
    user: CurrentUser,
    data: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> impl Responder {
    json_result(data.db.reading_history(&user.id, query.page_request()))
}

/// Save where the reader stopped in a novel
pub async fn record_history(
    user: CurrentUser,
    data: web::Data<AppState>,
    input: web::Json<ReadingProgress>,
) -> impl Responder {
    success_result(
        data.db.record_reading(&user.id, &input),
        "Reading progress saved",
    )
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::json;

    use crate::core::database::test_support as db_support;
    use crate::core::models::{
        Bookmark, BookmarkList, Chapter, FavoriteList, FavoriteToggle, HistoryList, NewChapter,
    };
    use crate::web::auth::USER_HEADER;
    use crate::web::models::GenericResponse;
    use crate::web::server::{routes, test_support};

    #[actix_web::test]
    async fn test_favorite_toggle_and_listing() {
        let state = test_support::state();
        let novel = db_support::novel(&state.db, "Moonlit", None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/novels/{}/favorite", novel.id))
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let toggle: FavoriteToggle = test::call_and_read_body_json(&app, req).await;
        assert!(toggle.favorited);

        let req = test::TestRequest::get()
            .uri("/api/me/favorites")
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let list: FavoriteList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.favorites.len(), 1);
        assert_eq!(list.favorites[0].novel.favorite_count, 1);

        let req = test::TestRequest::get()
            .uri("/api/me/favorites")
            .insert_header((USER_HEADER, "someone-else"))
            .to_request();
        let list: FavoriteList = test::call_and_read_body_json(&app, req).await;
        assert!(list.favorites.is_empty());
    }

    #[actix_web::test]
    async fn test_bookmarks_and_history() {
        let state = test_support::state();
        let novel = db_support::novel(&state.db, "Harbor", None);
        let chapter: Chapter = state
            .chapters
            .create_chapter(&NewChapter {
                novel_id: novel.id.clone(),
                chapter_number: 1,
                title: "Dock".to_string(),
                content: "Ships.".to_string(),
                is_free: true,
            })
            .await
            .unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/api/me/bookmarks")
            .insert_header((USER_HEADER, test_support::READER))
            .set_json(json!({"novel_id": novel.id, "chapter_id": chapter.id, "position": 3}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201);
        let bookmark: Bookmark = test::read_body_json(resp).await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/me/bookmarks?novel_id={}", novel.id))
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let list: BookmarkList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.bookmarks.len(), 1);
        assert_eq!(list.bookmarks[0].chapter.title, "Dock");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/me/bookmarks/{}", bookmark.id))
            .insert_header((USER_HEADER, "someone-else"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/me/bookmarks/{}", bookmark.id))
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let body: GenericResponse = test::call_and_read_body_json(&app, req).await;
        assert!(body.success);

        let req = test::TestRequest::put()
            .uri("/api/me/history")
            .insert_header((USER_HEADER, test_support::READER))
            .set_json(json!({"novel_id": novel.id, "chapter_id": chapter.id, "progress": 0.5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());

        let req = test::TestRequest::get()
            .uri("/api/me/history")
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let history: HistoryList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history.history.len(), 1);
        assert_eq!(history.history[0].progress, 0.5);
        assert_eq!(
            history.history[0].chapter.as_ref().map(|c| c.id.as_str()),
            Some(chapter.id.as_str())
        );
    }

    #[actix_web::test]
    async fn test_history_requires_user() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state())
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/me/history").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
    }
}
