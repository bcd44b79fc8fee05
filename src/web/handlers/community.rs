use actix_web::{web, Responder};

use crate::core::models::{NewComment, NewRating, PageRequest};
use crate::web::auth::CurrentUser;
use crate::web::handlers::{created_result, json_result, success_result};
use crate::web::models::CommentQuery;
use crate::web::server::AppState;

/// Rate a novel; a second rating from the same reader replaces the first
pub async fn rate_novel(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    input: web::Json<NewRating>,
) -> impl Responder {
    json_result(data.db.rate_novel(&user.id, &path, &input))
}

pub async fn list_comments(
    data: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<CommentQuery>,
) -> impl Responder {
    let page = PageRequest::new(query.page, query.limit);
    json_result(
        data.db
            .list_comments(&path, query.chapter_id.as_deref(), page),
    )
}

pub async fn add_comment(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
    input: web::Json<NewComment>,
) -> impl Responder {
    created_result(data.db.add_comment(&user.id, &path, &input))
}

pub async fn delete_comment(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    success_result(data.db.delete_comment(&user.id, &path), "Comment deleted")
}

pub async fn like_comment(
    user: CurrentUser,
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> impl Responder {
    json_result(data.db.toggle_comment_like(&user.id, &path))
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};
    use serde_json::json;

    use crate::core::database::test_support as db_support;
    use crate::core::models::{Comment, CommentLikeToggle, CommentList, RatingOutcome};
    use crate::web::auth::USER_HEADER;
    use crate::web::models::ErrorResponse;
    use crate::web::server::{routes, test_support};

    #[actix_web::test]
    async fn test_rating_replaces_previous_score() {
        let state = test_support::state();
        let novel = db_support::novel(&state.db, "Rated", None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        for (user, score) in [("a", 5), ("b", 2), ("a", 3)] {
            let req = test::TestRequest::post()
                .uri(&format!("/api/novels/{}/rating", novel.id))
                .insert_header((USER_HEADER, user))
                .set_json(json!({"score": score}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert!(resp.status().is_success());
        }

        let req = test::TestRequest::post()
            .uri(&format!("/api/novels/{}/rating", novel.id))
            .insert_header((USER_HEADER, "c"))
            .set_json(json!({"score": 4, "review": "solid"}))
            .to_request();
        let outcome: RatingOutcome = test::call_and_read_body_json(&app, req).await;
        assert_eq!(outcome.rating_count, 3);
        assert!((outcome.average - 3.0).abs() < 1e-9);

        let req = test::TestRequest::post()
            .uri(&format!("/api/novels/{}/rating", novel.id))
            .insert_header((USER_HEADER, "c"))
            .set_json(json!({"score": 9}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }

    #[actix_web::test]
    async fn test_comment_thread() {
        let state = test_support::state();
        let novel = db_support::novel(&state.db, "Talkative", None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/novels/{}/comments", novel.id))
            .insert_header((USER_HEADER, test_support::READER))
            .set_json(json!({"content": "First!"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 201);
        let first: Comment = test::read_body_json(resp).await;

        let req = test::TestRequest::post()
            .uri(&format!("/api/novels/{}/comments", novel.id))
            .insert_header((USER_HEADER, "replier"))
            .set_json(json!({"content": "Welcome", "parent_id": first.id}))
            .to_request();
        let reply: Comment = test::call_and_read_body_json(&app, req).await;
        assert_eq!(reply.parent_id.as_deref(), Some(first.id.as_str()));

        let req = test::TestRequest::post()
            .uri(&format!("/api/comments/{}/like", first.id))
            .insert_header((USER_HEADER, "replier"))
            .to_request();
        let like: CommentLikeToggle = test::call_and_read_body_json(&app, req).await;
        assert!(like.liked);
        assert_eq!(like.like_count, 1);

        let req = test::TestRequest::get()
            .uri(&format!("/api/novels/{}/comments", novel.id))
            .to_request();
        let list: CommentList = test::call_and_read_body_json(&app, req).await;
        assert_eq!(list.pagination.total, 2);

        let req = test::TestRequest::delete()
            .uri(&format!("/api/comments/{}", first.id))
            .insert_header((USER_HEADER, "replier"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 404);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(body.error_code, "NOT_FOUND");

        let req = test::TestRequest::delete()
            .uri(&format!("/api/comments/{}", reply.id))
            .insert_header((USER_HEADER, "replier"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }
}
