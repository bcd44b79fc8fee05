use actix_web::{web, HttpResponse, Responder};
use serde_json::json;

use crate::web::auth::CurrentUser;
use crate::web::handlers::json_result;
use crate::web::server::AppState;

/// Liveness probe
pub async fn health() -> impl Responder {
    HttpResponse::Ok().content_type("text/plain").body("OK")
}

/// Echo the caller's identity
pub async fn private(user: CurrentUser) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "This is private",
        "user": user.id,
    }))
}

/// Prometheus text exposition of the library counters
pub async fn metrics(data: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(data.chapters.metrics().render())
}

pub async fn admin_stats(_user: CurrentUser, data: web::Data<AppState>) -> impl Responder {
    json_result(data.db.admin_stats())
}

#[cfg(test)]
mod tests {
    use actix_web::{test, App};

    use crate::core::models::AdminStats;
    use crate::web::auth::USER_HEADER;
    use crate::web::models::ErrorResponse;
    use crate::web::server::{routes, test_support};

    #[actix_web::test]
    async fn test_health() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state())
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "OK");
    }

    #[actix_web::test]
    async fn test_private_requires_user() {
        let app = test::init_service(
            App::new()
                .app_data(test_support::state())
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/private").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 401);
        let body: ErrorResponse = test::read_body_json(resp).await;
        assert!(!body.success);
        assert_eq!(body.error_code, "UNAUTHORIZED");

        let req = test::TestRequest::get()
            .uri("/api/private")
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["message"], "This is private");
        assert_eq!(body["user"], test_support::READER);
    }

    #[actix_web::test]
    async fn test_admin_stats_and_metrics() {
        let state = test_support::state();
        crate::core::database::test_support::novel(&state.db, "Stats Novel", None);
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::get()
            .uri("/api/admin/stats")
            .insert_header((USER_HEADER, test_support::READER))
            .to_request();
        let stats: AdminStats = test::call_and_read_body_json(&app, req).await;
        assert_eq!(stats.total_novels, 1);
        assert_eq!(stats.recent_novels[0].title, "Stats Novel");

        let req = test::TestRequest::get().uri("/api/system/metrics").to_request();
        let body = test::call_and_read_body(&app, req).await;
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("novel_chapter_reads_total"));
    }
}
