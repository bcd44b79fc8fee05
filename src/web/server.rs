use std::sync::Arc;

use actix_files as fs;
use actix_web::{middleware, web, App, HttpServer};
use log::info;

use crate::config::ServerConfig;
use crate::core::chapters::ChapterService;
use crate::core::database::Database;
use crate::core::error::LibraryError;
use crate::web::handlers;

/// Start the web server for the library site and API
pub async fn start_web_server(config: ServerConfig, state: AppState) -> std::io::Result<()> {
    info!("Starting web server on http://{}", config.bind_addr);

    let app_state = web::Data::new(state);
    let static_dir = config.static_dir.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(app_state.clone())
            // Static files
            .service(fs::Files::new("/static", static_dir.clone()))
            .configure(routes)
    })
    .bind(config.bind_addr.as_str())?
    .run()
    .await
}

/// Route table shared by the server and the handler tests
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        LibraryError::ValidationError(err.to_string()).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        LibraryError::ValidationError(err.to_string()).into()
    }))
    // API routes
    .service(
        web::scope("/api")
            // System APIs
            .route("/health", web::get().to(handlers::system::health))
            .route("/private", web::get().to(handlers::system::private))
            .route("/system/metrics", web::get().to(handlers::system::metrics))
            .route("/admin/stats", web::get().to(handlers::system::admin_stats))
            // Catalogue APIs
            .route("/categories", web::get().to(handlers::catalog::list_categories))
            .route("/categories", web::post().to(handlers::catalog::create_category))
            .route("/categories/{id}", web::put().to(handlers::catalog::update_category))
            .route("/categories/{id}", web::delete().to(handlers::catalog::delete_category))
            .route("/novels", web::get().to(handlers::catalog::list_novels))
            .route("/novels", web::post().to(handlers::catalog::create_novel))
            .route("/novels/{id}", web::get().to(handlers::catalog::get_novel))
            .route("/novels/{id}", web::put().to(handlers::catalog::update_novel))
            .route("/novels/{id}", web::delete().to(handlers::catalog::delete_novel))
            .route("/novels/{id}/favorite", web::post().to(handlers::reader::toggle_favorite))
            .route("/novels/{id}/rating", web::post().to(handlers::community::rate_novel))
            .route("/novels/{id}/comments", web::get().to(handlers::community::list_comments))
            .route("/novels/{id}/comments", web::post().to(handlers::community::add_comment))
            // Chapter APIs
            .route("/chapters", web::post().to(handlers::chapters::create_chapter))
            .route("/chapters/{id}", web::get().to(handlers::chapters::get_chapter))
            .route("/chapters/{id}", web::put().to(handlers::chapters::update_chapter))
            .route("/chapters/{id}", web::delete().to(handlers::chapters::delete_chapter))
            .route("/chapters/{id}/detail", web::get().to(handlers::chapters::chapter_detail))
            // Reader APIs
            .route("/me/favorites", web::get().to(handlers::reader::favorites))
            .route("/me/bookmarks", web::get().to(handlers::reader::bookmarks))
            .route("/me/bookmarks", web::post().to(handlers::reader::add_bookmark))
            .route("/me/bookmarks/{id}", web::delete().to(handlers::reader::remove_bookmark))
            .route("/me/history", web::get().to(handlers::reader::history))
            .route("/me/history", web::put().to(handlers::reader::record_history))
            // Comment APIs
            .route("/comments/{id}", web::delete().to(handlers::community::delete_comment))
            .route("/comments/{id}/like", web::post().to(handlers::community::like_comment)),
    )
    // Raw blob routes
    .route("/file", web::post().to(handlers::files::upload))
    .route("/file/get/{key:.*}", web::get().to(handlers::files::download))
    // Page routes
    .route("/", web::get().to(handlers::pages::index))
    .route("/novels", web::get().to(handlers::pages::novels))
    .route("/novels/{id}", web::get().to(handlers::pages::novel))
    .route(
        "/novels/{id}/chapters/{chapter_id}",
        web::get().to(handlers::pages::chapter),
    )
    .route("/categories", web::get().to(handlers::pages::categories))
    .route("/rankings", web::get().to(handlers::pages::rankings))
    .route("/search", web::get().to(handlers::pages::search))
    .route("/dashboard", web::get().to(handlers::pages::dashboard))
    // Back-office pages
    .route("/admin", web::get().to(handlers::pages::admin))
    .route("/admin/novels", web::get().to(handlers::admin::novels))
    .route("/admin/novels/create", web::get().to(handlers::admin::new_novel))
    .route("/admin/novels/{id}", web::get().to(handlers::admin::novel_chapters))
    .route("/admin/novels/{id}/edit", web::get().to(handlers::admin::edit_novel))
    .route(
        "/admin/novels/{id}/chapters/create",
        web::get().to(handlers::admin::new_chapter),
    )
    .route(
        "/admin/novels/{id}/chapters/{chapter_id}/edit",
        web::get().to(handlers::admin::edit_chapter),
    )
    .route("/admin/categories", web::get().to(handlers::admin::categories))
    // Default route for 404
    .default_service(web::to(handlers::pages::not_found));
}

/// Shared application state for web handlers
pub struct AppState {
    pub db: Arc<Database>,
    pub chapters: Arc<ChapterService>,
}
