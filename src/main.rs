use log::{error, info};
use std::sync::Arc;

mod config;
mod core;
mod storage;
mod web;

use crate::config::ServerConfig;
use crate::core::chapters::ChapterService;
use crate::core::database::Database;
use crate::core::metrics::LibraryMetrics;
use crate::core::seed::seed_if_empty;
use crate::storage::fs::FsBlobStore;
use crate::web::server::{start_web_server, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));
    info!("Starting Novel Planet...");

    let config = ServerConfig::from_env();
    info!("Configuration: {:?}", config);

    let db = match Database::open(&config.database_path) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    if config.seed {
        if let Err(e) = seed_if_empty(&db) {
            error!("Failed to seed sample data: {}", e);
        }
    }

    let blobs = match FsBlobStore::new(config.blob_dir.clone()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to prepare blob directory: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()));
        }
    };

    let metrics = LibraryMetrics::new()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let chapters = Arc::new(ChapterService::new(
        db.clone(),
        blobs,
        config.cache_capacity,
        metrics,
    ));
    info!("Library services initialized");

    // Start the web interface; actix handles Ctrl+C and drains connections
    let result = start_web_server(config, AppState { db, chapters }).await;
    if let Err(e) = &result {
        error!("Web server stopped with error: {}", e);
    }

    info!("Novel Planet shutdown complete");
    result
}
