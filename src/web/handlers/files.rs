use actix_web::http::header;
use actix_web::{web, HttpResponse, Responder};
use log::{error, info};
use serde_json::json;

use crate::core::error::LibraryError;
use crate::web::models::FileUploadRequest;
use crate::web::server::AppState;

/// Gzip a text body and store it under the given key
pub async fn upload(data: web::Data<AppState>, body: web::Json<FileUploadRequest>) -> impl Responder {
    let key = body.key.as_deref().map(str::trim).unwrap_or_default();
    let content = body.content.as_ref().and_then(|value| value.as_str());

    let content = match content {
        Some(content) if !key.is_empty() => content,
        _ => {
            return HttpResponse::BadRequest().json(json!({
                "error": "Both key and content are required"
            }));
        }
    };

    match data.chapters.store_raw(key, content).await {
        Ok(size) => {
            info!("Stored {} compressed bytes under {}", size, key);
            HttpResponse::Ok().json(json!({
                "key": key,
                "size": size,
                "success": true,
            }))
        }
        Err(LibraryError::ValidationError(msg)) => {
            HttpResponse::BadRequest().json(json!({ "error": msg }))
        }
        Err(e) => {
            error!("Failed to store {}: {}", key, e);
            HttpResponse::InternalServerError().json(json!({
                "error": "Failed to compress and save"
            }))
        }
    }
}

/// Stored bytes as-is, still gzip-encoded
pub async fn download(data: web::Data<AppState>, path: web::Path<String>) -> impl Responder {
    match data.chapters.fetch_raw(&path).await {
        Ok(Some(blob)) => {
            let mut response = HttpResponse::Ok();
            response.content_type(blob.metadata.content_type.as_str());
            if let Some(encoding) = &blob.metadata.content_encoding {
                response.insert_header((header::CONTENT_ENCODING, encoding.as_str()));
            }
            response.body(blob.data)
        }
        Ok(None) => HttpResponse::NotFound().json(json!({ "error": "File not found" })),
        Err(LibraryError::ValidationError(msg)) => {
            HttpResponse::BadRequest().json(json!({ "error": msg }))
        }
        Err(e) => {
            error!("Failed to read {}: {}", path, e);
            HttpResponse::InternalServerError().json(json!({ "error": "Failed to read file" }))
        }
    }
}
