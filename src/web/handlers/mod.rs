pub mod admin;
pub mod catalog;
pub mod chapters;
pub mod community;
pub mod files;
pub mod pages;
pub mod reader;
pub mod system;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;

use crate::core::error::{LibraryError, LibraryResult};
use crate::web::models::{ErrorResponse, GenericResponse};

fn status_for(err: &LibraryError) -> StatusCode {
    match err {
        LibraryError::NotFound(_) => StatusCode::NOT_FOUND,
        LibraryError::ValidationError(_) => StatusCode::BAD_REQUEST,
        LibraryError::Conflict(_) => StatusCode::CONFLICT,
        LibraryError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        LibraryError::StorageError(_)
        | LibraryError::DatabaseError(_)
        | LibraryError::CodecError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// JSON error body for a failed operation
pub fn error_response(err: &LibraryError) -> HttpResponse {
    let status = status_for(err);
    if status.is_server_error() {
        error!("Request failed: {}", err);
    }
    HttpResponse::build(status).json(ErrorResponse {
        success: false,
        error: err.to_string(),
        error_code: err.error_code().to_string(),
    })
}

/// 200 with the value as JSON, or the mapped error
pub fn json_result<T: Serialize>(result: LibraryResult<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Ok().json(value),
        Err(e) => error_response(&e),
    }
}

/// 201 with the created value as JSON, or the mapped error
pub fn created_result<T: Serialize>(result: LibraryResult<T>) -> HttpResponse {
    match result {
        Ok(value) => HttpResponse::Created().json(value),
        Err(e) => error_response(&e),
    }
}

/// `{success: true, message}` once a mutation without a body has completed
pub fn success_result(result: LibraryResult<()>, message: &str) -> HttpResponse {
    match result {
        Ok(()) => HttpResponse::Ok().json(GenericResponse {
            success: true,
            message: message.to_string(),
            data: None,
        }),
        Err(e) => error_response(&e),
    }
}

impl ResponseError for LibraryError {
    fn status_code(&self) -> StatusCode {
        status_for(self)
    }

    fn error_response(&self) -> HttpResponse {
        error_response(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (LibraryError::NotFound("x".into()), 404),
            (LibraryError::ValidationError("x".into()), 400),
            (LibraryError::Conflict("x".into()), 409),
            (LibraryError::Unauthorized("x".into()), 401),
            (LibraryError::StorageError("x".into()), 500),
            (LibraryError::DatabaseError("x".into()), 500),
            (LibraryError::CodecError("x".into()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(error_response(&err).status().as_u16(), status, "{}", err);
        }
    }
}
