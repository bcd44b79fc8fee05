//! Caller identity.
//!
//! Sign-in happens upstream; the authenticating proxy forwards the user id in
//! the `X-User-Id` header.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::core::error::LibraryError;

pub const USER_HEADER: &str = "x-user-id";

/// The signed-in user making the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: String,
}

impl CurrentUser {
    pub fn from_request_head(req: &HttpRequest) -> Option<Self> {
        req.headers()
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| CurrentUser { id: id.to_string() })
    }
}

impl FromRequest for CurrentUser {
    type Error = LibraryError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            Self::from_request_head(req)
                .ok_or_else(|| LibraryError::Unauthorized("sign in required".to_string())),
        )
    }
}
