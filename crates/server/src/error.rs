//! HTTP error taxonomy — spec §7: input errors reject at the boundary,
//! configuration/auth errors surface as 401/500, everything else that
//! reaches the handler layer degrades to a 500 rather than panicking.
//!
//! Grounded on the teacher's `ServerError -> StatusCode` conversion
//! (`voice-agent-rust/crates/server/src/lib.rs`).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<mbs_core::Error> for ServerError {
    fn from(err: mbs_core::Error) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Auth(_) => StatusCode::UNAUTHORIZED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
