//! Error taxonomy shared by every layer of the store.
//!
//! The small set of variants maps one-to-one onto the externally visible
//! status codes. Fan-out coordinators never branch on status codes embedded
//! in errors; "absent" outcomes travel as `Ok(None)` through the
//! `NodeClient` interface and only genuine failures become a `StoreError`.

use axum::http::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Schema or file absent everywhere it was looked for.
    #[error("not found: {0}")]
    NotFound(String),

    /// Schema name already taken, or a repair is already running.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Grid dimensions don't match R/D, invalid shard target, or not enough
    /// live nodes to assign a grid.
    #[error("not acceptable: {0}")]
    NotAcceptable(String),

    /// Path escapes the schema root.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Local file I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A node RPC failed for a reason other than the file being absent.
    #[error("remote node error: {0}")]
    Remote(String),

    /// Anything else: serialization failures, exhausted fan-outs, timeouts.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StoreError {
    /// HTTP status the REST layer answers with for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::Conflict(_) => StatusCode::CONFLICT,
            StoreError::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            StoreError::Forbidden(_) => StatusCode::FORBIDDEN,
            StoreError::Io(_) | StoreError::Remote(_) | StoreError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl axum::response::IntoResponse for StoreError {
    fn into_response(self) -> axum::response::Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Internal(format!("serialization: {}", e))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
