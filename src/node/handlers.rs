//! Internal Node API Handlers
//!
//! Serves this node's `LocalStore` over the `/internal` routes that
//! `HttpNodeClient` consumes. These handlers stay deliberately thin: decode,
//! call the store, encode. Placement decisions never happen here.

use crate::error::StoreError;
use crate::node::protocol::{HEADER_LAST_MODIFIED, NodeListing, now_ms};
use crate::node::store::LocalStore;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct PutFileParams {
    pub last_modified: Option<u64>,
}

fn error_response(op: &str, e: StoreError) -> Response {
    tracing::error!("Local {} failed: {}", op, e);
    (e.status_code(), e.to_string()).into_response()
}

pub async fn handle_get_file(
    Extension(store): Extension<Arc<LocalStore>>,
    Path((schema, path)): Path<(String, String)>,
) -> Response {
    match store.get(&schema, &path) {
        Ok(Some((bytes, metadata))) => (
            StatusCode::OK,
            [(HEADER_LAST_MODIFIED, metadata.last_modified.to_string())],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response("get", e),
    }
}

pub async fn handle_get_meta(
    Extension(store): Extension<Arc<LocalStore>>,
    Path((schema, path)): Path<(String, String)>,
) -> Response {
    match store.head(&schema, &path) {
        Ok(Some(metadata)) => (StatusCode::OK, Json(metadata)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response("head", e),
    }
}

pub async fn handle_put_file(
    Extension(store): Extension<Arc<LocalStore>>,
    Path((schema, path)): Path<(String, String)>,
    Query(params): Query<PutFileParams>,
    body: Bytes,
) -> Response {
    let last_modified = params.last_modified.unwrap_or_else(now_ms);
    match store.put(&schema, &path, &body, last_modified) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response("put", e),
    }
}

pub async fn handle_delete_file(
    Extension(store): Extension<Arc<LocalStore>>,
    Path((schema, path)): Path<(String, String)>,
) -> Response {
    match store.delete(&schema, &path) {
        Ok(true) => StatusCode::OK.into_response(),
        Ok(false) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response("delete", e),
    }
}

pub async fn handle_list_dir(
    Extension(store): Extension<Arc<LocalStore>>,
    Path((schema, path)): Path<(String, String)>,
) -> Response {
    list_dir(&store, &schema, &path)
}

/// Listing of the schema root itself (no trailing path segment).
pub async fn handle_list_root(
    Extension(store): Extension<Arc<LocalStore>>,
    Path(schema): Path<String>,
) -> Response {
    list_dir(&store, &schema, "")
}

fn list_dir(store: &LocalStore, schema: &str, path: &str) -> Response {
    match store.list_dir(schema, path) {
        Ok(Some(listing)) => (StatusCode::OK, Json::<NodeListing>(listing)).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => error_response("list", e),
    }
}

pub async fn handle_create_schema_dir(
    Extension(store): Extension<Arc<LocalStore>>,
    Path(schema): Path<String>,
) -> Response {
    match store.create_schema_dir(&schema) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response("create schema dir", e),
    }
}

pub async fn handle_delete_schema_dir(
    Extension(store): Extension<Arc<LocalStore>>,
    Path(schema): Path<String>,
) -> Response {
    match store.delete_schema_dir(&schema) {
        Ok(()) => StatusCode::OK.into_response(),
        Err(e) => error_response("delete schema dir", e),
    }
}
