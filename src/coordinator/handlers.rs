//! Public File Operation Handlers
//!
//! `GET/HEAD/PUT/DELETE /:schema/*path`. The traversal guard runs first:
//! a path with a `..` segment is rejected with 403 before any node RPC.
//! File GETs answer with a redirect to the owning node so large payloads
//! never double-hop through the coordinator; directory GETs return the
//! merged listing.

use crate::coordinator::types::Resolved;
use crate::error::{Result, StoreError};
use crate::node::protocol::{
    ENDPOINT_INTERNAL_FILE, HEADER_FILE_SIZE, HEADER_FILE_TYPE, HEADER_LAST_MODIFIED, encode_path,
    now_ms,
};
use crate::node::store::sanitize_rel_path;
use crate::schema::registry::SchemaRegistry;
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Extension, Path, Query};
use axum::http::StatusCode;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct FileOpParams {
    /// Modification timestamp to stamp on a PUT; defaults to now.
    pub last_modified: Option<u64>,
    /// Explicit shard override.
    pub target: Option<usize>,
    /// Per-request operation timeout, milliseconds.
    pub timeout: Option<u64>,
}

async fn with_timeout<T>(
    timeout_ms: Option<u64>,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    match timeout_ms {
        Some(ms) => tokio::time::timeout(Duration::from_millis(ms), operation)
            .await
            .map_err(|_| StoreError::Internal(format!("operation timed out after {} ms", ms)))?,
        None => operation.await,
    }
}

pub async fn handle_get(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path((schema, path)): Path<(String, String)>,
    Query(params): Query<FileOpParams>,
) -> Result<Response> {
    let path = sanitize_rel_path(&path)?;
    let coordinator = registry.coordinator(&schema).await?;
    let resolved = with_timeout(params.timeout, coordinator.resolve(&path, params.target)).await?;

    match resolved {
        Some(Resolved::File(location)) => {
            let target = format!(
                "http://{}{}/{}/{}",
                location.node,
                ENDPOINT_INTERNAL_FILE,
                encode_path(&schema),
                encode_path(&path)
            );
            Ok(Redirect::temporary(&target).into_response())
        }
        Some(Resolved::Directory(listing)) => Ok(Json(listing).into_response()),
        None => Err(StoreError::NotFound(format!("{}/{}", schema, path))),
    }
}

pub async fn handle_head(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path((schema, path)): Path<(String, String)>,
    Query(params): Query<FileOpParams>,
) -> Result<Response> {
    let path = sanitize_rel_path(&path)?;
    let coordinator = registry.coordinator(&schema).await?;
    let resolved = with_timeout(params.timeout, coordinator.resolve(&path, params.target)).await?;

    match resolved {
        Some(Resolved::File(location)) => {
            let mut headers = vec![
                (HEADER_FILE_TYPE, location.metadata.kind.as_str().to_string()),
                (
                    HEADER_LAST_MODIFIED,
                    location.metadata.last_modified.to_string(),
                ),
            ];
            if let Some(size) = location.metadata.size {
                headers.push((HEADER_FILE_SIZE, size.to_string()));
            }
            Ok((StatusCode::OK, AppendHeaders(headers)).into_response())
        }
        Some(Resolved::Directory(_)) => Ok((
            StatusCode::OK,
            AppendHeaders([(HEADER_FILE_TYPE, "DIRECTORY".to_string())]),
        )
            .into_response()),
        None => Err(StoreError::NotFound(format!("{}/{}", schema, path))),
    }
}

pub async fn handle_put(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path((schema, path)): Path<(String, String)>,
    Query(params): Query<FileOpParams>,
    body: Bytes,
) -> Result<StatusCode> {
    let path = sanitize_rel_path(&path)?;
    let coordinator = registry.coordinator(&schema).await?;
    let last_modified = params.last_modified.unwrap_or_else(now_ms);

    with_timeout(
        params.timeout,
        coordinator.put(&path, body, last_modified, params.target),
    )
    .await
    .inspect_err(|e| tracing::error!("PUT {}/{} failed: {}", schema, path, e))?;
    Ok(StatusCode::OK)
}

pub async fn handle_delete(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path((schema, path)): Path<(String, String)>,
    Query(params): Query<FileOpParams>,
) -> Result<StatusCode> {
    let path = sanitize_rel_path(&path)?;
    let coordinator = registry.coordinator(&schema).await?;

    let deleted = with_timeout(params.timeout, coordinator.delete(&path)).await?;
    if deleted {
        Ok(StatusCode::OK)
    } else {
        Err(StoreError::NotFound(format!("{}/{}", schema, path)))
    }
}
