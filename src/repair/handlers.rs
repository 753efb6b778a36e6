//! Repair Control Handlers
//!
//! `GET/POST/DELETE /:schema/repair` — query, start, and abort the
//! anti-entropy worker of a schema.

use crate::error::Result;
use crate::repair::engine::RepairEngine;
use crate::repair::types::RepairStatus;
use crate::schema::registry::SchemaRegistry;
use axum::Json;
use axum::extract::{Extension, Path};
use std::sync::Arc;

pub async fn handle_repair_start(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Extension(engine): Extension<Arc<RepairEngine>>,
    Path(schema): Path<String>,
) -> Result<Json<RepairStatus>> {
    let schema = registry.get(&schema).await?;
    let coordinator = registry.coordinator(&schema.name).await?;
    let status = engine.start(schema, coordinator).await.inspect_err(|e| {
        tracing::warn!("Repair start rejected: {}", e);
    })?;
    Ok(Json(status))
}

pub async fn handle_repair_status(
    Extension(engine): Extension<Arc<RepairEngine>>,
    Path(schema): Path<String>,
) -> Result<Json<RepairStatus>> {
    engine.status(&schema).await.map(Json)
}

pub async fn handle_repair_stop(
    Extension(engine): Extension<Arc<RepairEngine>>,
    Path(schema): Path<String>,
) -> Result<Json<RepairStatus>> {
    engine.stop(&schema).await.map(Json)
}
