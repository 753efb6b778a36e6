//! Schema CRUD Handlers
//!
//! `GET /` lists schema names; `GET/POST/DELETE /:schema` read, create and
//! delete definitions. The grid in a creation body is optional — when
//! absent the registry assigns one from the live node pool.

use crate::error::Result;
use crate::schema::registry::SchemaRegistry;
use crate::schema::types::SchemaDef;
use axum::Json;
use axum::extract::{Extension, Path};
use axum::http::StatusCode;
use std::sync::Arc;

pub async fn handle_list_schemas(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
) -> Json<Vec<String>> {
    Json(registry.list().await)
}

pub async fn handle_get_schema(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path(schema): Path<String>,
) -> Result<Json<SchemaDef>> {
    let schema = registry.get(&schema).await?;
    Ok(Json(schema.def()))
}

pub async fn handle_create_schema(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path(schema): Path<String>,
    Json(def): Json<SchemaDef>,
) -> Result<(StatusCode, Json<SchemaDef>)> {
    let created = registry.create(&schema, def).await.inspect_err(|e| {
        tracing::warn!("Schema creation rejected: {}", e);
    })?;
    Ok((StatusCode::CREATED, Json(created.def())))
}

pub async fn handle_delete_schema(
    Extension(registry): Extension<Arc<SchemaRegistry>>,
    Path(schema): Path<String>,
) -> Result<StatusCode> {
    registry.delete(&schema).await?;
    Ok(StatusCode::OK)
}
