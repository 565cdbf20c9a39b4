//! Collection and health routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;

use super::store::CollectionStore;
use crate::error::ApiError;
use crate::record::{Draft, Record, RecordId};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub service: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        service: "athletes-sync",
    })
}

/// Create the collection router
pub fn router() -> Router<CollectionStore> {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route("/:id", delete(delete_record))
}

/// List every record in insertion order
async fn list_records(State(store): State<CollectionStore>) -> Json<Vec<Record>> {
    Json(store.list().await)
}

/// Create a record
async fn create_record(
    State(store): State<CollectionStore>,
    Json(draft): Json<Draft>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
    let record = store.create(&draft).await?;
    tracing::info!(id = %record.id, name = %record.name, "Created record");
    Ok((StatusCode::CREATED, Json(record)))
}

/// Delete a record
async fn delete_record(
    State(store): State<CollectionStore>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = RecordId::parse(&id);
    store.remove(&id).await?;
    tracing::info!(%id, "Deleted record");
    Ok(StatusCode::NO_CONTENT)
}
