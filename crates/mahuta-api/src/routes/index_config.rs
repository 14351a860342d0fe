//! # Index Administration Routes
//!
//! - `POST /config/index/:index`: create an index, optional body = mapping
//! - `GET  /config/index`: list indices

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use mahuta_core::{CreateIndexRequest, CreateIndexResponse, GetIndexesResponse};
use serde_json::Value;

use crate::error::AppError;
use crate::extractors::optional_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/config/index", get(list_indexes))
        .route("/config/index/:index", post(create_index))
}

async fn create_index(
    State(state): State<AppState>,
    Path(index): Path<String>,
    body: Bytes,
) -> Result<Json<CreateIndexResponse>, AppError> {
    let mut request = CreateIndexRequest::new(index);
    if let Some(configuration) = optional_json::<Value>(&body)? {
        request = request.with_configuration(configuration);
    }
    tracing::info!(index = %request.name, "creating index");
    Ok(Json(state.service.create_index(request).await?))
}

async fn list_indexes(State(state): State<AppState>) -> Result<Json<GetIndexesResponse>, AppError> {
    Ok(Json(state.service.get_indexes().await?))
}
