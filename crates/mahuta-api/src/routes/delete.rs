//! # Deindexing Routes
//!
//! - `DELETE /delete/id/:id?index=`: deindex a document
//! - `DELETE /delete/hash/:hash?index=`: deindex the document holding a content id
//!
//! Both unpin the content from every replica after the document is removed.

use axum::extract::{Path, Query, State};
use axum::routing::delete;
use axum::{Json, Router};
use mahuta_core::{DeindexingRequest, DeindexingResponse, GetRequest};
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/delete/id/:id", delete(delete_by_id))
        .route("/delete/hash/:hash", delete(delete_by_hash))
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub index: Option<String>,
}

impl DeleteParams {
    fn required_index(self) -> Result<String, AppError> {
        self.index
            .filter(|i| !i.trim().is_empty())
            .ok_or_else(|| AppError::Validation("query parameter 'index' is required".into()))
    }
}

async fn delete_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeindexingResponse>, AppError> {
    let index = params.required_index()?;
    tracing::info!(index = %index, id = %id, "deindexing document");
    let response = state
        .service
        .deindex(DeindexingRequest::new(index, id))
        .await?;
    Ok(Json(response))
}

async fn delete_by_hash(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    Query(params): Query<DeleteParams>,
) -> Result<Json<DeindexingResponse>, AppError> {
    let index = params.required_index()?;
    let found = state
        .service
        .get(GetRequest::by_content_id(hash).in_index(index.as_str()))
        .await?;
    let id = found.metadata.index_doc_id;
    tracing::info!(index = %index, id = %id, "deindexing document by content id");
    let response = state
        .service
        .deindex(DeindexingRequest::new(index, id))
        .await?;
    Ok(Json(response))
}
