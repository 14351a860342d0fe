//! # Store and Index Routes
//!
//! - `POST /raw/index`, `POST /json/index`: index an already stored content id
//! - `POST /raw/store_index`: multipart: part `file` (bytes) + part `request` (JSON)
//! - `POST /json/store_index`: JSON body with inline string content
//!
//! Every route answers with the `IndexingResponse` of the operation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use mahuta_core::{IndexFields, IndexingRequest, IndexingResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::extract_json;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/raw/index", post(index_content_id))
        .route("/json/index", post(index_content_id))
        .route("/raw/store_index", post(store_and_index_file))
        .route("/json/store_index", post(store_and_index_text))
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

/// Index content that is already stored.
#[derive(Debug, Deserialize)]
pub struct CidIndexingBody {
    pub index: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "hash")]
    pub content_id: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index_fields: IndexFields,
}

/// Metadata part of a multipart store-and-index request.
#[derive(Debug, Deserialize)]
pub struct StoreIndexingBody {
    pub index: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index_fields: IndexFields,
}

/// Store a string and index it.
#[derive(Debug, Deserialize)]
pub struct TextIndexingBody {
    pub index: String,
    #[serde(default)]
    pub id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub index_fields: IndexFields,
}

fn with_header(
    mut request: IndexingRequest,
    id: Option<String>,
    content_type: Option<String>,
    index_fields: IndexFields,
) -> IndexingRequest {
    if let Some(id) = id {
        request = request.with_id(id);
    }
    if let Some(content_type) = content_type {
        request = request.with_content_type(content_type);
    }
    request.with_fields(index_fields)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index_content_id(
    State(state): State<AppState>,
    body: Result<Json<CidIndexingBody>, JsonRejection>,
) -> Result<Json<IndexingResponse>, AppError> {
    let body = extract_json(body)?;
    let request = with_header(
        IndexingRequest::cid(body.index, body.content_id),
        body.id,
        body.content_type,
        body.index_fields,
    );
    Ok(Json(state.service.index(request).await?))
}

async fn store_and_index_text(
    State(state): State<AppState>,
    body: Result<Json<TextIndexingBody>, JsonRejection>,
) -> Result<Json<IndexingResponse>, AppError> {
    let body = extract_json(body)?;
    let request = with_header(
        IndexingRequest::text(body.index, body.content),
        body.id,
        body.content_type,
        body.index_fields,
    );
    Ok(Json(state.service.index(request).await?))
}

async fn store_and_index_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IndexingResponse>, AppError> {
    let mut metadata: Option<StoreIndexingBody> = None;
    let mut file: Option<(Vec<u8>, Option<String>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("request") => {
                let raw = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                let parsed = serde_json::from_slice(&raw)
                    .map_err(|e| AppError::BadRequest(format!("invalid request part: {e}")))?;
                metadata = Some(parsed);
            }
            Some("file") => {
                // A generic part type says nothing; let the service sniff instead.
                let part_type = field
                    .content_type()
                    .filter(|ct| *ct != "application/octet-stream")
                    .map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                file = Some((bytes.to_vec(), part_type));
            }
            other => tracing::debug!(part = ?other, "ignoring multipart part"),
        }
    }

    let metadata =
        metadata.ok_or_else(|| AppError::Validation("multipart part 'request' is required".into()))?;
    let (content, part_type) =
        file.ok_or_else(|| AppError::Validation("multipart part 'file' is required".into()))?;

    tracing::debug!(index = %metadata.index, bytes = content.len(), "store and index upload");
    let request = with_header(
        IndexingRequest::bytes(metadata.index, content),
        metadata.id,
        metadata.content_type.or(part_type),
        metadata.index_fields,
    );
    Ok(Json(state.service.index(request).await?))
}
