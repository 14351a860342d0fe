//! # Query Routes
//!
//! - `GET  /query/fetch/:hash?index=`: raw content by content id
//! - `POST /query/search?index=&page=&size=&sort=&dir=`: paged search, body = Query JSON

use axum::body::Bytes;
use axum::extract::{Path, Query as QueryParams, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderValue;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use mahuta_core::page::DEFAULT_PAGE_SIZE;
use mahuta_core::{GetRequest, PageRequest, Query, SearchRequest, SearchResponse, SortDirection};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::optional_json;
use crate::state::AppState;

const OCTET_STREAM: &str = "application/octet-stream";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/query/fetch/:hash", get(fetch))
        .route("/query/search", post(search))
}

#[derive(Debug, Deserialize)]
pub struct FetchParams {
    pub index: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub index: Option<String>,
    pub page: Option<usize>,
    pub size: Option<usize>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl SearchParams {
    fn page_request(&self) -> Result<PageRequest, AppError> {
        let page = self.page.unwrap_or(0);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        let request = match self.sort.as_deref().filter(|s| !s.is_empty()) {
            Some(sort) => {
                let direction = match self.dir.as_deref() {
                    Some(dir) => dir.parse::<SortDirection>()?,
                    None => SortDirection::Asc,
                };
                PageRequest::sorted(page, size, sort, direction)?
            }
            None => PageRequest::of(page, size)?,
        };
        Ok(request)
    }
}

/// Content bytes with the content type recorded in the index.
async fn fetch(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    QueryParams(params): QueryParams<FetchParams>,
) -> Result<Response, AppError> {
    let mut request = GetRequest::by_content_id(hash).load_file(true);
    if let Some(index) = params.index {
        request = request.in_index(index);
    }
    let response = state.service.get(request).await?;

    let content_type = response
        .metadata
        .content_type
        .as_deref()
        .and_then(|ct| HeaderValue::from_str(ct).ok())
        .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM));
    let payload = response.payload.unwrap_or_default();
    Ok(([(CONTENT_TYPE, content_type)], payload).into_response())
}

/// Paged search. An empty body is the empty query, matching everything.
async fn search(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<SearchParams>,
    body: Bytes,
) -> Result<Json<SearchResponse>, AppError> {
    let query: Query = optional_json(&body)?.unwrap_or_default();
    let request = SearchRequest {
        index_name: params.index.clone(),
        query,
        page_request: Some(params.page_request()?),
        load_file: false,
    };
    Ok(Json(state.service.search(request).await?))
}
