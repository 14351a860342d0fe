//! # mahuta-api — HTTP Surface of the Mahuta Gateway
//!
//! Thin axum controllers over [`mahuta_core::MahutaService`]. Handlers parse
//! the request, delegate to the service and map errors through [`AppError`].
//!
//! ## API Surface
//!
//! | Route | Module | Operation |
//! |-------|--------|-----------|
//! | `POST /config/index/:index` | [`routes::index_config`] | create index |
//! | `GET  /config/index` | [`routes::index_config`] | list indices |
//! | `POST /raw/index`, `/json/index` | [`routes::store`] | index a content id |
//! | `POST /raw/store_index` | [`routes::store`] | store (multipart) and index |
//! | `POST /json/store_index` | [`routes::store`] | store (inline string) and index |
//! | `GET  /query/fetch/:hash` | [`routes::query`] | fetch raw content |
//! | `POST /query/search` | [`routes::query`] | paged search |
//! | `DELETE /delete/id/:id` | [`routes::delete`] | deindex by document id |
//! | `DELETE /delete/hash/:hash` | [`routes::delete`] | deindex by content id |
//! | `GET  /health/*` | this module | liveness and readiness probes |
//!
//! ## Middleware Stack
//!
//! ```text
//! CorsLayer → TraceLayer → DefaultBodyLimit → Handler
//! ```

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::AppState;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsOrigins;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::index_config::router())
        .merge(routes::store::router())
        .merge(routes::query::router())
        .merge(routes::delete::router())
        .layer(DefaultBodyLimit::max(state.config.max_upload_bytes));

    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

fn cors_layer(origins: &CorsOrigins) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.allows_any() {
        return layer.allow_origin(Any);
    }
    let allowed: Vec<HeaderValue> = origins
        .0
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Liveness probe: always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 "ready" when the storage backend answers, else 503
/// with the probe message.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.service.storage().check().await;
    if health.healthy {
        return (StatusCode::OK, "ready".to_string()).into_response();
    }
    let message = health
        .message
        .unwrap_or_else(|| "storage unavailable".to_string());
    tracing::warn!(
        cause = health.cause.as_deref().unwrap_or("unknown"),
        "readiness check failed: {message}"
    );
    (StatusCode::SERVICE_UNAVAILABLE, message).into_response()
}
