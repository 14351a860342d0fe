//! Elasticsearch client error types.

use mahuta_core::MahutaError;

/// Errors from Elasticsearch REST calls.
#[derive(Debug, thiserror::Error)]
pub enum ElasticError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Elasticsearch returned a non-2xx status.
    #[error("Elasticsearch {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

impl ElasticError {
    pub(crate) async fn from_response(endpoint: impl Into<String>, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Self::Api {
            endpoint: endpoint.into(),
            status,
            body,
        }
    }

    pub(crate) fn http(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Http {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub(crate) fn deserialization(endpoint: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Deserialization {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status of an API error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the target index does not exist.
    pub fn is_index_not_found(&self) -> bool {
        matches!(self, Self::Api { status: 404, body, .. } if body.contains("index_not_found_exception"))
    }

    /// `true` when an index creation raced with another one.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::Api { status: 400, body, .. } if body.contains("resource_already_exists_exception"))
    }
}

impl From<ElasticError> for MahutaError {
    fn from(err: ElasticError) -> Self {
        match &err {
            ElasticError::Http { endpoint, source } if source.is_timeout() => {
                MahutaError::Timeout(format!("{endpoint} timed out"))
            }
            ElasticError::Http { endpoint, source } if source.is_connect() => {
                MahutaError::connection(endpoint.clone(), source)
            }
            ElasticError::Api { status: 404, .. } => MahutaError::NotFound(err.to_string()),
            ElasticError::Http { endpoint, .. }
            | ElasticError::Api { endpoint, .. }
            | ElasticError::Deserialization { endpoint, .. } => {
                MahutaError::technical(format!("error calling Elasticsearch {endpoint}"), &err)
            }
            ElasticError::Config(_) => MahutaError::technical("Elasticsearch configuration error", &err),
        }
    }
}
