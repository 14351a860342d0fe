//! IPFS, cluster and Pinata client error types.

use mahuta_core::MahutaError;
use serde::Deserialize;

/// Errors from IPFS RPC, IPFS cluster and Pinata calls.
#[derive(Debug, thiserror::Error)]
pub enum IpfsError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The remote API returned a non-2xx status.
    #[error("{endpoint} returned {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {reason}")]
    Deserialization { endpoint: String, reason: String },
    /// Reading the content stream failed before upload.
    #[error("failed to read content for {endpoint}: {source}")]
    Io {
        endpoint: String,
        source: std::io::Error,
    },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}

/// Error payload of the IPFS RPC API.
#[derive(Debug, Deserialize)]
struct RpcError {
    #[serde(rename = "Message", alias = "message")]
    message: String,
}

impl IpfsError {
    /// Build an [`IpfsError::Api`] from a failed response, extracting the
    /// RPC `Message` field when the body carries one.
    pub(crate) async fn from_response(endpoint: impl Into<String>, resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<RpcError>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        Self::Api {
            endpoint: endpoint.into(),
            status,
            message,
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

    /// Remote message, lower-cased, for API errors.
    fn api_message(&self) -> Option<String> {
        match self {
            Self::Api { message, .. } => Some(message.to_lowercase()),
            _ => None,
        }
    }

    /// `true` when the remote side reports the content or pin as unknown.
    pub fn is_not_found(&self) -> bool {
        if let Self::Api { status: 404, .. } = self {
            return true;
        }
        self.api_message()
            .is_some_and(|m| m.contains("not found") || m.contains("no link named"))
    }

    /// `true` when an unpin failed only because the content was not pinned.
    pub fn is_not_pinned(&self) -> bool {
        self.api_message().is_some_and(|m| m.contains("not pinned"))
    }
}

impl From<IpfsError> for MahutaError {
    fn from(err: IpfsError) -> Self {
        match &err {
            IpfsError::Http { endpoint, source } if source.is_timeout() => {
                MahutaError::Timeout(format!("{endpoint} timed out"))
            }
            IpfsError::Http { endpoint, source } if source.is_connect() => {
                MahutaError::connection(endpoint.clone(), source)
            }
            _ if err.is_not_found() => MahutaError::NotFound(err.to_string()),
            IpfsError::Http { endpoint, .. }
            | IpfsError::Api { endpoint, .. }
            | IpfsError::Deserialization { endpoint, .. }
            | IpfsError::Io { endpoint, .. } => {
                MahutaError::technical(format!("error calling {endpoint}"), &err)
            }
            IpfsError::Config(_) => MahutaError::technical("IPFS configuration error", &err),
        }
    }
}
