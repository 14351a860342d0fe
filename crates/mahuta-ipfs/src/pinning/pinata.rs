//! Pinning through the Pinata API.
//!
//! Authenticates with the `pinata_api_key` / `pinata_secret_api_key`
//! headers. The secret lives only in the client's default headers and in
//! the zeroized configuration.

use std::time::Duration;

use async_trait::async_trait;
use mahuta_core::{MahutaError, MahutaResult, PinningStrategy};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{ConfigError, PinataConfig};
use crate::error::IpfsError;
use crate::retry::retry_send;

const NAME: &str = "pinata";
const PIN_LIST_LIMIT: &str = "1000";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PinByHashRequest<'a> {
    hash_to_pin: &'a str,
    #[serde(rename = "host_nodes", skip_serializing_if = "<[String]>::is_empty")]
    host_nodes: &'a [String],
    pinata_metadata: PinMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct PinMetadata<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct RemovePinRequest<'a> {
    ipfs_pin_hash: &'a str,
}

#[derive(Debug, Deserialize)]
struct PinList {
    #[serde(default)]
    rows: Vec<PinRow>,
}

#[derive(Debug, Deserialize)]
struct PinRow {
    ipfs_pin_hash: String,
}

#[derive(Debug, Clone)]
pub struct PinataPinning {
    http: reqwest::Client,
    base_url: Url,
    host_nodes: Vec<String>,
}

impl PinataPinning {
    pub fn new(config: &PinataConfig, timeout: Duration) -> Result<Self, IpfsError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "pinata_api_key",
            HeaderValue::from_str(&config.api_key)
                .map_err(|_| ConfigError::InvalidHeader("PINATA_API_KEY".into()))?,
        );
        let mut secret = HeaderValue::from_str(config.secret_api_key.as_str())
            .map_err(|_| ConfigError::InvalidHeader("PINATA_SECRET_API_KEY".into()))?;
        secret.set_sensitive(true);
        headers.insert("pinata_secret_api_key", secret);

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| IpfsError::http("client_init", e))?;
        Ok(Self {
            http,
            base_url: config.url.clone(),
            host_nodes: Vec::new(),
        })
    }

    /// Multiaddresses Pinata should fetch the content from.
    pub fn with_host_nodes(mut self, host_nodes: Vec<String>) -> Self {
        self.host_nodes = host_nodes;
        self
    }

    /// Build the strategy and verify the credentials.
    pub async fn connect(config: &PinataConfig, timeout: Duration) -> MahutaResult<Self> {
        let pinning = Self::new(config, timeout)?;
        pinning
            .get("data/testAuthentication", &[])
            .await
            .map_err(|e| MahutaError::connection(NAME, e))?;
        tracing::info!(strategy = NAME, api_key = %config.api_key, "connected to Pinata");
        Ok(pinning)
    }

    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, IpfsError> {
        let endpoint = format!("GET /{path}");
        let url = format!("{}{}", self.base_url, path);
        let resp = retry_send(&endpoint, || self.http.get(&url).query(query).send())
            .await
            .map_err(|e| IpfsError::http(endpoint.clone(), e))?;
        if !resp.status().is_success() {
            return Err(IpfsError::from_response(endpoint, resp).await);
        }
        Ok(resp)
    }

    async fn post<B: Serialize>(&self, path: &str, body: &B) -> Result<reqwest::Response, IpfsError> {
        let endpoint = format!("POST /{path}");
        let url = format!("{}{}", self.base_url, path);
        let resp = retry_send(&endpoint, || self.http.post(&url).json(body).send())
            .await
            .map_err(|e| IpfsError::http(endpoint.clone(), e))?;
        if !resp.status().is_success() {
            return Err(IpfsError::from_response(endpoint, resp).await);
        }
        Ok(resp)
    }
}

#[async_trait]
impl PinningStrategy for PinataPinning {
    fn name(&self) -> &str {
        NAME
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        let body = PinByHashRequest {
            hash_to_pin: content_id,
            host_nodes: &self.host_nodes,
            pinata_metadata: PinMetadata { name: content_id },
        };
        self.post("pinning/pinHashToIPFS", &body).await?;
        tracing::debug!(strategy = NAME, content_id, "pinned");
        Ok(())
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        let body = RemovePinRequest {
            ipfs_pin_hash: content_id,
        };
        self.post("pinning/removePinFromIPFS", &body).await?;
        tracing::debug!(strategy = NAME, content_id, "unpinned");
        Ok(())
    }

    async fn list_tracked(&self) -> MahutaResult<Vec<String>> {
        let list: PinList = self
            .get(
                "data/pinList",
                &[("status", "pinned"), ("pageLimit", PIN_LIST_LIMIT)],
            )
            .await?
            .json()
            .await
            .map_err(|e| IpfsError::deserialization("GET /data/pinList", e))?;
        Ok(list.rows.into_iter().map(|r| r.ipfs_pin_hash).collect())
    }
}
