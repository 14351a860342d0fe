//! Typed client for the IPFS HTTP RPC API.
//!
//! Every RPC call is a `POST` under `/api/v0`.
//!
//! | Path | Operation |
//! |------|-----------|
//! | `add?stream-channels=true&pin=<bool>` | add a file (multipart part `file`) |
//! | `cat?arg=<cid>` | read content |
//! | `pin/add?arg=<cid>` | pin recursively |
//! | `pin/rm?arg=<cid>` | unpin |
//! | `pin/ls?type=recursive` | list recursive pins |
//! | `version` | reachability check |

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::config::address_of;
use crate::error::IpfsError;
use crate::retry::retry_send;

const API_PREFIX: &str = "api/v0";

/// Response of `add`.
#[derive(Debug, Clone, Deserialize)]
pub struct AddResponse {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Hash")]
    pub hash: String,
    #[serde(rename = "Size", default)]
    pub size: String,
}

/// Response of `version`.
#[derive(Debug, Clone, Deserialize)]
pub struct VersionInfo {
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Commit", default)]
    pub commit: String,
}

#[derive(Debug, Deserialize)]
struct PinLsResponse {
    #[serde(rename = "Keys", default)]
    keys: BTreeMap<String, serde_json::Value>,
}

/// Client for one IPFS node.
#[derive(Debug, Clone)]
pub struct IpfsClient {
    http: reqwest::Client,
    base_url: Url,
    address: String,
}

impl IpfsClient {
    /// Build a client; `timeout` bounds every HTTP call.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, IpfsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IpfsError::http("client_init", e))?;
        Ok(Self {
            address: address_of(&base_url),
            http,
            base_url,
        })
    }

    /// `host:port` of the node.
    pub fn address(&self) -> &str {
        &self.address
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}/{}", self.base_url, API_PREFIX, path)
    }

    async fn post(&self, path: &str, query: &[(&str, &str)]) -> Result<reqwest::Response, IpfsError> {
        let endpoint = format!("POST /{API_PREFIX}/{path}");
        let url = self.url(path);
        let resp = retry_send(&endpoint, || self.http.post(&url).query(query).send())
            .await
            .map_err(|e| IpfsError::http(endpoint.clone(), e))?;
        if !resp.status().is_success() {
            return Err(IpfsError::from_response(endpoint, resp).await);
        }
        Ok(resp)
    }

    /// Calls `POST /api/v0/version`.
    pub async fn version(&self) -> Result<VersionInfo, IpfsError> {
        let resp = self.post("version", &[]).await?;
        resp.json()
            .await
            .map_err(|e| IpfsError::deserialization("POST /api/v0/version", e))
    }

    /// Calls `POST /api/v0/add` with the content as multipart part `file`.
    pub async fn add(&self, content: Vec<u8>, pin: bool) -> Result<AddResponse, IpfsError> {
        let endpoint = "POST /api/v0/add";
        let url = self.url("add");
        let pin = if pin { "true" } else { "false" };
        let resp = retry_send(endpoint, || {
            let part = reqwest::multipart::Part::bytes(content.clone()).file_name("file");
            let form = reqwest::multipart::Form::new().part("file", part);
            self.http
                .post(&url)
                .query(&[("stream-channels", "true"), ("pin", pin)])
                .multipart(form)
                .send()
        })
        .await
        .map_err(|e| IpfsError::http(endpoint, e))?;
        if !resp.status().is_success() {
            return Err(IpfsError::from_response(endpoint, resp).await);
        }

        // With stream-channels the node may emit one JSON object per line;
        // the last one describes the added root.
        let body = resp
            .text()
            .await
            .map_err(|e| IpfsError::deserialization(endpoint, e))?;
        let last = body
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .ok_or_else(|| IpfsError::deserialization(endpoint, "empty add response"))?;
        serde_json::from_str(last).map_err(|e| IpfsError::deserialization(endpoint, e))
    }

    /// Calls `POST /api/v0/cat?arg=<cid>`.
    pub async fn cat(&self, content_id: &str) -> Result<Vec<u8>, IpfsError> {
        let resp = self.post("cat", &[("arg", content_id)]).await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| IpfsError::http("POST /api/v0/cat", e))?;
        Ok(bytes.to_vec())
    }

    /// Calls `POST /api/v0/pin/add?arg=<cid>`.
    pub async fn pin_add(&self, content_id: &str) -> Result<(), IpfsError> {
        self.post("pin/add", &[("arg", content_id)]).await?;
        Ok(())
    }

    /// Calls `POST /api/v0/pin/rm?arg=<cid>`. Unpinning content that is not
    /// pinned succeeds.
    pub async fn pin_rm(&self, content_id: &str) -> Result<(), IpfsError> {
        match self.post("pin/rm", &[("arg", content_id)]).await {
            Err(err) if err.is_not_pinned() => {
                tracing::debug!(node = %self.address, content_id, "content was not pinned");
                Ok(())
            }
            other => other.map(|_| ()),
        }
    }

    /// Calls `POST /api/v0/pin/ls?type=recursive`.
    pub async fn pin_ls(&self) -> Result<Vec<String>, IpfsError> {
        let resp = self.post("pin/ls", &[("type", "recursive")]).await?;
        let pins: PinLsResponse = resp
            .json()
            .await
            .map_err(|e| IpfsError::deserialization("POST /api/v0/pin/ls", e))?;
        Ok(pins.keys.into_keys().collect())
    }
}
