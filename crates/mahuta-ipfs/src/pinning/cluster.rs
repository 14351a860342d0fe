//! Pinning through the IPFS cluster REST API.
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/id` | peer identity, used as a reachability check |
//! | POST   | `/pins/{cid}` | pin across the cluster |
//! | DELETE | `/pins/{cid}` | unpin |
//! | GET    | `/pins` | list tracked pins |

use std::time::Duration;

use async_trait::async_trait;
use mahuta_core::{MahutaError, MahutaResult, PinningStrategy};
use serde::Deserialize;
use url::Url;

use crate::config::address_of;
use crate::error::IpfsError;
use crate::retry::retry_send;

/// Cluster responses encode a CID either as a plain string or as an IPLD
/// link `{"/": cid}` depending on the cluster version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClusterCid {
    Plain(String),
    Link {
        #[serde(rename = "/")]
        cid: String,
    },
}

impl ClusterCid {
    fn into_string(self) -> String {
        match self {
            Self::Plain(cid) | Self::Link { cid } => cid,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PinInfo {
    cid: ClusterCid,
}

#[derive(Debug, Clone)]
pub struct IpfsClusterPinning {
    http: reqwest::Client,
    base_url: Url,
    name: String,
}

impl IpfsClusterPinning {
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self, IpfsError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IpfsError::http("client_init", e))?;
        Ok(Self {
            name: format!("ipfs cluster [{}]", address_of(&base_url)),
            http,
            base_url,
        })
    }

    /// Build the strategy and check the peer answers `GET /id`.
    pub async fn connect(base_url: Url, timeout: Duration) -> MahutaResult<Self> {
        let pinning = Self::new(base_url, timeout)?;
        pinning
            .send(reqwest::Method::GET, "id")
            .await
            .map_err(|e| MahutaError::connection(pinning.name.clone(), e))?;
        tracing::info!(strategy = %pinning.name, "connected to IPFS cluster");
        Ok(pinning)
    }

    async fn send(&self, method: reqwest::Method, path: &str) -> Result<reqwest::Response, IpfsError> {
        let endpoint = format!("{method} /{path}");
        let url = format!("{}{}", self.base_url, path);
        let resp = retry_send(&endpoint, || self.http.request(method.clone(), &url).send())
            .await
            .map_err(|e| IpfsError::http(endpoint.clone(), e))?;
        if !resp.status().is_success() {
            return Err(IpfsError::from_response(endpoint, resp).await);
        }
        Ok(resp)
    }
}

#[async_trait]
impl PinningStrategy for IpfsClusterPinning {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        self.send(reqwest::Method::POST, &format!("pins/{content_id}"))
            .await?;
        tracing::debug!(strategy = %self.name, content_id, "pinned");
        Ok(())
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        match self
            .send(reqwest::Method::DELETE, &format!("pins/{content_id}"))
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_not_found() || err.is_not_pinned() => {
                tracing::debug!(strategy = %self.name, content_id, "content was not pinned");
            }
            Err(err) => return Err(err.into()),
        }
        tracing::debug!(strategy = %self.name, content_id, "unpinned");
        Ok(())
    }

    async fn list_tracked(&self) -> MahutaResult<Vec<String>> {
        let endpoint = "GET /pins";
        let body = self
            .send(reqwest::Method::GET, "pins")
            .await?
            .text()
            .await
            .map_err(|e| IpfsError::deserialization(endpoint, e))?;
        Ok(parse_pins(&body).map_err(|e| IpfsError::deserialization(endpoint, e))?)
    }
}

/// Older clusters answer with a JSON array, newer ones stream one object
/// per line.
fn parse_pins(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let trimmed = body.trim_start();
    let infos: Vec<PinInfo> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<Result<_, _>>()?
    };
    Ok(infos.into_iter().map(|p| p.cid.into_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_with_both_cid_encodings() {
        let body = r#"[{"cid":"QmA","peer_map":{}},{"cid":{"/":"QmB"}}]"#;
        assert_eq!(parse_pins(body).unwrap(), vec!["QmA", "QmB"]);
    }

    #[test]
    fn parses_line_delimited_stream() {
        let body = "{\"cid\":\"QmA\"}\n{\"cid\":\"QmB\"}\n";
        assert_eq!(parse_pins(body).unwrap(), vec!["QmA", "QmB"]);
    }

    #[test]
    fn empty_body_is_no_pins() {
        assert!(parse_pins("").unwrap().is_empty());
    }
}
