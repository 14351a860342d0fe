use std::time::Duration;

use async_trait::async_trait;
use mahuta_core::{MahutaError, MahutaResult, PinningStrategy};
use url::Url;

use crate::client::IpfsClient;

/// Pins through an IPFS node's own `pin/*` RPC calls.
#[derive(Debug, Clone)]
pub struct IpfsNativePinning {
    client: IpfsClient,
    name: String,
}

impl IpfsNativePinning {
    pub fn new(client: IpfsClient) -> Self {
        let name = format!("ipfs node [{}]", client.address());
        Self { client, name }
    }

    /// Connect to a replica node, failing when it does not answer `version`.
    pub async fn connect(endpoint: Url, timeout: Duration) -> MahutaResult<Self> {
        let client = IpfsClient::new(endpoint, timeout)?;
        let pinning = Self::new(client);
        let version = pinning
            .client
            .version()
            .await
            .map_err(|e| MahutaError::connection(pinning.name.clone(), e))?;
        tracing::info!(strategy = %pinning.name, version = %version.version, "connected to IPFS replica");
        Ok(pinning)
    }
}

#[async_trait]
impl PinningStrategy for IpfsNativePinning {
    fn name(&self) -> &str {
        &self.name
    }

    async fn pin(&self, content_id: &str) -> MahutaResult<()> {
        self.client.pin_add(content_id).await?;
        tracing::debug!(strategy = %self.name, content_id, "pinned");
        Ok(())
    }

    async fn unpin(&self, content_id: &str) -> MahutaResult<()> {
        self.client.pin_rm(content_id).await?;
        tracing::debug!(strategy = %self.name, content_id, "unpinned");
        Ok(())
    }

    async fn list_tracked(&self) -> MahutaResult<Vec<String>> {
        Ok(self.client.pin_ls().await?)
    }
}
