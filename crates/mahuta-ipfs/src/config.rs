//! IPFS backend configuration.
//!
//! The primary node is addressed either by host and port or by a
//! multiaddress. Replica lists are comma separated `host:port` pairs.

use std::time::Duration;

use url::Url;
use zeroize::Zeroizing;

/// Default IPFS RPC port.
pub const DEFAULT_IPFS_PORT: u16 = 5001;
/// Default IPFS cluster REST API port.
pub const DEFAULT_CLUSTER_PORT: u16 = 9094;
/// Default Pinata API endpoint.
pub const DEFAULT_PINATA_URL: &str = "https://api.pinata.cloud";

/// Configuration for the IPFS storage backend and its replicas.
#[derive(Debug, Clone)]
pub struct IpfsConfig {
    /// RPC endpoint of the primary node.
    pub endpoint: Url,
    /// Deadline for reads and writes on the primary node.
    pub timeout: Duration,
    /// Number of concurrent backend calls.
    pub pool_size: usize,
    /// Extra IPFS nodes pinned through their own RPC API.
    pub replicas: Vec<Url>,
    /// IPFS cluster REST endpoints.
    pub cluster_replicas: Vec<Url>,
    /// Pinata credentials, when the Pinata replica is enabled.
    pub pinata: Option<PinataConfig>,
}

impl IpfsConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `IPFS_HOST` (default: `localhost`), `IPFS_PORT` (default: 5001)
    /// - `IPFS_MULTIADDRESS` (overrides host and port)
    /// - `IPFS_TIMEOUT_MS` (default: 10000)
    /// - `IPFS_THREAD_POOL` (default: 10)
    /// - `IPFS_REPLICAS`, `IPFS_CLUSTER_REPLICAS`
    /// - `PINATA_API_KEY`, `PINATA_SECRET_API_KEY`, `PINATA_URL`
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = match non_empty_var("IPFS_MULTIADDRESS") {
            Some(multiaddress) => parse_multiaddress(&multiaddress)?,
            None => {
                let host = non_empty_var("IPFS_HOST").unwrap_or_else(|| "localhost".to_string());
                let port = env_number("IPFS_PORT", DEFAULT_IPFS_PORT)?;
                host_url(&host, port)?
            }
        };

        Ok(Self {
            endpoint,
            timeout: Duration::from_millis(env_number("IPFS_TIMEOUT_MS", 10_000)?),
            pool_size: env_number("IPFS_THREAD_POOL", mahuta_core::pool::DEFAULT_POOL_SIZE)?,
            replicas: parse_host_list(
                &non_empty_var("IPFS_REPLICAS").unwrap_or_default(),
                DEFAULT_IPFS_PORT,
            )?,
            cluster_replicas: parse_host_list(
                &non_empty_var("IPFS_CLUSTER_REPLICAS").unwrap_or_default(),
                DEFAULT_CLUSTER_PORT,
            )?,
            pinata: PinataConfig::from_env()?,
        })
    }

    /// Configuration pointing to a local mock node, with no replicas.
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: host_url("127.0.0.1", port)?,
            timeout: Duration::from_secs(2),
            pool_size: 4,
            replicas: Vec::new(),
            cluster_replicas: Vec::new(),
            pinata: None,
        })
    }
}

/// Pinata API credentials.
///
/// Custom `Debug` obfuscates the secret.
#[derive(Clone)]
pub struct PinataConfig {
    pub url: Url,
    pub api_key: String,
    pub secret_api_key: Zeroizing<String>,
}

impl std::fmt::Debug for PinataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinataConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key)
            .field("secret_api_key", &obfuscate(&self.secret_api_key))
            .finish()
    }
}

impl PinataConfig {
    /// `None` unless both `PINATA_API_KEY` and `PINATA_SECRET_API_KEY` are set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let (Some(api_key), Some(secret)) = (
            non_empty_var("PINATA_API_KEY"),
            non_empty_var("PINATA_SECRET_API_KEY"),
        ) else {
            return Ok(None);
        };
        Ok(Some(Self {
            url: env_url("PINATA_URL", DEFAULT_PINATA_URL)?,
            api_key,
            secret_api_key: Zeroizing::new(secret),
        }))
    }
}

/// Keep the first five characters of a secret.
pub fn obfuscate(secret: &str) -> String {
    let head: String = secret.chars().take(5).collect();
    format!("{head}***********")
}

/// Turn a multiaddress such as `/ip4/127.0.0.1/tcp/5001` or
/// `/dns4/ipfs.example.com/tcp/443/https` into an HTTP(S) URL.
pub fn parse_multiaddress(multiaddress: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: &str| {
        ConfigError::InvalidMultiaddress(multiaddress.to_string(), reason.to_string())
    };
    let parts: Vec<&str> = multiaddress
        .trim()
        .split('/')
        .filter(|p| !p.is_empty())
        .collect();

    let mut host = None;
    let mut port = None;
    let mut scheme = "http";
    let mut i = 0;
    while i < parts.len() {
        match parts[i] {
            "ip4" | "dns" | "dns4" | "dns6" => {
                host = parts.get(i + 1).map(|h| h.to_string());
                i += 2;
            }
            "ip6" => {
                host = parts.get(i + 1).map(|h| format!("[{h}]"));
                i += 2;
            }
            "tcp" => {
                let raw = parts.get(i + 1).ok_or_else(|| invalid("missing tcp port"))?;
                port = Some(raw.parse::<u16>().map_err(|_| invalid("invalid tcp port"))?);
                i += 2;
            }
            "https" | "tls" => {
                scheme = "https";
                i += 1;
            }
            "http" => i += 1,
            other => return Err(invalid(&format!("unsupported protocol '{other}'"))),
        }
    }

    let host = host.ok_or_else(|| invalid("missing host"))?;
    let port = port.ok_or_else(|| invalid("missing tcp port"))?;
    Url::parse(&format!("{scheme}://{host}:{port}"))
        .map_err(|e| ConfigError::InvalidUrl(multiaddress.to_string(), e.to_string()))
}

/// Parse a comma separated list of `host:port` (or full URLs). Entries
/// without a port get `default_port`.
pub fn parse_host_list(raw: &str, default_port: u16) -> Result<Vec<Url>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            if entry.contains("://") {
                return Url::parse(entry)
                    .map_err(|e| ConfigError::InvalidUrl(entry.to_string(), e.to_string()));
            }
            match entry.rsplit_once(':') {
                Some((host, port)) => {
                    let port = port.parse::<u16>().map_err(|_| {
                        ConfigError::InvalidNumber(entry.to_string(), port.to_string())
                    })?;
                    host_url(host, port)
                }
                None => host_url(entry, default_port),
            }
        })
        .collect()
}

/// `host:port` label of a URL, as used in backend names.
pub fn address_of(url: &Url) -> String {
    let host = url.host_str().unwrap_or("unknown");
    match url.port_or_known_default() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn host_url(host: &str, port: u16) -> Result<Url, ConfigError> {
    Url::parse(&format!("http://{host}:{port}"))
        .map_err(|e| ConfigError::InvalidUrl(format!("{host}:{port}"), e.to_string()))
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = non_empty_var(var).unwrap_or_else(|| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

fn env_number<T: std::str::FromStr>(var: &str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(var) {
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        None => Ok(default),
    }
}

fn non_empty_var(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid multiaddress {0}: {1}")]
    InvalidMultiaddress(String, String),
    #[error("invalid number for {0}: {1}")]
    InvalidNumber(String, String),
    #[error("invalid header value for {0}")]
    InvalidHeader(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = IpfsConfig::local_mock(5002).unwrap();
        assert_eq!(cfg.endpoint.as_str(), "http://127.0.0.1:5002/");
        assert!(cfg.replicas.is_empty());
        assert!(cfg.pinata.is_none());
    }

    #[test]
    fn multiaddress_ip4() {
        let url = parse_multiaddress("/ip4/127.0.0.1/tcp/5001").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:5001/");
    }

    #[test]
    fn multiaddress_dns_with_https() {
        let url = parse_multiaddress("/dns4/ipfs.infura.io/tcp/5001/https").unwrap();
        assert_eq!(url.as_str(), "https://ipfs.infura.io:5001/");
    }

    #[test]
    fn multiaddress_ip6() {
        let url = parse_multiaddress("/ip6/::1/tcp/5001").unwrap();
        assert_eq!(url.host_str(), Some("[::1]"));
        assert_eq!(url.port(), Some(5001));
    }

    #[test]
    fn multiaddress_without_port_is_rejected() {
        assert!(matches!(
            parse_multiaddress("/ip4/127.0.0.1"),
            Err(ConfigError::InvalidMultiaddress(..))
        ));
        assert!(parse_multiaddress("/ip4/127.0.0.1/udp/4001").is_err());
    }

    #[test]
    fn host_list_applies_default_port() {
        let urls = parse_host_list("node-a:5005, node-b ,,", DEFAULT_CLUSTER_PORT).unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].as_str(), "http://node-a:5005/");
        assert_eq!(urls[1].as_str(), "http://node-b:9094/");
    }

    #[test]
    fn host_list_accepts_full_urls() {
        let urls = parse_host_list("https://cluster.example.com", DEFAULT_CLUSTER_PORT).unwrap();
        assert_eq!(address_of(&urls[0]), "cluster.example.com:443");
    }

    #[test]
    fn host_list_rejects_bad_port() {
        assert!(parse_host_list("node:abc", DEFAULT_IPFS_PORT).is_err());
    }

    #[test]
    fn pinata_debug_hides_secret() {
        let cfg = PinataConfig {
            url: Url::parse(DEFAULT_PINATA_URL).unwrap(),
            api_key: "key".into(),
            secret_api_key: Zeroizing::new("supersecretvalue".into()),
        };
        let debug = format!("{cfg:?}");
        assert!(debug.contains("super***********"));
        assert!(!debug.contains("supersecretvalue"));
    }

    #[test]
    fn env_number_rejects_garbage() {
        std::env::set_var("TEST_IPFS_BAD_NUMBER", "ten");
        let result = env_number::<u64>("TEST_IPFS_BAD_NUMBER", 1);
        std::env::remove_var("TEST_IPFS_BAD_NUMBER");
        assert!(result.is_err());
    }
}
