//! Elasticsearch connection configuration.

use std::time::Duration;

use url::Url;

#[derive(Debug, Clone)]
pub struct ElasticConfig {
    /// Base URL of the cluster, e.g. `http://localhost:9200`.
    pub url: Url,
    /// Expected cluster name. A mismatch is logged, not rejected.
    pub cluster_name: String,
    /// Replace null and empty-string field values with `"null"` before writing.
    pub index_null_value: bool,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ElasticConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `ELASTICSEARCH_URL` (default: `http://localhost:9200`)
    /// - `ELASTICSEARCH_CLUSTER_NAME` (default: `docker-cluster`)
    /// - `ELASTICSEARCH_INDEX_NULL_VALUE` (default: `false`)
    /// - `ELASTICSEARCH_TIMEOUT_MS` (default: 10000)
    pub fn from_env() -> Result<Self, ConfigError> {
        let raw_url = env_or("ELASTICSEARCH_URL", "http://localhost:9200");
        let url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidUrl("ELASTICSEARCH_URL".into(), e.to_string()))?;

        let raw_null = env_or("ELASTICSEARCH_INDEX_NULL_VALUE", "false");
        let index_null_value = raw_null.parse::<bool>().map_err(|_| {
            ConfigError::InvalidValue("ELASTICSEARCH_INDEX_NULL_VALUE".into(), raw_null.clone())
        })?;

        let raw_timeout = env_or("ELASTICSEARCH_TIMEOUT_MS", "10000");
        let timeout_ms = raw_timeout.parse::<u64>().map_err(|_| {
            ConfigError::InvalidValue("ELASTICSEARCH_TIMEOUT_MS".into(), raw_timeout.clone())
        })?;

        Ok(Self {
            url,
            cluster_name: env_or("ELASTICSEARCH_CLUSTER_NAME", "docker-cluster"),
            index_null_value,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    /// Configuration pointing to a local mock cluster (for testing).
    pub fn local_mock(port: u16) -> Result<Self, ConfigError> {
        Ok(Self {
            url: Url::parse(&format!("http://127.0.0.1:{port}"))
                .map_err(|e| ConfigError::InvalidUrl("localhost".into(), e.to_string()))?,
            cluster_name: "docker-cluster".into(),
            index_null_value: false,
            timeout: Duration::from_secs(2),
        })
    }
}

fn env_or(var: &str, default: &str) -> String {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_mock_builds_valid_config() {
        let cfg = ElasticConfig::local_mock(9201).unwrap();
        assert_eq!(cfg.url.as_str(), "http://127.0.0.1:9201/");
        assert_eq!(cfg.cluster_name, "docker-cluster");
        assert!(!cfg.index_null_value);
    }

    #[test]
    fn env_or_ignores_blank_values() {
        std::env::set_var("TEST_ES_BLANK_VAR", "  ");
        let value = env_or("TEST_ES_BLANK_VAR", "fallback");
        std::env::remove_var("TEST_ES_BLANK_VAR");
        assert_eq!(value, "fallback");
    }
}
