//! # Application Configuration
//!
//! Process-level settings for the HTTP gateway, read from the environment.
//! Backend connection settings live with their backends
//! (`IpfsConfig::from_env`, `ElasticConfig::from_env`) and are only read when
//! that backend is selected.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `PORT` | 8040 |
//! | `LOG_FORMAT` | `text` (`json` for JSON lines) |
//! | `MAHUTA_STORAGE` | `ipfs` (`memory`) |
//! | `MAHUTA_INDEXER` | `elasticsearch` (`memory`) |
//! | `MAHUTA_INDEX_CONFIGS` | none, comma list of `name=path/to/mapping.json` |
//! | `MAHUTA_RECONCILER_PERIOD_SECS` | 30, `0` disables |
//! | `MAHUTA_CORS_ORIGINS` | `*` |
//! | `MAHUTA_MAX_UPLOAD_MB` | 100 |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;

pub const DEFAULT_PORT: u16 = 8040;
pub const DEFAULT_RECONCILER_PERIOD: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_UPLOAD_MB: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Ipfs,
    Memory,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IndexerBackend {
    #[default]
    Elasticsearch,
    Memory,
}

/// An index created at startup with its backend mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexConfig {
    pub name: String,
    pub configuration: Value,
}

/// Allowed CORS origins. An empty list means any origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsOrigins(pub Vec<String>);

impl CorsOrigins {
    pub fn allows_any(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub log_format: LogFormat,
    pub storage: StorageBackend,
    pub indexer: IndexerBackend,
    pub index_configs: Vec<IndexConfig>,
    /// Zero disables the reconciler.
    pub reconciler_period: Duration,
    pub cors_origins: CorsOrigins,
    pub max_upload_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            log_format: LogFormat::Text,
            storage: StorageBackend::Ipfs,
            indexer: IndexerBackend::Elasticsearch,
            index_configs: Vec::new(),
            reconciler_period: DEFAULT_RECONCILER_PERIOD,
            cors_origins: CorsOrigins::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }
}

impl AppConfig {
    /// In-memory backends, no reconciler. For development and tests.
    pub fn in_memory() -> Self {
        Self {
            storage: StorageBackend::Memory,
            indexer: IndexerBackend::Memory,
            reconciler_period: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = parse_or(&var, "PORT", defaults.port)?;
        let log_format = match var("LOG_FORMAT").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => return Err(ConfigError::invalid("LOG_FORMAT", other)),
        };
        let storage = match var("MAHUTA_STORAGE").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("ipfs") => StorageBackend::Ipfs,
            Some("memory") => StorageBackend::Memory,
            Some(other) => return Err(ConfigError::invalid("MAHUTA_STORAGE", other)),
        };
        let indexer = match var("MAHUTA_INDEXER").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("elasticsearch") => IndexerBackend::Elasticsearch,
            Some("memory") => IndexerBackend::Memory,
            Some(other) => return Err(ConfigError::invalid("MAHUTA_INDEXER", other)),
        };
        let index_configs = match var("MAHUTA_INDEX_CONFIGS") {
            Some(raw) => parse_index_configs(&raw)?,
            None => Vec::new(),
        };
        let period_secs: u64 = parse_or(
            &var,
            "MAHUTA_RECONCILER_PERIOD_SECS",
            defaults.reconciler_period.as_secs(),
        )?;
        let cors_origins = var("MAHUTA_CORS_ORIGINS")
            .map(|raw| parse_cors_origins(&raw))
            .unwrap_or_default();
        let max_upload_mb: usize = parse_or(&var, "MAHUTA_MAX_UPLOAD_MB", DEFAULT_MAX_UPLOAD_MB)?;

        Ok(Self {
            port,
            log_format,
            storage,
            indexer,
            index_configs,
            reconciler_period: Duration::from_secs(period_secs),
            cors_origins,
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
        })
    }
}

fn parse_or<T: FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, ConfigError> {
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::invalid(name, &raw)),
        None => Ok(default),
    }
}

/// Parse `name=path,name=path` and load each mapping file as JSON.
pub fn parse_index_configs(raw: &str) -> Result<Vec<IndexConfig>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| -> Result<IndexConfig, ConfigError> {
            let (name, path) = entry
                .split_once('=')
                .map(|(n, p)| (n.trim(), p.trim()))
                .filter(|(n, p)| !n.is_empty() && !p.is_empty())
                .ok_or_else(|| ConfigError::invalid("MAHUTA_INDEX_CONFIGS", entry))?;
            Ok(IndexConfig {
                name: name.to_string(),
                configuration: load_mapping(name, PathBuf::from(path))?,
            })
        })
        .collect()
}

fn load_mapping(name: &str, path: PathBuf) -> Result<Value, ConfigError> {
    let mapping_error = |reason: String| ConfigError::IndexMapping {
        index: name.to_string(),
        path: path.clone(),
        reason,
    };
    let raw = std::fs::read_to_string(&path).map_err(|e| mapping_error(e.to_string()))?;
    serde_json::from_str(&raw).map_err(|e| mapping_error(e.to_string()))
}

fn parse_cors_origins(raw: &str) -> CorsOrigins {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect();
    if origins.iter().any(|o| o == "*") {
        CorsOrigins::default()
    } else {
        CorsOrigins(origins)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
    #[error("cannot load mapping for index {index} from {}: {reason}", .path.display())]
    IndexMapping {
        index: String,
        path: PathBuf,
        reason: String,
    },
}

impl ConfigError {
    fn invalid(var: &str, value: &str) -> Self {
        Self::InvalidValue {
            var: var.to_string(),
            value: value.to_string(),
        }
    }
}
