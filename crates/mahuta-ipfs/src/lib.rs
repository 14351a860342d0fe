//! # mahuta-ipfs -- IPFS storage backend
//!
//! [`IpfsStorage`] implements [`mahuta_core::StorageService`] on top of the
//! IPFS HTTP RPC API (`/api/v0/*`). Content is added without pinning; the
//! node's own [`IpfsNativePinning`] strategy is always the first member of
//! the replica set, followed by any configured replicas:
//!
//! - extra IPFS nodes ([`IpfsNativePinning`]),
//! - IPFS cluster peers ([`IpfsClusterPinning`]),
//! - the Pinata pinning service ([`PinataPinning`]).
//!
//! All HTTP calls go through a shared retry helper that retries connection
//! failures with exponential backoff. Reads and writes run on a bounded
//! [`WorkerPool`](mahuta_core::WorkerPool) with a deadline.

pub mod client;
pub mod config;
pub mod error;
pub mod pinning;
pub(crate) mod retry;
pub mod storage;

pub use client::IpfsClient;
pub use config::{ConfigError, IpfsConfig, PinataConfig};
pub use error::IpfsError;
pub use pinning::{IpfsClusterPinning, IpfsNativePinning, PinataPinning};
pub use storage::IpfsStorage;
