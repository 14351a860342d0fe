//! Pinning strategies backed by IPFS-compatible services.

mod cluster;
mod native;
mod pinata;

pub use cluster::IpfsClusterPinning;
pub use native::IpfsNativePinning;
pub use pinata::PinataPinning;
