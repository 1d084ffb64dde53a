//! Shared types for the tikfleet IPAM engine: the error taxonomy and the
//! serde-backed engine configuration.

pub mod config;
pub mod error;

pub use config::{HostBitsPolicy, IpamConfig, SplitConfig};
pub use error::{IpamError, IpamResult};
