//! Address codec and block math for the tikfleet IPAM engine.
//!
//! Everything here is a pure function over plain values. Addresses of both
//! families live in the low bits of a `u128`, which spans the full 128-bit
//! IPv6 space and keeps every computation bit-exact -- containment tests mask
//! over the whole address width rather than truncating to octet or group
//! boundaries.

pub mod block;
pub mod codec;
pub mod family;

pub use block::{AddressBlock, Cidr};
pub use codec::{format_address, parse_address, parse_cidr};
pub use family::AddressFamily;
