use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tikfleet_common::{IpamError, IpamResult};

use crate::family::AddressFamily;

/// A CIDR block: a masked network address plus a prefix length.
///
/// Addresses of both families are held in the low bits of a `u128`, so all
/// arithmetic operates over the full address width. Construction guarantees
/// that every bit beyond `prefix_len` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Cidr {
    family: AddressFamily,
    network: u128,
    prefix_len: u8,
}

impl Cidr {
    /// Create a block from an already-masked network address.
    ///
    /// Fails with a format error if the prefix length is out of range for the
    /// family, the address does not fit the family width, or any host bit is
    /// set.
    pub fn new(family: AddressFamily, network: u128, prefix_len: u8) -> IpamResult<Self> {
        let masked = Self::masked(family, network, prefix_len)?;
        if masked.network != network {
            return Err(IpamError::Format(format!(
                "address has host bits set beyond /{} (network would be {})",
                prefix_len, masked
            )));
        }
        Ok(masked)
    }

    /// Create a block from an arbitrary address, masking host bits to zero.
    pub fn masked(family: AddressFamily, address: u128, prefix_len: u8) -> IpamResult<Self> {
        let max_bits = family.max_bits();
        if prefix_len > max_bits {
            return Err(IpamError::Format(format!(
                "prefix length /{} out of range for {} (max /{})",
                prefix_len, family, max_bits
            )));
        }
        if max_bits < 128 && address >> max_bits != 0 {
            return Err(IpamError::Format(format!(
                "address value does not fit in {} bits ({})",
                max_bits, family
            )));
        }
        Ok(Self {
            family,
            network: address & !host_mask(family, prefix_len),
            prefix_len,
        })
    }

    pub const fn family(&self) -> AddressFamily {
        self.family
    }

    /// The network address (all host bits zero).
    pub const fn network(&self) -> u128 {
        self.network
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// First and last address of the block, inclusive.
    pub fn range(&self) -> (u128, u128) {
        (self.network, self.network | host_mask(self.family, self.prefix_len))
    }

    /// Number of addresses in the block: `2^(max_bits - prefix_len)`.
    ///
    /// Exact for every prefix length >= 1. The whole IPv6 space (`::/0`)
    /// holds 2^128 addresses, one more than `u128` can represent; that single
    /// case saturates at `u128::MAX`.
    pub fn address_count(&self) -> u128 {
        host_mask(self.family, self.prefix_len).saturating_add(1)
    }

    /// Bit-exact prefix containment test.
    ///
    /// Returns `false` across families or when `other` is not strictly more
    /// specific than `self`. Otherwise true iff `other`'s network address,
    /// masked to `self.prefix_len` bits over the full address width, equals
    /// `self`'s network address. Prefix lengths that are not multiples of 8
    /// or 16 are handled exactly like any other.
    pub fn contains(&self, other: &Cidr) -> bool {
        if self.family != other.family || other.prefix_len <= self.prefix_len {
            return false;
        }
        (other.network & !host_mask(self.family, self.prefix_len)) == self.network
    }
}

/// Mask covering the host bits of a block: `2^(max_bits - prefix_len) - 1`.
fn host_mask(family: AddressFamily, prefix_len: u8) -> u128 {
    let host_bits = family.max_bits() - prefix_len;
    if host_bits >= 128 {
        u128::MAX
    } else {
        (1u128 << host_bits) - 1
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family {
            AddressFamily::V4 => {
                write!(f, "{}/{}", Ipv4Addr::from(self.network as u32), self.prefix_len)
            }
            AddressFamily::V6 => {
                write!(f, "{}/{}", Ipv6Addr::from(self.network), self.prefix_len)
            }
        }
    }
}

impl From<Cidr> for String {
    fn from(cidr: Cidr) -> Self {
        cidr.to_string()
    }
}

impl TryFrom<String> for Cidr {
    type Error = IpamError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        text.parse()
    }
}

impl FromStr for Cidr {
    type Err = IpamError;

    /// Parse CIDR text, masking any host bits. Use [`crate::codec::parse_cidr`]
    /// to control the host-bits policy.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::codec::parse_cidr(s, tikfleet_common::HostBitsPolicy::Mask)
    }
}

/// An inventory entry: a CIDR block plus the metadata the IPAM service keeps
/// for it. `id` and `section_id` are opaque keys owned by the external
/// inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressBlock {
    pub id: String,
    pub label: String,
    pub section_id: String,
    pub cidr: Cidr,
}

impl AddressBlock {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        section_id: impl Into<String>,
        cidr: Cidr,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            section_id: section_id.into(),
            cidr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v4(text: &str) -> Cidr {
        text.parse().unwrap()
    }

    fn v6(text: &str) -> Cidr {
        text.parse().unwrap()
    }

    #[test]
    fn new_rejects_host_bits() {
        // 10.0.0.5 has host bits under /24
        let addr = u128::from(u32::from(Ipv4Addr::new(10, 0, 0, 5)));
        assert!(Cidr::new(AddressFamily::V4, addr, 24).is_err());
        assert!(Cidr::new(AddressFamily::V4, addr, 32).is_ok());
    }

    #[test]
    fn new_rejects_out_of_range_prefix() {
        assert!(Cidr::new(AddressFamily::V4, 0, 33).is_err());
        assert!(Cidr::new(AddressFamily::V6, 0, 129).is_err());
        assert!(Cidr::new(AddressFamily::V6, 0, 128).is_ok());
    }

    #[test]
    fn new_rejects_oversized_v4_value() {
        assert!(Cidr::new(AddressFamily::V4, 1u128 << 32, 8).is_err());
    }

    #[test]
    fn masked_zeroes_host_bits() {
        let addr = u128::from(u32::from(Ipv4Addr::new(192, 168, 1, 77)));
        let cidr = Cidr::masked(AddressFamily::V4, addr, 24).unwrap();
        assert_eq!(cidr.to_string(), "192.168.1.0/24");
    }

    #[test]
    fn range_of_v4_block() {
        let cidr = v4("10.0.0.0/24");
        let (start, end) = cidr.range();
        assert_eq!(start, u128::from(u32::from(Ipv4Addr::new(10, 0, 0, 0))));
        assert_eq!(end, u128::from(u32::from(Ipv4Addr::new(10, 0, 0, 255))));
        assert_eq!(cidr.address_count(), 256);
    }

    #[test]
    fn address_count_needs_more_than_64_bits() {
        // A /64 alone holds 2^64 addresses.
        assert_eq!(v6("2001:db8::/64").address_count(), 1u128 << 64);
        assert_eq!(v6("2001:db8::/128").address_count(), 1);
        assert_eq!(v4("0.0.0.0/0").address_count(), 1u128 << 32);
    }

    #[test]
    fn full_v6_space_saturates() {
        assert_eq!(v6("::/0").address_count(), u128::MAX);
        let (start, end) = v6("::/0").range();
        assert_eq!(start, 0);
        assert_eq!(end, u128::MAX);
    }

    #[test]
    fn contains_is_strict_and_family_scoped() {
        let parent = v4("10.0.0.0/16");
        let child = v4("10.0.1.0/24");
        assert!(parent.contains(&child));
        assert!(!child.contains(&parent));
        // A block never contains itself.
        assert!(!parent.contains(&parent));
        // 10.0.0.0/16 and ::/16 share low bits but not a family.
        assert!(!v6("::/8").contains(&child));
    }

    #[test]
    fn contains_at_non_octet_boundaries() {
        // /25 and /26 land mid-octet; byte-truncated comparison would accept both.
        let upper = v4("10.0.0.128/25");
        assert!(upper.contains(&v4("10.0.0.192/26")));
        assert!(!upper.contains(&v4("10.0.0.64/26")));

        // Same for a v6 prefix that is not a multiple of 16.
        let odd = v6("2001:db8:8000::/33");
        assert!(odd.contains(&v6("2001:db8:8000::/48")));
        assert!(!odd.contains(&v6("2001:db8:4000::/48")));
    }

    #[test]
    fn containment_antisymmetry() {
        let blocks = [
            v4("10.0.0.0/8"),
            v4("10.0.0.0/24"),
            v4("10.0.0.128/25"),
            v6("2001:db8::/32"),
            v6("2001:db8::/64"),
        ];
        for a in &blocks {
            for b in &blocks {
                assert!(!(a.contains(b) && b.contains(a)), "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn ordering_sorts_by_family_then_network() {
        let mut blocks = vec![v6("::/0"), v4("192.168.0.0/16"), v4("10.0.0.0/8")];
        blocks.sort();
        assert_eq!(blocks[0].to_string(), "10.0.0.0/8");
        assert_eq!(blocks[1].to_string(), "192.168.0.0/16");
        assert_eq!(blocks[2].to_string(), "::/0");
    }

    #[test]
    fn display_round_trip() {
        for text in ["0.0.0.0/0", "10.0.0.0/24", "2001:db8::/64", "::1/128"] {
            assert_eq!(text.parse::<Cidr>().unwrap().to_string(), text);
        }
    }
}
