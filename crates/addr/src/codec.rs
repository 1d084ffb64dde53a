//! Text conversion between dotted-quad / colon-hex notation and the integer
//! address representation used by the block math.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use ipnet::IpNet;
use tikfleet_common::{HostBitsPolicy, IpamError, IpamResult};

use crate::block::Cidr;
use crate::family::AddressFamily;

/// Parse an address of the given family into its integer value.
///
/// The std parsers reject malformed dotted-quad and colon-hex syntax,
/// including more than one `::` in an IPv6 address.
pub fn parse_address(text: &str, family: AddressFamily) -> IpamResult<u128> {
    match family {
        AddressFamily::V4 => text
            .parse::<Ipv4Addr>()
            .map(|addr| u128::from(u32::from(addr)))
            .map_err(|_| IpamError::Format(format!("invalid IPv4 address: {}", text))),
        AddressFamily::V6 => text
            .parse::<Ipv6Addr>()
            .map(u128::from)
            .map_err(|_| IpamError::Format(format!("invalid IPv6 address: {}", text))),
    }
}

/// Format an integer address in the canonical text form of its family.
///
/// IPv6 output uses the standard zero-run compression (`::`). Fails when the
/// value does not fit the family width.
pub fn format_address(value: u128, family: AddressFamily) -> IpamResult<String> {
    match family {
        AddressFamily::V4 => {
            let addr = u32::try_from(value).map_err(|_| {
                IpamError::Format(format!("value {} does not fit in an IPv4 address", value))
            })?;
            Ok(Ipv4Addr::from(addr).to_string())
        }
        AddressFamily::V6 => Ok(Ipv6Addr::from(value).to_string()),
    }
}

/// Parse CIDR text into a [`Cidr`] block.
///
/// The address part determines the family; the prefix length is validated
/// against the family width. Input with non-zero host bits is masked down to
/// the network address or rejected, per `policy`. A bare address with no `/`
/// is accepted as a host block (/32 or /128).
pub fn parse_cidr(text: &str, policy: HostBitsPolicy) -> IpamResult<Cidr> {
    let trimmed = text.trim();

    if let Ok(net) = trimmed.parse::<IpNet>() {
        if policy == HostBitsPolicy::Reject && net.addr() != net.network() {
            return Err(IpamError::Format(format!(
                "{} has host bits set (network address is {}/{})",
                trimmed,
                net.network(),
                net.prefix_len()
            )));
        }
        return cidr_from_net(&net);
    }

    // No prefix => treat as a single host.
    if let Ok(addr) = trimmed.parse::<IpAddr>() {
        return match addr {
            IpAddr::V4(v4) => Cidr::new(AddressFamily::V4, u128::from(u32::from(v4)), 32),
            IpAddr::V6(v6) => Cidr::new(AddressFamily::V6, u128::from(v6), 128),
        };
    }

    Err(IpamError::Format(format!(
        "invalid CIDR or address: {}",
        trimmed
    )))
}

fn cidr_from_net(net: &IpNet) -> IpamResult<Cidr> {
    match net.network() {
        IpAddr::V4(v4) => Cidr::new(
            AddressFamily::V4,
            u128::from(u32::from(v4)),
            net.prefix_len(),
        ),
        IpAddr::V6(v6) => Cidr::new(AddressFamily::V6, u128::from(v6), net.prefix_len()),
    }
}
