use serde::Serialize;
use tikfleet_addr::{AddressBlock, Cidr};
use tikfleet_common::{IpamError, IpamResult, SplitConfig};

use crate::hierarchy::HierarchyNode;

/// One candidate way to subdivide a block into equal-sized subnets.
#[derive(Debug, Clone, Serialize)]
pub struct SplitOption {
    pub new_prefix_len: u8,
    pub subnet_count: u128,
    pub addresses_per_subnet: u128,
    pub feasible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Whether the split planner is offered for a block at all.
///
/// A policy gate, not an arithmetic limit: tiny blocks can be subdivided in
/// principle, the product just does not offer it below the configured
/// granularity.
pub fn can_split(cidr: &Cidr, config: &SplitConfig) -> bool {
    cidr.address_count() > config.min_addresses
}

/// Enumerate candidate subdivisions of `block`, one per prefix length from
/// one past the block's own to `max_delta` deeper (bounded by the family
/// width).
///
/// A candidate is infeasible when one of its subnet boundaries would cut
/// through an existing child allocation; the option is still returned, with
/// `reason` naming the conflicting child, so the UI can show it greyed out.
/// Every option satisfies `subnet_count * addresses_per_subnet ==
/// address_count(block)`.
pub fn enumerate_split_options(
    block: &AddressBlock,
    children: &[AddressBlock],
    config: &SplitConfig,
) -> IpamResult<Vec<SplitOption>> {
    let cidr = &block.cidr;
    if !can_split(cidr, config) {
        return Err(IpamError::Unsupported(format!(
            "block {} ({}) is below the split granularity ({} addresses, need more than {})",
            cidr,
            block.id,
            cidr.address_count(),
            config.min_addresses
        )));
    }

    for child in children {
        if !cidr.contains(&child.cidr) {
            return Err(IpamError::DataIntegrity(format!(
                "child {} ({}) is not contained in block {} ({})",
                child.cidr, child.id, cidr, block.id
            )));
        }
    }

    let max_bits = cidr.family().max_bits();
    let deepest = max_bits.min(cidr.prefix_len().saturating_add(config.max_delta));
    let (block_start, _) = cidr.range();

    let mut options = Vec::with_capacity(usize::from(deepest - cidr.prefix_len()));
    for new_prefix_len in (cidr.prefix_len() + 1)..=deepest {
        let subnet_count = pow2_saturating(new_prefix_len - cidr.prefix_len());
        // new_prefix_len >= 1, so this is exact.
        let addresses_per_subnet = pow2_saturating(max_bits - new_prefix_len);

        let mut feasible = true;
        let mut reason = None;
        for child in children {
            let (child_start, child_end) = child.cidr.range();
            let first_subnet = (child_start - block_start) / addresses_per_subnet;
            let last_subnet = (child_end - block_start) / addresses_per_subnet;
            if first_subnet != last_subnet {
                feasible = false;
                reason = Some(format!(
                    "a /{} boundary would cut allocation {} ({})",
                    new_prefix_len, child.label, child.cidr
                ));
                break;
            }
        }

        options.push(SplitOption {
            new_prefix_len,
            subnet_count,
            addresses_per_subnet,
            feasible,
            reason,
        });
    }
    Ok(options)
}

fn pow2_saturating(bits: u8) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        1u128 << bits
    }
}

impl HierarchyNode {
    /// Split options for this node against its direct children. See
    /// [`enumerate_split_options`].
    pub fn split_options(&self, config: &SplitConfig) -> IpamResult<Vec<SplitOption>> {
        let children: Vec<AddressBlock> =
            self.children.iter().map(|c| c.block.clone()).collect();
        enumerate_split_options(&self.block, &children, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tikfleet_common::HostBitsPolicy;

    fn block(id: &str, cidr: &str) -> AddressBlock {
        AddressBlock::new(
            id,
            id.to_string(),
            "1",
            tikfleet_addr::parse_cidr(cidr, HostBitsPolicy::Mask).unwrap(),
        )
    }

    fn config() -> SplitConfig {
        SplitConfig::default()
    }

    #[test]
    fn gate_follows_configured_granularity() {
        let cfg = config();
        assert!(can_split(&block("a", "10.0.0.0/24").cidr, &cfg));
        assert!(can_split(&block("a", "10.0.0.0/29").cidr, &cfg));
        // A /30 holds exactly 4 addresses -- not more than the minimum.
        assert!(!can_split(&block("a", "10.0.0.0/30").cidr, &cfg));
        assert!(!can_split(&block("a", "10.0.0.1/32").cidr, &cfg));

        let loose = SplitConfig {
            min_addresses: 1,
            ..config()
        };
        assert!(can_split(&block("a", "10.0.0.0/31").cidr, &loose));
    }

    #[test]
    fn split_below_gate_is_unsupported() {
        let err = enumerate_split_options(&block("a", "10.0.0.0/30"), &[], &config())
            .unwrap_err();
        assert!(matches!(err, IpamError::Unsupported(_)), "{}", err);
    }

    #[test]
    fn empty_v6_block_is_fully_splittable() {
        let options =
            enumerate_split_options(&block("a", "2001:db8::/64"), &[], &config()).unwrap();

        assert_eq!(options.len(), 8);
        for (i, option) in options.iter().enumerate() {
            assert_eq!(usize::from(option.new_prefix_len), 65 + i);
            assert_eq!(option.subnet_count, 1u128 << (i + 1));
            assert_eq!(option.addresses_per_subnet, 1u128 << (63 - i));
            assert!(option.feasible);
            assert!(option.reason.is_none());
        }
        assert_eq!(options[0].subnet_count, 2);
        assert_eq!(options[7].subnet_count, 256);
    }

    #[test]
    fn enumeration_stops_at_family_width() {
        let options =
            enumerate_split_options(&block("a", "10.0.0.0/29"), &[], &config()).unwrap();
        // /30, /31, /32 -- maxDelta of 8 runs past the family width.
        assert_eq!(options.len(), 3);
        assert_eq!(options.last().unwrap().new_prefix_len, 32);
        assert_eq!(options.last().unwrap().addresses_per_subnet, 1);
    }

    #[test]
    fn straddling_child_marks_option_infeasible() {
        let parent = block("p", "10.0.0.0/24");
        let children = [block("dmz", "10.0.0.64/26")];
        let options = enumerate_split_options(&parent, &children, &config()).unwrap();

        // /25 keeps the child in its lower half; /26 aligns with it exactly.
        assert!(options[0].feasible, "/25 should be feasible");
        assert!(options[1].feasible, "/26 should be feasible");
        // A /27 boundary at 10.0.0.96 lands inside the child.
        assert!(!options[2].feasible, "/27 must be infeasible");
        let reason = options[2].reason.as_deref().unwrap();
        assert!(reason.contains("dmz"), "{}", reason);
        assert!(reason.contains("10.0.0.64/26"), "{}", reason);
        // Deeper splits only get worse.
        assert!(options[3..].iter().all(|o| !o.feasible));
    }

    #[test]
    fn aligned_children_leave_options_feasible() {
        let parent = block("p", "10.0.0.0/24");
        let children = [block("a", "10.0.0.0/26"), block("b", "10.0.0.128/26")];
        let options = enumerate_split_options(&parent, &children, &config()).unwrap();

        assert!(options[0].feasible, "/25 splits between the children");
        assert!(options[1].feasible, "/26 aligns with both children");
        assert!(!options[2].feasible, "/27 cuts both children");
    }

    #[test]
    fn address_conservation_holds_for_every_option() {
        for text in ["10.0.0.0/20", "192.168.0.0/24", "2001:db8::/32", "2001:db8::/120"] {
            let parent = block("p", text);
            let total = parent.cidr.address_count();
            for option in enumerate_split_options(&parent, &[], &config()).unwrap() {
                assert_eq!(
                    option.subnet_count * option.addresses_per_subnet,
                    total,
                    "option /{} of {}",
                    option.new_prefix_len,
                    text
                );
            }
        }
    }

    #[test]
    fn child_outside_block_is_integrity_error() {
        let err = enumerate_split_options(
            &block("p", "10.0.0.0/24"),
            &[block("x", "10.0.1.0/26")],
            &config(),
        )
        .unwrap_err();
        assert!(matches!(err, IpamError::DataIntegrity(_)), "{}", err);
    }

    #[test]
    fn custom_max_delta_bounds_enumeration() {
        let cfg = SplitConfig {
            max_delta: 2,
            ..config()
        };
        let options = enumerate_split_options(&block("a", "10.0.0.0/16"), &[], &cfg).unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[1].new_prefix_len, 18);
    }
}
