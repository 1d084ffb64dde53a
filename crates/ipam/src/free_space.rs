use serde::Serialize;
use tikfleet_common::{IpamError, IpamResult};

use crate::hierarchy::{verify_siblings, HierarchyNode};

/// A contiguous unallocated range inside a block, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeInterval {
    pub start: u128,
    pub end: u128,
}

impl FreeInterval {
    /// Number of addresses in the interval. Saturates at `u128::MAX` for an
    /// interval spanning the whole IPv6 space.
    pub fn address_count(&self) -> u128 {
        (self.end - self.start).saturating_add(1)
    }
}

/// Address accounting for a block, derived from its free intervals.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Utilization {
    pub total: u128,
    pub allocated: u128,
    pub free: u128,
}

impl Utilization {
    pub fn percent_used(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.allocated as f64 / self.total as f64 * 100.0
    }
}

/// Compute the sorted free intervals of a node given its direct children.
///
/// A childless node yields a single interval spanning its whole range.
/// Otherwise a cursor sweeps left to right across the sorted children,
/// emitting the gap before each child and the tail after the last one. The
/// children's ranges and the returned intervals together reconstruct the
/// node's range exactly, with no gaps and no overlaps.
///
/// The children are validated first -- same family, contained in the node,
/// sorted, pairwise disjoint -- and any violation aborts the computation with
/// a data-integrity error rather than producing a plausible-looking result.
pub fn compute_free_intervals(node: &HierarchyNode) -> IpamResult<Vec<FreeInterval>> {
    let parent = &node.block.cidr;
    let (start, end) = parent.range();

    for child in &node.children {
        if child.block.cidr.family() != parent.family() {
            return Err(IpamError::DataIntegrity(format!(
                "child {} ({}) is not in the same family as parent {} ({})",
                child.block.cidr, child.block.id, parent, node.block.id
            )));
        }
        if !parent.contains(&child.block.cidr) {
            return Err(IpamError::DataIntegrity(format!(
                "child {} ({}) is not contained in parent {} ({})",
                child.block.cidr, child.block.id, parent, node.block.id
            )));
        }
    }
    verify_siblings(&node.children)?;

    let mut free = Vec::new();
    let mut cursor = start;
    for child in &node.children {
        let (child_start, child_end) = child.block.cidr.range();
        if child_start > cursor {
            free.push(FreeInterval {
                start: cursor,
                end: child_start - 1,
            });
        }
        cursor = match child_end.checked_add(1) {
            Some(next) => next,
            // The child ends at the top of the address space, which is also
            // the parent's end: nothing can follow it.
            None => return Ok(free),
        };
    }
    if cursor <= end {
        free.push(FreeInterval { start: cursor, end });
    }
    Ok(free)
}

/// Total / allocated / free address counts for a node.
pub fn utilization(node: &HierarchyNode) -> IpamResult<Utilization> {
    let free: u128 = compute_free_intervals(node)?
        .iter()
        .map(FreeInterval::address_count)
        .fold(0u128, u128::saturating_add);
    let total = node.block.cidr.address_count();
    Ok(Utilization {
        total,
        allocated: total.saturating_sub(free),
        free,
    })
}

impl HierarchyNode {
    /// See [`compute_free_intervals`].
    pub fn free_intervals(&self) -> IpamResult<Vec<FreeInterval>> {
        compute_free_intervals(self)
    }

    /// See [`utilization`].
    pub fn utilization(&self) -> IpamResult<Utilization> {
        utilization(self)
    }
}
