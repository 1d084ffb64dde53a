use std::collections::HashMap;

use serde::Serialize;
use tikfleet_addr::{AddressBlock, Cidr};
use tikfleet_common::{IpamError, IpamResult};
use tracing::debug;

/// A block and the blocks allocated directly inside it, sorted ascending by
/// network address. The forest is owned top-down from its roots; parents are
/// found by walking down, never through back-references.
#[derive(Debug, Clone, Serialize)]
pub struct HierarchyNode {
    pub block: AddressBlock,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// A node with no children.
    pub fn leaf(block: AddressBlock) -> Self {
        Self {
            block,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }
}

/// Build an allocation forest from a flat inventory snapshot.
///
/// Each block's parent is the most specific block that contains it; blocks
/// contained by nothing become roots. Roots and children come out sorted
/// ascending by (family, network address).
///
/// Duplicate blocks are a data-integrity failure: two identical blocks would
/// be equally valid parents for anything inside them, and the builder refuses
/// to pick one arbitrarily.
pub fn build_forest(blocks: &[AddressBlock]) -> IpamResult<Vec<HierarchyNode>> {
    let mut seen: HashMap<Cidr, &AddressBlock> = HashMap::with_capacity(blocks.len());
    for block in blocks {
        if let Some(previous) = seen.insert(block.cidr, block) {
            return Err(IpamError::DataIntegrity(format!(
                "duplicate block {} (records {} and {})",
                block.cidr, previous.id, block.id
            )));
        }
    }

    // O(n^2) best-parent scan; inventories are hundreds of blocks.
    let mut parent: Vec<Option<usize>> = vec![None; blocks.len()];
    for (i, block) in blocks.iter().enumerate() {
        for (j, candidate) in blocks.iter().enumerate() {
            if i == j || !candidate.cidr.contains(&block.cidr) {
                continue;
            }
            match parent[i] {
                Some(best) if blocks[best].cidr.prefix_len() >= candidate.cidr.prefix_len() => {}
                _ => parent[i] = Some(j),
            }
        }
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); blocks.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (i, p) in parent.iter().enumerate() {
        match p {
            Some(j) => children[*j].push(i),
            None => roots.push(i),
        }
    }

    let mut forest: Vec<HierarchyNode> = roots
        .into_iter()
        .map(|i| build_node(i, blocks, &children))
        .collect();
    forest.sort_by_key(|node| node.block.cidr);

    for node in &forest {
        verify_subtree(node)?;
    }
    verify_siblings(&forest)?;

    debug!(
        blocks = blocks.len(),
        roots = forest.len(),
        "built allocation forest"
    );
    Ok(forest)
}

fn build_node(index: usize, blocks: &[AddressBlock], children: &[Vec<usize>]) -> HierarchyNode {
    let mut nodes: Vec<HierarchyNode> = children[index]
        .iter()
        .map(|&child| build_node(child, blocks, children))
        .collect();
    nodes.sort_by_key(|node| node.block.cidr);
    HierarchyNode {
        block: blocks[index].clone(),
        children: nodes,
    }
}

/// Check that a sequence of sibling nodes is sorted ascending by network
/// address with pairwise-disjoint ranges.
pub fn verify_siblings(siblings: &[HierarchyNode]) -> IpamResult<()> {
    for pair in siblings.windows(2) {
        let (left, right) = (&pair[0].block, &pair[1].block);
        if left.cidr.family() != right.cidr.family() {
            continue;
        }
        if right.cidr < left.cidr {
            return Err(IpamError::DataIntegrity(format!(
                "siblings out of order: {} before {}",
                left.cidr, right.cidr
            )));
        }
        let (_, left_end) = left.cidr.range();
        let (right_start, _) = right.cidr.range();
        if right_start <= left_end {
            return Err(IpamError::DataIntegrity(format!(
                "overlapping siblings {} ({}) and {} ({})",
                left.cidr, left.id, right.cidr, right.id
            )));
        }
    }
    Ok(())
}

fn verify_subtree(node: &HierarchyNode) -> IpamResult<()> {
    verify_siblings(&node.children)?;
    for child in &node.children {
        if !node.block.cidr.contains(&child.block.cidr) {
            return Err(IpamError::DataIntegrity(format!(
                "child {} ({}) is not contained in parent {} ({})",
                child.block.cidr, child.block.id, node.block.cidr, node.block.id
            )));
        }
        verify_subtree(child)?;
    }
    Ok(())
}
