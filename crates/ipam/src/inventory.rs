use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tikfleet_addr::AddressBlock;
use tikfleet_common::{HostBitsPolicy, IpamError, IpamResult};
use tracing::{debug, info};

use crate::hierarchy::{build_forest, HierarchyNode};

/// The dashboard's cached inventory export: a flat list of block records with
/// the timestamp of the sync that produced it.
#[derive(Debug, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    pub blocks: Vec<BlockRecord>,
}

/// One raw inventory record, CIDR still in text form.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    pub label: String,
    pub section_id: String,
    pub cidr: String,
}

/// Parse raw records into address blocks under the given host-bits policy.
///
/// A record that fails to parse aborts the whole batch: a tree rendered from
/// an inventory that silently dropped allocations would be worse than no tree
/// at all.
pub fn blocks_from_records(
    records: &[BlockRecord],
    policy: HostBitsPolicy,
) -> IpamResult<Vec<AddressBlock>> {
    records
        .iter()
        .map(|record| {
            let cidr = tikfleet_addr::parse_cidr(&record.cidr, policy).map_err(|e| {
                IpamError::Format(format!("record {} ({:?}): {}", record.id, record.cidr, e))
            })?;
            Ok(AddressBlock::new(
                record.id.clone(),
                record.label.clone(),
                record.section_id.clone(),
                cidr,
            ))
        })
        .collect()
}

/// Holder for the latest inventory snapshot.
///
/// Uses `ArcSwap` so UI request handlers read lock-free while a sync worker
/// swaps in a fresh snapshot. The store never talks to the external IPAM
/// service itself -- it only keeps whatever the sync last handed over, and
/// every computation runs against one immutable snapshot.
pub struct InventoryStore {
    blocks: ArcSwap<Vec<AddressBlock>>,
    host_bits: HostBitsPolicy,
}

impl InventoryStore {
    pub fn new(host_bits: HostBitsPolicy) -> Self {
        Self {
            blocks: ArcSwap::from_pointee(Vec::new()),
            host_bits,
        }
    }

    /// Atomically replace the held snapshot.
    pub fn replace(&self, blocks: Vec<AddressBlock>) {
        debug!(count = blocks.len(), "replacing inventory snapshot");
        self.blocks.store(Arc::new(blocks));
    }

    /// The current snapshot. Cheap; later `replace` calls do not affect the
    /// returned list.
    pub fn snapshot(&self) -> Arc<Vec<AddressBlock>> {
        self.blocks.load_full()
    }

    pub fn len(&self) -> usize {
        self.blocks.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load a JSON snapshot file and swap it in.
    ///
    /// Returns the number of blocks loaded. On any error the previously held
    /// snapshot stays in place.
    pub fn load_file(&self, path: &Path) -> IpamResult<usize> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: InventorySnapshot = serde_json::from_str(&content)?;
        let blocks = blocks_from_records(&snapshot.blocks, self.host_bits)?;
        let count = blocks.len();
        info!(
            path = %path.display(),
            count,
            generated_at = ?snapshot.generated_at,
            "loaded inventory snapshot"
        );
        self.replace(blocks);
        Ok(count)
    }

    /// Build the allocation forest from the current snapshot.
    pub fn forest(&self) -> IpamResult<Vec<HierarchyNode>> {
        build_forest(&self.snapshot())
    }
}
