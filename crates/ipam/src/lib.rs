//! IP block hierarchy and free-space engine for the tikfleet dashboard.
//!
//! Given a flat snapshot of allocated CIDR blocks this crate answers the
//! three questions the IPAM views ask:
//!
//! - **Hierarchy** -- which block sits inside which: [`build_forest`] assigns
//!   every block its most specific containing block and returns the resulting
//!   trees.
//!
//! - **Free space** -- what is still unallocated inside a block:
//!   [`compute_free_intervals`] sweeps a node's children and returns the
//!   gaps, exact to the address.
//!
//! - **Splitting** -- how a block can be subdivided without cutting an
//!   existing allocation: [`enumerate_split_options`] enumerates candidate
//!   prefix lengths and flags the ones whose subnet boundaries would
//!   fragment a child.
//!
//! Every operation is a pure function over one immutable snapshot: no I/O,
//! no internal state, no retries. Detected inconsistencies (duplicate
//! blocks, overlapping siblings) abort the computation instead of degrading
//! to a best-effort answer. [`InventoryStore`] is the one stateful
//! convenience: an `ArcSwap`-backed holder that lets a sync worker publish
//! fresh snapshots while readers compute against the one they hold.

pub mod free_space;
pub mod hierarchy;
pub mod inventory;
pub mod split;

pub use free_space::{compute_free_intervals, utilization, FreeInterval, Utilization};
pub use hierarchy::{build_forest, verify_siblings, HierarchyNode};
pub use inventory::{blocks_from_records, BlockRecord, InventorySnapshot, InventoryStore};
pub use split::{can_split, enumerate_split_options, SplitOption};
