//! Fan-Out Coordination Module
//!
//! Turns one logical file operation into the right set of node RPCs.
//!
//! ## Core Concepts
//! - **Two-level tree**: a `ReplicationCoordinator` owns one
//!   `DistributionCoordinator` per replication group; each group owns one
//!   `NodeClient` per shard column.
//! - **Write-all / read-any**: writes must land in every group; reads are
//!   served by the first group (and shard) that has the data.
//! - **Merged listings**: directory views from every copy are unioned into
//!   a per-node inventory, which doubles as the repair engine's input.

pub mod distribution;
pub mod handlers;
pub mod replication;
pub mod types;
