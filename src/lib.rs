//! Sharded, replicated blob store.
//!
//! Clients write and read named files under a *schema* (a logical bucket).
//! The store spreads a schema's namespace across `distribution_factor` shard
//! nodes and duplicates that shard grid across `replication_factor`
//! independent groups. A background anti-entropy process detects replicas
//! that have fallen out of sync and copies the most recent version over
//! lagging ones.
//!
//! ## Architecture Modules
//!
//! - **`membership`**: directory of live node addresses per service; the
//!   boundary behind which cluster discovery lives.
//! - **`node`**: a single node's local file store, the HTTP API serving it,
//!   and the `NodeClient` facade other nodes use to reach it.
//! - **`placement`**: pure path-to-shard hashing and live-nodes-to-grid
//!   assignment.
//! - **`schema`**: schema definitions (R, D, node grid), their JSON
//!   persistence, and lifecycle operations.
//! - **`coordinator`**: translates one logical file operation into one or
//!   many node RPCs — write-all across replication groups, shard-targeted
//!   reads with failover, merged directory listings.
//! - **`repair`**: per-schema background walker that compares the physical
//!   copies of every file and heals divergence last-modified-wins.

pub mod coordinator;
pub mod error;
pub mod membership;
pub mod node;
pub mod placement;
pub mod repair;
pub mod schema;
