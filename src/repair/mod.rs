//! Anti-Entropy Repair Module
//!
//! Detects and heals divergence between the physical copies of a schema's
//! files without blocking normal reads and writes.
//!
//! ## Core Concepts
//! - **Detection**: the merged directory listing exposes every copy of a
//!   file as a node-to-metadata map; copies that are missing or disagree
//!   mark the file for repair.
//! - **Lead copy**: the newest non-empty copy wins; its bytes and timestamp
//!   are replayed onto every lagging node.
//! - **Lifecycle**: one worker per schema, cooperative abort, status
//!   queryable while running and after termination.

pub mod engine;
pub mod handlers;
pub mod types;
