//! Repair Status
//!
//! One `RepairStatus` exists per schema while a repair worker lives. It is
//! created on start, mutated only by the worker (and the abort request),
//! read by status queries, and replaced when a new repair starts after
//! termination.

use serde::{Deserialize, Serialize};

/// Progress and lifecycle snapshot of a schema's repair run.
///
/// Lifecycle: `running` → (`aborting` →) `terminated`. A worker that hit an
/// unexpected error records it in `error` and still terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairStatus {
    /// Worker start, milliseconds since epoch.
    pub start_time: u64,
    /// Set once the worker terminates.
    pub end_time: Option<u64>,
    /// Path the worker is currently visiting.
    pub current_path: String,
    pub checked_directories: u64,
    pub checked_files: u64,
    /// Files healed, counted once per file regardless of how many node
    /// copies were rewritten.
    pub repaired_files: u64,
    pub running: bool,
    /// Abort requested, worker still finishing its current unit of work.
    pub aborting: bool,
    pub terminated: bool,
    pub error: Option<String>,
}

impl RepairStatus {
    pub fn started(start_time: u64) -> Self {
        Self {
            start_time,
            end_time: None,
            current_path: "/".to_string(),
            checked_directories: 0,
            checked_files: 0,
            repaired_files: 0,
            running: true,
            aborting: false,
            terminated: false,
            error: None,
        }
    }
}
