//! Merged Listing Types
//!
//! A logical directory exists on many nodes at once: every shard of every
//! replication group can hold a slice of it. `DirectoryListing` is the
//! union of those slices; for each file it keeps the metadata of every
//! physical copy keyed by node address. That per-node map is exactly what
//! the repair engine diffs.

use crate::node::protocol::{FileMetadata, NodeListing};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where the bytes of a resolved file actually live.
///
/// Coordinators never proxy file content to callers; they hand back this
/// pointer so the bytes can be fetched from the owning node directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLocation {
    pub node: String,
    pub metadata: FileMetadata,
}

/// What a path resolves to across the whole grid.
#[derive(Debug, Clone)]
pub enum Resolved {
    File(FileLocation),
    Directory(DirectoryListing),
}

/// Union of per-node directory views.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DirectoryListing {
    /// Subdirectory names, deduplicated. On conflicting views the newest
    /// metadata wins, keeping merges order-independent.
    pub directories: BTreeMap<String, FileMetadata>,
    /// File name -> (node address -> that node's copy metadata).
    pub files: BTreeMap<String, BTreeMap<String, FileMetadata>>,
}

impl DirectoryListing {
    /// Folds one node's view into the union.
    pub fn absorb_node(&mut self, node: &str, listing: NodeListing) {
        for (name, metadata) in listing.directories {
            self.keep_newer_directory(name, metadata);
        }
        for (name, metadata) in listing.files {
            self.files
                .entry(name)
                .or_default()
                .insert(node.to_string(), metadata);
        }
    }

    /// Merges another union into this one. Commutative and associative:
    /// group results may be folded in any arrival order.
    pub fn merge(&mut self, other: DirectoryListing) {
        for (name, metadata) in other.directories {
            self.keep_newer_directory(name, metadata);
        }
        for (name, copies) in other.files {
            let entry = self.files.entry(name).or_default();
            for (node, metadata) in copies {
                entry.insert(node, metadata);
            }
        }
    }

    fn keep_newer_directory(&mut self, name: String, metadata: FileMetadata) {
        let entry = self.directories.entry(name).or_insert_with(|| metadata.clone());
        if metadata.last_modified > entry.last_modified {
            *entry = metadata;
        }
    }
}
