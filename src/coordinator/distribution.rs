//! Distribution Coordinator
//!
//! Owns one replication group: an ordered list of `distribution_factor`
//! node clients, one per shard column. Shard ownership within the group is
//! decided by `placement::shard_index`, so a write touches exactly one node
//! while deletes and listings fan out to the whole group.
//!
//! Iteration order over shards is the grid row order as declared and must
//! stay stable: failover reads walk it deterministically.

use crate::coordinator::types::{DirectoryListing, FileLocation};
use crate::error::{Result, StoreError};
use crate::node::client::{FileContent, NodeClient};
use crate::placement::shard_index;
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;

pub struct DistributionCoordinator {
    schema: String,
    shards: Vec<Arc<dyn NodeClient>>,
}

impl DistributionCoordinator {
    pub fn new(schema: &str, shards: Vec<Arc<dyn NodeClient>>) -> Self {
        Self {
            schema: schema.to_string(),
            shards,
        }
    }

    /// Shard column owning `path` within this group.
    fn owner(&self, path: &str, explicit: Option<usize>) -> Result<usize> {
        shard_index(path, self.shards.len(), explicit)
    }

    /// Owning shard first, then the remaining shards in declared order.
    /// Finds data written under an explicit shard override too.
    fn failover_order(&self, path: &str, explicit: Option<usize>) -> Result<Vec<usize>> {
        let owner = self.owner(path, explicit)?;
        let mut order = vec![owner];
        order.extend((0..self.shards.len()).filter(|&i| i != owner));
        Ok(order)
    }

    /// Writes to exactly the owning shard. No fan-out.
    pub async fn put(
        &self,
        path: &str,
        content: Bytes,
        last_modified: u64,
        explicit: Option<usize>,
    ) -> Result<()> {
        let owner = self.owner(path, explicit)?;
        tracing::debug!(
            "PUT {}/{} -> shard {} ({})",
            self.schema,
            path,
            owner,
            self.shards[owner].address()
        );
        self.shards[owner]
            .put_file(&self.schema, path, content, last_modified)
            .await
    }

    /// Broadcasts the delete to every shard concurrently: data can outlive a
    /// shard remap or an explicit-target write, so the owning column alone
    /// is not enough. `true` when any shard had the file.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let results = join_all(
            self.shards
                .iter()
                .map(|shard| shard.delete_file(&self.schema, path)),
        )
        .await;

        let mut deleted = false;
        for outcome in results {
            match outcome {
                Ok(true) => deleted = true,
                Ok(false) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(deleted)
    }

    /// Sequential failover read of metadata; answers with the address of the
    /// node that holds the entry so callers can redirect to it.
    pub async fn head(&self, path: &str, explicit: Option<usize>) -> Result<Option<FileLocation>> {
        let mut last_err: Option<StoreError> = None;

        for idx in self.failover_order(path, explicit)? {
            let shard = &self.shards[idx];
            match shard.head_file(&self.schema, path).await {
                Ok(Some(metadata)) => {
                    return Ok(Some(FileLocation {
                        node: shard.address().to_string(),
                        metadata,
                    }));
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("HEAD {}/{} failed on {}: {}", self.schema, path, shard.address(), e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Sequential failover read of content, same shard order as `head`.
    pub async fn get(&self, path: &str, explicit: Option<usize>) -> Result<Option<FileContent>> {
        let mut last_err: Option<StoreError> = None;

        for idx in self.failover_order(path, explicit)? {
            let shard = &self.shards[idx];
            match shard.get_file(&self.schema, path).await {
                Ok(Some(content)) => return Ok(Some(content)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("GET {}/{} failed on {}: {}", self.schema, path, shard.address(), e);
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Concurrent fan-out listing over all shards, merged into one view.
    /// A shard that doesn't know the directory is skipped; only when every
    /// shard reports it missing does the group report `None`.
    pub async fn list_dir(&self, path: &str) -> Result<Option<DirectoryListing>> {
        let results = join_all(
            self.shards
                .iter()
                .map(|shard| shard.list_dir(&self.schema, path)),
        )
        .await;

        let mut merged: Option<DirectoryListing> = None;
        for (shard, outcome) in self.shards.iter().zip(results) {
            match outcome {
                Ok(Some(listing)) => {
                    merged
                        .get_or_insert_with(DirectoryListing::default)
                        .absorb_node(shard.address(), listing);
                }
                Ok(None) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(merged)
    }
}
