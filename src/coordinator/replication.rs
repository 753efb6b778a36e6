//! Replication Coordinator
//!
//! Owns every replication group of a schema and applies the per-operation
//! consistency policy:
//!
//! - **put**: write-all — every group must take the write or the operation
//!   fails as a whole. Divergence from a partial failure is left for the
//!   repair engine; nothing is rolled back or retried here.
//! - **resolve/get**: read-any — groups are tried sequentially in grid
//!   order and the first one that knows the path wins.
//! - **delete/list**: fan out to all groups, tolerating per-group misses.

use crate::coordinator::distribution::DistributionCoordinator;
use crate::coordinator::types::{DirectoryListing, Resolved};
use crate::error::{Result, StoreError};
use crate::node::client::{FileContent, NodeClientFactory};
use crate::node::protocol::FileKind;
use crate::schema::types::Schema;
use bytes::Bytes;
use futures::future::join_all;

pub struct ReplicationCoordinator {
    schema: String,
    groups: Vec<DistributionCoordinator>,
}

impl ReplicationCoordinator {
    /// Builds the two-level fan-out tree for a schema's grid: one
    /// distribution coordinator per grid row, one leaf client per cell.
    pub fn for_schema(schema: &Schema, factory: &dyn NodeClientFactory) -> Self {
        let groups = schema
            .nodes
            .iter()
            .map(|row| {
                let shards = row.iter().map(|addr| factory.client(addr)).collect();
                DistributionCoordinator::new(&schema.name, shards)
            })
            .collect();

        Self {
            schema: schema.name.clone(),
            groups,
        }
    }

    /// Write-all. The content arrives by value and is buffered once so it
    /// can be replayed to every group; `Bytes` clones share the buffer.
    pub async fn put(
        &self,
        path: &str,
        content: Bytes,
        last_modified: u64,
        explicit: Option<usize>,
    ) -> Result<()> {
        let results = join_all(
            self.groups
                .iter()
                .map(|group| group.put(path, content.clone(), last_modified, explicit)),
        )
        .await;

        for outcome in results {
            outcome?;
        }
        tracing::debug!(
            "PUT {}/{} replicated to {} group(s)",
            self.schema,
            path,
            self.groups.len()
        );
        Ok(())
    }

    /// Read-any with failover: the first group that knows the path answers.
    /// A file resolves to a redirect-style pointer at the owning node; a
    /// directory resolves to the fully merged listing across all groups.
    /// The last error is surfaced only when every group failed or missed.
    pub async fn resolve(&self, path: &str, explicit: Option<usize>) -> Result<Option<Resolved>> {
        let mut last_err: Option<StoreError> = None;

        for group in &self.groups {
            match group.head(path, explicit).await {
                Ok(Some(location)) => {
                    if location.metadata.kind == FileKind::Directory {
                        let listing = self.list_dir(path).await?.unwrap_or_default();
                        return Ok(Some(Resolved::Directory(listing)));
                    }
                    return Ok(Some(Resolved::File(location)));
                }
                Ok(None) => {}
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Read-any content fetch, same group order as `resolve`.
    pub async fn get(&self, path: &str, explicit: Option<usize>) -> Result<Option<FileContent>> {
        let mut last_err: Option<StoreError> = None;

        for group in &self.groups {
            match group.get(path, explicit).await {
                Ok(Some(content)) => return Ok(Some(content)),
                Ok(None) => {}
                Err(e) => last_err = Some(e),
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    /// Concurrent delete across all groups. `true` when any group had the
    /// file; per-group misses are tolerated, real failures are not.
    pub async fn delete(&self, path: &str) -> Result<bool> {
        let results = join_all(self.groups.iter().map(|group| group.delete(path))).await;

        let mut deleted = false;
        for outcome in results {
            if outcome? {
                deleted = true;
            }
        }
        Ok(deleted)
    }

    /// Full inventory of every physical copy under `path`, merged across
    /// all groups. This is the structure the repair engine walks.
    pub async fn list_dir(&self, path: &str) -> Result<Option<DirectoryListing>> {
        let results = join_all(self.groups.iter().map(|group| group.list_dir(path))).await;

        let mut merged: Option<DirectoryListing> = None;
        for outcome in results {
            if let Some(listing) = outcome? {
                match merged.as_mut() {
                    Some(target) => target.merge(listing),
                    None => merged = Some(listing),
                }
            }
        }
        Ok(merged)
    }
}
