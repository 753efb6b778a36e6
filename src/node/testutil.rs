//! In-memory `NodeClient` doubles for coordinator and repair tests.
//!
//! `MemoryNode` mimics one node's directory store over a map keyed by
//! `(schema, path)`; `MemoryCluster` is the matching factory. Failure and
//! latency switches let tests take a node offline or keep a repair running
//! long enough to observe intermediate states.

use crate::error::{Result, StoreError};
use crate::node::client::{FileContent, NodeClient, NodeClientFactory};
use crate::node::protocol::{FileKind, FileMetadata, NodeListing};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

pub struct MemoryNode {
    addr: String,
    files: DashMap<(String, String), (Bytes, u64)>,
    schemas: DashMap<String, ()>,
    /// When set, every call answers with a remote error.
    pub fail: AtomicBool,
    /// Artificial latency in milliseconds applied to every call.
    pub delay_ms: AtomicU64,
}

impl MemoryNode {
    pub fn new(addr: &str) -> Arc<Self> {
        Arc::new(Self {
            addr: addr.to_string(),
            files: DashMap::new(),
            schemas: DashMap::new(),
            fail: AtomicBool::new(false),
            delay_ms: AtomicU64::new(0),
        })
    }

    /// Writes a copy directly, bypassing the client interface. Used to
    /// manufacture divergent replicas.
    pub fn set_file_raw(&self, schema: &str, path: &str, content: &[u8], last_modified: u64) {
        self.schemas.insert(schema.to_string(), ());
        self.files.insert(
            (schema.to_string(), path.to_string()),
            (Bytes::copy_from_slice(content), last_modified),
        );
    }

    pub fn file(&self, schema: &str, path: &str) -> Option<(Bytes, u64)> {
        self.files
            .get(&(schema.to_string(), path.to_string()))
            .map(|entry| entry.value().clone())
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    async fn checkpoint(&self, op: &str) -> Result<()> {
        let delay = self.delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail.load(Ordering::Relaxed) {
            return Err(StoreError::Remote(format!(
                "{}: simulated {} failure",
                self.addr, op
            )));
        }
        Ok(())
    }

    fn has_child_under(&self, schema: &str, dir: &str) -> bool {
        let prefix = child_prefix(dir);
        self.files
            .iter()
            .any(|entry| entry.key().0 == schema && entry.key().1.starts_with(&prefix))
    }
}

fn child_prefix(dir: &str) -> String {
    if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    }
}

#[async_trait]
impl NodeClient for MemoryNode {
    fn address(&self) -> &str {
        &self.addr
    }

    async fn get_file(&self, schema: &str, path: &str) -> Result<Option<FileContent>> {
        self.checkpoint("get").await?;
        Ok(self.file(schema, path).map(|(bytes, last_modified)| {
            FileContent {
                bytes,
                last_modified,
            }
        }))
    }

    async fn head_file(&self, schema: &str, path: &str) -> Result<Option<FileMetadata>> {
        self.checkpoint("head").await?;

        if let Some((bytes, last_modified)) = self.file(schema, path) {
            return Ok(Some(FileMetadata {
                kind: FileKind::File,
                size: Some(bytes.len() as u64),
                last_modified,
            }));
        }
        let is_dir = (path.is_empty() && self.schemas.contains_key(schema))
            || self.has_child_under(schema, path);
        if is_dir {
            return Ok(Some(FileMetadata {
                kind: FileKind::Directory,
                size: None,
                last_modified: 0,
            }));
        }
        Ok(None)
    }

    async fn put_file(
        &self,
        schema: &str,
        path: &str,
        content: Bytes,
        last_modified: u64,
    ) -> Result<()> {
        self.checkpoint("put").await?;
        self.schemas.insert(schema.to_string(), ());
        self.files
            .insert((schema.to_string(), path.to_string()), (content, last_modified));
        Ok(())
    }

    async fn delete_file(&self, schema: &str, path: &str) -> Result<bool> {
        self.checkpoint("delete").await?;

        if self
            .files
            .remove(&(schema.to_string(), path.to_string()))
            .is_some()
        {
            return Ok(true);
        }
        // Directory delete removes the whole subtree.
        let prefix = child_prefix(path);
        if path.is_empty() {
            return Ok(false);
        }
        let doomed: Vec<(String, String)> = self
            .files
            .iter()
            .filter(|entry| entry.key().0 == schema && entry.key().1.starts_with(&prefix))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &doomed {
            self.files.remove(key);
        }
        Ok(!doomed.is_empty())
    }

    async fn list_dir(&self, schema: &str, path: &str) -> Result<Option<NodeListing>> {
        self.checkpoint("list").await?;

        let is_root = path.is_empty();
        if !(is_root && self.schemas.contains_key(schema)) && !self.has_child_under(schema, path) {
            return Ok(None);
        }

        let prefix = child_prefix(path);
        let mut listing = NodeListing::default();
        for entry in self.files.iter() {
            let (file_schema, file_path) = entry.key();
            if file_schema != schema || !file_path.starts_with(&prefix) {
                continue;
            }
            let remainder = &file_path[prefix.len()..];
            match remainder.split_once('/') {
                Some((child_dir, _)) => {
                    listing.directories.insert(
                        child_dir.to_string(),
                        FileMetadata {
                            kind: FileKind::Directory,
                            size: None,
                            last_modified: 0,
                        },
                    );
                }
                None => {
                    let (bytes, last_modified) = entry.value();
                    listing.files.insert(
                        remainder.to_string(),
                        FileMetadata {
                            kind: FileKind::File,
                            size: Some(bytes.len() as u64),
                            last_modified: *last_modified,
                        },
                    );
                }
            }
        }
        Ok(Some(listing))
    }

    async fn create_schema_dir(&self, schema: &str) -> Result<()> {
        self.checkpoint("create schema dir").await?;
        self.schemas.insert(schema.to_string(), ());
        Ok(())
    }

    async fn delete_schema_dir(&self, schema: &str) -> Result<()> {
        self.checkpoint("delete schema dir").await?;
        self.schemas.remove(schema);
        let doomed: Vec<(String, String)> = self
            .files
            .iter()
            .filter(|entry| entry.key().0 == schema)
            .map(|entry| entry.key().clone())
            .collect();
        for key in &doomed {
            self.files.remove(key);
        }
        Ok(())
    }
}

/// Factory over a fixed set of in-memory nodes, created on first use.
pub struct MemoryCluster {
    nodes: DashMap<String, Arc<MemoryNode>>,
}

impl MemoryCluster {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            nodes: DashMap::new(),
        })
    }

    pub fn node(&self, addr: &str) -> Arc<MemoryNode> {
        self.nodes
            .entry(addr.to_string())
            .or_insert_with(|| MemoryNode::new(addr))
            .clone()
    }
}

impl NodeClientFactory for MemoryCluster {
    fn client(&self, addr: &str) -> Arc<dyn NodeClient> {
        self.node(addr)
    }
}
