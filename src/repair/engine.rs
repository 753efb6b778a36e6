//! Anti-Entropy Repair Engine
//!
//! One background worker per schema walks the merged directory tree,
//! compares the physical copies of every file, and copies the most recent
//! non-empty version over lagging or missing replicas
//! (last-modified-wins). The write-all path never repairs inline; this
//! engine is the only mechanism that heals divergence left behind by
//! partial write failures or briefly unreachable nodes.
//!
//! Cancellation is cooperative: the abort flag is polled at every
//! directory and file boundary, and the worker finishes its current unit
//! of work before terminating. The join handle is retained so schema
//! deletion and service shutdown can await the worker deterministically.

use crate::coordinator::replication::ReplicationCoordinator;
use crate::error::{Result, StoreError};
use crate::node::client::NodeClientFactory;
use crate::node::protocol::{FileMetadata, now_ms};
use crate::placement::shard_index;
use crate::repair::types::RepairStatus;
use crate::schema::types::Schema;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

struct RepairTask {
    status: RwLock<RepairStatus>,
    abort: AtomicBool,
    handle: Mutex<Option<JoinHandle<()>>>,
}

pub struct RepairEngine {
    factory: Arc<dyn NodeClientFactory>,
    /// Schema name -> repair slot. Structural changes (start, teardown)
    /// take the write lock; status queries share the read lock.
    tasks: RwLock<HashMap<String, Arc<RepairTask>>>,
}

impl RepairEngine {
    pub fn new(factory: Arc<dyn NodeClientFactory>) -> Arc<Self> {
        Arc::new(Self {
            factory,
            tasks: RwLock::new(HashMap::new()),
        })
    }

    /// Starts a repair worker for the schema and returns its initial
    /// status. Fails `Conflict` while a previous repair is still running
    /// or aborting; a terminated run is replaced.
    pub async fn start(
        &self,
        schema: Schema,
        coordinator: ReplicationCoordinator,
    ) -> Result<RepairStatus> {
        let mut tasks = self.tasks.write().await;

        if let Some(existing) = tasks.get(&schema.name) {
            let status = existing.status.read().await;
            if !status.terminated {
                return Err(StoreError::Conflict(format!(
                    "repair already running for schema {}",
                    schema.name
                )));
            }
        }

        let initial = RepairStatus::started(now_ms());
        let task = Arc::new(RepairTask {
            status: RwLock::new(initial.clone()),
            abort: AtomicBool::new(false),
            handle: Mutex::new(None),
        });
        tasks.insert(schema.name.clone(), task.clone());

        tracing::info!("Starting repair of schema {}", schema.name);
        let worker = {
            let task = task.clone();
            let factory = self.factory.clone();
            tokio::spawn(async move {
                run_worker(task, schema, coordinator, factory).await;
            })
        };
        *task.handle.lock().await = Some(worker);

        Ok(initial)
    }

    /// Requests an abort and returns the current status without waiting
    /// for the worker to wind down.
    pub async fn stop(&self, schema: &str) -> Result<RepairStatus> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(schema)
            .ok_or_else(|| StoreError::NotFound(format!("no repair for schema {}", schema)))?;

        let mut status = task.status.write().await;
        if !status.terminated {
            task.abort.store(true, Ordering::SeqCst);
            status.aborting = true;
            tracing::info!("Abort requested for repair of schema {}", schema);
        }
        Ok(status.clone())
    }

    /// Fails `NotFound` when no repair was ever started for the schema.
    pub async fn status(&self, schema: &str) -> Result<RepairStatus> {
        let tasks = self.tasks.read().await;
        let task = tasks
            .get(schema)
            .ok_or_else(|| StoreError::NotFound(format!("no repair for schema {}", schema)))?;
        let status = task.status.read().await.clone();
        Ok(status)
    }

    /// Aborts and awaits the schema's worker, then drops its status slot.
    /// Called when the schema is deleted or the service shuts down.
    pub async fn shutdown(&self, schema: &str) {
        let removed = self.tasks.write().await.remove(schema);
        if let Some(task) = removed {
            task.abort.store(true, Ordering::SeqCst);
            let handle = task.handle.lock().await.take();
            if let Some(handle) = handle {
                if let Err(e) = handle.await {
                    tracing::warn!("Repair worker for {} did not join cleanly: {}", schema, e);
                }
            }
        }
    }
}

async fn run_worker(
    task: Arc<RepairTask>,
    schema: Schema,
    coordinator: ReplicationCoordinator,
    factory: Arc<dyn NodeClientFactory>,
) {
    let outcome = walk(&task, &schema, &coordinator, factory.as_ref()).await;

    let mut status = task.status.write().await;
    status.running = false;
    status.aborting = false;
    status.terminated = true;
    status.end_time = Some(now_ms());

    match outcome {
        Ok(()) => {
            tracing::info!(
                "Repair of schema {} finished: {} dir(s), {} file(s) checked, {} repaired",
                schema.name,
                status.checked_directories,
                status.checked_files,
                status.repaired_files
            );
        }
        Err(e) => {
            tracing::error!("Repair of schema {} failed: {}", schema.name, e);
            status.error = Some(e.to_string());
        }
    }
}

async fn walk(
    task: &RepairTask,
    schema: &Schema,
    coordinator: &ReplicationCoordinator,
    factory: &dyn NodeClientFactory,
) -> Result<()> {
    let mut pending = vec![String::new()];

    while let Some(dir) = pending.pop() {
        if task.abort.load(Ordering::SeqCst) {
            return Ok(());
        }
        {
            let mut status = task.status.write().await;
            status.checked_directories += 1;
            status.current_path = display_path(&dir);
        }

        let listing = match coordinator.list_dir(&dir).await? {
            Some(listing) => listing,
            None => continue,
        };

        for name in listing.directories.keys() {
            pending.push(join_path(&dir, name));
        }

        for (name, copies) in &listing.files {
            if task.abort.load(Ordering::SeqCst) {
                return Ok(());
            }
            let path = join_path(&dir, name);
            {
                let mut status = task.status.write().await;
                status.checked_files += 1;
                status.current_path = display_path(&path);
            }

            if !needs_repair(copies, schema.replication_factor) {
                continue;
            }
            if repair_file(schema, &path, copies, factory).await? {
                task.status.write().await.repaired_files += 1;
            }
        }
    }
    Ok(())
}

/// A file needs repair when it is missing copies (or carries strays) or
/// when any two copies disagree on kind, size, or modification time.
fn needs_repair(copies: &BTreeMap<String, FileMetadata>, expected_copies: usize) -> bool {
    if copies.len() != expected_copies {
        return true;
    }
    let mut entries = copies.values();
    match entries.next() {
        Some(first) => entries.any(|metadata| metadata != first),
        None => false,
    }
}

/// Copies the lead version over every divergent or missing replica.
/// Returns whether anything was written.
async fn repair_file(
    schema: &Schema,
    path: &str,
    copies: &BTreeMap<String, FileMetadata>,
    factory: &dyn NodeClientFactory,
) -> Result<bool> {
    // Lead copy: latest modification time among non-empty copies. When
    // every copy is empty there is nothing trustworthy to replay.
    let lead = copies
        .iter()
        .filter(|(_, metadata)| metadata.size.unwrap_or(0) > 0)
        .max_by_key(|(_, metadata)| metadata.last_modified);
    let (lead_addr, lead_meta) = match lead {
        Some(found) => found,
        None => {
            tracing::warn!(
                "Cannot repair {}/{}: every copy is empty",
                schema.name,
                path
            );
            return Ok(false);
        }
    };

    let content = factory
        .client(lead_addr)
        .get_file(&schema.name, path)
        .await?
        .ok_or_else(|| {
            StoreError::Internal(format!(
                "lead copy of {}/{} disappeared from {}",
                schema.name, path, lead_addr
            ))
        })?;

    // Expected copy set: the file's hash shard in every group, plus any
    // node already holding a copy (strays from explicit-target writes).
    let shard = shard_index(path, schema.distribution_factor, None)?;
    let mut targets: BTreeSet<String> = schema
        .nodes
        .iter()
        .filter_map(|row| row.get(shard).cloned())
        .collect();
    targets.extend(copies.keys().cloned());

    let mut wrote = false;
    for addr in targets {
        if addr == *lead_addr || copies.get(&addr) == Some(lead_meta) {
            continue;
        }
        tracing::info!(
            "Repairing {}/{} on {} from lead {}",
            schema.name,
            path,
            addr,
            lead_addr
        );
        factory
            .client(&addr)
            .put_file(&schema.name, path, content.bytes.clone(), lead_meta.last_modified)
            .await?;
        wrote = true;
    }
    Ok(wrote)
}

fn join_path(dir: &str, name: &str) -> String {
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

fn display_path(path: &str) -> String {
    format!("/{}", path)
}
