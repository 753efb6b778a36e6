//! Schema Registry
//!
//! CRUD over schema definitions with JSON file persistence. Creation
//! assigns a node grid when none is supplied; deletion tears down the
//! schema everywhere — repair worker first, then every node's local
//! directory, then the persisted definition.
//!
//! The in-memory map sits behind a reader/writer lock: lookups run in
//! parallel, create/delete serialize.

use crate::coordinator::replication::ReplicationCoordinator;
use crate::error::{Result, StoreError};
use crate::membership::{BLOBSTORE_SERVICE, NodeDirectory};
use crate::node::client::NodeClientFactory;
use crate::placement::assign_grid;
use crate::repair::engine::RepairEngine;
use crate::schema::types::{Schema, SchemaDef};
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

pub struct SchemaRegistry {
    schemas: RwLock<HashMap<String, Schema>>,
    persist_path: PathBuf,
    directory: Arc<NodeDirectory>,
    factory: Arc<dyn NodeClientFactory>,
    repair: Arc<RepairEngine>,
}

impl SchemaRegistry {
    /// Opens the registry, loading previously persisted definitions if the
    /// file exists.
    pub fn load(
        persist_path: impl Into<PathBuf>,
        directory: Arc<NodeDirectory>,
        factory: Arc<dyn NodeClientFactory>,
        repair: Arc<RepairEngine>,
    ) -> Result<Arc<Self>> {
        let persist_path = persist_path.into();
        let mut schemas = HashMap::new();

        if persist_path.is_file() {
            let raw = std::fs::read_to_string(&persist_path)?;
            let defs: BTreeMap<String, SchemaDef> = serde_json::from_str(&raw)?;
            for (name, def) in defs {
                schemas.insert(name.clone(), Schema::from_def(&name, def));
            }
            tracing::info!(
                "Loaded {} schema definition(s) from {}",
                schemas.len(),
                persist_path.display()
            );
        }

        Ok(Arc::new(Self {
            schemas: RwLock::new(schemas),
            persist_path,
            directory,
            factory,
            repair,
        }))
    }

    /// Creates a schema. Assigns a grid from the live node pool when the
    /// definition carries none, otherwise validates the supplied grid
    /// against the declared factors. Provisions the schema directory on
    /// every grid node before the definition becomes visible.
    pub async fn create(&self, name: &str, mut def: SchemaDef) -> Result<Schema> {
        let mut schemas = self.schemas.write().await;
        if schemas.contains_key(name) {
            return Err(StoreError::Conflict(format!(
                "schema {} already exists",
                name
            )));
        }

        if def.nodes.is_empty() {
            let live = self.directory.live_nodes(BLOBSTORE_SERVICE);
            def.nodes = assign_grid(&live, def.replication_factor, def.distribution_factor)?;
        }
        let schema = Schema::from_def(name, def);
        schema.validate_grid()?;

        let created = join_all(schema.all_nodes().map(|addr| {
            let client = self.factory.client(addr);
            async move { client.create_schema_dir(name).await }
        }))
        .await;
        for outcome in created {
            outcome?;
        }

        schemas.insert(name.to_string(), schema.clone());
        self.persist(&schemas)?;
        tracing::info!(
            "Created schema {} ({}x{} grid)",
            name,
            schema.replication_factor,
            schema.distribution_factor
        );
        Ok(schema)
    }

    pub async fn get(&self, name: &str) -> Result<Schema> {
        self.schemas
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("schema {} does not exist", name)))
    }

    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.schemas.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Deletes a schema: aborts and awaits its repair worker, tears down
    /// the local directory on every grid node, then drops the definition.
    /// A teardown failure keeps the definition so the delete can be
    /// retried.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut schemas = self.schemas.write().await;
        let schema = schemas
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("schema {} does not exist", name)))?;

        self.repair.shutdown(name).await;

        let torn_down = join_all(schema.all_nodes().map(|addr| {
            let client = self.factory.client(addr);
            async move { client.delete_schema_dir(name).await }
        }))
        .await;
        for outcome in torn_down {
            outcome?;
        }

        schemas.remove(name);
        self.persist(&schemas)?;
        tracing::info!("Deleted schema {}", name);
        Ok(())
    }

    /// Builds the fan-out tree executing file operations for a schema.
    pub async fn coordinator(&self, name: &str) -> Result<ReplicationCoordinator> {
        let schema = self.get(name).await?;
        Ok(ReplicationCoordinator::for_schema(
            &schema,
            self.factory.as_ref(),
        ))
    }

    fn persist(&self, schemas: &HashMap<String, Schema>) -> Result<()> {
        let defs: BTreeMap<&String, SchemaDef> = schemas
            .iter()
            .map(|(name, schema)| (name, schema.def()))
            .collect();
        let raw = serde_json::to_string_pretty(&defs)?;
        std::fs::write(&self.persist_path, raw)?;
        Ok(())
    }
}
