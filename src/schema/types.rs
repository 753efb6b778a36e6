//! Schema Definitions
//!
//! A schema is the unit of placement: a name, its replication and
//! distribution factors, and the node grid assigned at creation time. Grids
//! are immutable once assigned — there is no live rebalancing.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_factor() -> usize {
    1
}

/// Wire and persistence shape of a schema definition.
///
/// `nodes` may be omitted on creation, in which case the registry assigns a
/// grid from the live node pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaDef {
    #[serde(default = "default_factor")]
    pub replication_factor: usize,
    #[serde(default = "default_factor")]
    pub distribution_factor: usize,
    #[serde(default)]
    pub nodes: Vec<Vec<String>>,
}

/// A named schema with its assigned grid.
///
/// Invariant: `nodes` has exactly `replication_factor` rows of exactly
/// `distribution_factor` addresses each, and no address appears twice in
/// the whole grid. Row `r` is one complete replication group; column `s`
/// is the shard owning `hash(path) mod distribution_factor == s`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub replication_factor: usize,
    pub distribution_factor: usize,
    pub nodes: Vec<Vec<String>>,
}

impl Schema {
    pub fn from_def(name: &str, def: SchemaDef) -> Self {
        Self {
            name: name.to_string(),
            replication_factor: def.replication_factor,
            distribution_factor: def.distribution_factor,
            nodes: def.nodes,
        }
    }

    pub fn def(&self) -> SchemaDef {
        SchemaDef {
            replication_factor: self.replication_factor,
            distribution_factor: self.distribution_factor,
            nodes: self.nodes.clone(),
        }
    }

    /// Every node address in the grid, row-major.
    pub fn all_nodes(&self) -> impl Iterator<Item = &String> {
        self.nodes.iter().flatten()
    }

    /// Checks the grid invariant against the declared factors.
    pub fn validate_grid(&self) -> Result<()> {
        if self.replication_factor == 0 || self.distribution_factor == 0 {
            return Err(StoreError::NotAcceptable(format!(
                "schema {}: replication and distribution factors must be at least 1",
                self.name
            )));
        }
        if self.nodes.len() != self.replication_factor {
            return Err(StoreError::NotAcceptable(format!(
                "schema {}: grid has {} row(s), expected replication factor {}",
                self.name,
                self.nodes.len(),
                self.replication_factor
            )));
        }
        for (row_idx, row) in self.nodes.iter().enumerate() {
            if row.len() != self.distribution_factor {
                return Err(StoreError::NotAcceptable(format!(
                    "schema {}: grid row {} has {} node(s), expected distribution factor {}",
                    self.name,
                    row_idx,
                    row.len(),
                    self.distribution_factor
                )));
            }
        }

        let mut seen = HashSet::new();
        for addr in self.all_nodes() {
            if !seen.insert(addr) {
                return Err(StoreError::NotAcceptable(format!(
                    "schema {}: node {} appears more than once in the grid",
                    self.name, addr
                )));
            }
        }
        Ok(())
    }
}
