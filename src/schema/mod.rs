//! Schema Management Module
//!
//! A schema is a logical bucket with a fixed placement: `replication_factor`
//! independent groups of `distribution_factor` shard nodes. This module owns
//! the definitions — validation, grid assignment, JSON persistence, and the
//! lifecycle fan-out that provisions and tears down the grid.

pub mod handlers;
pub mod registry;
pub mod types;

#[cfg(test)]
mod tests;
