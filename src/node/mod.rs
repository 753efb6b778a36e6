//! Single-Node Storage Layer
//!
//! Everything one physical node contributes to the store:
//!
//! - **`store`**: create/read/delete/list over a local directory tree, one
//!   subdirectory per schema.
//! - **`protocol`**: endpoint constants and DTOs of the internal node API.
//! - **`handlers`**: the axum routes serving `store` to remote peers.
//! - **`client`**: the `NodeClient` facade coordinators use to reach a node,
//!   plus its HTTP implementation.

pub mod client;
pub mod handlers;
pub mod protocol;
pub mod store;

#[cfg(test)]
pub mod testutil;
