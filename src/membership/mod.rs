//! Cluster Membership Directory
//!
//! The rest of the store only ever asks one question of the cluster layer:
//! "which nodes tagged with this service are live right now?". This module
//! answers it. Node addresses are seeded from the peer list the binary is
//! started with; a discovery protocol can refresh the directory at runtime
//! through the same `set_live_nodes` surface.

use dashmap::DashMap;

/// Name under which blob store nodes register themselves.
pub const BLOBSTORE_SERVICE: &str = "blobstore";

/// Directory of live node addresses, keyed by service name.
pub struct NodeDirectory {
    services: DashMap<String, Vec<String>>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self {
            services: DashMap::new(),
        }
    }

    /// Builds a directory with the given addresses registered for `service`.
    pub fn with_nodes(service: &str, addrs: Vec<String>) -> Self {
        let directory = Self::new();
        directory.set_live_nodes(service, addrs);
        directory
    }

    /// Replaces the live-node set for a service.
    pub fn set_live_nodes(&self, service: &str, addrs: Vec<String>) {
        tracing::debug!("Registered {} node(s) for service {}", addrs.len(), service);
        self.services.insert(service.to_string(), addrs);
    }

    /// Addresses currently known live for a service. Empty when the service
    /// was never registered.
    pub fn live_nodes(&self, service: &str) -> Vec<String> {
        self.services
            .get(service)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }
}

impl Default for NodeDirectory {
    fn default() -> Self {
        Self::new()
    }
}
