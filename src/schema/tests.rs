//! Schema Registry Tests
//!
//! Lifecycle over in-memory nodes and a temp persistence file: grid
//! assignment from the live pool, validation of supplied grids, creation
//! conflicts, teardown on delete, and reload from disk.

use crate::membership::{BLOBSTORE_SERVICE, NodeDirectory};
use crate::node::client::NodeClient;
use crate::node::testutil::MemoryCluster;
use crate::repair::engine::RepairEngine;
use crate::schema::registry::SchemaRegistry;
use crate::schema::types::SchemaDef;
use bytes::Bytes;
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    cluster: Arc<MemoryCluster>,
    registry: Arc<SchemaRegistry>,
    _dir: TempDir,
}

fn fixture(live_nodes: &[&str]) -> Fixture {
    let dir = TempDir::new().unwrap();
    let cluster = MemoryCluster::new();
    let directory = Arc::new(NodeDirectory::with_nodes(
        BLOBSTORE_SERVICE,
        live_nodes.iter().map(|s| s.to_string()).collect(),
    ));
    let repair = RepairEngine::new(cluster.clone());
    let registry = SchemaRegistry::load(
        dir.path().join("schemas.json"),
        directory,
        cluster.clone(),
        repair,
    )
    .unwrap();
    Fixture {
        cluster,
        registry,
        _dir: dir,
    }
}

fn def(replication: usize, distribution: usize, nodes: Vec<Vec<String>>) -> SchemaDef {
    SchemaDef {
        replication_factor: replication,
        distribution_factor: distribution,
        nodes,
    }
}

#[tokio::test]
async fn create_assigns_a_full_grid_from_the_live_pool() {
    let fx = fixture(&["n1:9000", "n2:9000", "n3:9000", "n4:9000"]);

    let schema = fx
        .registry
        .create("docs", def(2, 2, Vec::new()))
        .await
        .unwrap();

    assert_eq!(schema.nodes.len(), 2);
    assert!(schema.nodes.iter().all(|row| row.len() == 2));
    let distinct: HashSet<&String> = schema.all_nodes().collect();
    assert_eq!(distinct.len(), 4, "every grid slot gets its own node");

    // Every assigned node was provisioned with the schema directory.
    for addr in schema.all_nodes() {
        assert!(fx.cluster.node(addr).list_dir("docs", "").await.unwrap().is_some());
    }
}

#[tokio::test]
async fn create_rejects_a_duplicate_name() {
    let fx = fixture(&["n1:9000", "n2:9000"]);

    fx.registry.create("docs", def(1, 2, Vec::new())).await.unwrap();
    let err = fx
        .registry
        .create("docs", def(1, 2, Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
}

#[tokio::test]
async fn create_fails_when_the_pool_is_too_small() {
    let fx = fixture(&["n1:9000", "n2:9000", "n3:9000"]);

    let err = fx
        .registry
        .create("docs", def(2, 2, Vec::new()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_ACCEPTABLE);
    assert!(fx.registry.list().await.is_empty());
}

#[tokio::test]
async fn create_validates_a_supplied_grid() {
    let fx = fixture(&[]);

    // Row count does not match the replication factor.
    let err = fx
        .registry
        .create("docs", def(2, 1, vec![vec!["n1:9000".to_string()]]))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_ACCEPTABLE);

    // Same address twice in the grid.
    let err = fx
        .registry
        .create(
            "docs",
            def(
                2,
                1,
                vec![vec!["n1:9000".to_string()], vec!["n1:9000".to_string()]],
            ),
        )
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_ACCEPTABLE);

    // A well-formed explicit grid is taken as-is.
    let schema = fx
        .registry
        .create(
            "docs",
            def(
                2,
                1,
                vec![vec!["n1:9000".to_string()], vec!["n2:9000".to_string()]],
            ),
        )
        .await
        .unwrap();
    assert_eq!(schema.nodes[0], vec!["n1:9000"]);
    assert_eq!(schema.nodes[1], vec!["n2:9000"]);
}

#[tokio::test]
async fn get_and_list_reflect_the_registry_contents() {
    let fx = fixture(&["n1:9000", "n2:9000"]);

    assert!(fx.registry.get("docs").await.is_err());
    assert!(fx.registry.list().await.is_empty());

    fx.registry.create("logs", def(1, 1, Vec::new())).await.unwrap();
    fx.registry.create("docs", def(1, 1, Vec::new())).await.unwrap();

    assert_eq!(fx.registry.list().await, vec!["docs", "logs"]);
    assert_eq!(fx.registry.get("docs").await.unwrap().name, "docs");
}

#[tokio::test]
async fn delete_tears_down_every_node_and_forgets_the_definition() {
    let fx = fixture(&["n1:9000", "n2:9000", "n3:9000", "n4:9000"]);

    let schema = fx
        .registry
        .create("docs", def(2, 2, Vec::new()))
        .await
        .unwrap();
    let coordinator = fx.registry.coordinator("docs").await.unwrap();
    coordinator
        .put("a/b.txt", Bytes::from_static(b"hello"), 1000, None)
        .await
        .unwrap();

    fx.registry.delete("docs").await.unwrap();

    assert!(fx.registry.get("docs").await.is_err());
    for addr in schema.all_nodes() {
        let node = fx.cluster.node(addr);
        assert_eq!(node.file_count(), 0);
        assert!(node.list_dir("docs", "").await.unwrap().is_none());
    }

    let err = fx.registry.delete("docs").await.unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn definitions_survive_a_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("schemas.json");
    let cluster = MemoryCluster::new();
    let directory = Arc::new(NodeDirectory::with_nodes(
        BLOBSTORE_SERVICE,
        vec!["n1:9000".to_string(), "n2:9000".to_string()],
    ));

    {
        let registry = SchemaRegistry::load(
            &path,
            directory.clone(),
            cluster.clone(),
            RepairEngine::new(cluster.clone()),
        )
        .unwrap();
        registry.create("docs", def(1, 2, Vec::new())).await.unwrap();
    }

    let reloaded = SchemaRegistry::load(
        &path,
        directory,
        cluster.clone(),
        RepairEngine::new(cluster.clone()),
    )
    .unwrap();
    let schema = reloaded.get("docs").await.unwrap();
    assert_eq!(schema.distribution_factor, 2);
    assert_eq!(schema.nodes[0].len(), 2);
}
