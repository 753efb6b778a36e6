use axum::{
    Router,
    extract::Extension,
    routing::{get, post},
};
use blobgrid::coordinator::handlers::{handle_delete, handle_get, handle_head, handle_put};
use blobgrid::membership::{BLOBSTORE_SERVICE, NodeDirectory};
use blobgrid::node::client::HttpNodeClientFactory;
use blobgrid::node::handlers::{
    handle_create_schema_dir, handle_delete_file, handle_delete_schema_dir, handle_get_file,
    handle_get_meta, handle_list_dir, handle_list_root, handle_put_file,
};
use blobgrid::node::store::LocalStore;
use blobgrid::repair::engine::RepairEngine;
use blobgrid::repair::handlers::{handle_repair_start, handle_repair_status, handle_repair_stop};
use blobgrid::schema::handlers::{
    handle_create_schema, handle_delete_schema, handle_get_schema, handle_list_schemas,
};
use blobgrid::schema::registry::SchemaRegistry;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug)]
struct CliArgs {
    bind_addr: SocketAddr,
    data_dir: String,
    peer_nodes: Vec<String>,
    schemas_file: String,
    log_level: tracing::Level,
}

fn flag_value<'a>(args: &'a [String], i: usize) -> anyhow::Result<&'a str> {
    args.get(i + 1)
        .map(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("{} requires a value", args[i]))
}

fn parse_args(args: &[String]) -> anyhow::Result<CliArgs> {
    let mut bind_addr: Option<SocketAddr> = None;
    let mut data_dir: Option<String> = None;
    let mut peer_nodes: Vec<String> = vec![];
    let mut schemas_file: Option<String> = None;
    let mut log_level = tracing::Level::INFO;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" => {
                bind_addr = Some(flag_value(args, i)?.parse()?);
            }
            "--data-dir" => {
                data_dir = Some(flag_value(args, i)?.to_string());
            }
            "--node" => {
                peer_nodes.push(flag_value(args, i)?.to_string());
            }
            "--schemas" => {
                schemas_file = Some(flag_value(args, i)?.to_string());
            }
            "--log-level" => {
                let value = flag_value(args, i)?;
                log_level = value
                    .parse()
                    .map_err(|_| anyhow::anyhow!("unknown log level {}", value))?;
            }
            other => anyhow::bail!("unknown argument {}", other),
        }
        i += 2;
    }

    let bind_addr = bind_addr.ok_or_else(|| anyhow::anyhow!("--bind is required"))?;
    let data_dir = data_dir.ok_or_else(|| anyhow::anyhow!("--data-dir is required"))?;
    if peer_nodes.is_empty() {
        // Single-node cluster: this process is its own storage pool.
        peer_nodes.push(bind_addr.to_string());
    }
    let schemas_file =
        schemas_file.unwrap_or_else(|| format!("{}/schemas.json", data_dir.trim_end_matches('/')));

    Ok(CliArgs {
        bind_addr,
        data_dir,
        peer_nodes,
        schemas_file,
        log_level,
    })
}

fn usage(binary: &str) {
    eprintln!(
        "Usage: {} --bind <addr:port> --data-dir <dir> [--node <addr:port>]... \\",
        binary
    );
    eprintln!("          [--schemas <file>] [--log-level <trace|debug|info|warn|error>]");
    eprintln!(
        "Example: {} --bind 127.0.0.1:5000 --data-dir /var/lib/blobgrid \\",
        binary
    );
    eprintln!("             --node 127.0.0.1:5000 --node 127.0.0.1:5001");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let cli = match parse_args(&args[1..]) {
        Ok(cli) => cli,
        Err(e) => {
            eprintln!("{}", e);
            usage(&args[0]);
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level)
        .init();

    tracing::info!("Starting blobgrid node on {}", cli.bind_addr);
    tracing::info!("Data directory: {}", cli.data_dir);
    tracing::info!("Peer nodes: {:?}", cli.peer_nodes);

    // 1. Node-local storage:
    let store = Arc::new(LocalStore::new(&cli.data_dir)?);

    // 2. Cluster directory and the RPC client pool:
    let directory = Arc::new(NodeDirectory::with_nodes(BLOBSTORE_SERVICE, cli.peer_nodes));
    let factory = Arc::new(HttpNodeClientFactory::new());

    // 3. Repair engine and the schema registry on top of it:
    let repair = RepairEngine::new(factory.clone());
    let registry = SchemaRegistry::load(cli.schemas_file, directory, factory, repair.clone())?;

    // 4. HTTP router. Literal segments win over captures, so the internal
    //    and repair routes are not shadowed by `/:schema/*path`.
    let app = Router::new()
        .route("/", get(handle_list_schemas))
        .route(
            "/:schema",
            get(handle_get_schema)
                .post(handle_create_schema)
                .delete(handle_delete_schema),
        )
        .route(
            "/:schema/repair",
            get(handle_repair_status)
                .post(handle_repair_start)
                .delete(handle_repair_stop),
        )
        .route(
            "/:schema/*path",
            get(handle_get)
                .head(handle_head)
                .put(handle_put)
                .delete(handle_delete),
        )
        .route(
            "/internal/file/:schema/*path",
            get(handle_get_file)
                .put(handle_put_file)
                .delete(handle_delete_file),
        )
        .route("/internal/meta/:schema/*path", get(handle_get_meta))
        .route("/internal/list/:schema", get(handle_list_root))
        .route("/internal/list/:schema/*path", get(handle_list_dir))
        .route(
            "/internal/schema/:schema",
            post(handle_create_schema_dir).delete(handle_delete_schema_dir),
        )
        .layer(Extension(store))
        .layer(Extension(registry))
        .layer(Extension(repair));

    tracing::info!("HTTP server listening on {}", cli.bind_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let listener = tokio::net::TcpListener::bind(cli.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_the_full_flag_set() {
        let cli = parse_args(&args(&[
            "--bind",
            "127.0.0.1:5000",
            "--data-dir",
            "/tmp/blobgrid",
            "--node",
            "127.0.0.1:5000",
            "--node",
            "127.0.0.1:5001",
            "--schemas",
            "/tmp/defs.json",
            "--log-level",
            "debug",
        ]))
        .unwrap();

        assert_eq!(cli.bind_addr.port(), 5000);
        assert_eq!(cli.peer_nodes, vec!["127.0.0.1:5000", "127.0.0.1:5001"]);
        assert_eq!(cli.schemas_file, "/tmp/defs.json");
        assert_eq!(cli.log_level, tracing::Level::DEBUG);
    }

    #[test]
    fn log_level_defaults_to_info() {
        let cli = parse_args(&args(&[
            "--bind",
            "127.0.0.1:5000",
            "--data-dir",
            "/tmp/blobgrid",
        ]))
        .unwrap();
        assert_eq!(cli.log_level, tracing::Level::INFO);
    }

    #[test]
    fn bad_log_level_is_an_error_not_a_silent_default() {
        let err = parse_args(&args(&[
            "--bind",
            "127.0.0.1:5000",
            "--data-dir",
            "/tmp/blobgrid",
            "--log-level",
            "loud",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn a_trailing_flag_without_a_value_is_an_error() {
        for raw in [
            vec!["--bind"],
            vec!["--bind", "127.0.0.1:5000", "--data-dir"],
            vec!["--bind", "127.0.0.1:5000", "--data-dir", "/tmp", "--node"],
        ] {
            let err = parse_args(&args(&raw)).unwrap_err();
            assert!(err.to_string().contains("requires a value"), "{:?}", raw);
        }
    }

    #[test]
    fn unknown_flags_are_rejected() {
        let err = parse_args(&args(&["--bogus", "x"])).unwrap_err();
        assert!(err.to_string().contains("unknown argument"));
    }

    #[test]
    fn missing_required_flags_are_errors() {
        assert!(parse_args(&args(&["--data-dir", "/tmp"])).is_err());
        assert!(parse_args(&args(&["--bind", "127.0.0.1:5000"])).is_err());
    }

    #[test]
    fn defaults_derive_from_bind_and_data_dir() {
        let cli = parse_args(&args(&[
            "--bind",
            "127.0.0.1:5000",
            "--data-dir",
            "/var/lib/blobgrid/",
        ]))
        .unwrap();
        assert_eq!(cli.peer_nodes, vec!["127.0.0.1:5000"]);
        assert_eq!(cli.schemas_file, "/var/lib/blobgrid/schemas.json");
    }
}
