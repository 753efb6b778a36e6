//! Node RPC Facade
//!
//! `NodeClient` is the seam between the coordinators and a physical node.
//! Every lookup-style call returns `Result<Option<T>>` so callers can
//! pattern-match "found / not found / failed" instead of sniffing status
//! codes out of error values; only genuine failures surface as errors.
//!
//! `HttpNodeClient` is the production implementation speaking the
//! `/internal` protocol over HTTP with bounded retries.

use crate::error::{Result, StoreError};
use crate::node::protocol::{
    ENDPOINT_INTERNAL_FILE, ENDPOINT_INTERNAL_LIST, ENDPOINT_INTERNAL_META,
    ENDPOINT_INTERNAL_SCHEMA, FileMetadata, HEADER_LAST_MODIFIED, NodeListing, encode_path,
};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

const RPC_TIMEOUT: Duration = Duration::from_secs(10);
const RPC_ATTEMPTS: usize = 3;

/// File bytes together with the modification time they carry.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub bytes: Bytes,
    pub last_modified: u64,
}

/// RPC facade to one physical node's local store.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Address this client talks to, as it appears in schema grids.
    fn address(&self) -> &str;

    async fn get_file(&self, schema: &str, path: &str) -> Result<Option<FileContent>>;

    async fn head_file(&self, schema: &str, path: &str) -> Result<Option<FileMetadata>>;

    async fn put_file(
        &self,
        schema: &str,
        path: &str,
        content: Bytes,
        last_modified: u64,
    ) -> Result<()>;

    /// `true` when a file was removed, `false` when nothing was there.
    async fn delete_file(&self, schema: &str, path: &str) -> Result<bool>;

    async fn list_dir(&self, schema: &str, path: &str) -> Result<Option<NodeListing>>;

    async fn create_schema_dir(&self, schema: &str) -> Result<()>;

    async fn delete_schema_dir(&self, schema: &str) -> Result<()>;
}

/// Hands out `NodeClient`s for grid addresses. The registry, coordinators
/// and repair engine all go through this seam, so tests can swap in
/// in-memory nodes.
pub trait NodeClientFactory: Send + Sync {
    fn client(&self, addr: &str) -> Arc<dyn NodeClient>;
}

pub struct HttpNodeClient {
    addr: String,
    http: reqwest::Client,
}

impl HttpNodeClient {
    pub fn new(addr: &str, http: reqwest::Client) -> Self {
        Self {
            addr: addr.to_string(),
            http,
        }
    }

    fn url(&self, endpoint: &str, schema: &str, path: &str) -> String {
        if path.is_empty() {
            format!("http://{}{}/{}", self.addr, endpoint, encode_path(schema))
        } else {
            format!(
                "http://{}{}/{}/{}",
                self.addr,
                endpoint,
                encode_path(schema),
                encode_path(path)
            )
        }
    }

    /// Sends a request, retrying transport-level failures with doubling
    /// delay plus jitter. HTTP error statuses are not retried; the caller
    /// interprets them.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut delay_ms = 150u64;

        for attempt in 0..RPC_ATTEMPTS {
            match build().timeout(RPC_TIMEOUT).send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if attempt + 1 == RPC_ATTEMPTS {
                        return Err(StoreError::Remote(format!("{}: {}", self.addr, e)));
                    }
                    let jitter = rand::random::<u64>() % 50;
                    tokio::time::sleep(Duration::from_millis(delay_ms + jitter)).await;
                    delay_ms = (delay_ms * 2).min(1200);
                }
            }
        }

        Err(StoreError::Remote(format!(
            "{}: retry attempts exhausted",
            self.addr
        )))
    }

    fn remote_error(&self, what: &str, status: reqwest::StatusCode) -> StoreError {
        StoreError::Remote(format!("{}: {} answered {}", self.addr, what, status))
    }
}

#[async_trait]
impl NodeClient for HttpNodeClient {
    fn address(&self) -> &str {
        &self.addr
    }

    async fn get_file(&self, schema: &str, path: &str) -> Result<Option<FileContent>> {
        let url = self.url(ENDPOINT_INTERNAL_FILE, schema, path);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.remote_error("get", response.status()));
        }

        let last_modified = response
            .headers()
            .get(HEADER_LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Remote(format!("{}: {}", self.addr, e)))?;

        Ok(Some(FileContent {
            bytes,
            last_modified,
        }))
    }

    async fn head_file(&self, schema: &str, path: &str) -> Result<Option<FileMetadata>> {
        let url = self.url(ENDPOINT_INTERNAL_META, schema, path);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.remote_error("head", response.status()));
        }

        let metadata = response
            .json()
            .await
            .map_err(|e| StoreError::Remote(format!("{}: {}", self.addr, e)))?;
        Ok(Some(metadata))
    }

    async fn put_file(
        &self,
        schema: &str,
        path: &str,
        content: Bytes,
        last_modified: u64,
    ) -> Result<()> {
        let url = self.url(ENDPOINT_INTERNAL_FILE, schema, path);
        let response = self
            .send_with_retry(|| {
                self.http
                    .put(&url)
                    .query(&[("last_modified", last_modified)])
                    .body(content.clone())
            })
            .await?;

        if !response.status().is_success() {
            return Err(self.remote_error("put", response.status()));
        }
        Ok(())
    }

    async fn delete_file(&self, schema: &str, path: &str) -> Result<bool> {
        let url = self.url(ENDPOINT_INTERNAL_FILE, schema, path);
        let response = self.send_with_retry(|| self.http.delete(&url)).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(self.remote_error("delete", response.status()));
        }
        Ok(true)
    }

    async fn list_dir(&self, schema: &str, path: &str) -> Result<Option<NodeListing>> {
        let url = self.url(ENDPOINT_INTERNAL_LIST, schema, path);
        let response = self.send_with_retry(|| self.http.get(&url)).await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(self.remote_error("list", response.status()));
        }

        let listing = response
            .json()
            .await
            .map_err(|e| StoreError::Remote(format!("{}: {}", self.addr, e)))?;
        Ok(Some(listing))
    }

    async fn create_schema_dir(&self, schema: &str) -> Result<()> {
        let url = format!(
            "http://{}{}/{}",
            self.addr,
            ENDPOINT_INTERNAL_SCHEMA,
            encode_path(schema)
        );
        let response = self.send_with_retry(|| self.http.post(&url)).await?;

        if !response.status().is_success() {
            return Err(self.remote_error("create schema dir", response.status()));
        }
        Ok(())
    }

    async fn delete_schema_dir(&self, schema: &str) -> Result<()> {
        let url = format!(
            "http://{}{}/{}",
            self.addr,
            ENDPOINT_INTERNAL_SCHEMA,
            encode_path(schema)
        );
        let response = self.send_with_retry(|| self.http.delete(&url)).await?;

        // A node that never held the schema has nothing to tear down.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(self.remote_error("delete schema dir", response.status()));
        }
        Ok(())
    }
}

/// Production factory: one shared reqwest client, one `HttpNodeClient` per
/// distinct address.
pub struct HttpNodeClientFactory {
    http: reqwest::Client,
    cache: DashMap<String, Arc<HttpNodeClient>>,
}

impl HttpNodeClientFactory {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: DashMap::new(),
        }
    }
}

impl Default for HttpNodeClientFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeClientFactory for HttpNodeClientFactory {
    fn client(&self, addr: &str) -> Arc<dyn NodeClient> {
        self.cache
            .entry(addr.to_string())
            .or_insert_with(|| Arc::new(HttpNodeClient::new(addr, self.http.clone())))
            .clone()
    }
}
