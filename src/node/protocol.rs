//! Node-Local Storage Protocol
//!
//! Endpoint constants and DTOs for the internal HTTP API every node serves
//! over its local directory store. Coordinators speak this protocol through
//! `NodeClient`; file bytes travel as the raw request/response body with the
//! modification timestamp in a header, everything else is JSON.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// --- API Endpoints ---

/// File content transfer (GET body + timestamp header, PUT, DELETE).
pub const ENDPOINT_INTERNAL_FILE: &str = "/internal/file";
/// Metadata lookup without transferring content.
pub const ENDPOINT_INTERNAL_META: &str = "/internal/meta";
/// Single-node directory listing.
pub const ENDPOINT_INTERNAL_LIST: &str = "/internal/list";
/// Schema-directory lifecycle (POST creates, DELETE tears down).
pub const ENDPOINT_INTERNAL_SCHEMA: &str = "/internal/schema";

/// Header carrying a file's modification time (milliseconds since epoch)
/// alongside raw content bytes.
pub const HEADER_LAST_MODIFIED: &str = "x-last-modified";
/// Header mirroring `FileKind` on public HEAD responses.
pub const HEADER_FILE_TYPE: &str = "x-file-type";
/// Header carrying the file size on public HEAD responses (the response
/// body itself is empty, so `content-length` cannot be reused).
pub const HEADER_FILE_SIZE: &str = "x-file-size";

// --- Data Transfer Objects ---

/// What kind of entry a path resolves to on a node.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileKind {
    File,
    Directory,
    /// Present on disk but neither a regular file nor a directory.
    Unknown,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::File => "FILE",
            FileKind::Directory => "DIRECTORY",
            FileKind::Unknown => "UNKNOWN",
        }
    }
}

/// Metadata of one physical copy of a file (or of a directory).
///
/// Two copies of a logical file count as identical when kind, size and
/// `last_modified` all agree; the repair engine compares exactly these
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileMetadata {
    pub kind: FileKind,
    /// Content size in bytes; `None` for directories.
    pub size: Option<u64>,
    /// Modification time, milliseconds since the Unix epoch.
    pub last_modified: u64,
}

/// One node's view of a directory.
///
/// `BTreeMap`s keep entries ordered by name so merged listings come out the
/// same regardless of which node answered first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeListing {
    pub directories: BTreeMap<String, FileMetadata>,
    pub files: BTreeMap<String, FileMetadata>,
}

/// Characters that cannot travel raw inside a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encodes a relative path for use in a URL, segment by segment so
/// the `/` separators stay raw. File names may contain spaces, `?` or `#`;
/// unencoded they would truncate or malform the request URL.
pub fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| utf8_percent_encode(segment, PATH_SEGMENT).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Current system time in milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
