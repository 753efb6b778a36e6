//! Local Directory Store
//!
//! Wraps one directory on the local filesystem as this node's slice of the
//! blob store: one subdirectory per schema, plain files below it. The file
//! mtime carries `last_modified`, so replicated writes stamp the
//! coordinator-chosen timestamp instead of the local clock.

use crate::error::{Result, StoreError};
use crate::node::protocol::{FileKind, FileMetadata, NodeListing};
use bytes::Bytes;
use filetime::FileTime;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn get(&self, schema: &str, path: &str) -> Result<Option<(Bytes, FileMetadata)>> {
        let full = self.resolve(schema, path)?;
        if !full.is_file() {
            return Ok(None);
        }
        let bytes = Bytes::from(fs::read(&full)?);
        let metadata = read_metadata(&full)?;
        Ok(Some((bytes, metadata)))
    }

    pub fn head(&self, schema: &str, path: &str) -> Result<Option<FileMetadata>> {
        let full = self.resolve(schema, path)?;
        if !full.exists() {
            return Ok(None);
        }
        Ok(Some(read_metadata(&full)?))
    }

    /// Writes content and stamps `last_modified` onto the file's mtime.
    pub fn put(&self, schema: &str, path: &str, content: &[u8], last_modified: u64) -> Result<()> {
        let full = self.resolve(schema, path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, content)?;

        let mtime = FileTime::from_unix_time(
            (last_modified / 1000) as i64,
            ((last_modified % 1000) * 1_000_000) as u32,
        );
        filetime::set_file_mtime(&full, mtime)?;
        Ok(())
    }

    /// Removes a file (or directory tree). `false` when nothing was there.
    pub fn delete(&self, schema: &str, path: &str) -> Result<bool> {
        let full = self.resolve(schema, path)?;
        if full.is_file() {
            fs::remove_file(&full)?;
            Ok(true)
        } else if full.is_dir() {
            fs::remove_dir_all(&full)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Lists one directory level. `None` when the path is not a directory
    /// on this node.
    pub fn list_dir(&self, schema: &str, path: &str) -> Result<Option<NodeListing>> {
        let full = self.resolve(schema, path)?;
        if !full.is_dir() {
            return Ok(None);
        }

        let mut listing = NodeListing::default();
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = read_metadata(&entry.path())?;
            match metadata.kind {
                FileKind::Directory => {
                    listing.directories.insert(name, metadata);
                }
                FileKind::File | FileKind::Unknown => {
                    listing.files.insert(name, metadata);
                }
            }
        }
        Ok(Some(listing))
    }

    pub fn create_schema_dir(&self, schema: &str) -> Result<()> {
        fs::create_dir_all(self.schema_root(schema)?)?;
        Ok(())
    }

    /// Tears down everything this node holds for a schema. Absent is fine.
    pub fn delete_schema_dir(&self, schema: &str) -> Result<()> {
        let root = self.schema_root(schema)?;
        if root.is_dir() {
            fs::remove_dir_all(&root)?;
        }
        Ok(())
    }

    fn schema_root(&self, schema: &str) -> Result<PathBuf> {
        if schema.is_empty() || schema.contains(['/', '\\']) || schema == ".." || schema == "." {
            return Err(StoreError::Forbidden(format!(
                "invalid schema name: {}",
                schema
            )));
        }
        Ok(self.root.join(schema))
    }

    fn resolve(&self, schema: &str, path: &str) -> Result<PathBuf> {
        let rel = sanitize_rel_path(path)?;
        Ok(self.schema_root(schema)?.join(rel))
    }
}

/// Validates a schema-relative path: no absolute paths, no `..` segments.
///
/// Returns the normalized form (empty string addresses the schema root).
/// This guard runs both at the REST boundary, before any node RPC is
/// issued, and again here in front of the filesystem.
pub fn sanitize_rel_path(path: &str) -> Result<String> {
    let candidate = Path::new(path);
    let mut parts: Vec<&str> = Vec::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => match part.to_str() {
                Some(part) => parts.push(part),
                None => {
                    return Err(StoreError::Forbidden(format!(
                        "path is not valid UTF-8: {}",
                        path
                    )));
                }
            },
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::Forbidden(format!(
                    "path escapes the schema root: {}",
                    path
                )));
            }
        }
    }
    Ok(parts.join("/"))
}

fn read_metadata(full: &Path) -> Result<FileMetadata> {
    let fs_meta = fs::metadata(full)?;

    let kind = if fs_meta.is_file() {
        FileKind::File
    } else if fs_meta.is_dir() {
        FileKind::Directory
    } else {
        FileKind::Unknown
    };

    let last_modified = fs_meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    Ok(FileMetadata {
        kind,
        size: if kind == FileKind::File {
            Some(fs_meta.len())
        } else {
            None
        },
        last_modified,
    })
}
