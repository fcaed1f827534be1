//! Storage operations
//!
//! Directory listing and directory creation on top of a [`StorageBackend`].
//! Uploads and downloads live in [`crate::transfer`].

use chrono::{DateTime, Local};
use log::{debug, info};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::SystemTime;

use crate::error::FileManagerError;
use crate::storage::backend::{EntryKind, StorageBackend};
use crate::storage::results::Entry;
use crate::storage::validation::{PathResolver, ResolvedPath, join_logical};
use crate::transfer::STAGING_PREFIX;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Entry point for every file manager operation.
///
/// Owns the resolver for the storage root, the upload ceiling and the
/// storage backend. Built once at startup and shared by all requests.
#[derive(Debug)]
pub struct FileStore<B> {
    resolver: PathResolver,
    max_upload_size: u64,
    backend: B,
}

impl<B: StorageBackend> FileStore<B> {
    pub fn new(root: impl Into<PathBuf>, max_upload_size: u64, backend: B) -> Self {
        Self {
            resolver: PathResolver::new(root),
            max_upload_size,
            backend,
        }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn max_upload_size(&self) -> u64 {
        self.max_upload_size
    }

    /// Confines a client-supplied path to the storage root
    pub fn resolve(&self, logical: &str) -> Result<ResolvedPath, FileManagerError> {
        Ok(self.resolver.resolve(logical)?)
    }

    /// Lists the entries of `dir` in the order storage returns them.
    ///
    /// A directory that does not exist yet lists as empty. Symbolic links
    /// and in-flight upload staging files are left out.
    pub async fn list_directory(&self, dir: &ResolvedPath) -> Result<Vec<Entry>, FileManagerError> {
        let raw_entries = match self.backend.read_dir(dir.real()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Listing absent directory {} as empty", dir.logical());
                return Ok(Vec::new());
            }
            Err(e) => return Err(FileManagerError::storage("Failed to read directory", e)),
        };

        let entries: Vec<Entry> = raw_entries
            .into_iter()
            .filter(|entry| entry.metadata.kind != EntryKind::Symlink)
            .filter(|entry| !entry.name.starts_with(STAGING_PREFIX))
            .map(|entry| {
                let is_dir = entry.metadata.is_dir();
                Entry {
                    path: join_logical(dir.logical(), &entry.name),
                    name: entry.name,
                    is_dir,
                    size: (!is_dir).then_some(entry.metadata.len),
                    modified_at: entry.metadata.modified.map(format_timestamp),
                }
            })
            .collect();

        debug!("Listed directory {} - {} entries", dir.logical(), entries.len());
        Ok(entries)
    }

    /// Creates `name` beneath `parent`, along with any missing ancestors.
    /// Creating a directory that already exists succeeds.
    pub async fn create_directory(
        &self,
        parent: &ResolvedPath,
        name: &str,
    ) -> Result<ResolvedPath, FileManagerError> {
        if name.is_empty() {
            return Err(FileManagerError::MalformedRequest("Directory name is required"));
        }

        let target = self.resolver.resolve_child(parent, name)?;
        self.backend
            .create_dir_all(target.real())
            .await
            .map_err(|e| FileManagerError::storage("Failed to create directory", e))?;

        info!("Created directory {}", target.logical());
        Ok(target)
    }
}

/// Formats a modification time in local time with second precision
pub fn format_timestamp(time: SystemTime) -> String {
    DateTime::<Local>::from(time).format(TIMESTAMP_FORMAT).to_string()
}
