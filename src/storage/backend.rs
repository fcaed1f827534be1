//! Storage access interface
//!
//! All direct filesystem calls go through [`StorageBackend`] so the
//! confinement and listing logic can run against [`crate::storage::MemoryFs`]
//! as well as the real disk.

use std::future::Future;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use tokio::io::{AsyncRead, AsyncWrite};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
}

/// Metadata of a single path. Symbolic links are reported, not followed.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub kind: EntryKind,
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileMetadata {
    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// One raw directory entry as read from storage
#[derive(Debug, Clone)]
pub struct DirEntryInfo {
    pub name: String,
    pub metadata: FileMetadata,
}

pub trait StorageBackend: Send + Sync + 'static {
    type Reader: AsyncRead + Send + Unpin + 'static;
    type Writer: AsyncWrite + Send + Unpin + 'static;

    /// Lists the immediate children of `path`. Entries whose metadata
    /// cannot be read are skipped.
    fn read_dir(&self, path: &Path) -> impl Future<Output = io::Result<Vec<DirEntryInfo>>> + Send;

    fn metadata(&self, path: &Path) -> impl Future<Output = io::Result<FileMetadata>> + Send;

    /// Creates `path` and every missing ancestor; existing directories are fine
    fn create_dir_all(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;

    /// Creates or truncates a file for writing
    fn create_file(&self, path: &Path) -> impl Future<Output = io::Result<Self::Writer>> + Send;

    fn open_file(&self, path: &Path) -> impl Future<Output = io::Result<Self::Reader>> + Send;

    /// Moves `from` to `to`, replacing any existing file at `to`
    fn rename(&self, from: &Path, to: &Path) -> impl Future<Output = io::Result<()>> + Send;

    fn remove_file(&self, path: &Path) -> impl Future<Output = io::Result<()>> + Send;
}
