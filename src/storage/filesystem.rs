//! File system operations
//!
//! Real-disk storage backend built on `tokio::fs`.

use log::warn;
use std::io;
use std::path::Path;
use tokio::fs;

use crate::storage::backend::{DirEntryInfo, EntryKind, FileMetadata, StorageBackend};

/// Storage backend operating on the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

fn to_metadata(meta: &std::fs::Metadata) -> FileMetadata {
    let file_type = meta.file_type();
    let kind = if file_type.is_symlink() {
        EntryKind::Symlink
    } else if file_type.is_dir() {
        EntryKind::Directory
    } else {
        EntryKind::File
    };

    FileMetadata {
        kind,
        len: meta.len(),
        modified: meta.modified().ok(),
    }
}

impl StorageBackend for LocalFs {
    type Reader = fs::File;
    type Writer = fs::File;

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let mut dir = fs::read_dir(path).await?;
        let mut entries = Vec::new();

        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();

            // DirEntry::metadata does not traverse symlinks
            match entry.metadata().await {
                Ok(meta) => entries.push(DirEntryInfo {
                    name,
                    metadata: to_metadata(&meta),
                }),
                Err(e) => warn!("Skipping {} in {}: {}", name, path.display(), e),
            }
        }

        Ok(entries)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let meta = fs::symlink_metadata(path).await?;
        Ok(to_metadata(&meta))
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path).await
    }

    async fn create_file(&self, path: &Path) -> io::Result<fs::File> {
        fs::File::create(path).await
    }

    async fn open_file(&self, path: &Path) -> io::Result<fs::File> {
        fs::File::open(path).await
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to).await
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_read_dir_reports_kinds_and_sizes() {
        let temp = tempfile::tempdir().unwrap();
        let backend = LocalFs;
        backend
            .create_dir_all(&temp.path().join("sub/deeper"))
            .await
            .unwrap();
        let mut file = backend.create_file(&temp.path().join("a.bin")).await.unwrap();
        file.write_all(b"12345").await.unwrap();
        file.flush().await.unwrap();

        let mut entries = backend.read_dir(temp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "a.bin");
        assert_eq!(entries[0].metadata.kind, EntryKind::File);
        assert_eq!(entries[0].metadata.len, 5);
        assert_eq!(entries[1].metadata.kind, EntryKind::Directory);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinks_are_not_followed() {
        let temp = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink("/etc", temp.path().join("out")).unwrap();

        let meta = LocalFs.metadata(&temp.path().join("out")).await.unwrap();
        assert_eq!(meta.kind, EntryKind::Symlink);
    }

    #[tokio::test]
    async fn test_read_dir_missing_is_not_found() {
        let temp = tempfile::tempdir().unwrap();
        let err = LocalFs.read_dir(&temp.path().join("nope")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
