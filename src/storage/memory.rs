//! In-memory storage backend
//!
//! A fake filesystem with the same observable behavior as [`crate::storage::LocalFs`]
//! for the operations the file manager uses. Cloning shares the same tree.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};
use std::time::SystemTime;

use tokio::io::AsyncWrite;

use crate::storage::backend::{DirEntryInfo, EntryKind, FileMetadata, StorageBackend};

#[derive(Debug)]
struct MemFile {
    data: Vec<u8>,
    modified: SystemTime,
}

#[derive(Debug, Default)]
struct Tree {
    dirs: BTreeMap<PathBuf, SystemTime>,
    files: BTreeMap<PathBuf, MemFile>,
    symlinks: BTreeSet<PathBuf>,
}

impl Tree {
    fn exists(&self, path: &Path) -> bool {
        self.dirs.contains_key(path) || self.files.contains_key(path) || self.symlinks.contains(path)
    }

    fn require_parent_dir(&self, path: &Path) -> io::Result<()> {
        match path.parent() {
            Some(parent) if self.dirs.contains_key(parent) => Ok(()),
            _ => Err(io::Error::from(io::ErrorKind::NotFound)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    tree: Arc<Mutex<Tree>>,
}

impl MemoryFs {
    /// Creates a tree containing `root` and all of its ancestors
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let fs = Self::default();
        {
            let mut tree = fs.lock();
            for ancestor in root.as_ref().ancestors() {
                tree.dirs.insert(ancestor.to_path_buf(), SystemTime::now());
            }
        }
        fs
    }

    /// Current contents of the file at `path`
    pub fn file_contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.lock().files.get(path.as_ref()).map(|f| f.data.clone())
    }

    pub fn insert_symlink(&self, path: impl Into<PathBuf>) {
        self.lock().symlinks.insert(path.into());
    }

    fn lock(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Writer appending straight into the shared tree
#[derive(Debug)]
pub struct MemoryWriter {
    tree: Arc<Mutex<Tree>>,
    path: PathBuf,
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let mut tree = self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match tree.files.get_mut(&self.path) {
            Some(file) => {
                file.data.extend_from_slice(buf);
                file.modified = SystemTime::now();
                Poll::Ready(Ok(buf.len()))
            }
            None => Poll::Ready(Err(io::Error::from(io::ErrorKind::NotFound))),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl StorageBackend for MemoryFs {
    type Reader = Cursor<Vec<u8>>;
    type Writer = MemoryWriter;

    async fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntryInfo>> {
        let tree = self.lock();
        if tree.files.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }
        if !tree.dirs.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::NotFound));
        }

        let is_child = |candidate: &Path| candidate.parent() == Some(path);
        let name_of = |candidate: &Path| {
            candidate
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default()
        };

        let mut entries = Vec::new();
        for (dir, modified) in tree.dirs.iter().filter(|(d, _)| is_child(d)) {
            entries.push(DirEntryInfo {
                name: name_of(dir),
                metadata: FileMetadata {
                    kind: EntryKind::Directory,
                    len: 0,
                    modified: Some(*modified),
                },
            });
        }
        for (file, data) in tree.files.iter().filter(|(f, _)| is_child(f)) {
            entries.push(DirEntryInfo {
                name: name_of(file),
                metadata: FileMetadata {
                    kind: EntryKind::File,
                    len: data.data.len() as u64,
                    modified: Some(data.modified),
                },
            });
        }
        for link in tree.symlinks.iter().filter(|l| is_child(l)) {
            entries.push(DirEntryInfo {
                name: name_of(link),
                metadata: FileMetadata {
                    kind: EntryKind::Symlink,
                    len: 0,
                    modified: None,
                },
            });
        }

        Ok(entries)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let tree = self.lock();
        if let Some(modified) = tree.dirs.get(path) {
            return Ok(FileMetadata {
                kind: EntryKind::Directory,
                len: 0,
                modified: Some(*modified),
            });
        }
        if let Some(file) = tree.files.get(path) {
            return Ok(FileMetadata {
                kind: EntryKind::File,
                len: file.data.len() as u64,
                modified: Some(file.modified),
            });
        }
        if tree.symlinks.contains(path) {
            return Ok(FileMetadata {
                kind: EntryKind::Symlink,
                len: 0,
                modified: None,
            });
        }
        Err(io::Error::from(io::ErrorKind::NotFound))
    }

    async fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        let mut tree = self.lock();
        let missing: Vec<PathBuf> = path
            .ancestors()
            .take_while(|a| !tree.dirs.contains_key(*a))
            .map(Path::to_path_buf)
            .collect();

        if missing.iter().any(|p| tree.exists(p)) {
            return Err(io::Error::from(io::ErrorKind::NotADirectory));
        }
        for dir in missing {
            tree.dirs.insert(dir, SystemTime::now());
        }
        Ok(())
    }

    async fn create_file(&self, path: &Path) -> io::Result<MemoryWriter> {
        let mut tree = self.lock();
        if tree.dirs.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::IsADirectory));
        }
        tree.require_parent_dir(path)?;
        tree.files.insert(
            path.to_path_buf(),
            MemFile {
                data: Vec::new(),
                modified: SystemTime::now(),
            },
        );

        Ok(MemoryWriter {
            tree: Arc::clone(&self.tree),
            path: path.to_path_buf(),
        })
    }

    async fn open_file(&self, path: &Path) -> io::Result<Cursor<Vec<u8>>> {
        let tree = self.lock();
        if tree.dirs.contains_key(path) {
            return Err(io::Error::from(io::ErrorKind::IsADirectory));
        }
        tree.files
            .get(path)
            .map(|f| Cursor::new(f.data.clone()))
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }

    async fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        let mut tree = self.lock();
        if tree.dirs.contains_key(to) {
            return Err(io::Error::from(io::ErrorKind::IsADirectory));
        }
        tree.require_parent_dir(to)?;
        let file = tree
            .files
            .remove(from)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;
        tree.files.insert(to.to_path_buf(), file);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.lock()
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_write_then_read_back() {
        let fs = MemoryFs::with_root("/root");
        fs.create_dir_all(Path::new("/root/a/b")).await.unwrap();

        let mut writer = fs.create_file(Path::new("/root/a/b/f.txt")).await.unwrap();
        writer.write_all(b"hello").await.unwrap();
        writer.shutdown().await.unwrap();

        let mut reader = fs.open_file(Path::new("/root/a/b/f.txt")).await.unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).await.unwrap();
        assert_eq!(out, "hello");

        let entries = fs.read_dir(Path::new("/root/a")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "b");
    }

    #[tokio::test]
    async fn test_create_file_requires_parent() {
        let fs = MemoryFs::with_root("/root");
        let err = fs.create_file(Path::new("/root/missing/f")).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_dir_all_over_file_fails() {
        let fs = MemoryFs::with_root("/root");
        fs.create_file(Path::new("/root/f")).await.unwrap();
        assert!(fs.create_dir_all(Path::new("/root/f/sub")).await.is_err());
    }

    #[tokio::test]
    async fn test_rename_replaces_target() {
        let fs = MemoryFs::with_root("/root");
        let mut a = fs.create_file(Path::new("/root/a")).await.unwrap();
        a.write_all(b"new").await.unwrap();
        let mut b = fs.create_file(Path::new("/root/b")).await.unwrap();
        b.write_all(b"old").await.unwrap();

        fs.rename(Path::new("/root/a"), Path::new("/root/b")).await.unwrap();
        assert_eq!(fs.file_contents("/root/b").unwrap(), b"new");
        assert!(fs.file_contents("/root/a").is_none());
    }
}
