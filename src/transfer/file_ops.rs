//! Module `file_ops`
//!
//! Upload and download operations for the file manager.
//!
//! Uploads are streamed into a staging file inside the storage root and
//! renamed over the final path once complete, so a failed or oversized
//! upload never leaves a partial file at the target. Concurrent uploads to
//! the same target race at the rename; the last one wins.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::{info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::pin;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use url::form_urlencoded;
use uuid::Uuid;

use crate::error::{FileManagerError, PathError};
use crate::storage::backend::{EntryKind, StorageBackend};
use crate::storage::{DownloadOutcome, FileStore, ResolvedPath};

/// Name prefix of in-flight upload files in the storage root
pub const STAGING_PREFIX: &str = ".rax-upload-";

/// An upload fully written to its staging file, not yet placed
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    size: u64,
}

impl StagedUpload {
    pub fn size(&self) -> u64 {
        self.size
    }
}

impl<B: StorageBackend> FileStore<B> {
    /// Streams `content` into a new staging file.
    ///
    /// The size ceiling is checked on every chunk; crossing it aborts the
    /// copy and removes the staging file.
    pub async fn stage_upload<S>(&self, content: S) -> Result<StagedUpload, FileManagerError>
    where
        S: Stream<Item = Result<Bytes, FileManagerError>>,
    {
        let path = self
            .resolver()
            .root()
            .join(format!("{}{}.part", STAGING_PREFIX, Uuid::new_v4()));

        let mut writer = self
            .backend()
            .create_file(&path)
            .await
            .map_err(|e| FileManagerError::storage("Failed to create file on server", e))?;

        match copy_limited(&mut writer, content, self.max_upload_size()).await {
            Ok(size) => Ok(StagedUpload { path, size }),
            Err(e) => {
                drop(writer);
                self.remove_staging(&path).await;
                Err(e)
            }
        }
    }

    /// Moves a staged upload to `dir/filename`, creating missing directories
    /// and replacing any existing file. The staging file is removed on failure.
    pub async fn commit_upload(
        &self,
        staged: StagedUpload,
        dir: &ResolvedPath,
        filename: &str,
    ) -> Result<ResolvedPath, FileManagerError> {
        let result = self.place_upload(&staged, dir, filename).await;
        if result.is_err() {
            self.discard_upload(staged).await;
        }
        result
    }

    pub async fn discard_upload(&self, staged: StagedUpload) {
        self.remove_staging(&staged.path).await;
    }

    /// Writes `content` to `dir/filename` and returns the final location
    pub async fn receive_upload<S>(
        &self,
        dir: &ResolvedPath,
        filename: &str,
        content: S,
    ) -> Result<ResolvedPath, FileManagerError>
    where
        S: Stream<Item = Result<Bytes, FileManagerError>>,
    {
        // Fail before any bytes are staged
        upload_target(self, dir, filename)?;

        let staged = self.stage_upload(content).await?;
        self.commit_upload(staged, dir, filename).await
    }

    /// Decides what a download request for `target` serves
    pub async fn dispatch_download(
        &self,
        target: &ResolvedPath,
    ) -> Result<DownloadOutcome<B::Reader>, FileManagerError> {
        let metadata = match self.backend().metadata(target.real()).await {
            Ok(metadata) => metadata,
            Err(e) if is_absent(e.kind()) => return Ok(DownloadOutcome::NotFound),
            Err(e) => return Err(FileManagerError::storage("Failed to read file", e)),
        };

        match metadata.kind {
            EntryKind::Symlink => Ok(DownloadOutcome::NotFound),
            // There is no download of the whole tree
            EntryKind::Directory if target.is_root() => Ok(DownloadOutcome::NotFound),
            EntryKind::Directory => Ok(DownloadOutcome::Redirect {
                location: browse_location(target.logical()),
            }),
            EntryKind::File => {
                let reader = match self.backend().open_file(target.real()).await {
                    Ok(reader) => reader,
                    Err(e) if is_absent(e.kind()) => return Ok(DownloadOutcome::NotFound),
                    Err(e) => return Err(FileManagerError::storage("Failed to read file", e)),
                };

                let file_name = target.file_name().unwrap_or_default().to_string();
                let content_type = mime_guess::from_path(&file_name)
                    .first_or_octet_stream()
                    .essence_str()
                    .to_string();

                info!("Serving {} ({} bytes)", target.logical(), metadata.len);
                Ok(DownloadOutcome::File {
                    reader,
                    len: metadata.len,
                    file_name,
                    content_type,
                })
            }
        }
    }

    async fn place_upload(
        &self,
        staged: &StagedUpload,
        dir: &ResolvedPath,
        filename: &str,
    ) -> Result<ResolvedPath, FileManagerError> {
        let target = upload_target(self, dir, filename)?;

        self.backend()
            .create_dir_all(dir.real())
            .await
            .map_err(|e| FileManagerError::storage("Failed to create directory", e))?;

        // Filenames may carry their own subdirectories
        if let Some(parent) = target.real().parent().filter(|p| *p != dir.real()) {
            self.backend()
                .create_dir_all(parent)
                .await
                .map_err(|e| FileManagerError::storage("Failed to create directory", e))?;
        }

        self.backend()
            .rename(&staged.path, target.real())
            .await
            .map_err(|e| FileManagerError::storage("Failed to save file", e))?;

        info!("Stored upload {} ({} bytes)", target.logical(), staged.size);
        Ok(target)
    }

    async fn remove_staging(&self, path: &Path) {
        if let Err(e) = self.backend().remove_file(path).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove staging file {}: {}", path.display(), e);
            }
        }
    }
}

/// Validates the final location of an upload
fn upload_target<B: StorageBackend>(
    store: &FileStore<B>,
    dir: &ResolvedPath,
    filename: &str,
) -> Result<ResolvedPath, FileManagerError> {
    if filename.is_empty() {
        return Err(FileManagerError::MalformedRequest("Failed to get file from form"));
    }

    let target = store.resolver().resolve_child(dir, filename)?;
    // `.` or `a/..` would name the directory itself
    if target.is_root() || target.logical() == dir.logical() {
        return Err(PathError::Malformed(filename.to_string()).into());
    }
    Ok(target)
}

async fn copy_limited<W, S>(writer: &mut W, content: S, limit: u64) -> Result<u64, FileManagerError>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = Result<Bytes, FileManagerError>>,
{
    let mut content = pin!(content);
    let mut total_bytes = 0u64;

    while let Some(chunk) = content.next().await {
        let chunk = chunk?;
        total_bytes += chunk.len() as u64;
        if total_bytes > limit {
            return Err(FileManagerError::UploadTooLarge { limit });
        }

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FileManagerError::storage("Failed to save file", e))?;
    }

    writer
        .flush()
        .await
        .map_err(|e| FileManagerError::storage("Failed to save file", e))?;
    writer
        .shutdown()
        .await
        .map_err(|e| FileManagerError::storage("Failed to save file", e))?;

    Ok(total_bytes)
}

fn is_absent(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::NotFound | ErrorKind::NotADirectory)
}

/// Browsing view scoped to a logical directory
pub fn browse_location(logical: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(logical.as_bytes()).collect();
    format!("/?path={}", encoded)
}
