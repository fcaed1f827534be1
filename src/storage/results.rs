//! Storage result types
//!
//! Defines result structures returned by storage operations.

use serde::Serialize;

/// One record of a directory listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name: String,
    /// Logical path of the entry, never a filesystem path
    pub path: String,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(rename = "updated_at", skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

/// Result of a download request
pub enum DownloadOutcome<R> {
    File {
        reader: R,
        len: u64,
        file_name: String,
        content_type: String,
    },
    /// Target is a directory; browse it instead
    Redirect { location: String },
    NotFound,
}
