//! Error types
//!
//! Defines the path-confinement error and the request-level error taxonomy
//! shared by every storage component and the router.

use std::fmt;
use std::io;

/// Reasons a logical path is refused by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The normalized path climbs above the storage root
    Escape(String),
    /// The path contains bytes that can never name a file (e.g. NUL)
    Malformed(String),
}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathError::Escape(p) => write!(f, "Path escapes storage root: {}", p),
            PathError::Malformed(p) => write!(f, "Malformed path: {:?}", p),
        }
    }
}

impl std::error::Error for PathError {}

/// Errors surfaced by file manager operations.
///
/// Every filesystem error is translated into one of these kinds at the
/// component boundary; the router only ever sees this type.
#[derive(Debug)]
pub enum FileManagerError {
    InvalidPath(PathError),
    NotFound(String),
    MethodNotAllowed,
    MalformedRequest(&'static str),
    UploadTooLarge { limit: u64 },
    StorageFailure {
        message: &'static str,
        source: io::Error,
    },
}

impl FileManagerError {
    /// Wraps an I/O error with the short message shown to clients
    pub fn storage(message: &'static str, source: io::Error) -> Self {
        FileManagerError::StorageFailure { message, source }
    }

    /// Message safe to hand to a client; never includes raw system error text
    pub fn client_message(&self) -> &'static str {
        match self {
            FileManagerError::InvalidPath(_) => "Invalid path",
            FileManagerError::NotFound(_) => "File not found",
            FileManagerError::MethodNotAllowed => "Method not allowed",
            FileManagerError::MalformedRequest(msg) => *msg,
            FileManagerError::UploadTooLarge { .. } => "File too large",
            FileManagerError::StorageFailure { message, .. } => *message,
        }
    }
}

impl fmt::Display for FileManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileManagerError::InvalidPath(e) => write!(f, "Invalid path: {}", e),
            FileManagerError::NotFound(p) => write!(f, "Not found: {}", p),
            FileManagerError::MethodNotAllowed => write!(f, "Method not allowed"),
            FileManagerError::MalformedRequest(msg) => write!(f, "Malformed request: {}", msg),
            FileManagerError::UploadTooLarge { limit } => {
                write!(f, "Upload exceeds limit of {} bytes", limit)
            }
            FileManagerError::StorageFailure { message, source } => {
                write!(f, "{}: {}", message, source)
            }
        }
    }
}

impl std::error::Error for FileManagerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FileManagerError::InvalidPath(e) => Some(e),
            FileManagerError::StorageFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<PathError> for FileManagerError {
    fn from(error: PathError) -> Self {
        FileManagerError::InvalidPath(error)
    }
}
