//! File system storage management
//!
//! Handles path confinement, storage access and the listing / mkdir operations.

pub mod backend;
pub mod filesystem;
pub mod memory;
pub mod operations;
pub mod results;
pub mod validation;

pub use backend::{DirEntryInfo, EntryKind, FileMetadata, StorageBackend};
pub use filesystem::LocalFs;
pub use memory::MemoryFs;
pub use operations::FileStore;
pub use results::{DownloadOutcome, Entry};
pub use validation::{PathResolver, ResolvedPath};
