//! Transfer module for the file manager
//!
//! Handles streaming uploads into the storage root and serving downloads.

pub mod file_ops;

pub use file_ops::{STAGING_PREFIX, StagedUpload, browse_location};
