//! API response bodies
//!
//! Every JSON response carries `success`; failures carry `error`.

use serde::Serialize;

use crate::storage::Entry;

/// Body of a successful directory listing
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub success: bool,
    pub path: String,
    pub files: Vec<Entry>,
}

impl ListResponse {
    pub fn new(path: String, files: Vec<Entry>) -> Self {
        Self {
            success: true,
            path,
            files,
        }
    }
}

/// Body of a successful upload or mkdir
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}
