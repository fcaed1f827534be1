//! Error handling
//!
//! Defines error types and their HTTP rendering for the file manager.

pub mod handlers;
pub mod types;

pub use handlers::{plain_response, status_code};
pub use types::*;
