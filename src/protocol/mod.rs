//! HTTP API protocol
//!
//! JSON response shapes shared by the API endpoints.

pub mod responses;

pub use responses::{ErrorResponse, ListResponse, MessageResponse};
