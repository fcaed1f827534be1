//! Server core functionality
//!
//! This module contains the HTTP server, its router and startup wiring.

pub mod core;
pub mod router;

pub use self::core::Server;
pub use router::build_router;
