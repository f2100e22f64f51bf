//! HTTP server.
//!
//! - [`api`]: Request/response types and route handlers
//! - [`frontend`]: Loading of the front-end document

pub mod api;
pub mod frontend;
