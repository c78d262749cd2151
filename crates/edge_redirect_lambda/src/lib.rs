//! AWS-oriented adapters and handlers for the directory redirect function.
//!
//! This crate owns runtime integration details (the origin-response handler,
//! the object listing seam, and deployment configuration). Redirect rules and
//! the event contract live in `edge_redirect_core`.

pub mod adapters;
pub mod config;
pub mod handlers;
