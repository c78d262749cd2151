//! Directory redirect domain primitives.
//!
//! This crate owns the origin-response event contract and the redirect
//! decision. It intentionally excludes AWS SDK and Lambda runtime concerns.

pub mod contract;
pub mod redirect;
