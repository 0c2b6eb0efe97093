//! Document serving
//!
//! This module maps requests onto the document root: path resolution and
//! file operations live in `store`, the per-verb handlers in `router`.

pub mod router;
pub mod store;

pub use router::Router;
pub use store::{DocumentRoot, ResolveError};
