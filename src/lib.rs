//! Warden - HTTPS document server
//!
//! Serves, stores and deletes files under a document root over TLS, using
//! a fixed pool of workers fed by a single acceptor.

pub mod config;
pub mod files;
pub mod http;
pub mod server;
