//! Verb handlers
//!
//! Maps each request onto one document root operation and turns the
//! outcome into a response. Nothing here fails the session: every error
//! becomes a status code.

use std::io;
use std::path::Path;

use crate::files::store::DocumentRoot;
use crate::http::mime::content_type_for;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseBuilder, StatusCode};

/// Dispatches requests to the GET, HEAD, POST and DELETE handlers
#[derive(Debug, Clone)]
pub struct Router {
    root: DocumentRoot,
}

impl Router {
    pub fn new(root: DocumentRoot) -> Self {
        Self { root }
    }

    /// Produce the response for one request.
    pub async fn handle(&self, request: &Request) -> Response {
        let path = match self.root.resolve(&request.path) {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(
                    method = ?request.method,
                    path = %request.path,
                    error = %e,
                    "Rejected request target"
                );
                return Response::bad_request();
            }
        };

        match request.method {
            Method::GET => self.get(&path, &request.path).await,
            Method::HEAD => self.head(&path).await,
            Method::POST => self.post(&path, &request.body).await,
            Method::DELETE => self.delete(&path).await,
        }
    }

    async fn get(&self, path: &Path, target: &str) -> Response {
        match self.root.read(path).await {
            Ok(contents) => ResponseBuilder::new(StatusCode::Ok)
                .header("Content-Type", content_type_for(target))
                .body(contents)
                .build(),
            Err(e) => {
                log_miss("GET", path, &e);
                Response::not_found()
            }
        }
    }

    async fn head(&self, path: &Path) -> Response {
        match self.root.size(path).await {
            Ok(size) => ResponseBuilder::new(StatusCode::Ok)
                .content_length(size)
                .build(),
            Err(e) => {
                log_miss("HEAD", path, &e);
                ResponseBuilder::new(StatusCode::NotFound).build()
            }
        }
    }

    async fn post(&self, path: &Path, body: &[u8]) -> Response {
        match self.root.write(path, body).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), bytes = body.len(), "Stored document");
                ResponseBuilder::new(StatusCode::Created).build()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to store document");
                Response::internal_error()
            }
        }
    }

    async fn delete(&self, path: &Path) -> Response {
        match self.root.remove(path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Removed document");
                ResponseBuilder::new(StatusCode::NoContent).build()
            }
            Err(e) => {
                if e.kind() == io::ErrorKind::NotFound {
                    log_miss("DELETE", path, &e);
                } else {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove document");
                }
                Response::not_found()
            }
        }
    }
}

fn log_miss(method: &str, path: &Path, error: &io::Error) {
    tracing::debug!(method, path = %path.display(), error = %error, "Document not available");
}
