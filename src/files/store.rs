//! Document root and the filesystem operations the handlers rely on.
//!
//! Every request target is resolved against the document root before any
//! filesystem call, and a target that would leave the root is refused.

use std::io;
use std::path::{Component, Path, PathBuf};

use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("request target escapes the document root: {0:?}")]
    Traversal(String),

    #[error("request target contains a NUL byte")]
    NulByte,
}

/// Directory under which every served, created or deleted document lives.
#[derive(Debug, Clone)]
pub struct DocumentRoot {
    base: PathBuf,
}

impl DocumentRoot {
    /// Wraps `base` without touching the filesystem.
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    /// Wraps `base` after checking that it is an existing directory.
    pub fn open(base: impl Into<PathBuf>) -> io::Result<Self> {
        let base = base.into();
        let metadata = std::fs::metadata(&base)?;

        if !metadata.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotADirectory,
                format!("document root is not a directory: {}", base.display()),
            ));
        }

        Ok(Self { base })
    }

    /// Maps a raw request target to a path inside the document root.
    ///
    /// Leading slashes are dropped and `.` components ignored; `..` and
    /// absolute prefixes are rejected rather than normalized.
    pub fn resolve(&self, target: &str) -> Result<PathBuf, ResolveError> {
        if target.contains('\0') {
            return Err(ResolveError::NulByte);
        }

        let mut resolved = self.base.clone();

        for component in Path::new(target.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(ResolveError::Traversal(target.to_string()));
                }
            }
        }

        Ok(resolved)
    }

    /// Reads a whole document.
    pub async fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    /// Size of a regular file; anything else counts as absent.
    pub async fn size(&self, path: &Path) -> io::Result<u64> {
        let metadata = fs::metadata(path).await?;

        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "not a regular file",
            ));
        }

        Ok(metadata.len())
    }

    /// Stores a document, creating missing parent directories and
    /// replacing any existing file.
    pub async fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(path, contents).await
    }

    pub async fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}
