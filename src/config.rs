//! Server configuration.
//!
//! Read once at startup and immutable afterwards. Two file formats share one
//! set of keys:
//!
//! ```text
//! # config.txt
//! THREADS=4
//! PORT=8443
//! HOME=/srv/www
//! ```
//!
//! or, for files ending in `.yaml`/`.yml`, the same keys in lower case.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::http::connection::SessionConfig;

/// Keys whose values stay text even when they look numeric.
const PATH_KEYS: [&str; 3] = ["home", "cert", "key"];

/// Upper bound on `threads`; each worker owns a task, a slot and a session.
pub const MAX_THREADS: usize = 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: expected KEY=VALUE, found {text:?}")]
    Syntax { line: usize, text: String },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] serde_yaml::Error),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{key} must be at most {max}")]
    TooLarge { key: &'static str, max: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Number of worker threads (and worker slots)
    pub threads: usize,
    pub port: u16,
    /// Document root
    pub home: PathBuf,
    #[serde(default = "default_cert")]
    pub cert: PathBuf,
    #[serde(default = "default_key")]
    pub key: PathBuf,
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
    /// Seconds a single read or write may stall
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout: u64,
}

fn default_cert() -> PathBuf {
    PathBuf::from("cert.pem")
}

fn default_key() -> PathBuf {
    PathBuf::from("key.pem")
}

fn default_max_request_bytes() -> usize {
    1024 * 1024
}

fn default_idle_timeout() -> u64 {
    30
}

fn default_handshake_timeout() -> u64 {
    10
}

impl ServerConfig {
    /// Load from `path`, choosing the format by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml(&text),
            _ => Self::parse(&text),
        }
    }

    /// Parse `KEY=VALUE` lines. Lines starting with `#` and blank lines are
    /// skipped; keys are case-insensitive.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut mapping = Mapping::new();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Syntax {
                line: number + 1,
                text: line.to_string(),
            })?;

            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            let value = match value.parse::<u64>() {
                Ok(n) if !PATH_KEYS.contains(&key.as_str()) => Value::Number(n.into()),
                _ => Value::String(value.to_string()),
            };

            mapping.insert(Value::String(key), value);
        }

        let config: Self = serde_yaml::from_value(Value::Mapping(mapping))?;
        config.validate()
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout)
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout)
    }

    /// Per-session limits handed to the workers.
    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            max_request_bytes: self.max_request_bytes,
            idle_timeout: self.idle_timeout(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.threads == 0 {
            return Err(ConfigError::Zero("threads"));
        }
        if self.threads > MAX_THREADS {
            return Err(ConfigError::TooLarge {
                key: "threads",
                max: MAX_THREADS,
            });
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Zero("max_request_bytes"));
        }
        if self.idle_timeout == 0 {
            return Err(ConfigError::Zero("idle_timeout"));
        }
        if self.handshake_timeout == 0 {
            return Err(ConfigError::Zero("handshake_timeout"));
        }
        Ok(self)
    }
}
