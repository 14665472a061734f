//! Pipeline configuration.
//!
//! # Environment Variables
//!
//! - `ADAPTER_MULTIPART_MAX_FIELDS`: maximum multipart fields per request (default: 100)
//! - `ADAPTER_MULTIPART_MAX_BYTES`: maximum multipart body size in bytes (default: 6 MiB)
//! - `ADAPTER_STATIC_ROOT`: base directory for relative `read_file` paths (optional)

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Default maximum number of multipart fields.
pub const DEFAULT_MAX_FIELDS: usize = 100;

/// Default maximum multipart body size. Matches the Lambda synchronous payload limit.
pub const DEFAULT_MAX_BODY_BYTES: usize = 6 * 1024 * 1024;

/// Limits applied while decoding `multipart/form-data` bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipartLimits {
    /// Maximum number of fields (files included).
    pub max_fields: usize,
    /// Maximum decoded body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for MultipartLimits {
    fn default() -> Self {
        Self {
            max_fields: DEFAULT_MAX_FIELDS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Configuration shared by every invocation of a pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Multipart decoding limits.
    pub multipart: MultipartLimits,
    /// Base directory that relative `read_file` paths resolve against.
    pub static_root: Option<PathBuf>,
}

impl AdapterConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = MultipartLimits::default();
        let multipart = MultipartLimits {
            max_fields: env_or("ADAPTER_MULTIPART_MAX_FIELDS", defaults.max_fields),
            max_body_bytes: env_or("ADAPTER_MULTIPART_MAX_BYTES", defaults.max_body_bytes),
        };

        let static_root = std::env::var("ADAPTER_STATIC_ROOT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Self {
            multipart,
            static_root,
        }
    }

    /// Set the base directory for relative file reads.
    pub fn with_static_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.static_root = Some(root.into());
        self
    }

    /// Set the multipart limits.
    pub fn with_multipart_limits(mut self, limits: MultipartLimits) -> Self {
        self.multipart = limits;
        self
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => default,
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(key: &str, raw: &str, default: T) -> T {
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(variable = key, value = raw, default = %default, "ignoring invalid configuration value");
            default
        }
    }
}
