//! File-read capability exposed through the response builder.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

/// Storage that `read_file` reads from.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the whole resource at `path`.
    async fn read(&self, path: &Path) -> std::io::Result<Bytes>;
}

/// Reads from the local filesystem (the Lambda task directory).
#[derive(Debug, Clone, Default)]
pub struct LocalFiles {
    root: Option<PathBuf>,
}

impl LocalFiles {
    /// Read paths exactly as given.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve relative paths against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileSource for LocalFiles {
    async fn read(&self, path: &Path) -> std::io::Result<Bytes> {
        tokio::fs::read(self.resolve(path)).await.map(Bytes::from)
    }
}
