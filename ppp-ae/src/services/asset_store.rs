//! Read-only asset store
//!
//! The engine only ever fetches whole files by name: static segment audio,
//! music beds and the main content recording. Upload and catalog management
//! live elsewhere.

use crate::error::Error;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Asset store errors
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// Name is empty, absolute, or escapes the store root
    #[error("Invalid asset name: {0}")]
    InvalidName(String),

    /// Store temporarily unable to serve the file; worth retrying
    #[error("Asset store unavailable: {0}")]
    Unavailable(String),

    #[error("Asset read failed: {0}")]
    Read(String),
}

impl AssetError {
    /// True for failures a retry may fix
    pub fn is_transient(&self) -> bool {
        matches!(self, AssetError::Unavailable(_))
    }
}

impl From<AssetError> for Error {
    fn from(err: AssetError) -> Self {
        match err {
            AssetError::NotFound(name) => Error::AssetNotFound(name),
            AssetError::InvalidName(name) => Error::Validation(format!("Invalid asset name: {}", name)),
            other => Error::AssetStore(other.to_string()),
        }
    }
}

/// Source of named audio files
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Fetch the full contents of `filename`
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, AssetError>;
}

/// Asset store backed by a local directory
pub struct LocalAssetStore {
    root: PathBuf,
}

impl LocalAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `filename` inside the root, rejecting anything that could leave it
    fn resolve(&self, filename: &str) -> Result<PathBuf, AssetError> {
        let relative = Path::new(filename);

        if filename.trim().is_empty() {
            return Err(AssetError::InvalidName(filename.to_string()));
        }

        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(AssetError::InvalidName(filename.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetStore for LocalAssetStore {
    async fn fetch(&self, filename: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.resolve(filename)?;
        debug!(path = %path.display(), "Fetching asset");

        tokio::fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(filename.to_string()),
            std::io::ErrorKind::Interrupted
            | std::io::ErrorKind::TimedOut
            | std::io::ErrorKind::WouldBlock => {
                AssetError::Unavailable(format!("{}: {}", filename, e))
            }
            _ => AssetError::Read(format!("{}: {}", filename, e)),
        })
    }
}
