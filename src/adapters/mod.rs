//! Adapter interfaces for external systems.
//!
//! The review core never talks to the operating system's photo library
//! directly. It goes through two traits:
//! - `LibrarySource`: enumerate, decode, and remove assets
//! - `PermissionGate`: read and request library authorization

pub mod directory;
pub mod permission;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{Asset, DecodedImage, TargetSize};

// Re-export the built-in adapters
pub use directory::DirectoryLibrary;
pub use permission::{AuthorizationState, DirectoryPermission, FixedPermission, PermissionGate};

/// Errors raised by library sources
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("Library directory does not exist: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("Asset has no backing file: {0}")]
    NoLocation(String),

    #[error("Invalid include pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Library error: {0}")]
    Other(String),
}

/// Trait for photo libraries
#[async_trait]
pub trait LibrarySource: Send + Sync {
    /// Human-readable library name
    fn name(&self) -> &str;

    /// List all image assets, newest first
    async fn list_assets(&self) -> Result<Vec<Asset>, LibraryError>;

    /// Decode an asset at the requested size.
    ///
    /// `Ok(None)` means the library had nothing to return for this asset.
    async fn decode(
        &self,
        asset: &Asset,
        target: TargetSize,
    ) -> Result<Option<DecodedImage>, LibraryError>;

    /// Remove an asset from the library
    async fn remove(&self, asset: &Asset) -> Result<(), LibraryError>;
}
