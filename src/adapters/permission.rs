//! Library authorization.
//!
//! Mirrors the states a mobile photo library reports. Only `Authorized`
//! and `Limited` allow the review core to list assets.

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

/// Authorization state of the photo library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// Full read/write access
    Authorized,

    /// Access to a subset of the library, or read-only access
    Limited,

    /// User refused access
    Denied,

    /// Access blocked by policy
    Restricted,

    /// User has not been asked yet
    Undetermined,
}

impl AuthorizationState {
    /// Whether assets may be listed in this state
    pub fn allows_access(self) -> bool {
        matches!(self, Self::Authorized | Self::Limited)
    }
}

/// Trait for permission providers
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Current state, without prompting
    async fn authorization_state(&self) -> AuthorizationState;

    /// Prompt for access and return the resulting state
    async fn request_authorization(&self) -> AuthorizationState;
}

/// Gate that always reports the same state
#[derive(Debug, Clone, Copy)]
pub struct FixedPermission(pub AuthorizationState);

#[async_trait]
impl PermissionGate for FixedPermission {
    async fn authorization_state(&self) -> AuthorizationState {
        self.0
    }

    async fn request_authorization(&self) -> AuthorizationState {
        self.0
    }
}

/// Gate backed by filesystem access to a library directory.
///
/// - readable and writable: `Authorized`
/// - readable but read-only: `Limited`
/// - permission error: `Denied`
/// - missing or not a directory: `Restricted`
#[derive(Debug, Clone)]
pub struct DirectoryPermission {
    root: PathBuf,
}

impl DirectoryPermission {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    async fn probe(&self) -> AuthorizationState {
        let metadata = match fs::metadata(&self.root).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                return AuthorizationState::Denied
            }
            Err(_) => return AuthorizationState::Restricted,
        };

        if !metadata.is_dir() {
            return AuthorizationState::Restricted;
        }

        if let Err(e) = fs::read_dir(&self.root).await {
            debug!(root = %self.root.display(), error = %e, "Library directory not readable");
            return AuthorizationState::Denied;
        }

        if metadata.permissions().readonly() {
            AuthorizationState::Limited
        } else {
            AuthorizationState::Authorized
        }
    }
}

#[async_trait]
impl PermissionGate for DirectoryPermission {
    async fn authorization_state(&self) -> AuthorizationState {
        self.probe().await
    }

    async fn request_authorization(&self) -> AuthorizationState {
        // There is no prompt for a directory; asking again re-checks access
        self.probe().await
    }
}
