//! Decoded image payloads.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::asset::AssetId;

/// Requested decode size in device-independent pixels.
///
/// `TargetSize::MAXIMUM` asks the library for the full-size image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    pub const MAXIMUM: TargetSize = TargetSize {
        width: u32::MAX,
        height: u32::MAX,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_maximum(&self) -> bool {
        *self == Self::MAXIMUM
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::MAXIMUM
    }
}

/// A decoded image ready for display.
///
/// The pixel payload is shared, so snapshots can clone it freely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    /// Asset the image was decoded from
    pub asset_id: AssetId,

    /// Encoded or decoded image bytes, as produced by the library
    pub bytes: Arc<[u8]>,

    /// Size the image was requested at
    pub target: TargetSize,
}

impl DecodedImage {
    pub fn new(asset_id: AssetId, bytes: impl Into<Arc<[u8]>>, target: TargetSize) -> Self {
        Self {
            asset_id,
            bytes: bytes.into(),
            target,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
