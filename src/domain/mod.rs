//! Domain types for the sortify review core.
//!
//! This module contains the core data structures:
//! - Asset: A photo item owned by the library source
//! - Decision: Immutable keep/delete verdict for one asset
//! - Image: Decoded image payloads handed to the presentation layer

pub mod asset;
pub mod decision;
pub mod image;

// Re-export commonly used types
pub use asset::{sort_newest_first, Asset, AssetId};
pub use decision::{Decision, DecisionCounts, Direction, Progress, Summary};
pub use image::{DecodedImage, TargetSize};
