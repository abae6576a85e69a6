//! sortify - Swipe-to-review photo library core
//!
//! Review a photo library one image at a time, marking each photo "kept"
//! or "deleted", with every verdict persisted locally.
//!
//! # Architecture
//!
//! The review core is independent of any UI toolkit:
//! - A review queue holds the photos still waiting for a decision
//! - A prefetching presenter decodes the current and next photo, tagging
//!   every request with a per-slot sequence number and dropping stale results
//! - A swipe interpreter turns drag gestures into decisions, one at a time
//! - A decision recorder appends verdicts to a store from a single writer task
//! - A review session ties them together and publishes snapshots to render
//!
//! # Modules
//!
//! - `adapters`: Library source and permission interfaces (directory-backed)
//! - `core`: Queue, presenter, gesture, recorder, session
//! - `domain`: Data structures (Asset, Decision, DecodedImage)
//! - `store`: Append-only decision stores (JSONL, SQLite)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Review a directory of photos
//! sortify review --library ~/Pictures/camera
//!
//! # Show kept/deleted counts
//! sortify stats
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod store;

// Re-export main types at crate root for convenience
pub use adapters::{AuthorizationState, DirectoryLibrary, LibrarySource, PermissionGate};
pub use crate::core::{
    DecisionRecorder, DragSample, PrefetchPresenter, ReviewQueue, ReviewSession, ReviewSnapshot,
    SessionPhase, SessionSettings, Slot, SlotState, SwipeInterpreter, SwipeOutcome,
};
pub use domain::{Asset, AssetId, Decision, DecisionCounts, DecodedImage, Direction, Summary};
pub use store::{DecisionStore, JsonlDecisionStore, SqliteDecisionStore, StoreBackend};
