//! Core review logic.
//!
//! This module contains:
//! - ReviewQueue: Ordered pending assets
//! - PrefetchPresenter: Sequence-guarded asynchronous image slots
//! - SwipeInterpreter: Drag gesture to decision
//! - DecisionRecorder: Single-writer decision persistence
//! - ReviewSession: The observable state object tying them together

pub mod gesture;
pub mod presenter;
pub mod queue;
pub mod recorder;
pub mod session;

// Re-export commonly used types
pub use gesture::{DragSample, SwipeConfig, SwipeInterpreter, SwipeOutcome};
pub use presenter::{
    CompletionOutcome, DecodeCompletion, DecodeDispatcher, DecodeRequest, PrefetchPresenter, Slot,
    SlotState,
};
pub use queue::{QueueError, ReviewQueue};
pub use recorder::{DecisionRecorder, RecorderError};
pub use session::{ReviewSession, ReviewSnapshot, SessionError, SessionPhase, SessionSettings};
