//! Prefetching presenter.
//!
//! Tracks two display slots (the current image and a preview of the next
//! one). Every time the queue changes, each slot's sequence number is
//! bumped and a fresh decode request is tagged with it. Decodes finish on
//! other tasks, possibly out of order; a completion only touches its slot
//! when its sequence number is still the latest one issued for that slot.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::adapters::{LibraryError, LibrarySource};
use crate::domain::{Asset, AssetId, DecodedImage, TargetSize};

/// One of the two prefetch positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Current,
    Next,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => f.write_str("current"),
            Self::Next => f.write_str("next"),
        }
    }
}

/// Display state of a slot
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SlotState {
    /// No asset for this slot
    #[default]
    Idle,

    /// Waiting for the decode tagged with this sequence number
    Pending(u64),

    /// Image decoded and on display
    Ready(DecodedImage),

    /// The decode with this sequence number failed or returned nothing
    Failed(u64),
}

impl SlotState {
    pub fn image(&self) -> Option<&DecodedImage> {
        match self {
            Self::Ready(image) => Some(image),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

/// A decode to run for one slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeRequest {
    pub slot: Slot,
    pub sequence: u64,
    pub asset: Asset,
}

/// Result of a decode, tagged with the request it answers
#[derive(Debug)]
pub struct DecodeCompletion {
    pub slot: Slot,
    pub sequence: u64,
    pub asset_id: AssetId,
    pub result: Result<Option<DecodedImage>, LibraryError>,
}

impl DecodeCompletion {
    /// Completion carrying a decoded image
    pub fn ready(request: &DecodeRequest, image: DecodedImage) -> Self {
        Self {
            slot: request.slot,
            sequence: request.sequence,
            asset_id: request.asset.id.clone(),
            result: Ok(Some(image)),
        }
    }
}

/// What happened to a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The slot state changed
    Applied,

    /// A newer request exists for the slot; nothing changed
    Stale,
}

#[derive(Debug, Default)]
struct SlotTracker {
    sequence: u64,
    state: SlotState,
}

/// Per-slot sequence tracking for asynchronous decodes
#[derive(Debug, Default)]
pub struct PrefetchPresenter {
    current: SlotTracker,
    next: SlotTracker,
}

impl PrefetchPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    fn tracker(&self, slot: Slot) -> &SlotTracker {
        match slot {
            Slot::Current => &self.current,
            Slot::Next => &self.next,
        }
    }

    fn tracker_mut(&mut self, slot: Slot) -> &mut SlotTracker {
        match slot {
            Slot::Current => &mut self.current,
            Slot::Next => &mut self.next,
        }
    }

    /// Latest sequence number issued for a slot
    pub fn sequence(&self, slot: Slot) -> u64 {
        self.tracker(slot).sequence
    }

    pub fn state(&self, slot: Slot) -> &SlotState {
        &self.tracker(slot).state
    }

    pub fn image(&self, slot: Slot) -> Option<&DecodedImage> {
        self.tracker(slot).state.image()
    }

    /// Whether any slot is still waiting for a decode
    pub fn is_pending(&self) -> bool {
        self.current.state.is_pending() || self.next.state.is_pending()
    }

    /// Point a slot at a new asset (or at nothing).
    ///
    /// Always bumps the slot's sequence number, so any decode still in
    /// flight for the slot becomes stale.
    pub fn issue(&mut self, slot: Slot, asset: Option<&Asset>) -> Option<DecodeRequest> {
        let tracker = self.tracker_mut(slot);
        tracker.sequence += 1;
        let sequence = tracker.sequence;

        match asset {
            Some(asset) => {
                tracker.state = SlotState::Pending(sequence);
                debug!(%slot, sequence, asset_id = %asset.id, "Issued decode request");
                Some(DecodeRequest {
                    slot,
                    sequence,
                    asset: asset.clone(),
                })
            }
            None => {
                tracker.state = SlotState::Idle;
                None
            }
        }
    }

    /// Re-target both slots after a queue change.
    ///
    /// If the next slot already holds the image for the new current asset,
    /// that image moves to the current slot instead of being decoded again.
    pub fn refresh(&mut self, current: Option<&Asset>, next: Option<&Asset>) -> Vec<DecodeRequest> {
        let promoted = match (current, self.next.state.image()) {
            (Some(asset), Some(image)) if image.asset_id == asset.id => Some(image.clone()),
            _ => None,
        };

        let mut requests = Vec::with_capacity(2);

        match promoted {
            Some(image) => {
                self.current.sequence += 1;
                debug!(
                    sequence = self.current.sequence,
                    asset_id = %image.asset_id,
                    "Promoted prefetched image to current slot"
                );
                self.current.state = SlotState::Ready(image);
            }
            None => requests.extend(self.issue(Slot::Current, current)),
        }
        requests.extend(self.issue(Slot::Next, next));

        requests
    }

    /// Apply a finished decode if it is still the latest for its slot
    pub fn complete(&mut self, completion: DecodeCompletion) -> CompletionOutcome {
        let DecodeCompletion {
            slot,
            sequence,
            asset_id,
            result,
        } = completion;
        let tracker = self.tracker_mut(slot);

        if sequence != tracker.sequence {
            debug!(
                %slot,
                sequence,
                latest = tracker.sequence,
                asset_id = %asset_id,
                "Ignoring outdated decode result"
            );
            return CompletionOutcome::Stale;
        }

        tracker.state = match result {
            Ok(Some(image)) => {
                debug!(%slot, sequence, asset_id = %asset_id, bytes = image.len(), "Decoded image");
                SlotState::Ready(image)
            }
            Ok(None) => {
                warn!(%slot, sequence, asset_id = %asset_id, "Library returned no image");
                SlotState::Failed(sequence)
            }
            Err(e) => {
                warn!(%slot, sequence, asset_id = %asset_id, error = %e, "Decode failed");
                SlotState::Failed(sequence)
            }
        };

        CompletionOutcome::Applied
    }
}

/// Runs decode requests on the tokio runtime and sends results back
#[derive(Clone)]
pub struct DecodeDispatcher {
    library: Arc<dyn LibrarySource>,
    target: TargetSize,
    completions: mpsc::UnboundedSender<DecodeCompletion>,
}

impl DecodeDispatcher {
    /// Create a dispatcher and the receiver its completions arrive on
    pub fn new(
        library: Arc<dyn LibrarySource>,
        target: TargetSize,
    ) -> (Self, mpsc::UnboundedReceiver<DecodeCompletion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                library,
                target,
                completions: tx,
            },
            rx,
        )
    }

    /// Start a decode; the completion is delivered even if it turns out stale
    pub fn dispatch(&self, request: DecodeRequest) {
        let library = Arc::clone(&self.library);
        let target = self.target;
        let completions = self.completions.clone();

        tokio::spawn(async move {
            let result = library.decode(&request.asset, target).await;
            let completion = DecodeCompletion {
                slot: request.slot,
                sequence: request.sequence,
                asset_id: request.asset.id,
                result,
            };
            if completions.send(completion).is_err() {
                debug!("Presenter dropped before decode finished");
            }
        });
    }
}
