//! Review session: the observable state object the presentation layer
//! renders from.
//!
//! A session owns the review queue, the prefetching presenter and the swipe
//! interpreter, and is driven from a single task. External events map onto
//! exactly one method each:
//! - library loaded: `bootstrap` / `load`
//! - drag updates: `drag_changed`, `drag_ended`, `finish_commit_animation`
//! - programmatic decisions: `commit_decision`
//! - decode results: `apply_completion` (or `pump` / `settle`)
//!
//! Every state change is published as a `ReviewSnapshot` on a watch channel.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, instrument, warn};

use super::gesture::{DragSample, SwipeConfig, SwipeInterpreter, SwipeOutcome};
use super::presenter::{
    CompletionOutcome, DecodeCompletion, DecodeDispatcher, PrefetchPresenter, Slot, SlotState,
};
use super::queue::{QueueError, ReviewQueue};
use super::recorder::{DecisionRecorder, RecorderError};
use crate::adapters::{AuthorizationState, LibraryError, LibrarySource, PermissionGate};
use crate::domain::{Asset, DecodedImage, Decision, Direction, Progress, Summary, TargetSize};

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Nothing left to review")]
    NothingToReview(#[from] QueueError),

    #[error("A swipe commit is already in flight")]
    CommitInFlight,

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),

    #[error("Recorder error: {0}")]
    Recorder(#[from] RecorderError),
}

/// Behavior switches for a session
#[derive(Debug, Clone, Default)]
pub struct SessionSettings {
    /// Swipe thresholds and animation length
    pub swipe: SwipeConfig,

    /// Size to decode images at
    pub target: TargetSize,

    /// Remove deleted assets from the library, not just record the verdict
    pub apply_deletes: bool,

    /// Leave out assets that already have a recorded decision
    pub skip_reviewed: bool,
}

/// Coarse session state for choosing what to render
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing loaded yet
    #[default]
    Starting,

    /// Library access was refused; nothing will be listed
    PermissionDenied(AuthorizationState),

    /// Library has no assets to review
    Empty,

    /// An asset is on screen
    Reviewing,

    /// Every loaded asset has a decision
    Finished,
}

/// Everything the presentation layer needs to render one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewSnapshot {
    pub phase: SessionPhase,
    pub current: Option<Asset>,
    pub next: Option<Asset>,
    pub current_image: Option<DecodedImage>,
    pub next_preview: Option<DecodedImage>,
    pub progress: Progress,
    pub drag_offset: f64,
    pub commit_in_flight: bool,
}

/// Single-owner review state machine
pub struct ReviewSession {
    library: Arc<dyn LibrarySource>,
    recorder: DecisionRecorder,
    settings: SessionSettings,
    queue: ReviewQueue,
    presenter: PrefetchPresenter,
    interpreter: SwipeInterpreter,
    dispatcher: DecodeDispatcher,
    completions: mpsc::UnboundedReceiver<DecodeCompletion>,
    state: watch::Sender<ReviewSnapshot>,
    phase: SessionPhase,
    /// Assets in the library, decided ones included
    library_size: Option<usize>,
}

impl ReviewSession {
    /// Create a session. Nothing is listed until `bootstrap` or `load`.
    pub fn new(
        library: Arc<dyn LibrarySource>,
        recorder: DecisionRecorder,
        settings: SessionSettings,
    ) -> Self {
        let (dispatcher, completions) = DecodeDispatcher::new(Arc::clone(&library), settings.target);
        let (state, _) = watch::channel(ReviewSnapshot::default());

        Self {
            library,
            recorder,
            interpreter: SwipeInterpreter::new(settings.swipe.clone()),
            settings,
            queue: ReviewQueue::new(),
            presenter: PrefetchPresenter::new(),
            dispatcher,
            completions,
            state,
            phase: SessionPhase::Starting,
            library_size: None,
        }
    }

    /// Subscribe to state snapshots
    pub fn subscribe(&self) -> watch::Receiver<ReviewSnapshot> {
        self.state.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> ReviewSnapshot {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn queue(&self) -> &ReviewQueue {
        &self.queue
    }

    pub fn presenter(&self) -> &PrefetchPresenter {
        &self.presenter
    }

    pub fn recorder(&self) -> &DecisionRecorder {
        &self.recorder
    }

    pub fn progress(&self) -> Progress {
        Progress {
            reviewed: self.queue.popped(),
            remaining: self.queue.len(),
        }
    }

    /// Check library access, then list and load the library.
    ///
    /// An undetermined state prompts once. Any state other than
    /// authorized/limited ends the session without listing anything.
    #[instrument(skip(self, gate), fields(library = %self.library.name()))]
    pub async fn bootstrap(
        &mut self,
        gate: &dyn PermissionGate,
    ) -> Result<SessionPhase, SessionError> {
        let mut authorization = gate.authorization_state().await;
        if authorization == AuthorizationState::Undetermined {
            authorization = gate.request_authorization().await;
        }

        if !authorization.allows_access() {
            warn!(?authorization, "Library access not granted");
            self.phase = SessionPhase::PermissionDenied(authorization);
            self.publish();
            return Ok(self.phase);
        }

        let assets = self.library.list_assets().await?;
        let decided = self.recorder.decided_ids().await?;

        // Decided assets that were moved out of the library still count
        let listed: HashSet<_> = assets.iter().map(|a| a.id.clone()).collect();
        let library_size = listed.len() + decided.difference(&listed).count();

        let assets: Vec<Asset> = if self.settings.skip_reviewed {
            assets
                .into_iter()
                .filter(|a| !decided.contains(&a.id))
                .collect()
        } else {
            assets
        };

        info!(
            listed = listed.len(),
            decided = decided.len(),
            library_size,
            "Library loaded"
        );

        self.load_queue(assets, Some(library_size));
        Ok(self.phase)
    }

    /// Replace the queue with a new asset list and start prefetching.
    ///
    /// Without a listing from `bootstrap`, the library size is taken to be
    /// whatever this session has seen: reviewed plus pending.
    pub fn load(&mut self, assets: Vec<Asset>) {
        self.load_queue(assets, None);
    }

    fn load_queue(&mut self, assets: Vec<Asset>, library_size: Option<usize>) {
        if self.interpreter.finish_commit().is_some() {
            debug!("Dropped in-flight swipe commit on reload");
        }

        self.queue.load(assets);
        self.library_size =
            Some(library_size.unwrap_or(self.queue.popped() + self.queue.len()));
        self.phase = if self.queue.is_empty() {
            SessionPhase::Empty
        } else {
            SessionPhase::Reviewing
        };

        self.refresh_slots();
        self.publish();
    }

    /// Record a verdict for the current asset and move on.
    ///
    /// The queue advances immediately for both directions; persistence and
    /// library removal run in the background and only log on failure.
    pub fn commit_decision(&mut self, direction: Direction) -> Result<Decision, SessionError> {
        if self.interpreter.is_in_flight() {
            return Err(SessionError::CommitInFlight);
        }
        let decision = self.apply_commit(direction)?;
        self.publish();
        Ok(decision)
    }

    /// Track an in-progress drag
    pub fn drag_changed(&mut self, translation_x: f64) {
        self.interpreter.drag_changed(translation_x);
        self.publish();
    }

    /// Interpret a released drag. A commit starts the fly-off animation;
    /// the decision itself is applied by `finish_commit_animation`.
    pub fn drag_ended(&mut self, sample: DragSample) -> SwipeOutcome {
        if self.queue.current().is_none() {
            return SwipeOutcome::Ignored;
        }
        let outcome = self.interpreter.drag_ended(sample);
        self.publish();
        outcome
    }

    /// Finish the fly-off animation and apply the committed decision
    pub fn finish_commit_animation(&mut self) -> Result<Option<Decision>, SessionError> {
        let decision = match self.interpreter.finish_commit() {
            Some(direction) => Some(self.apply_commit(direction)?),
            None => None,
        };
        self.publish();
        Ok(decision)
    }

    /// Drag end, animation delay, and commit in one call
    pub async fn swipe(&mut self, sample: DragSample) -> Result<Option<Decision>, SessionError> {
        match self.drag_ended(sample) {
            SwipeOutcome::Commit(_) => {
                tokio::time::sleep(self.settings.swipe.commit_animation()).await;
                self.finish_commit_animation()
            }
            SwipeOutcome::SpringBack | SwipeOutcome::Ignored => Ok(None),
        }
    }

    /// Apply one decode result to the presenter
    pub fn apply_completion(&mut self, completion: DecodeCompletion) -> CompletionOutcome {
        let outcome = self.presenter.complete(completion);
        if outcome == CompletionOutcome::Applied {
            self.publish();
        }
        outcome
    }

    /// Apply every decode result that has already arrived.
    ///
    /// Returns how many changed a slot.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completions.try_recv() {
            if self.apply_completion(completion) == CompletionOutcome::Applied {
                applied += 1;
            }
        }
        applied
    }

    /// Wait until neither slot is waiting for a decode
    pub async fn settle(&mut self) {
        while self.presenter.is_pending() {
            match self.completions.recv().await {
                Some(completion) => {
                    self.apply_completion(completion);
                }
                None => break,
            }
        }
    }

    /// Counts from the decision store plus the library size seen at load
    pub async fn summary(&self) -> Result<Summary, SessionError> {
        let counts = self.recorder.aggregate_counts().await?;
        Ok(Summary {
            counts,
            library_size: self.library_size,
        })
    }

    fn apply_commit(&mut self, direction: Direction) -> Result<Decision, SessionError> {
        let asset = self.queue.advance()?;
        let decision = Decision::new(&asset, direction);

        self.recorder.append(decision.clone());

        if direction == Direction::Delete && self.settings.apply_deletes {
            self.dispatch_removal(asset.clone());
        }

        self.refresh_slots();
        if self.queue.is_empty() {
            self.phase = SessionPhase::Finished;
        }

        info!(
            asset_id = %asset.id,
            ?direction,
            remaining = self.queue.len(),
            "Decision committed"
        );
        Ok(decision)
    }

    fn dispatch_removal(&self, asset: Asset) {
        let library = Arc::clone(&self.library);
        tokio::spawn(async move {
            if let Err(e) = library.remove(&asset).await {
                warn!(asset_id = %asset.id, error = %e, "Failed to remove asset from library");
            }
        });
    }

    fn refresh_slots(&mut self) {
        let requests = self
            .presenter
            .refresh(self.queue.current(), self.queue.peek_next());
        for request in requests {
            self.dispatcher.dispatch(request);
        }
    }

    fn publish(&self) {
        let snapshot = ReviewSnapshot {
            phase: self.phase,
            current: self.queue.current().cloned(),
            next: self.queue.peek_next().cloned(),
            current_image: self.presenter.image(Slot::Current).cloned(),
            next_preview: self.presenter.image(Slot::Next).cloned(),
            progress: self.progress(),
            drag_offset: self.interpreter.offset_x(),
            commit_in_flight: self.interpreter.is_in_flight(),
        };
        self.state.send_replace(snapshot);
    }

    /// State of a prefetch slot
    pub fn slot_state(&self, slot: Slot) -> &SlotState {
        self.presenter.state(slot)
    }
}
