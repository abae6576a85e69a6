//! Review queue: the ordered list of assets still waiting for a decision.
//!
//! The front of the queue is the asset on screen. Assets leave the queue
//! only through `advance`, and an asset that has left is never let back in.

use std::collections::{HashSet, VecDeque};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Asset, AssetId};

/// Errors raised by queue operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("Review queue is empty")]
    Empty,
}

/// Ordered queue of pending assets
#[derive(Debug, Default)]
pub struct ReviewQueue {
    /// Pending assets, front = current
    pending: VecDeque<Asset>,

    /// Ids currently in `pending`
    queued: HashSet<AssetId>,

    /// Ids that have been popped
    popped: HashSet<AssetId>,
}

impl ReviewQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the queue contents.
    ///
    /// Duplicate ids keep their first occurrence; ids popped earlier are
    /// dropped. Loading an empty sequence leaves the queue empty.
    pub fn load<I>(&mut self, assets: I)
    where
        I: IntoIterator<Item = Asset>,
    {
        self.pending.clear();
        self.queued.clear();

        let mut skipped = 0usize;
        for asset in assets {
            if self.popped.contains(&asset.id) || !self.queued.insert(asset.id.clone()) {
                skipped += 1;
                continue;
            }
            self.pending.push_back(asset);
        }

        if skipped > 0 {
            warn!(skipped, "Dropped duplicate or already reviewed assets on load");
        }
        debug!(len = self.pending.len(), "Loaded review queue");
    }

    /// The asset under review
    pub fn current(&self) -> Option<&Asset> {
        self.pending.front()
    }

    /// The asset after the current one
    pub fn peek_next(&self) -> Option<&Asset> {
        self.pending.get(1)
    }

    /// Remove the current asset and return it
    pub fn advance(&mut self) -> Result<Asset, QueueError> {
        let asset = self.pending.pop_front().ok_or(QueueError::Empty)?;
        self.queued.remove(&asset.id);
        self.popped.insert(asset.id.clone());
        Ok(asset)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of assets popped over the queue's lifetime
    pub fn popped(&self) -> usize {
        self.popped.len()
    }

    /// Whether the asset has already left the queue
    pub fn was_popped(&self, id: &AssetId) -> bool {
        self.popped.contains(id)
    }

    /// Pending assets in order
    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.pending.iter()
    }
}
