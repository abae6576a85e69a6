//! Keep/delete decisions.
//!
//! A decision is recorded exactly once per asset, at the moment the user
//! commits a swipe. Records are never updated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::asset::{Asset, AssetId};

/// Which way an asset was swiped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Swiped right
    Keep,

    /// Swiped left
    Delete,
}

impl Direction {
    pub fn is_keep(self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// An immutable verdict for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier for this record
    pub id: Uuid,

    /// The asset this verdict applies to
    pub asset_id: AssetId,

    /// When the decision was committed
    pub timestamp: DateTime<Utc>,

    /// Creation date of the asset at decision time
    pub asset_created_at: DateTime<Utc>,

    /// True if the asset was kept, false if deleted
    pub kept: bool,
}

impl Decision {
    /// Create a decision for an asset with the current timestamp
    pub fn new(asset: &Asset, direction: Direction) -> Self {
        Self {
            id: Uuid::new_v4(),
            asset_id: asset.id.clone(),
            timestamp: Utc::now(),
            asset_created_at: asset.created_at,
            kept: direction.is_keep(),
        }
    }

    pub fn direction(&self) -> Direction {
        if self.kept {
            Direction::Keep
        } else {
            Direction::Delete
        }
    }
}

/// Aggregate counts over all recorded decisions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub kept: usize,
    pub deleted: usize,
}

impl DecisionCounts {
    pub fn total(&self) -> usize {
        self.kept + self.deleted
    }

    /// Count one more decision
    pub fn record(&mut self, kept: bool) {
        if kept {
            self.kept += 1;
        } else {
            self.deleted += 1;
        }
    }
}

impl<'a> FromIterator<&'a Decision> for DecisionCounts {
    fn from_iter<I: IntoIterator<Item = &'a Decision>>(iter: I) -> Self {
        let mut counts = Self::default();
        for decision in iter {
            counts.record(decision.kept);
        }
        counts
    }
}

/// Review progress within the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub reviewed: usize,
    pub remaining: usize,
}

impl Progress {
    /// One-based position of the current asset, as shown in "3 / 120"
    pub fn position(&self) -> usize {
        self.reviewed + 1
    }

    pub fn total(&self) -> usize {
        self.reviewed + self.remaining
    }
}

/// Numbers shown on the summary screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Counts from the decision store
    pub counts: DecisionCounts,

    /// Number of assets the library held when the session loaded
    pub library_size: Option<usize>,
}

impl Summary {
    /// Fraction of the library that has a decision, if the size is known
    pub fn completion(&self) -> Option<f64> {
        match self.library_size {
            Some(0) => Some(1.0),
            Some(size) => Some((self.counts.total() as f64 / size as f64).min(1.0)),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_direction() {
        let asset = Asset::new("IMG_0001", Utc::now());

        let kept = Decision::new(&asset, Direction::Keep);
        let deleted = Decision::new(&asset, Direction::Delete);

        assert!(kept.kept);
        assert!(!deleted.kept);
        assert_eq!(deleted.direction(), Direction::Delete);
        assert_eq!(kept.asset_created_at, asset.created_at);
        assert_ne!(kept.id, deleted.id);
    }

    #[test]
    fn test_counts_from_decisions() {
        let asset = Asset::new("IMG_0001", Utc::now());
        let decisions = vec![
            Decision::new(&asset, Direction::Keep),
            Decision::new(&asset, Direction::Delete),
            Decision::new(&asset, Direction::Keep),
        ];

        let counts: DecisionCounts = decisions.iter().collect();
        assert_eq!(counts.kept, 2);
        assert_eq!(counts.deleted, 1);
        assert_eq!(counts.total(), 3);
    }

    #[test]
    fn test_summary_completion_uses_library_size() {
        let summary = Summary {
            counts: DecisionCounts { kept: 3, deleted: 1 },
            library_size: Some(8),
        };
        assert_eq!(summary.completion(), Some(0.5));

        let unknown = Summary {
            counts: DecisionCounts { kept: 3, deleted: 1 },
            library_size: None,
        };
        assert_eq!(unknown.completion(), None);
    }

    #[test]
    fn test_direction_serialization() {
        assert_eq!(serde_json::to_string(&Direction::Keep).unwrap(), "\"keep\"");
        assert_eq!(
            serde_json::from_str::<Direction>("\"delete\"").unwrap(),
            Direction::Delete
        );
    }
}
