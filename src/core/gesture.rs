//! Swipe gesture interpretation.
//!
//! Turns the end of a horizontal drag into a keep/delete decision, and
//! keeps at most one commit in flight at a time.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::Direction;

/// Thresholds for committing a swipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeConfig {
    /// Fraction of the viewport width a drag must cross (default: 0.3)
    #[serde(default = "default_commit_fraction")]
    pub commit_fraction: f64,

    /// Fling speed that commits regardless of distance (default: 500 units/s)
    #[serde(default = "default_velocity_threshold")]
    pub velocity_threshold: f64,

    /// Length of the fly-off animation in milliseconds (default: 300)
    #[serde(default = "default_commit_animation_ms")]
    pub commit_animation_ms: u64,
}

fn default_commit_fraction() -> f64 {
    0.3
}
fn default_velocity_threshold() -> f64 {
    500.0
}
fn default_commit_animation_ms() -> u64 {
    300
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            commit_fraction: default_commit_fraction(),
            velocity_threshold: default_velocity_threshold(),
            commit_animation_ms: default_commit_animation_ms(),
        }
    }
}

impl SwipeConfig {
    pub fn commit_animation(&self) -> Duration {
        Duration::from_millis(self.commit_animation_ms)
    }
}

/// Final state of a drag gesture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSample {
    /// Horizontal translation at release
    pub translation_x: f64,

    /// Where the platform predicts the drag would have ended
    pub predicted_end_x: f64,

    /// Width of the view the drag happened in
    pub viewport_width: f64,
}

impl DragSample {
    /// Velocity estimate: predicted end minus current translation
    pub fn velocity(&self) -> f64 {
        self.predicted_end_x - self.translation_x
    }
}

/// What the interpreter decided at the end of a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeOutcome {
    /// Threshold met; a commit animation is now in flight
    Commit(Direction),

    /// Threshold not met; return to neutral
    SpringBack,

    /// A commit is already in flight; the gesture was dropped
    Ignored,
}

/// Drag-to-decision state machine
#[derive(Debug, Default)]
pub struct SwipeInterpreter {
    config: SwipeConfig,

    /// Direction of the commit currently animating
    in_flight: Option<Direction>,

    /// Current horizontal drag offset, for rendering
    offset_x: f64,
}

impl SwipeInterpreter {
    pub fn new(config: SwipeConfig) -> Self {
        Self {
            config,
            in_flight: None,
            offset_x: 0.0,
        }
    }

    pub fn config(&self) -> &SwipeConfig {
        &self.config
    }

    pub fn offset_x(&self) -> f64 {
        self.offset_x
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Track the drag while the finger is down
    pub fn drag_changed(&mut self, translation_x: f64) {
        if self.in_flight.is_none() {
            self.offset_x = translation_x;
        }
    }

    /// Decide what a released drag means
    pub fn drag_ended(&mut self, sample: DragSample) -> SwipeOutcome {
        if self.in_flight.is_some() {
            debug!("Swipe ignored while a commit is animating");
            return SwipeOutcome::Ignored;
        }

        let dx = sample.translation_x;
        let velocity = sample.velocity();
        let distance_met = dx.abs() > self.config.commit_fraction * sample.viewport_width;
        let velocity_met = velocity.abs() > self.config.velocity_threshold;

        if !(distance_met || velocity_met) {
            self.offset_x = 0.0;
            return SwipeOutcome::SpringBack;
        }

        // A pure fling with no displacement goes the way it was flung
        let toward = if dx == 0.0 { velocity } else { dx };
        let direction = if toward > 0.0 {
            Direction::Keep
        } else {
            Direction::Delete
        };

        self.in_flight = Some(direction);
        self.offset_x = sample.viewport_width * 1.5 * toward.signum();
        debug!(?direction, dx, velocity, "Swipe committed");

        SwipeOutcome::Commit(direction)
    }

    /// End the commit animation, returning the direction that was in flight
    pub fn finish_commit(&mut self) -> Option<Direction> {
        let direction = self.in_flight.take();
        self.offset_x = 0.0;
        direction
    }
}
