//! Cumulative camera trajectory with periodic drift reset.
//!
//! Chaining per-pair transforms accumulates estimation error without bound,
//! so every `reset_frequency`-th entry is forced back to identity. This
//! produces a visible jump at each reset boundary; nothing smooths across it.

use serde::{Deserialize, Serialize};
use steadyframe_core::Transform2D;
use tracing::debug;

/// Default number of frames between trajectory resets.
pub const DEFAULT_RESET_FREQUENCY: usize = 100;

/// Per-frame cumulative transforms; `trajectory[0]` is identity.
pub type Trajectory = Vec<Transform2D>;

/// Left-to-right accumulator of per-pair transforms.
#[derive(Debug, Clone)]
pub struct TrajectoryAccumulator {
    reset_frequency: usize,
    last_cumulative: Transform2D,
    next_index: usize,
}

impl TrajectoryAccumulator {
    /// `reset_frequency` must be non-zero; a value of 0 is treated as 1.
    pub fn new(reset_frequency: usize) -> Self {
        Self {
            reset_frequency: reset_frequency.max(1),
            last_cumulative: Transform2D::IDENTITY,
            next_index: 0,
        }
    }

    pub fn reset_frequency(&self) -> usize {
        self.reset_frequency
    }

    /// Index of the frame the next `push` belongs to.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    pub fn is_reset_index(&self, index: usize) -> bool {
        index % self.reset_frequency == 0
    }

    /// Fold in the per-pair transform of the next frame and return that
    /// frame's trajectory entry.
    pub fn push(&mut self, per_pair: Transform2D) -> Transform2D {
        let cumulative = if self.is_reset_index(self.next_index) {
            if self.next_index > 0 {
                debug!(frame = self.next_index, "trajectory reset");
            }
            Transform2D::IDENTITY
        } else {
            per_pair * self.last_cumulative
        };
        self.last_cumulative = cumulative;
        self.next_index += 1;
        cumulative
    }

    /// Batch form of [`push`](Self::push) starting from a fresh state.
    pub fn accumulate(reset_frequency: usize, per_pair: &[Transform2D]) -> Trajectory {
        let mut acc = Self::new(reset_frequency);
        per_pair.iter().map(|t| acc.push(*t)).collect()
    }
}

impl Default for TrajectoryAccumulator {
    fn default() -> Self {
        Self::new(DEFAULT_RESET_FREQUENCY)
    }
}

/// One serializable trajectory entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryRecord {
    pub index: usize,
    /// Row-major 3x3 homogeneous matrix.
    pub matrix: [[f64; 3]; 3],
    /// Whether this entry was forced to identity by a drift reset.
    pub reset: bool,
    /// Whether the per-pair transform for this frame was estimated (as
    /// opposed to reused after a failure). `false` for frame 0.
    pub estimated: bool,
}
