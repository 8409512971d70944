//! Running attempt/outcome statistics
//!
//! Recomputed on every mutation so readers always see a consistent rate.

use serde::{Deserialize, Serialize};

/// Attempt/success counters for one correlation family
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub attempts: u32,
    pub successes: u32,
    /// Timeout-implied failures
    pub misses: u32,
    /// successes / attempts, 0.0 while no attempts are recorded
    pub rate: f32,
}

impl FeedbackStats {
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
        self.recompute();
    }

    pub fn record_success(&mut self) {
        self.successes += 1;
        self.recompute();
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.rate = if self.attempts == 0 {
            0.0
        } else {
            self.successes as f32 / self.attempts as f32
        };
    }
}
