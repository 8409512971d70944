//! Outcome correlation subsystem
//!
//! Four attempt/outcome families share one generic ledger: parry,
//! timed block, guard counter, and the attack-defense classifier.

pub mod attack;
pub mod ledger;
pub mod stats;
pub mod trackers;

pub use attack::{AttackOutcome, AttackStats, AttackTracker};
pub use stats::FeedbackStats;
pub use trackers::SimpleOutcomeTracker;

use serde::{Deserialize, Serialize};

/// Aggregated per-agent statistics across all four families
///
/// A plain value copied into Snapshots; holding one never blocks a writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CombatFeedback {
    pub attack: AttackStats,
    pub parry: FeedbackStats,
    pub timed_block: FeedbackStats,
    pub guard_counter: FeedbackStats,
}
