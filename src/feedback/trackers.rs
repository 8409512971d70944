//! Binary outcome families: parry, timed block, guard counter
//!
//! Each family correlates "I attempted X" against a later success
//! notification from the engine; an attempt that sees no notification
//! inside the outcome window is treated as a miss.

use tracing::trace;

use crate::core::config::LedgerConfig;
use crate::core::shared_map::SharedMap;
use crate::core::types::{AgentId, Seconds};
use crate::feedback::ledger::AttemptList;
use crate::feedback::stats::FeedbackStats;

/// Outcome kinds for the binary families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleOutcome {
    Success,
    ImpliedMiss,
}

#[derive(Debug, Clone)]
struct StatsRecord {
    stats: FeedbackStats,
    since_success: Seconds,
}

impl Default for StatsRecord {
    fn default() -> Self {
        Self { stats: FeedbackStats::default(), since_success: f32::MAX }
    }
}

/// Attempt/outcome correlation for one binary event family
pub struct SimpleOutcomeTracker {
    family: &'static str,
    config: LedgerConfig,
    attempts: SharedMap<AgentId, AttemptList<(), SimpleOutcome>>,
    stats: SharedMap<AgentId, StatsRecord>,
}

impl SimpleOutcomeTracker {
    pub fn new(family: &'static str, config: LedgerConfig) -> Self {
        Self {
            family,
            config,
            attempts: SharedMap::new(),
            stats: SharedMap::new(),
        }
    }

    /// Log a speculative attempt for `subject` against `counterpart`
    pub fn record_attempt(&self, subject: AgentId, counterpart: AgentId) {
        let cap = self.config.max_attempts_per_subject;
        self.attempts
            .with_entry(subject, || AttemptList::new(cap), |list| {
                list.push(counterpart, ());
            });
        self.stats
            .with_entry(subject, StatsRecord::default, |record| {
                record.stats.record_attempt();
            });
        trace!(family = self.family, ?subject, "attempt recorded");
    }

    /// Claim the most recent unmatched attempt as a success
    ///
    /// Unknown subjects are a no-op.
    pub fn on_success(&self, subject: AgentId) {
        let claimed = self
            .attempts
            .with_existing(&subject, |list| {
                list.claim(SimpleOutcome::Success, |_, _| false, |_| true).is_some()
            })
            .unwrap_or(false);
        if claimed {
            self.stats.with_entry(subject, StatsRecord::default, |record| {
                record.stats.record_success();
                record.since_success = 0.0;
            });
            trace!(family = self.family, ?subject, "success matched");
        }
    }

    /// Age attempts and timers, synthesize implied misses, evict stale
    /// attempts, and drop empty per-subject entries
    pub fn update(&self, dt: Seconds) {
        let window = self.config.outcome_window;
        let max_age = self.config.max_attempt_age;
        let mut implied: Vec<(AgentId, usize)> = Vec::new();

        self.attempts.write_with(|map| {
            for (subject, list) in map.iter_mut() {
                list.age_all(dt);
                let missed = list.imply_expired(window, SimpleOutcome::ImpliedMiss);
                if missed > 0 {
                    implied.push((*subject, missed));
                }
                list.evict_older_than(max_age);
            }
            map.retain(|_, list| !list.is_empty());
        });

        for (subject, missed) in implied {
            self.stats.with_entry(subject, StatsRecord::default, |record| {
                for _ in 0..missed {
                    record.stats.record_miss();
                }
            });
            trace!(family = self.family, ?subject, missed, "implied misses");
        }

        self.stats.write_with(|map| {
            for record in map.values_mut() {
                record.since_success += dt;
            }
        });
    }

    /// Value snapshot of the subject's stats; empty stats for unknown ids
    pub fn feedback(&self, subject: AgentId) -> FeedbackStats {
        self.stats
            .get_cloned(&subject)
            .map(|record| record.stats)
            .unwrap_or_default()
    }

    /// Seconds since the last matched success, if the subject ever had one
    pub fn seconds_since_success(&self, subject: AgentId) -> Option<Seconds> {
        self.stats
            .get_cloned(&subject)
            .filter(|record| record.stats.successes > 0)
            .map(|record| record.since_success)
    }

    /// Number of attempts still held for the subject
    pub fn pending_attempts(&self, subject: AgentId) -> usize {
        self.attempts
            .read_with(|map| map.get(&subject).map(|list| list.len()).unwrap_or(0))
    }

    /// Drop everything tracked for an agent that left combat
    pub fn forget(&self, subject: AgentId) {
        self.attempts.remove(&subject);
        self.stats.remove(&subject);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> SimpleOutcomeTracker {
        SimpleOutcomeTracker::new("parry", LedgerConfig::default())
    }

    #[test]
    fn test_success_requires_prior_attempt() {
        let tracker = tracker();
        let subject = AgentId::new();
        tracker.on_success(subject);
        assert_eq!(tracker.feedback(subject).successes, 0);
    }

    #[test]
    fn test_attempt_then_success_updates_rate() {
        let tracker = tracker();
        let subject = AgentId::new();
        let counterpart = AgentId::new();
        tracker.record_attempt(subject, counterpart);
        tracker.record_attempt(subject, counterpart);
        tracker.on_success(subject);
        let stats = tracker.feedback(subject);
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.rate, 0.5);
        assert_eq!(tracker.seconds_since_success(subject), Some(0.0));
    }

    #[test]
    fn test_one_success_claims_one_attempt() {
        let tracker = tracker();
        let subject = AgentId::new();
        tracker.record_attempt(subject, AgentId::new());
        tracker.on_success(subject);
        tracker.on_success(subject);
        assert_eq!(tracker.feedback(subject).successes, 1);
    }

    #[test]
    fn test_implied_miss_synthesized_once() {
        let tracker = tracker();
        let subject = AgentId::new();
        tracker.record_attempt(subject, AgentId::new());
        tracker.update(2.0);
        tracker.update(2.0);
        tracker.update(2.0);
        let stats = tracker.feedback(subject);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.attempts, 1);
    }

    #[test]
    fn test_stale_attempts_evicted_and_entry_removed() {
        let tracker = tracker();
        let subject = AgentId::new();
        tracker.record_attempt(subject, AgentId::new());
        tracker.update(11.0);
        assert_eq!(tracker.pending_attempts(subject), 0);
        // A success after eviction has nothing to claim
        tracker.on_success(subject);
        assert_eq!(tracker.feedback(subject).successes, 0);
    }

    #[test]
    fn test_forget_clears_stats() {
        let tracker = tracker();
        let subject = AgentId::new();
        tracker.record_attempt(subject, AgentId::new());
        tracker.forget(subject);
        assert_eq!(tracker.feedback(subject), FeedbackStats::default());
    }
}
