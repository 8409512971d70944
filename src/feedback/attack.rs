//! Attack-defense outcome classification
//!
//! The most intricate correlation family: a swing can resolve as Parried,
//! TimedBlocked, Hit, or Missed (timeout). Parry and timed-block reports
//! come from the defender's mod events and carry only the attacker
//! identity; hit reports come from the engine and carry the victim, so a
//! hit only counts against the attempt aimed at that victim. Timed-block
//! reports are authoritative over parry matches and may reclassify them;
//! no other override is permitted.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::core::config::LedgerConfig;
use crate::core::shared_map::SharedMap;
use crate::core::types::{AgentId, Seconds};
use crate::decision::ActionKind;
use crate::feedback::ledger::{Attempt, AttemptList};

/// How a recorded swing resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    Parried,
    TimedBlocked,
    Hit,
    Missed,
}

impl AttackOutcome {
    /// Transition table for reclassification.
    ///
    /// A timed-block notification is authoritative over an earlier parry
    /// match. Every other transition out of a matched state is forbidden:
    /// hit and miss never displace a defensive outcome, and a parry report
    /// arriving after a timed-block match is stale.
    pub fn may_override(incoming: AttackOutcome, existing: AttackOutcome) -> bool {
        matches!(
            (incoming, existing),
            (AttackOutcome::TimedBlocked, AttackOutcome::Parried)
        )
    }
}

/// What kind of swing the attempt was
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackPayload {
    pub action: ActionKind,
}

/// Running swing statistics for one attacker
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttackStats {
    pub attacks: u32,
    pub hits: u32,
    pub misses: u32,
    pub parried: u32,
    pub timed_blocked: u32,
    /// hits / attacks, 0.0 while no attacks are recorded
    pub hit_rate: f32,
}

impl AttackStats {
    fn record_attempt(&mut self) {
        self.attacks += 1;
        self.recompute();
    }

    fn apply(&mut self, outcome: AttackOutcome) {
        match outcome {
            AttackOutcome::Parried => self.parried += 1,
            AttackOutcome::TimedBlocked => self.timed_blocked += 1,
            AttackOutcome::Hit => self.hits += 1,
            AttackOutcome::Missed => self.misses += 1,
        }
        self.recompute();
    }

    // Counters clamp at zero; a retract for an outcome that was never
    // counted is a logic fault upstream, not a reason to underflow.
    fn retract(&mut self, outcome: AttackOutcome) {
        match outcome {
            AttackOutcome::Parried => self.parried = self.parried.saturating_sub(1),
            AttackOutcome::TimedBlocked => {
                self.timed_blocked = self.timed_blocked.saturating_sub(1)
            }
            AttackOutcome::Hit => self.hits = self.hits.saturating_sub(1),
            AttackOutcome::Missed => self.misses = self.misses.saturating_sub(1),
        }
        self.recompute();
    }

    fn recompute(&mut self) {
        self.hit_rate = if self.attacks == 0 {
            0.0
        } else {
            self.hits as f32 / self.attacks as f32
        };
    }
}

#[derive(Debug, Clone)]
struct AttackRecord {
    stats: AttackStats,
    since_hit: Seconds,
}

impl Default for AttackRecord {
    fn default() -> Self {
        Self { stats: AttackStats::default(), since_hit: f32::MAX }
    }
}

/// Attempt/outcome correlation for swings
pub struct AttackTracker {
    config: LedgerConfig,
    attempts: SharedMap<AgentId, AttemptList<AttackPayload, AttackOutcome>>,
    stats: SharedMap<AgentId, AttackRecord>,
}

impl AttackTracker {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config, attempts: SharedMap::new(), stats: SharedMap::new() }
    }

    /// Log a swing by `attacker` aimed at `victim`
    pub fn record_attempt(&self, attacker: AgentId, victim: AgentId, action: ActionKind) {
        let cap = self.config.max_attempts_per_subject;
        self.attempts
            .with_entry(attacker, || AttemptList::new(cap), |list| {
                list.push(victim, AttackPayload { action });
            });
        self.stats
            .with_entry(attacker, AttackRecord::default, |record| {
                record.stats.record_attempt();
            });
        trace!(?attacker, ?victim, ?action, "swing recorded");
    }

    /// The swing landed on `victim`; only matches the attempt aimed at them
    pub fn on_hit(&self, attacker: AgentId, victim: AgentId) {
        self.resolve(attacker, AttackOutcome::Hit, move |attempt| {
            attempt.counterpart == victim
        });
    }

    /// The defender parried the swing; the report carries no victim identity
    pub fn on_parried(&self, attacker: AgentId) {
        self.resolve(attacker, AttackOutcome::Parried, |_| true);
    }

    /// The defender timed-blocked the swing; authoritative over a parry match
    pub fn on_timed_blocked(&self, attacker: AgentId) {
        self.resolve(attacker, AttackOutcome::TimedBlocked, |_| true);
    }

    fn resolve(
        &self,
        attacker: AgentId,
        kind: AttackOutcome,
        pred: impl Fn(&Attempt<AttackPayload, AttackOutcome>) -> bool,
    ) {
        let claim = self
            .attempts
            .with_existing(&attacker, |list| {
                list.claim(kind, AttackOutcome::may_override, pred)
            })
            .flatten();

        if let Some(claim) = claim {
            self.stats.with_entry(attacker, AttackRecord::default, |record| {
                if let Some(previous) = claim.previous {
                    record.stats.retract(previous);
                }
                record.stats.apply(kind);
                if kind == AttackOutcome::Hit {
                    record.since_hit = 0.0;
                }
            });
            trace!(?attacker, ?kind, reclassified = claim.previous.is_some(), "swing resolved");
        }
    }

    /// Age attempts and timers, synthesize timeout misses, evict stale
    /// attempts, and drop empty per-subject entries
    pub fn update(&self, dt: Seconds) {
        let window = self.config.outcome_window;
        let max_age = self.config.max_attempt_age;
        let mut implied: Vec<(AgentId, usize)> = Vec::new();

        self.attempts.write_with(|map| {
            for (attacker, list) in map.iter_mut() {
                list.age_all(dt);
                let missed = list.imply_expired(window, AttackOutcome::Missed);
                if missed > 0 {
                    implied.push((*attacker, missed));
                }
                list.evict_older_than(max_age);
            }
            map.retain(|_, list| !list.is_empty());
        });

        for (attacker, missed) in implied {
            self.stats.with_entry(attacker, AttackRecord::default, |record| {
                for _ in 0..missed {
                    record.stats.apply(AttackOutcome::Missed);
                }
            });
            trace!(?attacker, missed, "swings timed out as misses");
        }

        self.stats.write_with(|map| {
            for record in map.values_mut() {
                record.since_hit += dt;
            }
        });
    }

    /// Value snapshot of the attacker's stats; empty stats for unknown ids
    pub fn feedback(&self, attacker: AgentId) -> AttackStats {
        self.stats
            .get_cloned(&attacker)
            .map(|record| record.stats)
            .unwrap_or_default()
    }

    /// Seconds since the last landed hit, if the attacker ever landed one
    pub fn seconds_since_hit(&self, attacker: AgentId) -> Option<Seconds> {
        self.stats
            .get_cloned(&attacker)
            .filter(|record| record.stats.hits > 0)
            .map(|record| record.since_hit)
    }

    /// Number of attempts still held for the attacker
    pub fn pending_attempts(&self, attacker: AgentId) -> usize {
        self.attempts
            .read_with(|map| map.get(&attacker).map(|list| list.len()).unwrap_or(0))
    }

    /// Drop everything tracked for an agent that left combat
    pub fn forget(&self, attacker: AgentId) {
        self.attempts.remove(&attacker);
        self.stats.remove(&attacker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> AttackTracker {
        AttackTracker::new(LedgerConfig::default())
    }

    #[test]
    fn test_hit_requires_matching_victim() {
        let tracker = tracker();
        let attacker = AgentId::new();
        let victim = AgentId::new();
        tracker.record_attempt(attacker, victim, ActionKind::Attack);
        tracker.on_hit(attacker, AgentId::new());
        assert_eq!(tracker.feedback(attacker).hits, 0);
        tracker.on_hit(attacker, victim);
        assert_eq!(tracker.feedback(attacker).hits, 1);
    }

    #[test]
    fn test_parry_matches_on_subject_alone() {
        let tracker = tracker();
        let attacker = AgentId::new();
        tracker.record_attempt(attacker, AgentId::new(), ActionKind::PowerAttack);
        tracker.on_parried(attacker);
        assert_eq!(tracker.feedback(attacker).parried, 1);
    }

    #[test]
    fn test_timed_block_reclassifies_parry() {
        let tracker = tracker();
        let attacker = AgentId::new();
        tracker.record_attempt(attacker, AgentId::new(), ActionKind::Attack);
        tracker.on_parried(attacker);
        tracker.on_timed_blocked(attacker);
        let stats = tracker.feedback(attacker);
        assert_eq!(stats.parried, 0);
        assert_eq!(stats.timed_blocked, 1);
    }

    #[test]
    fn test_parry_never_reclassifies_timed_block() {
        let tracker = tracker();
        let attacker = AgentId::new();
        tracker.record_attempt(attacker, AgentId::new(), ActionKind::Attack);
        tracker.on_timed_blocked(attacker);
        tracker.on_parried(attacker);
        let stats = tracker.feedback(attacker);
        assert_eq!(stats.timed_blocked, 1);
        assert_eq!(stats.parried, 0);
    }

    #[test]
    fn test_hit_never_overrides_defensive_outcome() {
        let tracker = tracker();
        let attacker = AgentId::new();
        let victim = AgentId::new();
        tracker.record_attempt(attacker, victim, ActionKind::Attack);
        tracker.on_parried(attacker);
        tracker.on_hit(attacker, victim);
        let stats = tracker.feedback(attacker);
        assert_eq!(stats.parried, 1);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_timeout_miss_counted_once() {
        let tracker = tracker();
        let attacker = AgentId::new();
        tracker.record_attempt(attacker, AgentId::new(), ActionKind::Attack);
        tracker.update(2.0);
        tracker.update(2.0);
        let stats = tracker.feedback(attacker);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.attacks, 1);
    }

    #[test]
    fn test_evicted_attempt_cannot_match() {
        let tracker = tracker();
        let attacker = AgentId::new();
        let victim = AgentId::new();
        tracker.record_attempt(attacker, victim, ActionKind::Attack);
        tracker.update(11.0);
        assert_eq!(tracker.pending_attempts(attacker), 0);
        tracker.on_hit(attacker, victim);
        assert_eq!(tracker.feedback(attacker).hits, 0);
    }

    #[test]
    fn test_unknown_attacker_is_noop() {
        let tracker = tracker();
        tracker.on_parried(AgentId::new());
        tracker.on_hit(AgentId::new(), AgentId::new());
        tracker.update(1.0);
    }

    #[test]
    fn test_hit_rate_guarded_against_zero_attempts() {
        let tracker = tracker();
        assert_eq!(tracker.feedback(AgentId::new()).hit_rate, 0.0);
    }
}
