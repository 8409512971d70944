//! Generic attempt ledger
//!
//! One subject's bounded, FIFO-ordered list of speculative attempts, each
//! awaiting an asynchronous outcome. Outcome matching scans newest to
//! oldest; an explicit match state per attempt records which outcome has
//! claimed it, and an injected override table decides which transitions a
//! later, authoritative outcome may still perform.
//!
//! Attempts carry an age instead of a wall-clock stamp; `age_all` advances
//! every age by the tick delta, which keeps the ledger fully deterministic
//! under test.

use std::collections::VecDeque;

use crate::core::types::{AgentId, Seconds};

/// Which outcome, if any, has claimed an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState<K> {
    Unmatched,
    Matched(K),
}

/// A logged speculative action awaiting an asynchronous outcome
#[derive(Debug, Clone)]
pub struct Attempt<P, K> {
    pub counterpart: AgentId,
    pub age: Seconds,
    pub payload: P,
    pub state: MatchState<K>,
}

/// Result of a successful claim: the outcome the attempt carried before,
/// when the claim was an override rather than a first match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim<K> {
    pub previous: Option<K>,
}

/// Bounded per-subject attempt list
#[derive(Debug, Clone)]
pub struct AttemptList<P, K> {
    entries: VecDeque<Attempt<P, K>>,
    cap: usize,
}

impl<P, K: Copy + PartialEq> AttemptList<P, K> {
    pub fn new(cap: usize) -> Self {
        Self { entries: VecDeque::with_capacity(cap.min(16)), cap: cap.max(1) }
    }

    /// Append a fresh attempt, evicting the oldest beyond the cap
    pub fn push(&mut self, counterpart: AgentId, payload: P) {
        if self.entries.len() >= self.cap {
            self.entries.pop_front();
        }
        self.entries.push_back(Attempt {
            counterpart,
            age: 0.0,
            payload,
            state: MatchState::Unmatched,
        });
    }

    /// Claim the most recent attempt whose state admits `kind` and whose
    /// entry satisfies `pred`.
    ///
    /// An attempt admits `kind` when it is unmatched, or when it is matched
    /// with an outcome that `may_override(kind, existing)` permits replacing.
    /// At most one attempt transitions per call.
    pub fn claim(
        &mut self,
        kind: K,
        may_override: impl Fn(K, K) -> bool,
        pred: impl Fn(&Attempt<P, K>) -> bool,
    ) -> Option<Claim<K>> {
        for attempt in self.entries.iter_mut().rev() {
            if !pred(attempt) {
                continue;
            }
            match attempt.state {
                MatchState::Unmatched => {
                    attempt.state = MatchState::Matched(kind);
                    return Some(Claim { previous: None });
                }
                MatchState::Matched(existing) => {
                    if existing != kind && may_override(kind, existing) {
                        attempt.state = MatchState::Matched(kind);
                        return Some(Claim { previous: Some(existing) });
                    }
                }
            }
        }
        None
    }

    pub fn age_all(&mut self, dt: Seconds) {
        for attempt in self.entries.iter_mut() {
            attempt.age += dt;
        }
    }

    /// Mark unmatched attempts older than `window` with the implied outcome.
    ///
    /// Each attempt is marked at most once; repeated sweeps find it already
    /// matched and skip it. Returns how many attempts were marked.
    pub fn imply_expired(&mut self, window: Seconds, implied: K) -> usize {
        let mut marked = 0;
        for attempt in self.entries.iter_mut() {
            if attempt.state == MatchState::Unmatched && attempt.age > window {
                attempt.state = MatchState::Matched(implied);
                marked += 1;
            }
        }
        marked
    }

    /// Drop attempts older than `max_age` regardless of match state
    pub fn evict_older_than(&mut self, max_age: Seconds) -> usize {
        let before = self.entries.len();
        self.entries.retain(|attempt| attempt.age <= max_age);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Attempt<P, K>> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Outcome {
        Good,
        Bad,
    }

    fn no_override(_incoming: Outcome, _existing: Outcome) -> bool {
        false
    }

    fn any<P>(_: &Attempt<P, Outcome>) -> bool {
        true
    }

    #[test]
    fn test_push_evicts_oldest_beyond_cap() {
        let mut list: AttemptList<u32, Outcome> = AttemptList::new(3);
        for i in 0..5 {
            list.push(AgentId::new(), i);
        }
        assert_eq!(list.len(), 3);
        let payloads: Vec<u32> = list.entries().map(|a| a.payload).collect();
        assert_eq!(payloads, vec![2, 3, 4]);
    }

    #[test]
    fn test_claim_prefers_most_recent_unmatched() {
        let mut list: AttemptList<u32, Outcome> = AttemptList::new(8);
        list.push(AgentId::new(), 1);
        list.push(AgentId::new(), 2);
        list.claim(Outcome::Good, no_override, |a| a.payload == 2)
            .expect("should claim");
        // Next unqualified claim lands on the remaining unmatched entry
        list.claim(Outcome::Good, no_override, any).expect("should claim");
        assert!(list.claim(Outcome::Good, no_override, any).is_none());
    }

    #[test]
    fn test_claim_without_override_leaves_matched_entries() {
        let mut list: AttemptList<(), Outcome> = AttemptList::new(8);
        list.push(AgentId::new(), ());
        assert!(list.claim(Outcome::Good, no_override, any).is_some());
        assert!(list.claim(Outcome::Bad, no_override, any).is_none());
    }

    #[test]
    fn test_claim_with_override_reports_previous() {
        let mut list: AttemptList<(), Outcome> = AttemptList::new(8);
        list.push(AgentId::new(), ());
        list.claim(Outcome::Good, no_override, any).expect("first claim");
        let claim = list
            .claim(Outcome::Bad, |incoming, existing| {
                incoming == Outcome::Bad && existing == Outcome::Good
            }, any)
            .expect("override claim");
        assert_eq!(claim.previous, Some(Outcome::Good));
    }

    #[test]
    fn test_imply_expired_marks_each_attempt_once() {
        let mut list: AttemptList<(), Outcome> = AttemptList::new(8);
        list.push(AgentId::new(), ());
        list.age_all(2.0);
        assert_eq!(list.imply_expired(1.5, Outcome::Bad), 1);
        assert_eq!(list.imply_expired(1.5, Outcome::Bad), 0);
        list.age_all(2.0);
        assert_eq!(list.imply_expired(1.5, Outcome::Bad), 0);
    }

    #[test]
    fn test_evict_older_than_ignores_match_state() {
        let mut list: AttemptList<(), Outcome> = AttemptList::new(8);
        list.push(AgentId::new(), ());
        list.push(AgentId::new(), ());
        list.claim(Outcome::Good, no_override, any).expect("claim");
        list.age_all(11.0);
        list.push(AgentId::new(), ());
        assert_eq!(list.evict_older_than(10.0), 2);
        assert_eq!(list.len(), 1);
    }
}
