//! Candidate arbitration
//!
//! Runs every evaluator, re-weights each candidate for the agent's style,
//! then selects the winner: highest priority first, a deterministic score
//! among exact priority ties, and a uniform random pick only when the
//! scores are exactly equal too. That final pick is the one legitimate
//! nondeterminism in arbitration, and it flows through the injected RNG so
//! tests can pin it with a seed.

use ordered_float::OrderedFloat;
use rand::{Rng, RngCore};

use crate::core::config::DirectorConfig;
use crate::decision::evaluators::{standard_evaluators, Evaluator};
use crate::decision::{style, ActionKind, Decision, StyleProfile};
use crate::snapshot::{RangeCategory, Snapshot};

pub struct Arbitrator {
    evaluators: Vec<Box<dyn Evaluator>>,
}

impl Arbitrator {
    /// Arbitrator over the standard five evaluators
    pub fn new() -> Self {
        Self { evaluators: standard_evaluators() }
    }

    /// Arbitrator over a custom evaluator set
    pub fn with_evaluators(evaluators: Vec<Box<dyn Evaluator>>) -> Self {
        Self { evaluators }
    }

    /// Choose this tick's action; the no-op decision when nothing fires
    pub fn arbitrate(
        &self,
        snapshot: &Snapshot,
        profile: &StyleProfile,
        config: &DirectorConfig,
        rng: &mut dyn RngCore,
    ) -> Decision {
        let mut candidates: Vec<Decision> = Vec::with_capacity(self.evaluators.len());
        for evaluator in &self.evaluators {
            if let Some(candidate) = evaluator.evaluate(snapshot, config, rng) {
                if !candidate.is_noop() {
                    candidates.push(candidate);
                }
            }
        }
        if candidates.is_empty() {
            return Decision::noop();
        }

        // The full candidate set is re-weighted before any max scan
        for candidate in candidates.iter_mut() {
            style::reweight(candidate, profile, snapshot);
        }

        let top_priority = candidates
            .iter()
            .map(|c| OrderedFloat(c.priority))
            .max()
            .map(OrderedFloat::into_inner)
            .unwrap_or(0.0);

        // Exact equality: priorities are coarse tiers plus bounded nudges,
        // so ties are common and intended
        let tied: Vec<&Decision> = candidates
            .iter()
            .filter(|c| c.priority == top_priority)
            .collect();
        if tied.len() == 1 {
            return tied[0].clone();
        }

        let best_score = tied
            .iter()
            .map(|c| OrderedFloat(tie_break_score(c, snapshot)))
            .max()
            .map(OrderedFloat::into_inner)
            .unwrap_or(0.0);
        let finalists: Vec<&Decision> = tied
            .into_iter()
            .filter(|c| tie_break_score(c, snapshot) == best_score)
            .collect();

        let index = if finalists.len() == 1 {
            0
        } else {
            rng.gen_range(0..finalists.len())
        };
        finalists[index].clone()
    }
}

impl Default for Arbitrator {
    fn default() -> Self {
        Self::new()
    }
}

/// Deterministic ranking among equal-priority candidates
fn tie_break_score(decision: &Decision, snapshot: &Snapshot) -> f32 {
    decision.intensity * 10.0
        + health_preference(decision, snapshot)
        + distance_preference(decision, snapshot)
        + decision.action.ordinal() * 0.1
}

/// Healthy agents lean offensive, wounded agents lean defensive
fn health_preference(decision: &Decision, snapshot: &Snapshot) -> f32 {
    let healthy = snapshot.self_state.health_percent > 0.5;
    if healthy && decision.action.is_offensive() {
        2.0
    } else if !healthy && decision.action.is_defensive() {
        2.0
    } else {
        0.0
    }
}

/// Prefer the action that fits the current range band
fn distance_preference(decision: &Decision, snapshot: &Snapshot) -> f32 {
    match (snapshot.context.range, decision.action) {
        (RangeCategory::OutOfRange | RangeCategory::MaxRange, ActionKind::Advancing) => 1.5,
        (RangeCategory::CloseRange, ActionKind::Bash) => 1.5,
        (RangeCategory::OptimalRange, ActionKind::Attack | ActionKind::PowerAttack) => 1.5,
        _ => 0.0,
    }
}
