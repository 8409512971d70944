//! Candidate evaluators
//!
//! Each evaluator inspects the snapshot and proposes zero or one candidate
//! decision; returning `None` means "no opinion". All five run
//! unconditionally every tick and never mutate the snapshot. The only
//! state any of them touches is the injected RNG, so arbitration stays
//! reproducible under a fixed seed.

use rand::{Rng, RngCore};

use crate::core::config::DirectorConfig;
use crate::decision::{tier, ActionKind, Decision};
use crate::snapshot::{AttackState, Snapshot};

/// A tactical candidate source
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &'static str;

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        rng: &mut dyn RngCore,
    ) -> Option<Decision>;
}

/// Reflexive bash against a telegraphed power attack
///
/// Fires only in melee: a drawn bow cannot bash.
pub struct InterruptEvaluator;

impl Evaluator for InterruptEvaluator {
    fn name(&self) -> &'static str {
        "interrupt"
    }

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        _rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let target = snapshot.target.as_ref()?;
        if snapshot.self_state.weapon.is_ranged() {
            return None;
        }
        if target.attack_state != AttackState::PowerAttacking {
            return None;
        }
        let cfg = &config.interrupt;
        if target.distance > snapshot.weapon_reach * cfg.reach_multiplier {
            return None;
        }
        if target.facing_dot <= cfg.facing_threshold {
            return None;
        }
        Some(Decision::new(
            ActionKind::Bash,
            tier::INTERRUPT,
            snapshot.direction_to_target(),
            1.0,
        ))
    }
}

/// Jump, dodge and strafe responses to incoming threats
pub struct EvasionEvaluator;

impl Evaluator for EvasionEvaluator {
    fn name(&self) -> &'static str {
        "evasion"
    }

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let target = snapshot.target.as_ref()?;
        let cfg = &config.evasion;

        // Jump over an aimed shot
        if target.weapon.is_ranged()
            && target.distance >= cfg.jump_min_distance
            && target.distance <= cfg.jump_max_distance
            && target.facing_dot > cfg.jump_facing_threshold
            && rng.gen::<f32>() < cfg.jump_probability
        {
            return Some(Decision::new(
                ActionKind::Jump,
                tier::EVASION,
                snapshot.direction_to_target(),
                1.0,
            ));
        }

        // Dodge or strafe a swing, or circle a turtled blocker
        let swing_incoming = target.attack_state.is_swinging()
            && target.distance > cfg.dodge_min_distance
            && target.facing_dot > cfg.dodge_facing_threshold;
        let blocking_standoff =
            target.is_blocking && target.facing_dot > cfg.dodge_facing_threshold;
        if !swing_incoming && !blocking_standoff {
            return None;
        }
        if snapshot.self_state.stamina_percent < cfg.dodge_stamina_cost {
            return None;
        }

        if rng.gen::<f32>() < cfg.dodge_probability {
            let intensity = if target.distance <= cfg.very_close_distance {
                1.0
            } else if target.distance <= cfg.close_distance {
                0.8
            } else {
                0.6
            };
            Some(Decision::new(
                ActionKind::Dodge,
                tier::EVASION,
                snapshot.away_from_target(),
                intensity,
            ))
        } else {
            let side = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            let direction = snapshot.direction_to_target().perpendicular() * side;
            Some(Decision::new(
                ActionKind::Strafe,
                tier::EVASION,
                direction,
                cfg.strafe_intensity,
            ))
        }
    }
}

/// Disengage at critical health
///
/// The one evaluator that does not need a target: a dying agent backs
/// straight out of its own facing when it has nothing to run from.
pub struct SurvivalEvaluator;

impl Evaluator for SurvivalEvaluator {
    fn name(&self) -> &'static str {
        "survival"
    }

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        _rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        if snapshot.self_state.health_percent > config.survival.health_threshold {
            return None;
        }
        let direction = if snapshot.target.is_some() {
            snapshot.away_from_target()
        } else {
            (-snapshot.self_state.forward).normalize()
        };
        Some(Decision::new(ActionKind::Retreat, tier::SURVIVAL, direction, 1.0))
    }
}

/// Open distance against casters and drawn ranged weapons
pub struct BackoffEvaluator;

impl Evaluator for BackoffEvaluator {
    fn name(&self) -> &'static str {
        "backoff"
    }

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        _rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let target = snapshot.target.as_ref()?;
        if !target.is_casting && !target.is_drawing_ranged {
            return None;
        }
        let cfg = &config.backoff;
        // A distant threat that is not even pointed at us is not worth
        // giving ground over
        if target.distance > cfg.far_distance && target.facing_dot < cfg.facing_threshold {
            return None;
        }
        let intensity = if target.distance <= cfg.near_distance {
            1.0
        } else if target.distance <= cfg.far_distance {
            0.7
        } else {
            0.4
        };
        Some(Decision::new(
            ActionKind::Backoff,
            tier::BACKOFF,
            snapshot.away_from_target(),
            intensity,
        ))
    }
}

/// Distance-tiered offense: close, sprint in, or commit to a swing
pub struct OffenseEvaluator;

impl Evaluator for OffenseEvaluator {
    fn name(&self) -> &'static str {
        "offense"
    }

    fn evaluate(
        &self,
        snapshot: &Snapshot,
        config: &DirectorConfig,
        _rng: &mut dyn RngCore,
    ) -> Option<Decision> {
        let target = snapshot.target.as_ref()?;
        let cfg = &config.offense;
        let toward = snapshot.direction_to_target();

        if !target.has_line_of_sight {
            // Keep closing; pathfinding owns the detour
            return Some(Decision::new(ActionKind::Advancing, tier::OFFENSE, toward, 0.8));
        }

        let stamina = snapshot.self_state.stamina_percent;

        if target.distance > cfg.sprint_max_distance {
            let excess = (target.distance - cfg.sprint_max_distance) / cfg.sprint_max_distance;
            let intensity = (0.5 + excess * 0.5).clamp(0.5, 1.0);
            return Some(Decision::new(ActionKind::Advancing, tier::OFFENSE, toward, intensity));
        }

        if target.distance > cfg.sprint_min_distance {
            if stamina >= cfg.sprint_stamina_cost {
                return Some(Decision::new(ActionKind::SprintAttack, tier::OFFENSE, toward, 1.0));
            }
            return Some(Decision::new(ActionKind::Advancing, tier::OFFENSE, toward, 0.7));
        }

        if target.distance <= snapshot.weapon_reach {
            if stamina > cfg.power_attack_stamina_threshold {
                return Some(Decision::new(ActionKind::PowerAttack, tier::OFFENSE, toward, 1.0));
            }
            return Some(Decision::new(ActionKind::Attack, tier::OFFENSE, toward, 0.8));
        }

        // Between melee reach and the sprint band: walk it in
        Some(Decision::new(ActionKind::Advancing, tier::OFFENSE, toward, 0.6))
    }
}

/// The standard evaluator set, in registration order
pub fn standard_evaluators() -> Vec<Box<dyn Evaluator>> {
    vec![
        Box::new(InterruptEvaluator),
        Box::new(EvasionEvaluator),
        Box::new(SurvivalEvaluator),
        Box::new(BackoffEvaluator),
        Box::new(OffenseEvaluator),
    ]
}
