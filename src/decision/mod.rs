//! Decision values and priority tiers
//!
//! A Decision is created by one evaluator, adjusted in place by the style
//! re-weighter, and consumed once by the executor. It has no persistent
//! identity.

pub mod arbitrator;
pub mod evaluators;
pub mod style;

pub use arbitrator::Arbitrator;
pub use evaluators::{
    BackoffEvaluator, Evaluator, EvasionEvaluator, InterruptEvaluator, OffenseEvaluator,
    SurvivalEvaluator,
};
pub use style::{StyleKind, StyleProfile};

use serde::{Deserialize, Serialize};

use crate::core::types::Vec3;

/// Every tactical action the arbitration engine can emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    None,
    Retreat,
    Strafe,
    Bash,
    PowerAttack,
    SprintAttack,
    Attack,
    Jump,
    Dodge,
    Backoff,
    Advancing,
    Feint,
    Flanking,
    Parry,
    TimedBlock,
}

impl ActionKind {
    /// Stable ordinal used as the last tie-break term
    pub fn ordinal(&self) -> f32 {
        *self as u8 as f32
    }

    pub fn is_offensive(&self) -> bool {
        matches!(
            self,
            ActionKind::Bash
                | ActionKind::PowerAttack
                | ActionKind::SprintAttack
                | ActionKind::Attack
                | ActionKind::Advancing
                | ActionKind::Feint
                | ActionKind::Flanking
        )
    }

    pub fn is_defensive(&self) -> bool {
        matches!(
            self,
            ActionKind::Retreat
                | ActionKind::Strafe
                | ActionKind::Jump
                | ActionKind::Dodge
                | ActionKind::Backoff
                | ActionKind::Parry
                | ActionKind::TimedBlock
        )
    }

    /// Cooldown class, for actions that are rate-limited by the humanizer
    pub fn class(&self) -> Option<ActionClass> {
        match self {
            ActionKind::Bash => Some(ActionClass::Bash),
            ActionKind::Dodge => Some(ActionClass::Dodge),
            ActionKind::Jump => Some(ActionClass::Jump),
            _ => None,
        }
    }
}

/// Cooldown classes tracked by the humanizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionClass {
    Bash,
    Dodge,
    Jump,
}

/// Priority tiers
///
/// Coarse integer ranking; fine-grained ordering happens in re-weighting
/// and tie-break. Style nudges are clamped well below 1.0 so they can never
/// move a candidate across a tier boundary.
pub mod tier {
    pub const SURVIVAL: f32 = 6.0;
    pub const INTERRUPT: f32 = 5.0;
    pub const EVASION: f32 = 4.0;
    pub const BACKOFF: f32 = 3.0;
    pub const OFFENSE: f32 = 2.0;
}

/// The chosen action plus movement parameters for one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: ActionKind,
    pub priority: f32,
    pub direction: Vec3,
    /// Movement/animation intensity in [0, 1]
    pub intensity: f32,
}

impl Decision {
    pub fn new(action: ActionKind, priority: f32, direction: Vec3, intensity: f32) -> Self {
        Self { action, priority, direction, intensity }
    }

    /// The explicit "nothing to do" sentinel
    pub fn noop() -> Self {
        Self {
            action: ActionKind::None,
            priority: 0.0,
            direction: Vec3::ZERO,
            intensity: 0.0,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.action == ActionKind::None
    }
}
