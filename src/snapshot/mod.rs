//! Immutable per-tick view of the combat world
//!
//! Built fresh each tick by the external state observer, which performs all
//! defensive validation of live engine references before the snapshot ever
//! reaches the decision core. The core only reads it; a missing target is
//! `None`, never a dangling handle.

use serde::{Deserialize, Serialize};

use crate::core::config::RangeConfig;
use crate::core::types::{AgentId, Seconds, Vec3};
use crate::feedback::CombatFeedback;

/// Where an actor is in its swing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackState {
    Idle,
    Attacking,
    PowerAttacking,
}

impl AttackState {
    pub fn is_swinging(&self) -> bool {
        matches!(self, AttackState::Attacking | AttackState::PowerAttacking)
    }
}

/// Stagger condition of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnockState {
    Normal,
    Staggered,
    KnockedDown,
}

/// Coarse weapon classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeaponClass {
    Unarmed,
    OneHanded,
    TwoHanded,
    Bow,
    Crossbow,
    Staff,
}

impl WeaponClass {
    pub fn is_ranged(&self) -> bool {
        matches!(self, WeaponClass::Bow | WeaponClass::Crossbow)
    }

    pub fn is_melee(&self) -> bool {
        matches!(
            self,
            WeaponClass::Unarmed | WeaponClass::OneHanded | WeaponClass::TwoHanded
        )
    }
}

/// Crowd pressure derived from the nearby enemy count
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThreatTier {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

impl ThreatTier {
    pub fn from_enemy_count(count: u32) -> Self {
        match count {
            0 => ThreatTier::None,
            1 => ThreatTier::Low,
            2 => ThreatTier::Moderate,
            3..=4 => ThreatTier::High,
            _ => ThreatTier::Critical,
        }
    }
}

/// Distance relative to effective weapon reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeCategory {
    OutOfRange,
    MaxRange,
    OptimalRange,
    CloseRange,
}

impl RangeCategory {
    pub fn classify(distance: f32, optimal_reach: f32, config: &RangeConfig) -> Self {
        if optimal_reach <= 0.0 {
            return RangeCategory::OutOfRange;
        }
        if distance <= optimal_reach * config.close_factor {
            RangeCategory::CloseRange
        } else if distance <= optimal_reach {
            RangeCategory::OptimalRange
        } else if distance <= optimal_reach * config.max_factor {
            RangeCategory::MaxRange
        } else {
            RangeCategory::OutOfRange
        }
    }
}

/// The deciding agent's own condition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfState {
    /// Stamina and health as fractions in [0, 1]
    pub stamina_percent: f32,
    pub health_percent: f32,
    /// Level drives humanizer scaling (reaction delay, mistake chance)
    pub level: u16,
    pub attack_state: AttackState,
    pub is_blocking: bool,
    pub is_sprinting: bool,
    pub is_casting: bool,
    pub position: Vec3,
    pub forward: Vec3,
    pub weapon: WeaponClass,
}

/// The current opponent, already validated by the observer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetState {
    pub id: AgentId,
    pub health_percent: f32,
    pub stamina_percent: f32,
    pub attack_state: AttackState,
    pub is_blocking: bool,
    pub is_casting: bool,
    /// True while a bow or crossbow is being drawn or held drawn
    pub is_drawing_ranged: bool,
    pub weapon: WeaponClass,
    pub position: Vec3,
    pub distance: f32,
    /// Dot of the target's forward vector against the direction to us;
    /// 1.0 means it is looking straight at us
    pub facing_dot: f32,
    pub knock: KnockState,
    pub is_fleeing: bool,
    pub has_line_of_sight: bool,
}

/// Nearest friendly actor, when one is in scan range
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AllyInfo {
    pub position: Vec3,
    pub distance: f32,
    pub facing_dot: f32,
}

/// Ambient combat context around the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatContext {
    pub enemy_count: u32,
    pub ally_count: u32,
    pub threat: ThreatTier,
    pub nearest_ally: Option<AllyInfo>,
    pub range: RangeCategory,
}

/// Elapsed seconds since recent tactical events
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EventClock {
    pub since_attack: Seconds,
    pub since_power_attack: Seconds,
    pub since_dodge: Seconds,
    pub since_bash: Seconds,
    pub since_feint: Seconds,
}

impl Default for EventClock {
    fn default() -> Self {
        // "A long time ago" so fresh agents do not look like they just acted
        Self {
            since_attack: f32::MAX,
            since_power_attack: f32::MAX,
            since_dodge: f32::MAX,
            since_bash: f32::MAX,
            since_feint: f32::MAX,
        }
    }
}

/// Timers plus correlation-subsystem statistics for self and target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalState {
    pub self_events: EventClock,
    pub target_events: EventClock,
    pub self_feedback: CombatFeedback,
    pub target_feedback: CombatFeedback,
}

/// One tick's complete world-state read
///
/// Read-only once built; evaluators never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub self_state: SelfState,
    pub target: Option<TargetState>,
    pub context: CombatContext,
    pub temporal: TemporalState,
    /// Effective weapon reach in world units, resolved externally
    pub weapon_reach: f32,
}

impl Snapshot {
    /// Unit vector from self toward the target, zero without a target
    pub fn direction_to_target(&self) -> Vec3 {
        match &self.target {
            Some(target) => (target.position - self.self_state.position).normalize(),
            None => Vec3::ZERO,
        }
    }

    /// Unit vector from the target toward self, zero without a target
    pub fn away_from_target(&self) -> Vec3 {
        match &self.target {
            Some(target) => (self.self_state.position - target.position).normalize(),
            None => Vec3::ZERO,
        }
    }
}
