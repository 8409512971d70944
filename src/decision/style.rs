//! Behavioral style profiles and candidate re-weighting
//!
//! Profiles are loaded from TOML and describe how an agent fights, not
//! what it is allowed to do: re-weighting nudges priorities and scales
//! intensity but never changes a candidate's action or direction.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::core::error::Result;
use crate::decision::{ActionKind, Decision};
use crate::snapshot::{RangeCategory, Snapshot};

/// Affinity score above which a score-derived style activates
const AFFINITY_THRESHOLD: f32 = 0.6;
/// How lopsided offense/defense scores must be to activate a combat style
const SCORE_RATIO: f32 = 1.25;
/// Total priority shift any combination of styles may apply
///
/// Kept below one tier unit so styles can bias choices inside a tier but
/// never reorder the tiers themselves.
const MAX_STYLE_SHIFT: f32 = 0.9;

/// Named behavioral categories
///
/// Dueling and Flanking are flag-driven and mutually exclusive; the rest
/// derive from scores and stack freely on top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StyleKind {
    Dueling,
    Flanking,
    Aggressive,
    Defensive,
    MagicUser,
    RangedUser,
}

/// An agent's behavioral profile
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleProfile {
    /// Name of this profile (set from filename)
    pub name: String,
    /// Prefers single combat; wins over `prefers_flanking` when both set
    pub prefers_dueling: bool,
    pub prefers_flanking: bool,
    /// Offensive vs defensive tendency scores (0.0 to 1.0)
    pub offense_score: f32,
    pub defense_score: f32,
    /// Affinity for spellcasting loadouts
    pub magic_affinity: f32,
    /// Affinity for bow/crossbow loadouts
    pub ranged_affinity: f32,
    /// Appetite for shield bashes
    pub bash_affinity: f32,
    /// Appetite for staying out of danger
    pub avoid_threat_affinity: f32,
    /// Intensity multiplier on strafe/dodge while inside close range
    pub circling_multiplier: f32,
}

impl Default for StyleProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            prefers_dueling: false,
            prefers_flanking: false,
            offense_score: 0.5,
            defense_score: 0.5,
            magic_affinity: 0.0,
            ranged_affinity: 0.0,
            bash_affinity: 0.5,
            avoid_threat_affinity: 0.5,
            circling_multiplier: 1.0,
        }
    }
}

impl StyleProfile {
    /// Resolve which styles are active for this profile
    pub fn active_styles(&self) -> Vec<StyleKind> {
        let mut styles = Vec::new();

        // Flag styles first, exclusive of each other
        if self.prefers_dueling {
            styles.push(StyleKind::Dueling);
        } else if self.prefers_flanking {
            styles.push(StyleKind::Flanking);
        }

        // Score styles stack independently
        if self.offense_score > self.defense_score * SCORE_RATIO {
            styles.push(StyleKind::Aggressive);
        } else if self.defense_score > self.offense_score * SCORE_RATIO {
            styles.push(StyleKind::Defensive);
        }
        if self.magic_affinity > AFFINITY_THRESHOLD {
            styles.push(StyleKind::MagicUser);
        }
        if self.ranged_affinity > AFFINITY_THRESHOLD {
            styles.push(StyleKind::RangedUser);
        }

        styles
    }
}

/// Load a style profile from `data/style_profiles/{name}.toml`
pub fn load_style_profile(name: &str) -> Result<StyleProfile> {
    let path = profile_path(name);
    let contents = fs::read_to_string(&path)?;
    let mut profile: StyleProfile = toml::from_str(&contents)?;
    profile.name = name.to_string();
    Ok(profile)
}

fn profile_path(name: &str) -> PathBuf {
    PathBuf::from("data/style_profiles").join(format!("{}.toml", name))
}

/// Adjust a candidate's priority and intensity for the agent's style
///
/// Action kind and direction are never changed here.
pub fn reweight(decision: &mut Decision, profile: &StyleProfile, snapshot: &Snapshot) {
    let base_priority = decision.priority;

    for style in profile.active_styles() {
        apply_style(decision, style);
    }
    apply_generic_rules(decision, profile, snapshot);

    decision.priority = decision
        .priority
        .clamp(base_priority - MAX_STYLE_SHIFT, base_priority + MAX_STYLE_SHIFT);
    decision.intensity = decision.intensity.clamp(0.0, 1.0);
}

fn apply_style(decision: &mut Decision, style: StyleKind) {
    let nudge = match (style, decision.action) {
        (StyleKind::Dueling, ActionKind::Bash) => 0.2,
        (StyleKind::Dueling, ActionKind::Dodge) => 0.2,
        (StyleKind::Dueling, ActionKind::Feint) => 0.3,
        (StyleKind::Dueling, ActionKind::Strafe) => 0.1,
        (StyleKind::Dueling, ActionKind::PowerAttack) => -0.1,

        (StyleKind::Flanking, ActionKind::Flanking) => 0.3,
        (StyleKind::Flanking, ActionKind::Strafe) => 0.3,
        (StyleKind::Flanking, ActionKind::Advancing) => 0.1,
        (StyleKind::Flanking, ActionKind::Backoff) => -0.1,

        (StyleKind::Aggressive, ActionKind::PowerAttack) => 0.3,
        (StyleKind::Aggressive, ActionKind::SprintAttack) => 0.3,
        (StyleKind::Aggressive, ActionKind::Attack) => 0.2,
        (StyleKind::Aggressive, ActionKind::Bash) => 0.1,
        (StyleKind::Aggressive, ActionKind::Backoff) => -0.2,
        (StyleKind::Aggressive, ActionKind::Retreat) => -0.1,

        (StyleKind::Defensive, ActionKind::Dodge) => 0.3,
        (StyleKind::Defensive, ActionKind::TimedBlock) => 0.3,
        (StyleKind::Defensive, ActionKind::Backoff) => 0.2,
        (StyleKind::Defensive, ActionKind::Parry) => 0.2,
        (StyleKind::Defensive, ActionKind::Retreat) => 0.1,
        (StyleKind::Defensive, ActionKind::PowerAttack) => -0.2,

        (StyleKind::MagicUser, ActionKind::Backoff) => 0.2,
        (StyleKind::MagicUser, ActionKind::Retreat) => 0.1,
        (StyleKind::MagicUser, ActionKind::SprintAttack) => -0.2,
        (StyleKind::MagicUser, ActionKind::Advancing) => -0.1,

        (StyleKind::RangedUser, ActionKind::Backoff) => 0.3,
        (StyleKind::RangedUser, ActionKind::Retreat) => 0.2,
        (StyleKind::RangedUser, ActionKind::Advancing) => -0.3,
        (StyleKind::RangedUser, ActionKind::Attack) => -0.1,
        (StyleKind::RangedUser, ActionKind::PowerAttack) => -0.1,

        _ => 0.0,
    };
    decision.priority += nudge;

    let intensity_scale = match (style, decision.action) {
        (StyleKind::Aggressive, action) if action.is_offensive() => 1.15,
        (StyleKind::Defensive, action) if action.is_defensive() => 1.15,
        (StyleKind::Flanking, ActionKind::Strafe) => 1.2,
        _ => 1.0,
    };
    decision.intensity *= intensity_scale;
}

/// Affinity rules that apply regardless of which styles are active
fn apply_generic_rules(decision: &mut Decision, profile: &StyleProfile, snapshot: &Snapshot) {
    if decision.action == ActionKind::Bash {
        if profile.bash_affinity >= AFFINITY_THRESHOLD {
            decision.priority += 0.2;
        } else if profile.bash_affinity <= 0.3 {
            decision.priority -= 0.2;
        }
    }

    if profile.avoid_threat_affinity >= AFFINITY_THRESHOLD
        && matches!(
            decision.action,
            ActionKind::Dodge | ActionKind::Jump | ActionKind::Backoff
        )
    {
        decision.priority += 0.2;
    }

    if snapshot.context.range == RangeCategory::CloseRange
        && matches!(decision.action, ActionKind::Strafe | ActionKind::Dodge)
    {
        decision.intensity *= profile.circling_multiplier;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AgentId, Vec3};
    use crate::decision::tier;
    use crate::snapshot::{
        AttackState, CombatContext, KnockState, SelfState, TargetState, TemporalState, ThreatTier,
        WeaponClass,
    };

    fn test_snapshot(range: RangeCategory) -> Snapshot {
        Snapshot {
            self_state: SelfState {
                stamina_percent: 0.8,
                health_percent: 0.9,
                level: 10,
                attack_state: AttackState::Idle,
                is_blocking: false,
                is_sprinting: false,
                is_casting: false,
                position: Vec3::ZERO,
                forward: Vec3::new(1.0, 0.0, 0.0),
                weapon: WeaponClass::OneHanded,
            },
            target: Some(TargetState {
                id: AgentId::new(),
                health_percent: 1.0,
                stamina_percent: 1.0,
                attack_state: AttackState::Idle,
                is_blocking: false,
                is_casting: false,
                is_drawing_ranged: false,
                weapon: WeaponClass::OneHanded,
                position: Vec3::new(100.0, 0.0, 0.0),
                distance: 100.0,
                facing_dot: 0.9,
                knock: KnockState::Normal,
                is_fleeing: false,
                has_line_of_sight: true,
            }),
            context: CombatContext {
                enemy_count: 1,
                ally_count: 0,
                threat: ThreatTier::Low,
                nearest_ally: None,
                range,
            },
            temporal: TemporalState::default(),
            weapon_reach: 150.0,
        }
    }

    #[test]
    fn test_flag_styles_are_exclusive() {
        let mut profile = StyleProfile::default();
        profile.prefers_dueling = true;
        profile.prefers_flanking = true;
        let styles = profile.active_styles();
        assert!(styles.contains(&StyleKind::Dueling));
        assert!(!styles.contains(&StyleKind::Flanking));
    }

    #[test]
    fn test_score_styles_stack_on_flag_styles() {
        let mut profile = StyleProfile::default();
        profile.prefers_flanking = true;
        profile.offense_score = 0.9;
        profile.defense_score = 0.2;
        profile.ranged_affinity = 0.8;
        let styles = profile.active_styles();
        assert!(styles.contains(&StyleKind::Flanking));
        assert!(styles.contains(&StyleKind::Aggressive));
        assert!(styles.contains(&StyleKind::RangedUser));
    }

    #[test]
    fn test_balanced_profile_activates_no_combat_style() {
        let profile = StyleProfile::default();
        let styles = profile.active_styles();
        assert!(!styles.contains(&StyleKind::Aggressive));
        assert!(!styles.contains(&StyleKind::Defensive));
    }

    #[test]
    fn test_reweight_never_changes_action_or_direction() {
        let mut profile = StyleProfile::default();
        profile.prefers_dueling = true;
        profile.offense_score = 0.9;
        profile.defense_score = 0.1;
        let snapshot = test_snapshot(RangeCategory::CloseRange);
        let mut decision = Decision::new(
            ActionKind::Bash,
            tier::INTERRUPT,
            Vec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        let before = decision.clone();
        reweight(&mut decision, &profile, &snapshot);
        assert_eq!(decision.action, before.action);
        assert_eq!(decision.direction, before.direction);
    }

    #[test]
    fn test_aggressive_style_boosts_power_attack() {
        let mut profile = StyleProfile::default();
        profile.offense_score = 0.9;
        profile.defense_score = 0.2;
        let snapshot = test_snapshot(RangeCategory::OptimalRange);
        let mut decision = Decision::new(
            ActionKind::PowerAttack,
            tier::OFFENSE,
            Vec3::new(1.0, 0.0, 0.0),
            0.8,
        );
        reweight(&mut decision, &profile, &snapshot);
        assert!(decision.priority > tier::OFFENSE);
    }

    #[test]
    fn test_style_shift_is_bounded_below_one_tier() {
        // Pile every Bash-positive influence onto one candidate
        let mut profile = StyleProfile::default();
        profile.prefers_dueling = true;
        profile.offense_score = 1.0;
        profile.defense_score = 0.1;
        profile.bash_affinity = 1.0;
        let snapshot = test_snapshot(RangeCategory::CloseRange);
        let mut decision = Decision::new(
            ActionKind::Bash,
            tier::INTERRUPT,
            Vec3::new(1.0, 0.0, 0.0),
            1.0,
        );
        reweight(&mut decision, &profile, &snapshot);
        assert!((decision.priority - tier::INTERRUPT).abs() < 1.0);
    }

    #[test]
    fn test_intensity_clamped_to_unit_interval() {
        let mut profile = StyleProfile::default();
        profile.offense_score = 1.0;
        profile.defense_score = 0.1;
        let snapshot = test_snapshot(RangeCategory::OptimalRange);
        let mut decision = Decision::new(
            ActionKind::PowerAttack,
            tier::OFFENSE,
            Vec3::new(1.0, 0.0, 0.0),
            0.95,
        );
        reweight(&mut decision, &profile, &snapshot);
        assert!(decision.intensity <= 1.0);
    }

    #[test]
    fn test_circling_multiplier_only_in_close_range() {
        let mut profile = StyleProfile::default();
        profile.circling_multiplier = 0.5;
        let mut close = Decision::new(
            ActionKind::Strafe,
            tier::EVASION,
            Vec3::new(0.0, 1.0, 0.0),
            0.8,
        );
        reweight(&mut close, &profile, &test_snapshot(RangeCategory::CloseRange));
        assert!((close.intensity - 0.4).abs() < 0.001);

        let mut far = Decision::new(
            ActionKind::Strafe,
            tier::EVASION,
            Vec3::new(0.0, 1.0, 0.0),
            0.8,
        );
        reweight(&mut far, &profile, &test_snapshot(RangeCategory::OptimalRange));
        assert!((far.intensity - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_profile_toml_round_trip() {
        let profile: StyleProfile = toml::from_str(
            r#"
            prefers_dueling = true
            offense_score = 0.8
            bash_affinity = 0.9
            "#,
        )
        .expect("profile should parse");
        assert!(profile.prefers_dueling);
        assert_eq!(profile.offense_score, 0.8);
        // Unspecified knobs fall back to defaults
        assert_eq!(profile.circling_multiplier, 1.0);
    }
}
