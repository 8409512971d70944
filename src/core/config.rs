//! Engine configuration with documented constants
//!
//! All tuning knobs are collected here with explanations of their purpose
//! and how they interact with each other. Every section can be overridden
//! from a TOML file; missing sections fall back to the built-in defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::error::{DirectorError, Result};

/// Bash counter-play against telegraphed power attacks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InterruptConfig {
    /// Multiplier on weapon reach inside which an interrupt bash is viable
    ///
    /// At 1.0 the bash fires only when the power-attacker is already inside
    /// our own reach. Values above 1.0 allow a short lunge.
    pub reach_multiplier: f32,
    /// Target facing-dot above which the attack is considered aimed at us
    ///
    /// 0.9 is a narrow cone (~25 degrees); widening it makes the agent
    /// punish power attacks that were never going to land.
    pub facing_threshold: f32,
}

impl Default for InterruptConfig {
    fn default() -> Self {
        Self { reach_multiplier: 1.0, facing_threshold: 0.9 }
    }
}

/// Jump, dodge and strafe responses to incoming attacks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvasionConfig {
    /// Distance band [min, max] in which jumping a drawn bow makes sense
    ///
    /// Below min the agent should close instead; beyond max the arrow is
    /// easy to sidestep anyway.
    pub jump_min_distance: f32,
    pub jump_max_distance: f32,
    /// Chance per tick to actually jump when the band and facing match
    pub jump_probability: f32,
    /// Archer facing-dot required before a jump is considered
    pub jump_facing_threshold: f32,
    /// Minimum attacker distance for a dodge (no dodging at point blank)
    pub dodge_min_distance: f32,
    /// Attacker facing-dot required before a dodge/strafe is considered
    pub dodge_facing_threshold: f32,
    /// Stamina fraction a dodge costs; below this the agent cannot afford one
    pub dodge_stamina_cost: f32,
    /// Chance the evasion comes out as a dodge rather than a strafe
    pub dodge_probability: f32,
    /// Distance below which a dodge is executed at full intensity
    pub very_close_distance: f32,
    /// Distance below which a dodge is executed at 0.8 intensity
    pub close_distance: f32,
    /// Fixed intensity for strafing
    pub strafe_intensity: f32,
}

impl Default for EvasionConfig {
    fn default() -> Self {
        Self {
            jump_min_distance: 150.0,
            jump_max_distance: 600.0,
            jump_probability: 0.35,
            jump_facing_threshold: 0.9,
            dodge_min_distance: 80.0,
            dodge_facing_threshold: 0.7,
            dodge_stamina_cost: 0.15,
            dodge_probability: 0.6,
            very_close_distance: 120.0,
            close_distance: 220.0,
            strafe_intensity: 0.7,
        }
    }
}

/// Low-health retreat
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SurvivalConfig {
    /// Health fraction at or below which the agent disengages
    pub health_threshold: f32,
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self { health_threshold: 0.3 }
    }
}

/// Falling back from casters and drawn ranged weapons
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Inside this distance the backoff runs at full intensity
    pub near_distance: f32,
    /// Beyond this distance a non-facing threat is ignored entirely
    pub far_distance: f32,
    /// Threat facing-dot below which a distant threat is not worth reacting to
    pub facing_threshold: f32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self { near_distance: 200.0, far_distance: 500.0, facing_threshold: 0.5 }
    }
}

/// Distance-tiered offense
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OffenseConfig {
    /// Sprint attack band [min, max] in world units
    pub sprint_min_distance: f32,
    pub sprint_max_distance: f32,
    /// Stamina fraction required to commit to a sprint attack
    pub sprint_stamina_cost: f32,
    /// Stamina fraction above which a power attack replaces a plain attack
    pub power_attack_stamina_threshold: f32,
}

impl Default for OffenseConfig {
    fn default() -> Self {
        Self {
            sprint_min_distance: 350.0,
            sprint_max_distance: 900.0,
            sprint_stamina_cost: 0.25,
            power_attack_stamina_threshold: 0.4,
        }
    }
}

/// Range-category derivation from distance vs weapon reach
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// CloseRange = distance <= close_factor * optimal reach
    pub close_factor: f32,
    /// MaxRange extends to max_factor * optimal reach
    pub max_factor: f32,
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self { close_factor: 0.6, max_factor: 1.5 }
    }
}

/// Reaction warm-up, mistake rolls and action cooldowns
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanizerConfig {
    /// Base engagement reaction delay in seconds
    ///
    /// Drawn once per tracked agent: delay = base + uniform(0, variance),
    /// then scaled down with level. Models the initial "notice the fight"
    /// lag, not a recurring reflex delay.
    pub base_reaction_delay: f32,
    /// Upper bound of the uniform jitter added to the base delay
    pub reaction_delay_variance: f32,
    /// Fraction of the delay shaved off at the level cap (0 = no scaling)
    pub reaction_level_scale: f32,
    /// Mistake chance at level 1
    pub mistake_chance_low_level: f32,
    /// Mistake chance at or above the level cap
    ///
    /// Interpolation floors here: veteran agents keep making occasional
    /// mistakes, they never become perfect.
    pub mistake_chance_high_level: f32,
    /// Level at which the interpolation saturates
    pub mistake_level_cap: u16,
    /// Per-class multipliers on the mistake chance
    ///
    /// Dodges are muscle memory, bashes require a read of the opponent.
    pub dodge_mistake_scale: f32,
    pub bash_mistake_scale: f32,
    pub jump_mistake_scale: f32,
    /// Per-class cooldowns in seconds
    pub bash_cooldown: f32,
    pub dodge_cooldown: f32,
    pub jump_cooldown: f32,
}

impl Default for HumanizerConfig {
    fn default() -> Self {
        Self {
            base_reaction_delay: 0.25,
            reaction_delay_variance: 0.35,
            reaction_level_scale: 0.5,
            mistake_chance_low_level: 0.25,
            mistake_chance_high_level: 0.05,
            mistake_level_cap: 50,
            dodge_mistake_scale: 0.7,
            bash_mistake_scale: 1.2,
            jump_mistake_scale: 1.0,
            bash_cooldown: 4.0,
            dodge_cooldown: 2.5,
            jump_cooldown: 6.0,
        }
    }
}

/// Attempt ledger bounds shared by all four correlation families
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Per-subject attempt list cap; oldest entries are evicted beyond it
    pub max_attempts_per_subject: usize,
    /// Seconds after which an unmatched attempt is treated as a miss
    pub outcome_window: f32,
    /// Seconds after which any attempt is evicted regardless of match state
    ///
    /// Must exceed outcome_window so implied misses are synthesized before
    /// the attempt disappears.
    pub max_attempt_age: f32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { max_attempts_per_subject: 8, outcome_window: 1.5, max_attempt_age: 10.0 }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorConfig {
    #[serde(default)]
    pub interrupt: InterruptConfig,
    #[serde(default)]
    pub evasion: EvasionConfig,
    #[serde(default)]
    pub survival: SurvivalConfig,
    #[serde(default)]
    pub backoff: BackoffConfig,
    #[serde(default)]
    pub offense: OffenseConfig,
    #[serde(default)]
    pub range: RangeConfig,
    #[serde(default)]
    pub humanizer: HumanizerConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Minimum batch size before process_batch goes parallel
    ///
    /// Below this threshold, thread overhead exceeds benefits.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

fn default_parallel_threshold() -> usize {
    32
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            interrupt: InterruptConfig::default(),
            evasion: EvasionConfig::default(),
            survival: SurvivalConfig::default(),
            backoff: BackoffConfig::default(),
            offense: OffenseConfig::default(),
            range: RangeConfig::default(),
            humanizer: HumanizerConfig::default(),
            ledger: LedgerConfig::default(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl DirectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.evasion.jump_min_distance >= self.evasion.jump_max_distance {
            return Err(format!(
                "jump_min_distance ({}) should be < jump_max_distance ({})",
                self.evasion.jump_min_distance, self.evasion.jump_max_distance
            ));
        }

        if self.offense.sprint_min_distance >= self.offense.sprint_max_distance {
            return Err(format!(
                "sprint_min_distance ({}) should be < sprint_max_distance ({})",
                self.offense.sprint_min_distance, self.offense.sprint_max_distance
            ));
        }

        if self.ledger.outcome_window >= self.ledger.max_attempt_age {
            return Err(format!(
                "outcome_window ({}) should be < max_attempt_age ({})",
                self.ledger.outcome_window, self.ledger.max_attempt_age
            ));
        }

        if self.ledger.max_attempts_per_subject == 0 {
            return Err("max_attempts_per_subject must be positive".into());
        }

        if !(0.0..=1.0).contains(&self.survival.health_threshold) {
            return Err(format!(
                "health_threshold ({}) must be within [0, 1]",
                self.survival.health_threshold
            ));
        }

        if self.range.close_factor >= 1.0 || self.range.max_factor <= 1.0 {
            return Err(format!(
                "range factors must bracket the optimal reach (close {} < 1 < max {})",
                self.range.close_factor, self.range.max_factor
            ));
        }

        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        let config: Self = toml::from_str(&contents)?;
        config.validate().map_err(DirectorError::InvalidConfig)?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults on any failure
    ///
    /// The fallback is logged once here; callers do not need to care.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    "Failed to load config from {:?}, using defaults: {}",
                    path.as_ref(),
                    e
                );
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DirectorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_inverted_sprint_band_rejected() {
        let mut config = DirectorConfig::default();
        config.offense.sprint_min_distance = 1000.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_outcome_window_must_precede_max_age() {
        let mut config = DirectorConfig::default();
        config.ledger.outcome_window = 20.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: DirectorConfig = toml::from_str(
            r#"
            [survival]
            health_threshold = 0.5
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.survival.health_threshold, 0.5);
        assert_eq!(config.ledger.max_attempts_per_subject, 8);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DirectorConfig::load_or_default("/nonexistent/config.toml");
        assert!((config.survival.health_threshold - 0.3).abs() < f32::EPSILON);
    }
}
