//! Humanization gates between arbitration and execution
//!
//! Three gates run in order; any failure discards this tick's decision
//! outright rather than deferring it:
//!
//! 1. Reaction: a one-shot engagement warm-up. The delay is drawn once per
//!    tracked agent and the gate never re-locks afterward, even if the
//!    accumulated time were reset. It models noticing the fight, not a
//!    recurring reflex lag.
//! 2. Mistake: a probabilistic fumble roll interpolated over agent level.
//! 3. Cooldown: per-action-class timers so bashes, dodges and jumps come
//!    out at a believable rate.

use ahash::AHashMap;
use rand::{Rng, RngCore};
use tracing::trace;

use crate::core::config::HumanizerConfig;
use crate::core::shared_map::SharedMap;
use crate::core::types::{AgentId, Seconds};
use crate::decision::{ActionClass, ActionKind};

/// Per-agent gate state, created lazily on first observation
#[derive(Debug, Clone)]
pub struct AgentHumanizerState {
    /// Accumulated engagement time
    reaction_timer: Seconds,
    /// Randomized delay drawn at creation
    reaction_delay: Seconds,
    /// Monotonic: set once, never cleared while the agent is tracked
    unlocked: bool,
    /// Remaining cooldown per action class, floored at zero
    cooldowns: AHashMap<ActionClass, Seconds>,
}

impl AgentHumanizerState {
    fn new(delay: Seconds) -> Self {
        Self {
            reaction_timer: 0.0,
            reaction_delay: delay,
            unlocked: false,
            cooldowns: AHashMap::new(),
        }
    }
}

pub struct Humanizer {
    states: SharedMap<AgentId, AgentHumanizerState>,
}

impl Humanizer {
    pub fn new() -> Self {
        Self { states: SharedMap::new() }
    }

    /// Advance an agent's timers by one tick, creating state on first sight
    ///
    /// Must run every tick the agent is processed, whether or not a
    /// decision survives arbitration, so cooldowns drain on schedule.
    pub fn advance(
        &self,
        agent: AgentId,
        level: u16,
        dt: Seconds,
        config: &HumanizerConfig,
        rng: &mut dyn RngCore,
    ) {
        // Only first sight needs a delay draw; keep the RNG stream quiet on
        // the steady-state path
        let delay = if self.states.contains_key(&agent) {
            0.0
        } else {
            draw_reaction_delay(level, config, rng)
        };
        self.states.with_entry(agent, || AgentHumanizerState::new(delay), |state| {
            state.reaction_timer += dt;
            if !state.unlocked && state.reaction_timer >= state.reaction_delay {
                state.unlocked = true;
                trace!(?agent, "reaction gate opened");
            }
            for remaining in state.cooldowns.values_mut() {
                *remaining = (*remaining - dt).max(0.0);
            }
        });
    }

    /// Run the three gates against this tick's winning decision
    pub fn permit(
        &self,
        agent: AgentId,
        action: ActionKind,
        level: u16,
        config: &HumanizerConfig,
        rng: &mut dyn RngCore,
    ) -> bool {
        let unlocked = self
            .states
            .read_with(|map| map.get(&agent).map(|s| s.unlocked))
            .unwrap_or(false);
        if !unlocked {
            trace!(?agent, ?action, "suppressed: still reacting");
            return false;
        }

        let chance = mistake_chance(level, config) * class_mistake_scale(action, config);
        if rng.gen::<f32>() < chance {
            trace!(?agent, ?action, chance, "suppressed: mistake");
            return false;
        }

        if let Some(class) = action.class() {
            if self.is_on_cooldown(agent, class) {
                trace!(?agent, ?action, "suppressed: on cooldown");
                return false;
            }
        }

        true
    }

    /// Start the class cooldown after the executor confirms the action
    pub fn mark_action_used(&self, agent: AgentId, class: ActionClass, config: &HumanizerConfig) {
        let duration = match class {
            ActionClass::Bash => config.bash_cooldown,
            ActionClass::Dodge => config.dodge_cooldown,
            ActionClass::Jump => config.jump_cooldown,
        };
        self.states.with_existing(&agent, |state| {
            state.cooldowns.insert(class, duration);
        });
    }

    pub fn is_on_cooldown(&self, agent: AgentId, class: ActionClass) -> bool {
        self.states
            .read_with(|map| {
                map.get(&agent)
                    .and_then(|state| state.cooldowns.get(&class))
                    .map(|remaining| *remaining > 0.0)
            })
            .unwrap_or(false)
    }

    /// Whether the reaction gate has opened for this agent
    pub fn is_reacting(&self, agent: AgentId) -> bool {
        !self
            .states
            .read_with(|map| map.get(&agent).map(|s| s.unlocked))
            .unwrap_or(false)
    }

    /// Drop state for an agent that left combat
    pub fn forget(&self, agent: AgentId) {
        self.states.remove(&agent);
    }

    /// Drop state for every agent not in `known`
    ///
    /// `known` is typically the observer's current combatant scan; anything
    /// outside it is stale.
    pub fn retain_known(&self, known: &[AgentId]) {
        self.states.retain(|agent, _| known.contains(agent));
    }

    pub fn tracked_agents(&self) -> usize {
        self.states.len()
    }
}

impl Default for Humanizer {
    fn default() -> Self {
        Self::new()
    }
}

fn draw_reaction_delay(level: u16, config: &HumanizerConfig, rng: &mut dyn RngCore) -> Seconds {
    let jitter = if config.reaction_delay_variance > 0.0 {
        rng.gen_range(0.0..config.reaction_delay_variance)
    } else {
        0.0
    };
    let raw = config.base_reaction_delay + jitter;
    let t = level_fraction(level, config.mistake_level_cap);
    raw * (1.0 - config.reaction_level_scale * t)
}

/// Mistake chance interpolated over level, floored at the high-level value
fn mistake_chance(level: u16, config: &HumanizerConfig) -> f32 {
    let t = level_fraction(level, config.mistake_level_cap);
    config.mistake_chance_low_level
        + (config.mistake_chance_high_level - config.mistake_chance_low_level) * t
}

fn level_fraction(level: u16, cap: u16) -> f32 {
    if cap <= 1 {
        return 1.0;
    }
    let clamped = level.min(cap);
    (clamped.saturating_sub(1)) as f32 / (cap - 1) as f32
}

fn class_mistake_scale(action: ActionKind, config: &HumanizerConfig) -> f32 {
    match action.class() {
        Some(ActionClass::Bash) => config.bash_mistake_scale,
        Some(ActionClass::Dodge) => config.dodge_mistake_scale,
        Some(ActionClass::Jump) => config.jump_mistake_scale,
        None => 1.0,
    }
}
