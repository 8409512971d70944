//! The combat director
//!
//! Owns the arbitration pipeline, the humanizer, the four outcome
//! correlation trackers and the listener registry. Every public operation
//! takes `&self` and locks internally, so the tick driver and the
//! asynchronous outcome notifiers can run concurrently; no lock is held
//! across a call into an external component.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::config::DirectorConfig;
use crate::core::types::{AgentId, ListenerId, Seconds, Vec3};
use crate::decision::{ActionKind, Arbitrator, Decision, StyleProfile};
use crate::feedback::{AttackTracker, CombatFeedback, SimpleOutcomeTracker};
use crate::humanizer::Humanizer;
use crate::snapshot::Snapshot;

/// Notification sent to listeners when a decision is actually executed
#[derive(Debug, Clone)]
pub struct DecisionEvent {
    pub agent: AgentId,
    pub action: ActionKind,
    pub priority: f32,
    pub direction: Vec3,
    pub intensity: f32,
}

/// Third-party extension hook for executed decisions
pub trait DecisionListener: Send + Sync {
    fn on_decision(&self, event: &DecisionEvent);
}

/// The external side-effecting executor
///
/// Returns whether the action actually started; the director uses that
/// answer only to decide whether to arm a cooldown and log an attempt.
pub trait ActionExecutor: Send + Sync {
    fn execute(&self, agent: AgentId, decision: &Decision) -> bool;
}

/// One agent's work item for `process_batch`
pub struct TickRequest<'a> {
    pub agent: AgentId,
    pub snapshot: &'a Snapshot,
    pub profile: &'a StyleProfile,
    pub dt: Seconds,
}

pub struct CombatDirector {
    config: DirectorConfig,
    arbitrator: Arbitrator,
    rng: Mutex<ChaCha8Rng>,
    humanizer: Humanizer,
    attack: AttackTracker,
    parry: SimpleOutcomeTracker,
    timed_block: SimpleOutcomeTracker,
    guard_counter: SimpleOutcomeTracker,
    listeners: RwLock<Vec<(ListenerId, Arc<dyn DecisionListener>)>>,
}

impl CombatDirector {
    /// Director with the default seed
    pub fn new(config: DirectorConfig) -> Self {
        Self::with_seed(config, 42)
    }

    /// Director with a specific RNG seed for deterministic behavior
    pub fn with_seed(config: DirectorConfig, seed: u64) -> Self {
        let ledger = config.ledger.clone();
        Self {
            arbitrator: Arbitrator::new(),
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            humanizer: Humanizer::new(),
            attack: AttackTracker::new(ledger.clone()),
            parry: SimpleOutcomeTracker::new("parry", ledger.clone()),
            timed_block: SimpleOutcomeTracker::new("timed_block", ledger.clone()),
            guard_counter: SimpleOutcomeTracker::new("guard_counter", ledger),
            listeners: RwLock::new(Vec::new()),
            config,
        }
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    fn lock_rng(&self) -> MutexGuard<'_, ChaCha8Rng> {
        match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Run one agent through the full pipeline for this tick
    ///
    /// Snapshot in, decision out. The returned decision is the arbitration
    /// winner after humanization; the no-op decision when nothing fired or
    /// a gate suppressed the winner.
    pub fn process_tick(
        &self,
        agent: AgentId,
        snapshot: &Snapshot,
        profile: &StyleProfile,
        dt: Seconds,
        executor: &dyn ActionExecutor,
    ) -> Decision {
        let level = snapshot.self_state.level;
        let decision = {
            let mut rng = self.lock_rng();
            self.humanizer
                .advance(agent, level, dt, &self.config.humanizer, &mut *rng);
            let decision = self
                .arbitrator
                .arbitrate(snapshot, profile, &self.config, &mut *rng);
            if decision.is_noop() {
                return decision;
            }
            if !self
                .humanizer
                .permit(agent, decision.action, level, &self.config.humanizer, &mut *rng)
            {
                debug!(?agent, action = ?decision.action, "decision suppressed");
                return Decision::noop();
            }
            decision
            // rng lock ends here, before any external call
        };

        let executed = executor.execute(agent, &decision);
        if executed {
            if let Some(class) = decision.action.class() {
                self.humanizer
                    .mark_action_used(agent, class, &self.config.humanizer);
            }
            self.log_attempt(agent, snapshot, &decision);
            self.notify_listeners(agent, &decision);
        } else {
            debug!(?agent, action = ?decision.action, "executor declined decision");
        }
        decision
    }

    /// Process many agents in one call
    ///
    /// Goes parallel past the configured threshold; below it, thread
    /// overhead exceeds the benefit.
    pub fn process_batch(
        &self,
        requests: &[TickRequest<'_>],
        executor: &dyn ActionExecutor,
    ) -> Vec<(AgentId, Decision)> {
        let run = |request: &TickRequest<'_>| {
            (
                request.agent,
                self.process_tick(
                    request.agent,
                    request.snapshot,
                    request.profile,
                    request.dt,
                    executor,
                ),
            )
        };
        if requests.len() >= self.config.parallel_threshold {
            requests.par_iter().map(run).collect()
        } else {
            requests.iter().map(run).collect()
        }
    }

    /// Route an executed decision into the right correlation family
    fn log_attempt(&self, agent: AgentId, snapshot: &Snapshot, decision: &Decision) {
        let Some(target) = snapshot.target.as_ref() else {
            return;
        };
        match decision.action {
            ActionKind::Attack | ActionKind::PowerAttack | ActionKind::SprintAttack => {
                self.attack.record_attempt(agent, target.id, decision.action);
            }
            ActionKind::Bash => {
                // A bash thrown from behind a raised shield is a guard
                // counter; anything else is just another swing
                if snapshot.self_state.is_blocking {
                    self.guard_counter.record_attempt(agent, target.id);
                } else {
                    self.attack.record_attempt(agent, target.id, decision.action);
                }
            }
            ActionKind::Parry => self.parry.record_attempt(agent, target.id),
            ActionKind::TimedBlock => self.timed_block.record_attempt(agent, target.id),
            _ => {}
        }
    }

    // === Attempt records from external reactive systems ===
    //
    // Parries and timed blocks are executed by reactive controllers outside
    // this core; they log their attempts here so the same correlation
    // machinery scores them.

    pub fn record_attack_attempt(&self, attacker: AgentId, victim: AgentId, action: ActionKind) {
        self.attack.record_attempt(attacker, victim, action);
    }

    pub fn record_parry_attempt(&self, agent: AgentId, attacker: AgentId) {
        self.parry.record_attempt(agent, attacker);
    }

    pub fn record_timed_block_attempt(&self, agent: AgentId, attacker: AgentId) {
        self.timed_block.record_attempt(agent, attacker);
    }

    pub fn record_guard_counter_attempt(&self, agent: AgentId, attacker: AgentId) {
        self.guard_counter.record_attempt(agent, attacker);
    }

    // === Outcome notifications, safe to call off the tick cadence ===

    /// A recorded swing landed on `victim`
    pub fn on_attack_landed(&self, attacker: AgentId, victim: AgentId) {
        self.attack.on_hit(attacker, victim);
    }

    /// A recorded swing was parried
    pub fn on_attack_parried(&self, attacker: AgentId) {
        self.attack.on_parried(attacker);
    }

    /// A recorded swing was timed-blocked; reclassifies a parry match
    pub fn on_attack_timed_blocked(&self, attacker: AgentId) {
        self.attack.on_timed_blocked(attacker);
    }

    /// The agent's own parry attempt connected
    pub fn on_parry_success(&self, agent: AgentId) {
        self.parry.on_success(agent);
    }

    /// The agent's own timed block connected
    pub fn on_timed_block_success(&self, agent: AgentId) {
        self.timed_block.on_success(agent);
    }

    /// The agent's guard counter connected
    pub fn on_guard_counter_success(&self, agent: AgentId) {
        self.guard_counter.on_success(agent);
    }

    /// Age all ledgers: implied misses, stale-attempt eviction
    pub fn update(&self, dt: Seconds) {
        self.attack.update(dt);
        self.parry.update(dt);
        self.timed_block.update(dt);
        self.guard_counter.update(dt);
    }

    /// Value snapshot of an agent's statistics across all four families
    pub fn feedback(&self, agent: AgentId) -> CombatFeedback {
        CombatFeedback {
            attack: self.attack.feedback(agent),
            parry: self.parry.feedback(agent),
            timed_block: self.timed_block.feedback(agent),
            guard_counter: self.guard_counter.feedback(agent),
        }
    }

    /// Seconds since the agent last landed a hit, if it ever landed one
    pub fn seconds_since_hit(&self, agent: AgentId) -> Option<Seconds> {
        self.attack.seconds_since_hit(agent)
    }

    /// Seconds since the agent's last successful parry
    pub fn seconds_since_parry(&self, agent: AgentId) -> Option<Seconds> {
        self.parry.seconds_since_success(agent)
    }

    /// Seconds since the agent's last successful timed block
    pub fn seconds_since_timed_block(&self, agent: AgentId) -> Option<Seconds> {
        self.timed_block.seconds_since_success(agent)
    }

    /// Drop all per-agent state once the observer confirms combat exit
    pub fn forget_agent(&self, agent: AgentId) {
        self.humanizer.forget(agent);
        self.attack.forget(agent);
        self.parry.forget(agent);
        self.timed_block.forget(agent);
        self.guard_counter.forget(agent);
    }

    // === Listener registry ===

    pub fn subscribe(&self, listener: Arc<dyn DecisionListener>) -> ListenerId {
        let id = ListenerId::new();
        self.write_listeners().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.write_listeners();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    fn write_listeners(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, Vec<(ListenerId, Arc<dyn DecisionListener>)>> {
        match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn notify_listeners(&self, agent: AgentId, decision: &Decision) {
        let event = DecisionEvent {
            agent,
            action: decision.action,
            priority: decision.priority,
            direction: decision.direction,
            intensity: decision.intensity,
        };
        // Clone the registry so no lock is held while listeners run
        let listeners: Vec<(ListenerId, Arc<dyn DecisionListener>)> = {
            let guard = match self.listeners.read() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            guard.clone()
        };
        for (id, listener) in listeners {
            // One panicking listener must not take down the others or the
            // combat loop
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_decision(&event)));
            if result.is_err() {
                warn!(?id, "decision listener panicked; continuing");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Vec3;
    use crate::snapshot::{
        AttackState, CombatContext, KnockState, RangeCategory, SelfState, TargetState,
        TemporalState, ThreatTier, WeaponClass,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct AcceptAll;

    impl ActionExecutor for AcceptAll {
        fn execute(&self, _agent: AgentId, _decision: &Decision) -> bool {
            true
        }
    }

    struct RejectAll;

    impl ActionExecutor for RejectAll {
        fn execute(&self, _agent: AgentId, _decision: &Decision) -> bool {
            false
        }
    }

    struct CountingListener(AtomicUsize);

    impl DecisionListener for CountingListener {
        fn on_decision(&self, _event: &DecisionEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingListener;

    impl DecisionListener for PanickingListener {
        fn on_decision(&self, _event: &DecisionEvent) {
            panic!("listener bug");
        }
    }

    fn melee_snapshot(distance: f32) -> Snapshot {
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
                position: Vec3::new(distance, 0.0, 0.0),
                distance,
                facing_dot: 0.95,
                knock: KnockState::Normal,
                is_fleeing: false,
                has_line_of_sight: true,
            }),
            context: CombatContext {
                enemy_count: 1,
                ally_count: 0,
                threat: ThreatTier::Low,
                nearest_ally: None,
                range: RangeCategory::OptimalRange,
            },
            temporal: TemporalState::default(),
            weapon_reach: 150.0,
        }
    }

    /// Config with humanization neutralized so pipeline tests are exact
    fn transparent_config() -> DirectorConfig {
        let mut config = DirectorConfig::default();
        config.humanizer.base_reaction_delay = 0.0;
        config.humanizer.reaction_delay_variance = 0.0;
        config.humanizer.mistake_chance_low_level = 0.0;
        config.humanizer.mistake_chance_high_level = 0.0;
        config
    }

    #[test]
    fn test_executed_attack_logs_attempt() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let agent = AgentId::new();
        let snapshot = melee_snapshot(100.0);
        let decision = director.process_tick(agent, &snapshot, &StyleProfile::default(), 0.1, &AcceptAll);
        assert_eq!(decision.action, ActionKind::PowerAttack);
        assert_eq!(director.feedback(agent).attack.attacks, 1);
    }

    #[test]
    fn test_declined_execution_logs_nothing() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let agent = AgentId::new();
        let snapshot = melee_snapshot(100.0);
        let decision = director.process_tick(agent, &snapshot, &StyleProfile::default(), 0.1, &RejectAll);
        // The decision itself is still reported to the caller
        assert_eq!(decision.action, ActionKind::PowerAttack);
        assert_eq!(director.feedback(agent).attack.attacks, 0);
    }

    #[test]
    fn test_reaction_warmup_suppresses_first_tick() {
        let mut config = transparent_config();
        config.humanizer.base_reaction_delay = 5.0;
        let director = CombatDirector::with_seed(config, 1);
        let agent = AgentId::new();
        let snapshot = melee_snapshot(100.0);
        let decision = director.process_tick(agent, &snapshot, &StyleProfile::default(), 0.1, &AcceptAll);
        assert!(decision.is_noop());
    }

    #[test]
    fn test_listener_fanout_and_panic_isolation() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let counter = Arc::new(CountingListener(AtomicUsize::new(0)));
        director.subscribe(Arc::new(PanickingListener));
        director.subscribe(counter.clone());

        let snapshot = melee_snapshot(100.0);
        director.process_tick(AgentId::new(), &snapshot, &StyleProfile::default(), 0.1, &AcceptAll);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let counter = Arc::new(CountingListener(AtomicUsize::new(0)));
        let id = director.subscribe(counter.clone());
        assert!(director.unsubscribe(id));
        assert!(!director.unsubscribe(id));

        let snapshot = melee_snapshot(100.0);
        director.process_tick(AgentId::new(), &snapshot, &StyleProfile::default(), 0.1, &AcceptAll);
        assert_eq!(counter.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_forget_agent_clears_feedback() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let agent = AgentId::new();
        let snapshot = melee_snapshot(100.0);
        director.process_tick(agent, &snapshot, &StyleProfile::default(), 0.1, &AcceptAll);
        assert_eq!(director.feedback(agent).attack.attacks, 1);
        director.forget_agent(agent);
        assert_eq!(director.feedback(agent), CombatFeedback::default());
    }

    #[test]
    fn test_process_batch_matches_sequential_shape() {
        let director = CombatDirector::with_seed(transparent_config(), 1);
        let snapshot = melee_snapshot(100.0);
        let profile = StyleProfile::default();
        let agents: Vec<AgentId> = (0..4).map(|_| AgentId::new()).collect();
        let requests: Vec<TickRequest<'_>> = agents
            .iter()
            .map(|agent| TickRequest {
                agent: *agent,
                snapshot: &snapshot,
                profile: &profile,
                dt: 0.1,
            })
            .collect();
        let results = director.process_batch(&requests, &AcceptAll);
        assert_eq!(results.len(), 4);
        for (agent, decision) in &results {
            assert!(agents.contains(agent));
            assert_eq!(decision.action, ActionKind::PowerAttack);
        }
    }
}
