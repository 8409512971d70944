//! Duel simulator
//! Two agents trade blows through the director for a scripted number of
//! ticks; decisions and outcome statistics are printed as they happen.

use clap::Parser;
use std::sync::Arc;

use combat_director::core::config::DirectorConfig;
use combat_director::core::types::{AgentId, Vec3};
use combat_director::decision::{ActionKind, Decision, StyleProfile};
use combat_director::director::{
    ActionExecutor, CombatDirector, DecisionEvent, DecisionListener,
};
use combat_director::snapshot::{
    AttackState, CombatContext, KnockState, RangeCategory, SelfState, Snapshot, TargetState,
    TemporalState, ThreatTier, WeaponClass,
};

/// Duel simulator - two agents fight through the decision pipeline
#[derive(Parser, Debug)]
#[command(name = "duel_sim")]
#[command(about = "Run a scripted duel through the combat director")]
struct Args {
    /// Random seed for reproducible runs
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of ticks to simulate
    #[arg(long, default_value_t = 200)]
    ticks: u32,

    /// Tick length in seconds
    #[arg(long, default_value_t = 0.1)]
    dt: f32,

    /// Starting separation in world units
    #[arg(long, default_value_t = 1200.0)]
    distance: f32,

    /// Style profile for the red fighter (data/style_profiles/{name}.toml)
    #[arg(long, default_value = "berserker")]
    red_style: String,

    /// Style profile for the blue fighter
    #[arg(long, default_value = "duelist")]
    blue_style: String,

    /// Print every decision, not just executed ones
    #[arg(long, default_value_t = false)]
    verbose: bool,
}

/// Load a named profile, falling back to the built-in default
fn load_profile(name: &str) -> StyleProfile {
    match combat_director::decision::style::load_style_profile(name) {
        Ok(profile) => profile,
        Err(e) => {
            tracing::warn!("Failed to load style profile '{}', using default: {}", name, e);
            StyleProfile::default()
        }
    }
}

/// One duelist's scripted condition
struct Fighter {
    id: AgentId,
    health: f32,
    stamina: f32,
    level: u16,
    profile: StyleProfile,
}

/// Executor that always accepts and reports what it was asked to do
struct PrintingExecutor {
    verbose: bool,
}

impl ActionExecutor for PrintingExecutor {
    fn execute(&self, agent: AgentId, decision: &Decision) -> bool {
        if self.verbose {
            tracing::debug!(?agent, action = ?decision.action, intensity = decision.intensity, "executing");
        }
        true
    }
}

struct TraceListener;

impl DecisionListener for TraceListener {
    fn on_decision(&self, event: &DecisionEvent) {
        tracing::info!(
            agent = ?event.agent,
            action = ?event.action,
            priority = event.priority,
            intensity = event.intensity,
            "decision executed"
        );
    }
}

fn build_snapshot(
    config: &DirectorConfig,
    director: &CombatDirector,
    me: &Fighter,
    foe: &Fighter,
    distance: f32,
) -> Snapshot {
    let reach = 150.0;
    // Last tick's correlation stats feed this tick's read, closing the
    // adaptation loop the same way the live observer does
    let temporal = TemporalState {
        self_feedback: director.feedback(me.id),
        target_feedback: director.feedback(foe.id),
        ..TemporalState::default()
    };
    Snapshot {
        self_state: SelfState {
            stamina_percent: me.stamina,
            health_percent: me.health,
            level: me.level,
            attack_state: AttackState::Idle,
            is_blocking: false,
            is_sprinting: false,
            is_casting: false,
            position: Vec3::ZERO,
            forward: Vec3::new(1.0, 0.0, 0.0),
            weapon: WeaponClass::OneHanded,
        },
        target: Some(TargetState {
            id: foe.id,
            health_percent: foe.health,
            stamina_percent: foe.stamina,
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
            range: RangeCategory::classify(distance, reach, &config.range),
        },
        temporal,
        weapon_reach: reach,
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!(seed = args.seed, ticks = args.ticks, "duel starting");

    let config = DirectorConfig::load_or_default("data/director.toml");
    let director = CombatDirector::with_seed(config.clone(), args.seed);
    director.subscribe(Arc::new(TraceListener));

    let mut red = Fighter {
        id: AgentId::new(),
        health: 1.0,
        stamina: 1.0,
        level: 20,
        profile: load_profile(&args.red_style),
    };
    let mut blue = Fighter {
        id: AgentId::new(),
        health: 1.0,
        stamina: 1.0,
        level: 20,
        profile: load_profile(&args.blue_style),
    };

    let executor = PrintingExecutor { verbose: args.verbose };
    let mut distance = args.distance;

    for tick in 0..args.ticks {
        for (me, foe) in [(&red, &blue), (&blue, &red)] {
            let snapshot = build_snapshot(&config, &director, me, foe, distance);
            let decision =
                director.process_tick(me.id, &snapshot, &me.profile, args.dt, &executor);

            // Crude scripted physics: movement decisions close or open the
            // gap, swings burn stamina and chip the opponent
            match decision.action {
                ActionKind::Advancing => distance = (distance - 220.0 * args.dt).max(40.0),
                ActionKind::SprintAttack => distance = (distance - 400.0 * args.dt).max(40.0),
                ActionKind::Backoff | ActionKind::Retreat => distance += 180.0 * args.dt,
                _ => {}
            }
            if matches!(
                decision.action,
                ActionKind::Attack | ActionKind::PowerAttack | ActionKind::SprintAttack
            ) {
                director.on_attack_landed(me.id, foe.id);
            }
        }

        // Regenerate a little stamina and wear both fighters down
        red.stamina = (red.stamina + 0.01).min(1.0);
        blue.stamina = (blue.stamina + 0.01).min(1.0);
        red.health = (red.health - 0.001).max(0.05);
        blue.health = (blue.health - 0.001).max(0.05);

        director.update(args.dt);

        if tick % 50 == 0 {
            let stats = director.feedback(red.id);
            tracing::info!(
                tick,
                distance,
                attacks = stats.attack.attacks,
                hits = stats.attack.hits,
                hit_rate = stats.attack.hit_rate,
                "red scorecard"
            );
        }
    }

    let red_stats = director.feedback(red.id);
    let blue_stats = director.feedback(blue.id);
    match (
        serde_json::to_string_pretty(&red_stats),
        serde_json::to_string_pretty(&blue_stats),
    ) {
        (Ok(red_json), Ok(blue_json)) => {
            println!("red final scorecard:\n{}", red_json);
            println!("blue final scorecard:\n{}", blue_json);
        }
        _ => {
            tracing::warn!("failed to serialize final scorecards");
        }
    }
}
