//! Spirecrawl Headless Playthrough Harness
//!
//! Validates map generation, traversal and persistence against a stage
//! config without any client. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p spirecrawl-simtest
//!   cargo run -p spirecrawl-simtest -- --seeds 500 --verbose
//!   cargo run -p spirecrawl-simtest -- --config path/to/map_config.json

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use spirecrawl_core::generation::{generate_map, BlueprintKind};
use spirecrawl_core::persistence::{decode, encode, SaveData};
use spirecrawl_core::prelude::*;
use spirecrawl_core::traversal;
use tracing_subscriber::EnvFilter;

// ── Stage config (same JSON the game ships) ─────────────────────────────
const CONFIG_JSON: &str = include_str!("../../../data/map_config.json");

#[derive(Debug, Parser)]
#[command(name = "spirecrawl-simtest", about = "Headless map engine harness")]
struct Args {
    /// Number of seeds to sweep
    #[arg(long, default_value_t = 100)]
    seeds: u64,

    /// First seed of the sweep
    #[arg(long, default_value_t = 0)]
    seed_base: u64,

    /// Map config to test instead of the shipped one
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print passing checks and engine logs
    #[arg(long, short)]
    verbose: bool,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    println!("=== Spirecrawl Map Harness ===\n");

    let mut results = Vec::new();

    // 1. Config validation
    let config = match load_config(&args, &mut results) {
        Some(config) => config,
        None => {
            summarize(&results, args.verbose);
            std::process::exit(1);
        }
    };
    let seeds = args.seed_base..args.seed_base + args.seeds;

    // 2. Graph invariants across the seed sweep
    results.extend(validate_generation(&config, seeds.clone(), args.verbose));

    // 3. Random playthroughs through the engine
    results.extend(validate_playthroughs(&config, seeds.clone(), args.verbose));

    // 4. Save round-trips and recovery
    results.extend(validate_persistence(&config, seeds, args.verbose));

    if !summarize(&results, args.verbose) {
        std::process::exit(1);
    }
}

/// Print the summary; true if everything passed.
fn summarize(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed,
        results.len(),
        failed
    );
    failed == 0
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn load_config(args: &Args, results: &mut Vec<TestResult>) -> Option<MapConfig> {
    println!("--- Config ---");
    let parsed = match &args.config {
        Some(path) => MapConfig::from_path(path),
        None => MapConfig::from_json_str(CONFIG_JSON),
    };
    let source = args
        .config
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "data/map_config.json".into());

    match parsed {
        Ok(config) => {
            results.push(TestResult {
                name: "config_valid".into(),
                passed: true,
                detail: format!(
                    "'{}' from {}: {} layers, {} blueprints, {} stage(s)",
                    config.name,
                    source,
                    config.layers.len(),
                    config.blueprints.len(),
                    config.stage_count
                ),
            });
            Some(config)
        }
        Err(e) => {
            results.push(TestResult {
                name: "config_valid".into(),
                passed: false,
                detail: format!("{}: {}", source, e),
            });
            None
        }
    }
}

// ── 2. Generation ───────────────────────────────────────────────────────

fn validate_generation(
    config: &MapConfig,
    seeds: std::ops::Range<u64>,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Generation ---");
    let mut results = Vec::new();
    let catalog = config.catalog();

    let mut integrity_failures = Vec::new();
    let mut scope_failures = Vec::new();
    let mut nondeterministic = 0;
    let mut total_nodes = 0;
    let mut total_edges = 0;
    let mut maps: usize = 0;

    for seed in seeds {
        for stage in 0..config.stage_count * 2 {
            let generated = generate_map(config, stage, &mut ChaCha8Rng::seed_from_u64(seed));
            let map = match generated {
                Ok(map) => map,
                Err(e) => {
                    integrity_failures.push(format!("seed {} stage {}: {}", seed, stage, e));
                    continue;
                }
            };
            maps += 1;
            total_nodes += map.nodes().len();
            total_edges += map.edge_count();

            if let Err(e) = map
                .check_integrity()
                .and_then(|_| map.check_blueprints(&catalog))
            {
                integrity_failures.push(format!("seed {} stage {}: {}", seed, stage, e));
            }

            let context = config.context_for(stage);
            for node in map.nodes() {
                let in_scope = catalog
                    .get(&node.blueprint_id)
                    .map(|b| b.scope.matches(context))
                    .unwrap_or(false);
                if !in_scope {
                    scope_failures.push(format!(
                        "seed {} stage {}: {} uses '{}'",
                        seed, stage, node.point, node.blueprint_id
                    ));
                }
            }

            let again = generate_map(config, stage, &mut ChaCha8Rng::seed_from_u64(seed));
            if again.ok().as_ref() != Some(&map) {
                nondeterministic += 1;
            }
        }
    }

    if verbose {
        println!(
            "  {} maps, avg {:.1} nodes / {:.1} edges",
            maps,
            total_nodes as f32 / maps.max(1) as f32,
            total_edges as f32 / maps.max(1) as f32
        );
    }

    results.push(TestResult {
        name: "generation_integrity".into(),
        passed: integrity_failures.is_empty(),
        detail: first_or(&integrity_failures, format!("{} maps valid", maps)),
    });
    results.push(TestResult {
        name: "generation_blueprint_scope".into(),
        passed: scope_failures.is_empty(),
        detail: first_or(&scope_failures, "all nodes bound to in-scope blueprints".into()),
    });
    results.push(TestResult {
        name: "generation_deterministic".into(),
        passed: nondeterministic == 0,
        detail: format!("{} of {} maps differed on regeneration", nondeterministic, maps),
    });

    results
}

fn first_or(failures: &[String], ok: String) -> String {
    match failures.first() {
        Some(first) => format!("{} failures, first: {}", failures.len(), first),
        None => ok,
    }
}

// ── 3. Playthroughs ─────────────────────────────────────────────────────

/// Host that plays battles out immediately and keeps some bosses locked.
struct SimHost {
    rng: ChaCha8Rng,
    lock_chance: f64,
    battles: usize,
    bosses: usize,
    locked_bosses: usize,
    rewards: usize,
    last_boss_locked: bool,
}

impl SimHost {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed ^ 0x5eed),
            lock_chance: 0.2,
            battles: 0,
            bosses: 0,
            locked_bosses: 0,
            rewards: 0,
            last_boss_locked: false,
        }
    }
}

impl EncounterHost for SimHost {
    fn start_minion_battle(&mut self, _blueprint: &Blueprint) {
        self.battles += 1;
    }
    fn is_boss_unlocked(&self, _boss_id: &str) -> bool {
        !self.last_boss_locked
    }
    fn start_boss_battle(&mut self, _boss_id: &str) {
        self.bosses += 1;
    }
    fn grant_regen(&mut self, _amount: u32) {
        self.rewards += 1;
    }
    fn roll_treasure_reward(&mut self, _chance: f32) {
        self.rewards += 1;
    }
    fn open_shop(&mut self) {
        self.rewards += 1;
    }
}

#[derive(Default)]
struct PlayStats {
    stages: u32,
    moves: usize,
    busy_rejections: usize,
    locks_leaked: usize,
    restarts_resumed: usize,
}

fn validate_playthroughs(
    config: &MapConfig,
    seeds: std::ops::Range<u64>,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Playthroughs ---");
    let mut results = Vec::new();
    let mut failures = Vec::new();
    let mut stats = PlayStats::default();
    let mut host_totals = (0, 0, 0, 0);

    for seed in seeds {
        let mut host = SimHost::new(seed);
        match play_run(config, seed, &mut host, &mut stats) {
            Ok(()) => {}
            Err(e) => failures.push(format!("seed {}: {}", seed, e)),
        }
        host_totals.0 += host.battles;
        host_totals.1 += host.bosses;
        host_totals.2 += host.locked_bosses;
        host_totals.3 += host.rewards;
    }

    if verbose {
        println!(
            "  {} stages, {} moves, {} battles, {} bosses ({} locked), {} rewards",
            stats.stages, stats.moves, host_totals.0, host_totals.1, host_totals.2, host_totals.3
        );
    }

    results.push(TestResult {
        name: "playthrough_complete".into(),
        passed: failures.is_empty(),
        detail: first_or(&failures, format!("{} stages cleared", stats.stages)),
    });
    results.push(TestResult {
        name: "playthrough_lock_rejects".into(),
        passed: stats.busy_rejections == stats.moves,
        detail: format!(
            "{} of {} moves rejected a second selection while locked",
            stats.busy_rejections, stats.moves
        ),
    });
    results.push(TestResult {
        name: "playthrough_lock_released".into(),
        passed: stats.locks_leaked == 0,
        detail: format!("{} encounters left the map locked", stats.locks_leaked),
    });
    results.push(TestResult {
        name: "playthrough_resume".into(),
        passed: stats.restarts_resumed == stats.stages as usize,
        detail: format!(
            "{} of {} mid-stage restarts resumed the saved path",
            stats.restarts_resumed, stats.stages
        ),
    });

    results
}

/// Play two boss cycles with a restart in the middle of every stage and
/// between stages.
fn play_run(
    config: &MapConfig,
    seed: u64,
    host: &mut SimHost,
    stats: &mut PlayStats,
) -> Result<(), String> {
    let settings = EngineSettings::default()
        .with_seed(seed)
        .with_enter_delay(Duration::from_millis(200))
        .with_save_format(SaveFormat::Binary);
    let store: Box<dyn MapStore> = Box::new(MemoryStore::new(settings.save_format));
    let mut engine =
        MapEngine::start(config.clone(), settings.clone(), store).map_err(|e| e.to_string())?;
    let mut picker = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));

    for stage in 0..config.stage_count * 2 {
        if engine.stage() != stage {
            return Err(format!("expected stage {}, engine at {}", stage, engine.stage()));
        }
        let depth = config.layers.len();
        let restart_after = picker.gen_range(1..depth.max(2));

        let mut moves = 0;
        while !engine.is_stage_complete() {
            let choices = engine.attainable_nodes();
            let Some(&next) = choices.choose(&mut picker) else {
                return Err(format!("dead end after {} moves", moves));
            };
            engine.select_node(next).map_err(|e| e.to_string())?;
            stats.moves += 1;
            moves += 1;

            if engine.select_node(next) == Err(InvalidMove::Busy) {
                stats.busy_rejections += 1;
            }

            host.last_boss_locked = host.rng.gen_bool(host.lock_chance);
            // Ticks smaller than the entry delay
            let encounter = loop {
                if let Some(encounter) = engine.update(Duration::from_millis(50), host) {
                    break encounter;
                }
            };
            if let Encounter::BossLocked { .. } = encounter {
                host.locked_bosses += 1;
            }
            if encounter.holds_lock() {
                if host.rng.gen_bool(0.5) {
                    engine.on_battle_won();
                } else {
                    engine.on_battle_lost();
                }
            }
            if engine.is_locked() {
                stats.locks_leaked += 1;
                engine.force_unlock();
            }

            if moves == restart_after {
                let store = engine.into_store();
                engine = MapEngine::start(config.clone(), settings.clone(), store)
                    .map_err(|e| e.to_string())?;
                if engine.load_outcome() == &LoadOutcome::Resumed
                    && engine.current_map().path().len() == moves
                {
                    stats.restarts_resumed += 1;
                }
            }
        }

        if moves != config.layers.len() {
            return Err(format!("stage {} took {} moves", stage, moves));
        }
        stats.stages += 1;
        log::debug!("Seed {} cleared stage {} in {} moves", seed, stage, moves);

        let store = engine.into_store();
        engine =
            MapEngine::start(config.clone(), settings.clone(), store).map_err(|e| e.to_string())?;
        let expected = LoadOutcome::Regenerated {
            completed_stage: stage,
        };
        if engine.load_outcome() != &expected {
            return Err(format!(
                "after stage {}: {:?} instead of regeneration",
                stage,
                engine.load_outcome()
            ));
        }
    }
    Ok(())
}

// ── 4. Persistence ──────────────────────────────────────────────────────

fn validate_persistence(
    config: &MapConfig,
    seeds: std::ops::Range<u64>,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Persistence ---");
    let mut results = Vec::new();
    let catalog = config.catalog();
    let mut round_trip_failures = Vec::new();
    let mut json_bytes = 0;
    let mut binary_bytes = 0;
    let mut count = 0;

    for seed in seeds {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let Ok(mut map) = generate_map(config, 0, &mut rng) else {
            continue;
        };
        let steps = rng.gen_range(0..config.layers.len());
        for _ in 0..steps {
            let choices = traversal::attainable_nodes(&map);
            if let Some(&next) = choices.choose(&mut rng) {
                let _ = traversal::select_node(&mut map, next);
            }
        }

        let data = SaveData::new(&map, 0);
        for format in [SaveFormat::Json, SaveFormat::Binary] {
            let restored = encode(&data, format)
                .map(|bytes| {
                    match format {
                        SaveFormat::Json => json_bytes += bytes.len(),
                        SaveFormat::Binary => binary_bytes += bytes.len(),
                    }
                    bytes
                })
                .and_then(|bytes| decode(&bytes, format))
                .and_then(|decoded| decoded.into_map(&catalog));
            match restored {
                Ok(restored) if restored == map => {}
                Ok(_) => round_trip_failures.push(format!("seed {} {:?}: map changed", seed, format)),
                Err(e) => round_trip_failures.push(format!("seed {} {:?}: {}", seed, format, e)),
            }
        }
        count += 1;
    }

    if verbose && count > 0 {
        println!(
            "  avg save size: {} bytes json, {} bytes binary",
            json_bytes / count,
            binary_bytes / count
        );
        if let Ok(map) = generate_map(config, 0, &mut ChaCha8Rng::seed_from_u64(0)) {
            if let Ok(json) = serde_json::to_string(&SaveData::new(&map, 0)) {
                println!("  sample: {}...", json.chars().take(120).collect::<String>());
            }
        }
    }

    results.push(TestResult {
        name: "persistence_round_trip".into(),
        passed: round_trip_failures.is_empty(),
        detail: first_or(&round_trip_failures, format!("{} saves in both formats", count)),
    });

    // Garbage in the store must fall back to a fresh stage 0 map
    let store = MemoryStore::with_bytes(SaveFormat::Json, b"not a save".to_vec());
    let recovered = MapEngine::start(
        config.clone(),
        EngineSettings::default().with_seed(1),
        Box::new(store),
    );
    let (passed, detail) = match recovered {
        Ok(engine) => (
            matches!(engine.load_outcome(), LoadOutcome::Recovered { .. }) && engine.stage() == 0,
            format!("{:?}", engine.load_outcome()),
        ),
        Err(e) => (false, e.to_string()),
    };
    results.push(TestResult {
        name: "persistence_corrupt_recovery".into(),
        passed,
        detail,
    });

    // Boss ids cycle with the stage count
    let boss_ids: Vec<String> = (0..config.stage_count * 2)
        .filter_map(|stage| {
            let map = generate_map(config, stage, &mut ChaCha8Rng::seed_from_u64(3)).ok()?;
            let boss = map.stage_boss()?;
            match &catalog.get(&boss.blueprint_id)?.kind {
                BlueprintKind::Boss { boss_id } => Some(boss_id.clone()),
                _ => None,
            }
        })
        .collect();
    let cycle = config.stage_count as usize;
    let cycles = boss_ids.len() == cycle * 2 && boss_ids[..cycle] == boss_ids[cycle..];
    results.push(TestResult {
        name: "stage_boss_cycle".into(),
        passed: cycles,
        detail: boss_ids.join(" → "),
    });

    results
}
