//! Integration tests for the full map pipeline.
//!
//! Exercises: MapConfig (shipped JSON) → generate_map → traversal → dispatch
//! → persistence → engine restarts across stages.

use std::path::PathBuf;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use spirecrawl_core::generation::{generate_map, BlueprintKind};
use spirecrawl_core::persistence::{decode, SaveData};
use spirecrawl_core::prelude::*;
use spirecrawl_core::traversal;

// ── Helpers ────────────────────────────────────────────────────────────

fn standard_config() -> MapConfig {
    MapConfig::from_json_str(include_str!("../../../data/map_config.json")).unwrap()
}

fn settings(seed: u64) -> EngineSettings {
    EngineSettings::default()
        .with_seed(seed)
        .with_enter_delay(Duration::from_millis(500))
}

/// Records every entry point the engine calls.
#[derive(Default)]
struct ScriptedHost {
    log: Vec<String>,
}

impl EncounterHost for ScriptedHost {
    fn start_minion_battle(&mut self, blueprint: &Blueprint) {
        self.log.push(format!("minion:{}", blueprint.id));
    }
    fn is_boss_unlocked(&self, _boss_id: &str) -> bool {
        true
    }
    fn start_boss_battle(&mut self, boss_id: &str) {
        self.log.push(format!("boss:{}", boss_id));
    }
    fn grant_regen(&mut self, amount: u32) {
        self.log.push(format!("regen:{}", amount));
    }
    fn roll_treasure_reward(&mut self, chance: f32) {
        self.log.push(format!("treasure:{}", chance));
    }
    fn open_shop(&mut self) {
        self.log.push("shop".into());
    }
}

/// Walk the leftmost choice until the stage boss is reached, resolving
/// every encounter as it comes.
fn play_stage(engine: &mut MapEngine, host: &mut ScriptedHost) -> usize {
    let mut moves = 0;
    while !engine.is_stage_complete() {
        let next = engine.attainable_nodes()[0];
        engine.select_node(next).unwrap();
        let encounter = engine.update(Duration::from_millis(500), host).unwrap();
        if encounter.holds_lock() {
            assert!(engine.on_battle_won());
        }
        assert!(!engine.is_locked());
        moves += 1;
    }
    moves
}

fn boss_id(map: &Map, config: &MapConfig) -> String {
    let boss = map.stage_boss().unwrap();
    match &config.catalog().get(&boss.blueprint_id).unwrap().kind {
        BlueprintKind::Boss { boss_id } => boss_id.clone(),
        other => panic!("boss node bound to {:?}", other),
    }
}

fn temp_save(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("spirecrawl-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir.join("map.json")
}

// ── Config and generation ──────────────────────────────────────────────

#[test]
fn shipped_config_is_valid() {
    let config = standard_config();
    assert_eq!(config.stage_count, 2);
    assert_eq!(config.layers.len(), 7);
    config.validate().unwrap();
}

#[test]
fn generated_stage_maps_pass_integrity() {
    let config = standard_config();
    let mut rng = ChaCha8Rng::seed_from_u64(2024);
    for stage in 0..6 {
        let map = generate_map(&config, stage, &mut rng).unwrap();
        map.check_integrity().unwrap();
        map.check_blueprints(&config.catalog()).unwrap();
        assert_eq!(map.layer_count(), 7);
        assert_eq!(map.layer(2).len(), 4, "layer without a count inherits");
        assert_eq!(map.layer(6).len(), 1);
    }
}

#[test]
fn bosses_follow_the_stage_cycle() {
    let config = standard_config();
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let ids: Vec<String> = (0..4)
        .map(|stage| boss_id(&generate_map(&config, stage, &mut rng).unwrap(), &config))
        .collect();
    assert_eq!(
        ids,
        vec!["slime_king", "bronze_automaton", "slime_king", "bronze_automaton"]
    );
}

#[test]
fn stage_scoped_minions_stay_in_their_stage() {
    let config = standard_config();
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    for _ in 0..20 {
        let map = generate_map(&config, 0, &mut rng).unwrap();
        for node in map.nodes() {
            assert_ne!(node.blueprint_id, "gremlin_pack");
            assert_ne!(node.blueprint_id, "stone_sentries");
        }
    }
}

#[test]
fn same_seed_same_map() {
    let config = standard_config();
    let a = generate_map(&config, 1, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
    let b = generate_map(&config, 1, &mut ChaCha8Rng::seed_from_u64(77)).unwrap();
    assert_eq!(a, b);
}

// ── Traversal ──────────────────────────────────────────────────────────

#[test]
fn traversal_rules_on_generated_map() {
    let config = standard_config();
    let mut map = generate_map(&config, 0, &mut ChaCha8Rng::seed_from_u64(11)).unwrap();

    let deep = map.layer(1)[0].point;
    assert_eq!(
        traversal::select_node(&mut map, deep),
        Err(InvalidMove::OutOfStartLayer { point: deep })
    );
    assert!(map.path().is_empty());

    let start = map.layer(0)[0].point;
    traversal::select_node(&mut map, start).unwrap();

    let outgoing = map.outgoing(start).to_vec();
    let unreachable = map
        .layer(1)
        .iter()
        .map(|n| n.point)
        .find(|p| !outgoing.contains(p));
    if let Some(point) = unreachable {
        assert_eq!(
            traversal::select_node(&mut map, point),
            Err(InvalidMove::NotReachable {
                from: start,
                to: point
            })
        );
    }

    // Moving back into the start layer is never allowed once traversing
    let sibling = map.layer(0)[1].point;
    assert!(traversal::select_node(&mut map, sibling).is_err());
    assert_eq!(map.path(), &[start]);
}

// ── Engine sessions ────────────────────────────────────────────────────

#[test]
fn two_stage_run_with_restarts() {
    let config = standard_config();
    let mut host = ScriptedHost::default();

    let mut engine = MapEngine::start(
        config.clone(),
        settings(1),
        Box::new(MemoryStore::new(SaveFormat::Json)),
    )
    .unwrap();
    assert_eq!(engine.load_outcome(), &LoadOutcome::Fresh);

    let moves = play_stage(&mut engine, &mut host);
    assert_eq!(moves, 7);
    assert_eq!(host.log.len(), 7);
    assert_eq!(host.log.last().unwrap(), "boss:slime_king");

    let mut engine = MapEngine::start(config.clone(), settings(2), engine.into_store()).unwrap();
    assert_eq!(
        engine.load_outcome(),
        &LoadOutcome::Regenerated { completed_stage: 0 }
    );
    assert_eq!(engine.stage(), 1);

    play_stage(&mut engine, &mut host);
    assert_eq!(host.log.last().unwrap(), "boss:bronze_automaton");
}

#[test]
fn mid_stage_restart_resumes_path() {
    let config = standard_config();
    let mut host = ScriptedHost::default();
    let mut engine = MapEngine::start(
        config.clone(),
        settings(5).with_save_format(SaveFormat::Binary),
        Box::new(MemoryStore::new(SaveFormat::Binary)),
    )
    .unwrap();

    for _ in 0..3 {
        let next = engine.attainable_nodes()[0];
        engine.select_node(next).unwrap();
        engine.update(Duration::from_secs(1), &mut host);
        engine.on_battle_won();
    }
    let expected = engine.current_map().clone();

    let engine = MapEngine::start(
        config,
        settings(6).with_save_format(SaveFormat::Binary),
        engine.into_store(),
    ).unwrap();
    assert_eq!(engine.load_outcome(), &LoadOutcome::Resumed);
    assert_eq!(engine.current_map(), &expected);
    assert_eq!(engine.current_map().path().len(), 3);
}

#[test]
fn file_store_session_survives_restart() {
    let config = standard_config();
    let path = temp_save("resume");

    let mut engine = MapEngine::start(
        config.clone(),
        settings(10),
        Box::new(FileStore::new(&path, SaveFormat::Json)),
    )
    .unwrap();
    let first = engine.attainable_nodes()[0];
    engine.select_node(first).unwrap();
    drop(engine);

    let raw = std::fs::read(&path).unwrap();
    let saved: SaveData = decode(&raw, SaveFormat::Json).unwrap();
    assert_eq!(saved.stage, 0);
    assert_eq!(saved.map.path, vec![first]);

    let engine = MapEngine::start(
        config,
        settings(11),
        Box::new(FileStore::new(&path, SaveFormat::Json)),
    )
    .unwrap();
    assert_eq!(engine.load_outcome(), &LoadOutcome::Resumed);
    assert_eq!(engine.current_map().path(), &[first]);

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn corrupt_save_file_is_replaced() {
    let config = standard_config();
    let path = temp_save("corrupt");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"{ definitely not a save").unwrap();

    let engine = MapEngine::start(
        config,
        settings(12),
        Box::new(FileStore::new(&path, SaveFormat::Json)),
    )
    .unwrap();
    assert!(matches!(
        engine.load_outcome(),
        LoadOutcome::Recovered { .. }
    ));
    assert_eq!(engine.stage(), 0);

    // The fresh map replaced the garbage on disk
    let raw = std::fs::read(&path).unwrap();
    assert!(decode(&raw, SaveFormat::Json).is_ok());

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}
