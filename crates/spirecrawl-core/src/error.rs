//! Error taxonomy for generation, traversal and persistence.
//!
//! - [`ConfigError`] is fatal at generation time: no partial map is produced.
//! - [`InvalidMove`] is user-facing and never mutates state.
//! - [`IntegrityError`] marks a persisted map as corrupt; loading falls back
//!   to fresh generation instead of propagating it.
//! - [`PersistenceError`] covers encoding, IO and version problems.

use thiserror::Error;

use crate::map::{NodeType, Point};
use crate::persistence::SaveFormat;

/// A map config that cannot produce a valid map.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("map config has no layers")]
    NoLayers,

    #[error("stage_count must be at least 1")]
    ZeroStageCount,

    #[error("layer {layer}: node spacing must be a positive number, got {spacing}")]
    InvalidSpacing { layer: usize, spacing: f32 },

    #[error("layer {layer}: distance range {min}..={max} is malformed")]
    InvalidDistanceRange { layer: usize, min: f32, max: f32 },

    #[error("layer {layer}: position jitter must be in [0, 0.5), got {jitter}")]
    InvalidJitter { layer: usize, jitter: f32 },

    #[error("layer {layer}: type randomization must be in [0, 1], got {fraction}")]
    InvalidRandomization { layer: usize, fraction: f32 },

    #[error("layer {layer}: the first layer must state a node count")]
    MissingNodeCount { layer: usize },

    #[error("layer {layer}: node count must be at least 1")]
    ZeroNodeCount { layer: usize },

    #[error("config has no boss layer")]
    MissingBossLayer,

    #[error("layer {layer}: boss layer must be the last layer")]
    BossLayerNotTerminal { layer: usize },

    #[error("layer {layer}: boss layer must hold exactly one node, got {count}")]
    BossLayerWidth { layer: usize, count: usize },

    #[error("Boss cannot be a reward type")]
    BossInRewardTypes,

    #[error("layer {layer}: randomizes node types but no reward types are configured")]
    NoRewardTypes { layer: usize },

    #[error("duplicate blueprint id '{id}'")]
    DuplicateBlueprint { id: String },

    #[error("blueprint '{id}' must have a weight of at least 1")]
    InvalidBlueprintWeight { id: String },

    #[error("total weight of {node_type:?} blueprints overflows")]
    BlueprintWeightOverflow { node_type: NodeType },

    #[error("blueprint '{id}': treasure chance must be in [0, 1], got {chance}")]
    InvalidTreasureChance { id: String, chance: f32 },

    #[error("no {node_type:?} blueprint available for stage {stage}")]
    MissingBlueprint { node_type: NodeType, stage: u32 },

    #[error("requested {requested} extra paths but only {available} unconnected pairs exist")]
    ExtraPathsExceedCapacity { requested: usize, available: usize },

    #[error("failed to read map config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse map config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a `select_node` call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidMove {
    #[error("the first move must be into layer 0, not {point}")]
    OutOfStartLayer { point: Point },

    #[error("{to} is not reachable from {from}")]
    NotReachable { from: Point, to: Point },

    #[error("no node exists at {point}")]
    UnknownNode { point: Point },

    #[error("a node entry is already in progress")]
    Busy,
}

/// A broken map invariant, found while checking a decoded or generated map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("map has no nodes")]
    EmptyMap,

    #[error("point {point} appears more than once")]
    DuplicatePoint { point: Point },

    #[error("layer {layer} has no nodes")]
    EmptyLayer { layer: i32 },

    #[error("point {point} lies outside the map grid")]
    NegativeCoordinate { point: Point },

    #[error("point {point} is beyond the last supported layer")]
    CoordinateOutOfRange { point: Point },

    #[error("edge {from} -> {to} points at a missing node")]
    DanglingEdge { from: Point, to: Point },

    #[error("edge {from} -> {to} does not go to the next layer")]
    NonAdjacentEdge { from: Point, to: Point },

    #[error("edge {from} -> {to} is listed twice")]
    DuplicateEdge { from: Point, to: Point },

    #[error("node {point} has no outgoing edge")]
    DeadEnd { point: Point },

    #[error("node {point} has no incoming edge")]
    Unreachable { point: Point },

    #[error("terminal layer has no boss")]
    MissingStageBoss,

    #[error("terminal layer has {count} bosses")]
    MultipleStageBosses { count: usize },

    #[error("boss {point} sits outside the terminal layer")]
    BossOutsideTerminalLayer { point: Point },

    #[error("path starts at {point}, not in layer 0")]
    PathStart { point: Point },

    #[error("path visits unknown point {point}")]
    PathUnknownPoint { point: Point },

    #[error("path step {from} -> {to} is not an edge")]
    PathBroken { from: Point, to: Point },

    #[error("node {point} references unknown blueprint '{blueprint_id}'")]
    UnknownBlueprint { point: Point, blueprint_id: String },

    #[error("node {point} is {node_type:?} but blueprint '{blueprint_id}' is not")]
    BlueprintMismatch {
        point: Point,
        node_type: NodeType,
        blueprint_id: String,
    },
}

/// Errors that can occur during save/load.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary encoding error: {0}")]
    Binary(#[from] bincode::Error),

    #[error("save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("corrupt persisted map: {0}")]
    Corrupt(#[from] IntegrityError),
}

/// Errors that abort a session start or reload.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("store uses {found:?} saves but settings ask for {expected:?}")]
    StoreFormatMismatch {
        expected: SaveFormat,
        found: SaveFormat,
    },
}
