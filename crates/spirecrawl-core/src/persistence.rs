//! Save/Load functionality for persisting the stage map
//!
//! The save document holds the full node set (type, blueprint id, position,
//! outgoing points) and the visited path. Edges are plain points, so the
//! document is acyclic and round-trips exactly. JSON is the default;
//! bincode is available for compact binary saves.
//!
//! On load, a map whose path already contains the stage boss is discarded
//! and the next stage is generated instead.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use bincode::Options;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, IntegrityError, PersistenceError};
use crate::generation::{generate_map, BlueprintCatalog, MapConfig};
use crate::map::{Map, Node, NodeType, Point, Position};

/// Version number for save file format (increment when format changes)
pub const SAVE_VERSION: u32 = 1;

/// Upper bound on a binary save. Length prefixes beyond it are rejected
/// before anything is allocated.
pub const MAX_BINARY_SAVE_BYTES: u64 = 16 * 1024 * 1024;

/// Same wire layout as `bincode::serialize`, with a size limit.
fn binary_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_BINARY_SAVE_BYTES)
}

/// Encoding used for save files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveFormat {
    #[default]
    Json,
    Binary,
}

/// Serializable snapshot of a session's map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Stage the map was generated for
    pub stage: u32,
    pub map: MapDocument,
}

/// Serializable map: node order is not significant, path order is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    pub nodes: Vec<NodeRecord>,
    pub path: Vec<Point>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub point: Point,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub blueprint_id: String,
    pub position: Position,
    pub outgoing: Vec<Point>,
}

impl From<&Node> for NodeRecord {
    fn from(node: &Node) -> Self {
        Self {
            point: node.point,
            node_type: node.node_type,
            blueprint_id: node.blueprint_id.clone(),
            position: node.position,
            outgoing: node.outgoing.clone(),
        }
    }
}

impl From<NodeRecord> for Node {
    fn from(record: NodeRecord) -> Self {
        Node {
            point: record.point,
            node_type: record.node_type,
            blueprint_id: record.blueprint_id,
            position: record.position,
            outgoing: record.outgoing,
        }
    }
}

impl From<&Map> for MapDocument {
    fn from(map: &Map) -> Self {
        Self {
            nodes: map.nodes().iter().map(NodeRecord::from).collect(),
            path: map.path().to_vec(),
        }
    }
}

impl MapDocument {
    /// Rebuild the map, checking every graph and path invariant.
    pub fn into_map(self) -> Result<Map, IntegrityError> {
        let nodes = self.nodes.into_iter().map(Node::from).collect();
        Map::from_parts(nodes, self.path)
    }
}

impl SaveData {
    pub fn new(map: &Map, stage: u32) -> Self {
        Self {
            version: SAVE_VERSION,
            stage,
            map: MapDocument::from(map),
        }
    }

    /// Rebuild and fully check the map, including blueprint ids.
    pub fn into_map(self, catalog: &BlueprintCatalog<'_>) -> Result<Map, PersistenceError> {
        let map = self.map.into_map()?;
        map.check_blueprints(catalog)?;
        Ok(map)
    }
}

/// Encode save data in the given format.
pub fn encode(data: &SaveData, format: SaveFormat) -> Result<Vec<u8>, PersistenceError> {
    let mut buffer = Vec::new();
    write_save(&mut buffer, data, format)?;
    Ok(buffer)
}

/// Decode save data, rejecting other format versions.
pub fn decode(bytes: &[u8], format: SaveFormat) -> Result<SaveData, PersistenceError> {
    read_save(bytes, format)
}

/// Write save data to a writer
pub fn write_save<W: Write>(writer: W, data: &SaveData, format: SaveFormat) -> Result<(), PersistenceError> {
    match format {
        SaveFormat::Json => serde_json::to_writer_pretty(writer, data)?,
        SaveFormat::Binary => binary_options().serialize_into(writer, data)?,
    }
    Ok(())
}

/// Read save data from a reader
pub fn read_save<R: Read>(reader: R, format: SaveFormat) -> Result<SaveData, PersistenceError> {
    let data: SaveData = match format {
        SaveFormat::Json => serde_json::from_reader(reader)?,
        SaveFormat::Binary => binary_options().deserialize_from(reader)?,
    };

    if data.version != SAVE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: SAVE_VERSION,
            found: data.version,
        });
    }
    Ok(data)
}

/// Where a session's map is persisted.
pub trait MapStore {
    /// The stored save, or `None` if nothing has been saved.
    fn load(&mut self) -> Result<Option<SaveData>, PersistenceError>;
    fn save(&mut self, data: &SaveData) -> Result<(), PersistenceError>;
    fn clear(&mut self) -> Result<(), PersistenceError>;
    /// Encoding this store reads and writes.
    fn format(&self) -> SaveFormat;
}

/// Save file on disk. Writes go to a sibling temp file first and are then
/// renamed over the target, so a crash never leaves a half-written save.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    format: SaveFormat,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, format: SaveFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl MapStore for FileStore {
    fn load(&mut self) -> Result<Option<SaveData>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = std::fs::read(&self.path)?;
        decode(&bytes, self.format).map(Some)
    }

    fn save(&mut self, data: &SaveData) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let temp = self.temp_path();
        std::fs::write(&temp, encode(data, self.format)?)?;
        std::fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn format(&self) -> SaveFormat {
        self.format
    }
}

/// In-memory store holding the encoded bytes, for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    format: SaveFormat,
    bytes: Option<Vec<u8>>,
    saves: usize,
}

impl MemoryStore {
    pub fn new(format: SaveFormat) -> Self {
        Self {
            format,
            bytes: None,
            saves: 0,
        }
    }

    /// A store pre-filled with raw bytes (which need not be a valid save).
    pub fn with_bytes(format: SaveFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            bytes: Some(bytes),
            saves: 0,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl MapStore for MemoryStore {
    fn load(&mut self) -> Result<Option<SaveData>, PersistenceError> {
        match &self.bytes {
            Some(bytes) => decode(bytes, self.format).map(Some),
            None => Ok(None),
        }
    }

    fn save(&mut self, data: &SaveData) -> Result<(), PersistenceError> {
        self.bytes = Some(encode(data, self.format)?);
        self.saves += 1;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PersistenceError> {
        self.bytes = None;
        Ok(())
    }

    fn format(&self) -> SaveFormat {
        self.format
    }
}

/// How a session's starting map was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Nothing was saved; stage 0 was generated
    Fresh,
    /// The saved map was resumed unchanged
    Resumed,
    /// The saved stage was complete; the next stage was generated
    Regenerated { completed_stage: u32 },
    /// The save could not be used and was replaced by a fresh map
    Recovered { reason: String },
}

/// Result of [`load_or_generate`]
#[derive(Debug, Clone)]
pub struct LoadedMap {
    pub map: Map,
    pub stage: u32,
    pub outcome: LoadOutcome,
}

/// Resume the saved map, or generate a new one when there is none, when
/// it is corrupt, or when its stage boss has already been reached.
///
/// Only configuration errors escape; storage problems fall back to fresh
/// generation.
pub fn load_or_generate<R: Rng + ?Sized>(
    store: &mut dyn MapStore,
    config: &MapConfig,
    rng: &mut R,
) -> Result<LoadedMap, ConfigError> {
    let saved = match store.load() {
        Ok(saved) => saved,
        Err(e) => {
            log::warn!("Discarding unreadable save: {}", e);
            return generate_loaded(config, 0, rng, LoadOutcome::Recovered { reason: e.to_string() });
        }
    };

    let Some(data) = saved else {
        log::info!("No saved map, generating stage 0");
        return generate_loaded(config, 0, rng, LoadOutcome::Fresh);
    };

    let stage = data.stage;
    let Some(next_stage) = stage.checked_add(1) else {
        log::warn!("Discarding save with out-of-range stage {}", stage);
        return generate_loaded(
            config,
            0,
            rng,
            LoadOutcome::Recovered {
                reason: format!("stage {} out of range", stage),
            },
        );
    };
    match data.into_map(&config.catalog()) {
        Ok(map) if map.is_stage_complete() => {
            log::info!(
                "Stage {} boss already reached, generating stage {}",
                stage,
                next_stage
            );
            generate_loaded(
                config,
                next_stage,
                rng,
                LoadOutcome::Regenerated {
                    completed_stage: stage,
                },
            )
        }
        Ok(map) => {
            log::info!(
                "Resuming stage {} after {} moves",
                stage,
                map.path().len()
            );
            Ok(LoadedMap {
                map,
                stage,
                outcome: LoadOutcome::Resumed,
            })
        }
        Err(e) => {
            log::warn!("Discarding corrupt save for stage {}: {}", stage, e);
            generate_loaded(config, stage, rng, LoadOutcome::Recovered { reason: e.to_string() })
        }
    }
}

fn generate_loaded<R: Rng + ?Sized>(
    config: &MapConfig,
    stage: u32,
    rng: &mut R,
    outcome: LoadOutcome,
) -> Result<LoadedMap, ConfigError> {
    let map = generate_map(config, stage, rng)?;
    Ok(LoadedMap { map, stage, outcome })
}
