//! Spirecrawl Core - Roguelike Stage Map Engine
//!
//! Generates a layered, directed graph of nodes for each stage of a run,
//! validates the player's moves across it, dispatches entered nodes to the
//! game's encounter systems and persists progress between sessions.
//!
//! # Architecture
//!
//! - **map**: the node graph, its points and the traversal path
//! - **generation**: data-driven map configs, blueprints and the generator
//! - **traversal**: move validation against the current path
//! - **schedule** / **dispatch**: delayed node entry and encounter hand-off
//! - **persistence**: save documents, codecs and stores
//! - **engine**: the session object tying the above together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use spirecrawl_core::prelude::*;
//!
//! # fn run(host: &mut dyn EncounterHost) -> Result<(), EngineError> {
//! let config = MapConfig::from_path("data/map_config.json")?;
//! let store = FileStore::new("saves/map.json", SaveFormat::Json);
//! let mut engine = MapEngine::start(config, EngineSettings::default(), Box::new(store))?;
//!
//! let first = engine.attainable_nodes()[0];
//! engine.select_node(first).ok();
//!
//! // Game loop
//! loop {
//!     engine.update(Duration::from_millis(16), host);
//! }
//! # }
//! ```

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod generation;
pub mod map;
pub mod persistence;
pub mod schedule;
pub mod settings;
pub mod traversal;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::dispatch::{Encounter, EncounterHost};
    pub use crate::engine::{MapEngine, MoveReceipt};
    pub use crate::error::{ConfigError, EngineError, InvalidMove, PersistenceError};
    pub use crate::generation::{Blueprint, BlueprintKind, LayerSpec, MapConfig};
    pub use crate::map::*;
    pub use crate::persistence::{FileStore, LoadOutcome, MapStore, MemoryStore, SaveFormat};
    pub use crate::settings::EngineSettings;
}
