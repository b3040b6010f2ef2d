//! Map engine - the session service driving stage progression
//!
//! One engine owns the current map, its store, the random source and the
//! traversal lock for the lifetime of a session. It is constructed once and
//! passed to whatever drives the game loop; nothing here is global.

use std::path::PathBuf;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::dispatch::{dispatch, Encounter, EncounterHost};
use crate::error::{EngineError, InvalidMove, PersistenceError};
use crate::generation::{generate_map, MapConfig};
use crate::map::{Map, NodeType, Point};
use crate::persistence::{load_or_generate, FileStore, LoadOutcome, MapStore, SaveData};
use crate::schedule::{EntryHandle, EntryScheduler, LockState, TraversalLock};
use crate::settings::EngineSettings;
use crate::traversal;

/// A move the engine accepted and scheduled for entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveReceipt {
    pub entered: Point,
    pub attainable: Vec<Point>,
    /// Cancels the delayed entry
    pub entry: EntryHandle,
}

/// Main map engine
pub struct MapEngine {
    config: MapConfig,
    settings: EngineSettings,
    store: Box<dyn MapStore>,
    rng: ChaCha8Rng,
    map: Map,
    stage: u32,
    lock: TraversalLock,
    scheduler: EntryScheduler,
    last_load: LoadOutcome,
}

impl MapEngine {
    /// Start a session on a save file, encoded as `settings.save_format`.
    pub fn open(
        config: MapConfig,
        settings: EngineSettings,
        path: impl Into<PathBuf>,
    ) -> Result<Self, EngineError> {
        let store = FileStore::new(path, settings.save_format);
        Self::start(config, settings, Box::new(store))
    }

    /// Start a session: validate the config, then resume or generate.
    ///
    /// The store's encoding must match `settings.save_format`.
    pub fn start(
        config: MapConfig,
        settings: EngineSettings,
        store: Box<dyn MapStore>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if store.format() != settings.save_format {
            return Err(EngineError::StoreFormatMismatch {
                expected: settings.save_format,
                found: store.format(),
            });
        }

        let mut rng = match settings.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        let mut store = store;
        let loaded = load_or_generate(store.as_mut(), &config, &mut rng)?;

        let mut engine = Self {
            config,
            settings,
            store,
            rng,
            map: loaded.map,
            stage: loaded.stage,
            lock: TraversalLock::new(),
            scheduler: EntryScheduler::new(),
            last_load: loaded.outcome,
        };
        if engine.last_load != LoadOutcome::Resumed {
            engine.save()?;
        }
        Ok(engine)
    }

    pub fn current_map(&self) -> &Map {
        &self.map
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn stage(&self) -> u32 {
        self.stage
    }

    /// How the current map was obtained by the last start or load.
    pub fn load_outcome(&self) -> &LoadOutcome {
        &self.last_load
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_held()
    }

    pub fn lock_state(&self) -> LockState {
        self.lock.state()
    }

    /// Points the player may choose next; empty while locked.
    pub fn attainable_nodes(&self) -> Vec<Point> {
        if self.lock.is_held() {
            return Vec::new();
        }
        traversal::attainable_nodes(&self.map)
    }

    pub fn is_stage_complete(&self) -> bool {
        self.map.is_stage_complete()
    }

    /// Try to move to `point`. On success the path is saved and the node
    /// entry is scheduled; traversal stays locked until it resolves.
    pub fn select_node(&mut self, point: Point) -> Result<MoveReceipt, InvalidMove> {
        if self.lock.is_held() {
            log::debug!("Rejected move to {}: traversal locked", point);
            return Err(InvalidMove::Busy);
        }

        let accepted = traversal::select_node(&mut self.map, point).map_err(|e| {
            log::debug!("Rejected move to {}: {}", point, e);
            e
        })?;

        let entry = self
            .scheduler
            .schedule(point, self.settings.enter_node_delay());
        self.lock.hold_for_entry(point, entry);

        if let Err(e) = self.save() {
            log::error!("Failed to save map after moving to {}: {}", point, e);
        }

        Ok(MoveReceipt {
            entered: accepted.entered,
            attainable: accepted.attainable,
            entry,
        })
    }

    /// Advance the entry timer. When the pending entry fires, the node's
    /// encounter is dispatched to `host` and returned.
    pub fn update(&mut self, delta: Duration, host: &mut dyn EncounterHost) -> Option<Encounter> {
        let entry = self.scheduler.advance(delta)?;

        let catalog = self.config.catalog();
        let Some(node) = self.map.node(entry.point) else {
            log::error!("Pending entry into missing node {}", entry.point);
            self.lock.release();
            return None;
        };
        let Some(blueprint) = catalog.get(&node.blueprint_id) else {
            log::error!(
                "Node {} references unknown blueprint '{}'",
                node.point,
                node.blueprint_id
            );
            self.lock.release();
            return None;
        };

        let node_type = node.node_type;
        let encounter = dispatch(node, blueprint, host);
        if encounter.holds_lock() {
            self.lock.enter_encounter(entry.point, node_type);
        } else {
            self.lock.release();
        }
        Some(encounter)
    }

    /// The battle was won. Idempotent.
    pub fn on_battle_won(&mut self) -> bool {
        if let LockState::InEncounter {
            point,
            node_type: NodeType::Boss,
        } = self.lock.state()
        {
            log::info!("Stage {} boss at {} defeated", self.stage, point);
        }
        self.return_to_map("battle won")
    }

    /// The battle was lost. Idempotent.
    pub fn on_battle_lost(&mut self) -> bool {
        self.return_to_map("battle lost")
    }

    /// A non-battle node finished. Idempotent.
    pub fn on_node_resolved(&mut self) -> bool {
        self.return_to_map("node resolved")
    }

    /// Release an encounter lock. Calls arriving while no encounter is
    /// running (duplicates, or before the entry fired) are ignored.
    fn return_to_map(&mut self, reason: &str) -> bool {
        match self.lock.state() {
            LockState::InEncounter { point, .. } => {
                log::debug!("Returned to map from {} ({})", point, reason);
                self.lock.release()
            }
            _ => false,
        }
    }

    /// Cancel a scheduled entry that has not fired yet, releasing the lock.
    pub fn cancel_entry(&mut self, handle: EntryHandle) -> bool {
        if !self.scheduler.cancel(handle) {
            return false;
        }
        self.lock.release();
        true
    }

    /// Drop any pending entry and release the lock unconditionally, for
    /// when the encounter's return-to-map call can never arrive.
    pub fn force_unlock(&mut self) {
        let pending = self.scheduler.cancel_all();
        if self.lock.release() || pending.is_some() {
            log::warn!("Traversal lock forcibly released");
        }
    }

    pub fn save(&mut self) -> Result<(), PersistenceError> {
        self.store.save(&SaveData::new(&self.map, self.stage))
    }

    /// Reload from the store, applying the resume-or-regenerate rule.
    /// Any in-flight entry is dropped.
    pub fn load(&mut self) -> Result<LoadOutcome, EngineError> {
        self.force_unlock();
        let loaded = load_or_generate(self.store.as_mut(), &self.config, &mut self.rng)?;
        self.map = loaded.map;
        self.stage = loaded.stage;
        self.last_load = loaded.outcome.clone();
        if loaded.outcome != LoadOutcome::Resumed {
            self.save()?;
        }
        Ok(loaded.outcome)
    }

    /// Move on to the next stage once this stage's boss has been reached.
    /// Returns false if the stage is not complete or an entry is in flight.
    pub fn advance_stage(&mut self) -> Result<bool, EngineError> {
        if !self.map.is_stage_complete() || self.lock.is_held() {
            return Ok(false);
        }
        let Some(next) = self.stage.checked_add(1) else {
            log::warn!("Stage counter exhausted at {}", self.stage);
            return Ok(false);
        };
        self.replace_map(next)?;
        log::info!("Advanced to stage {}", next);
        Ok(true)
    }

    /// Throw the run away and start over at stage 0.
    pub fn abandon_run(&mut self) -> Result<(), EngineError> {
        self.force_unlock();
        self.replace_map(0)?;
        log::info!("Run abandoned, restarted at stage 0");
        Ok(())
    }

    fn replace_map(&mut self, stage: u32) -> Result<(), EngineError> {
        let map = generate_map(&self.config, stage, &mut self.rng)?;
        self.map = map;
        self.stage = stage;
        self.save()?;
        Ok(())
    }

    /// Hand back the store, e.g. to start a new session on the same save.
    pub fn into_store(self) -> Box<dyn MapStore> {
        self.store
    }
}
