//! Session settings that are not part of the map content.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::persistence::SaveFormat;

fn default_enter_delay_ms() -> u64 {
    1000
}

/// Runtime settings for a [`crate::engine::MapEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Delay between accepting a move and entering the node
    #[serde(default = "default_enter_delay_ms")]
    pub enter_node_delay_ms: u64,
    /// Fixed seed for reproducible runs; `None` draws from OS entropy
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub save_format: SaveFormat,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            enter_node_delay_ms: default_enter_delay_ms(),
            seed: None,
            save_format: SaveFormat::default(),
        }
    }
}

impl EngineSettings {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_enter_delay(mut self, delay: Duration) -> Self {
        self.enter_node_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_save_format(mut self, format: SaveFormat) -> Self {
        self.save_format = format;
        self
    }

    pub fn enter_node_delay(&self) -> Duration {
        Duration::from_millis(self.enter_node_delay_ms)
    }
}
