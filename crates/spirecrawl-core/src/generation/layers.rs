//! Per-layer generation rules.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::map::NodeType;

/// Inclusive range of f32 values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn fixed(value: f32) -> Self {
        Self::new(value, value)
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.max >= self.min
    }

    /// Uniform draw; a degenerate range returns `min` without touching the rng.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        if self.max > self.min {
            rng.gen_range(self.min..=self.max)
        } else {
            self.min
        }
    }
}

/// Generation rule for one row of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Type given to nodes that are not randomized
    pub node_type: NodeType,
    /// Vertical distance from the previous layer (ignored for layer 0)
    pub distance_from_previous: FloatRange,
    /// Nominal horizontal spacing between nodes
    pub nodes_apart_distance: f32,
    /// Horizontal jitter as a fraction of the spacing, in [0, 0.5)
    #[serde(default)]
    pub randomize_position: f32,
    /// Chance that a node's type is drawn from the reward set instead
    #[serde(default)]
    pub randomize_nodes: f32,
    /// Node count; `None` keeps the previous layer's count
    #[serde(default)]
    pub node_count: Option<usize>,
}

impl LayerSpec {
    pub fn new(node_type: NodeType) -> Self {
        Self {
            node_type,
            distance_from_previous: FloatRange::new(2.0, 3.0),
            nodes_apart_distance: 2.5,
            randomize_position: 0.0,
            randomize_nodes: 0.0,
            node_count: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.node_count = Some(count);
        self
    }

    pub fn with_distance(mut self, min: f32, max: f32) -> Self {
        self.distance_from_previous = FloatRange::new(min, max);
        self
    }

    pub fn with_spacing(mut self, spacing: f32) -> Self {
        self.nodes_apart_distance = spacing;
        self
    }

    pub fn with_jitter(mut self, fraction: f32) -> Self {
        self.randomize_position = fraction;
        self
    }

    pub fn with_randomized_types(mut self, fraction: f32) -> Self {
        self.randomize_nodes = fraction;
        self
    }

    pub fn is_boss_layer(&self) -> bool {
        self.node_type == NodeType::Boss
    }

    /// Nodes in this layer given the previous layer's size.
    /// Boss layers always hold a single node.
    pub fn resolved_count(&self, previous: Option<usize>) -> Option<usize> {
        if self.is_boss_layer() {
            return Some(1);
        }
        self.node_count.or(previous)
    }

    /// Whether any node of this layer may be drawn from the reward set.
    pub(crate) fn draws_rewards(&self) -> bool {
        !self.is_boss_layer() && self.randomize_nodes > 0.0
    }

    /// Whether any node of this layer may keep the default type.
    pub(crate) fn keeps_default(&self) -> bool {
        self.is_boss_layer() || self.randomize_nodes < 1.0
    }
}
