//! Map config - the declarative input of the graph generator.
//!
//! A config is authored (usually as JSON) once and never mutated. It is
//! validated as a whole before any randomness is drawn, so a bad config is
//! reported at startup rather than halfway through a generation.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::catalog::{Blueprint, BlueprintCatalog, BlueprintContext, BlueprintKind};
use super::layers::LayerSpec;
use crate::error::ConfigError;
use crate::map::NodeType;

fn default_stage_count() -> u32 {
    1
}

/// Complete description of how stage maps are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    pub name: String,
    /// Layers in order, start layer first, boss layer last
    pub layers: Vec<LayerSpec>,
    pub blueprints: Vec<Blueprint>,
    /// Types eligible for randomized nodes
    #[serde(default)]
    pub reward_types: Vec<NodeType>,
    /// Edges added beyond the minimal connection, for branching choice
    #[serde(default)]
    pub extra_paths: usize,
    /// Number of boss cycles before stage-scoped content repeats
    #[serde(default = "default_stage_count")]
    pub stage_count: u32,
}

impl MapConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: MapConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn catalog(&self) -> BlueprintCatalog<'_> {
        BlueprintCatalog::new(&self.blueprints)
    }

    /// Blueprint scoping context for a (possibly wrapped) stage number.
    pub fn context_for(&self, stage: u32) -> BlueprintContext {
        BlueprintContext {
            stage: stage % self.stage_count.max(1),
        }
    }

    /// Check every rule a generation relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.layers.is_empty() {
            return Err(ConfigError::NoLayers);
        }
        if self.stage_count == 0 {
            return Err(ConfigError::ZeroStageCount);
        }
        if self.reward_types.contains(&NodeType::Boss) {
            return Err(ConfigError::BossInRewardTypes);
        }

        let last = self.layers.len() - 1;
        let mut has_boss = false;
        for (layer, spec) in self.layers.iter().enumerate() {
            self.validate_layer(layer, spec)?;
            if spec.is_boss_layer() {
                if layer != last {
                    return Err(ConfigError::BossLayerNotTerminal { layer });
                }
                has_boss = true;
            }
        }
        if !has_boss {
            return Err(ConfigError::MissingBossLayer);
        }

        self.validate_blueprints()?;
        self.validate_coverage()
    }

    fn validate_layer(&self, layer: usize, spec: &LayerSpec) -> Result<(), ConfigError> {
        let spacing = spec.nodes_apart_distance;
        if !spacing.is_finite() || spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing { layer, spacing });
        }
        let range = spec.distance_from_previous;
        if !range.is_valid() {
            return Err(ConfigError::InvalidDistanceRange {
                layer,
                min: range.min,
                max: range.max,
            });
        }
        let jitter = spec.randomize_position;
        if !(0.0..0.5).contains(&jitter) {
            return Err(ConfigError::InvalidJitter { layer, jitter });
        }
        let fraction = spec.randomize_nodes;
        if !(0.0..=1.0).contains(&fraction) {
            return Err(ConfigError::InvalidRandomization { layer, fraction });
        }
        if spec.draws_rewards() && self.reward_types.is_empty() {
            return Err(ConfigError::NoRewardTypes { layer });
        }

        match spec.node_count {
            Some(0) => return Err(ConfigError::ZeroNodeCount { layer }),
            Some(count) if spec.is_boss_layer() && count != 1 => {
                return Err(ConfigError::BossLayerWidth { layer, count });
            }
            None if layer == 0 && !spec.is_boss_layer() => {
                return Err(ConfigError::MissingNodeCount { layer });
            }
            _ => {}
        }
        Ok(())
    }

    fn validate_blueprints(&self) -> Result<(), ConfigError> {
        let mut ids = HashSet::new();
        let mut totals: HashMap<NodeType, u32> = HashMap::new();
        for blueprint in &self.blueprints {
            if !ids.insert(blueprint.id.as_str()) {
                return Err(ConfigError::DuplicateBlueprint {
                    id: blueprint.id.clone(),
                });
            }
            if blueprint.weight == 0 {
                return Err(ConfigError::InvalidBlueprintWeight {
                    id: blueprint.id.clone(),
                });
            }
            // A weighted draw sums every candidate of one type
            let node_type = blueprint.node_type();
            let total = totals.entry(node_type).or_insert(0);
            *total = total
                .checked_add(blueprint.weight)
                .ok_or(ConfigError::BlueprintWeightOverflow { node_type })?;
            if let BlueprintKind::Treasure { chance } = blueprint.kind {
                if !(0.0..=1.0).contains(&chance) {
                    return Err(ConfigError::InvalidTreasureChance {
                        id: blueprint.id.clone(),
                        chance,
                    });
                }
            }
        }
        Ok(())
    }

    /// Every type a layer can produce needs a blueprint in every stage.
    fn validate_coverage(&self) -> Result<(), ConfigError> {
        let mut required: Vec<NodeType> = Vec::new();
        for spec in &self.layers {
            if spec.keeps_default() && !required.contains(&spec.node_type) {
                required.push(spec.node_type);
            }
            if spec.draws_rewards() {
                for reward in &self.reward_types {
                    if !required.contains(reward) {
                        required.push(*reward);
                    }
                }
            }
        }

        let catalog = self.catalog();
        for stage in 0..self.stage_count {
            let context = BlueprintContext { stage };
            for node_type in &required {
                catalog.blueprint_for(*node_type, context)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::BlueprintKind;

    fn config() -> MapConfig {
        MapConfig {
            name: "test".into(),
            layers: vec![
                LayerSpec::new(NodeType::Minion).with_count(3),
                LayerSpec::new(NodeType::Minion).with_randomized_types(0.5),
                LayerSpec::new(NodeType::Boss),
            ],
            blueprints: vec![
                Blueprint::new("slimes", BlueprintKind::Minion { enemies: vec![] }),
                Blueprint::new("chest", BlueprintKind::Treasure { chance: 0.3 }),
                Blueprint::new(
                    "guardian",
                    BlueprintKind::Boss {
                        boss_id: "guardian".into(),
                    },
                ),
            ],
            reward_types: vec![NodeType::Treasure],
            extra_paths: 1,
            stage_count: 1,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_negative_spacing_rejected() {
        let mut c = config();
        c.layers[1].nodes_apart_distance = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidSpacing { layer: 1, .. })
        ));
    }

    #[test]
    fn test_jitter_must_keep_order() {
        let mut c = config();
        c.layers[0].randomize_position = 0.5;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidJitter { layer: 0, .. })
        ));
    }

    #[test]
    fn test_first_layer_needs_count() {
        let mut c = config();
        c.layers[0].node_count = None;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::MissingNodeCount { layer: 0 })
        ));
    }

    #[test]
    fn test_boss_layer_rules() {
        let mut c = config();
        c.layers.pop();
        assert!(matches!(c.validate(), Err(ConfigError::MissingBossLayer)));

        let mut c = config();
        c.layers.swap(1, 2);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::BossLayerNotTerminal { layer: 1 })
        ));

        let mut c = config();
        c.layers[2].node_count = Some(2);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::BossLayerWidth { layer: 2, count: 2 })
        ));

        let mut c = config();
        c.reward_types.push(NodeType::Boss);
        assert!(matches!(c.validate(), Err(ConfigError::BossInRewardTypes)));
    }

    #[test]
    fn test_missing_reward_blueprint() {
        let mut c = config();
        c.reward_types.push(NodeType::Shop);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::MissingBlueprint {
                node_type: NodeType::Shop,
                stage: 0
            })
        ));
    }

    #[test]
    fn test_stage_scoped_coverage() {
        let mut c = config();
        c.stage_count = 2;
        c.blueprints[0] = c.blueprints[0].clone().for_stage(0);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::MissingBlueprint {
                node_type: NodeType::Minion,
                stage: 1
            })
        ));
    }

    #[test]
    fn test_randomizing_without_rewards() {
        let mut c = config();
        c.reward_types.clear();
        assert!(matches!(
            c.validate(),
            Err(ConfigError::NoRewardTypes { layer: 1 })
        ));
    }

    #[test]
    fn test_duplicate_blueprint_ids() {
        let mut c = config();
        c.blueprints.push(Blueprint::new("chest", BlueprintKind::Shop));
        assert!(matches!(
            c.validate(),
            Err(ConfigError::DuplicateBlueprint { .. })
        ));
    }

    #[test]
    fn test_blueprint_weight_total_overflow() {
        let mut c = config();
        c.blueprints[0].weight = u32::MAX;
        c.blueprints
            .push(Blueprint::new("bats", BlueprintKind::Minion { enemies: vec![] }).with_weight(1));
        assert!(matches!(
            c.validate(),
            Err(ConfigError::BlueprintWeightOverflow {
                node_type: NodeType::Minion
            })
        ));

        // Heavy weights on different types do not add up
        c.blueprints.pop();
        c.blueprints[1].weight = u32::MAX;
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let c = config();
        let json = c.to_json_string().unwrap();
        let parsed = MapConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, c);
    }

    #[test]
    fn test_context_wraps() {
        let mut c = config();
        c.stage_count = 3;
        assert_eq!(c.context_for(4).stage, 1);
    }
}
