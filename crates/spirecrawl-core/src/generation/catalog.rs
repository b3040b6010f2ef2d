//! Content blueprints and the catalog lookup used at generation time.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::map::NodeType;

/// The content carried by a blueprint. The node type follows from the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BlueprintKind {
    Minion { enemies: Vec<String> },
    Boss { boss_id: String },
    Regen { amount: u32 },
    Treasure { chance: f32 },
    Shop,
}

impl BlueprintKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            BlueprintKind::Minion { .. } => NodeType::Minion,
            BlueprintKind::Boss { .. } => NodeType::Boss,
            BlueprintKind::Regen { .. } => NodeType::Regen,
            BlueprintKind::Treasure { .. } => NodeType::Treasure,
            BlueprintKind::Shop => NodeType::Shop,
        }
    }
}

/// Which stages a blueprint may appear in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlueprintScope {
    #[default]
    Global,
    /// Only in this boss cycle (stage index modulo the config's stage count)
    Stage(u32),
}

impl BlueprintScope {
    pub fn matches(&self, context: BlueprintContext) -> bool {
        match self {
            BlueprintScope::Global => true,
            BlueprintScope::Stage(stage) => *stage == context.stage,
        }
    }
}

fn default_weight() -> u32 {
    1
}

/// Static content descriptor bound to generated nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub id: String,
    pub kind: BlueprintKind,
    #[serde(default)]
    pub scope: BlueprintScope,
    /// Relative draw weight among blueprints of the same type (rarity)
    #[serde(default = "default_weight")]
    pub weight: u32,
}

impl Blueprint {
    pub fn new(id: &str, kind: BlueprintKind) -> Self {
        Self {
            id: id.to_string(),
            kind,
            scope: BlueprintScope::Global,
            weight: 1,
        }
    }

    pub fn for_stage(mut self, stage: u32) -> Self {
        self.scope = BlueprintScope::Stage(stage);
        self
    }

    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }
}

/// Stage context blueprints are scoped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlueprintContext {
    pub stage: u32,
}

/// Read-only view over a config's blueprints.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintCatalog<'a> {
    blueprints: &'a [Blueprint],
}

impl<'a> BlueprintCatalog<'a> {
    pub fn new(blueprints: &'a [Blueprint]) -> Self {
        Self { blueprints }
    }

    pub fn get(&self, id: &str) -> Option<&'a Blueprint> {
        self.blueprints.iter().find(|b| b.id == id)
    }

    /// Every blueprint usable for `node_type` in `context`, or
    /// `MissingBlueprint` if there is none.
    pub fn blueprint_for(
        &self,
        node_type: NodeType,
        context: BlueprintContext,
    ) -> Result<Vec<&'a Blueprint>, ConfigError> {
        let candidates: Vec<&'a Blueprint> = self
            .blueprints
            .iter()
            .filter(|b| b.node_type() == node_type && b.scope.matches(context))
            .collect();
        if candidates.is_empty() {
            return Err(ConfigError::MissingBlueprint {
                node_type,
                stage: context.stage,
            });
        }
        Ok(candidates)
    }

    /// Weighted draw among the candidates for `node_type`.
    pub fn choose<R: Rng + ?Sized>(
        &self,
        node_type: NodeType,
        context: BlueprintContext,
        rng: &mut R,
    ) -> Result<&'a Blueprint, ConfigError> {
        let candidates = self.blueprint_for(node_type, context)?;
        candidates
            .choose_weighted(rng, |b| b.weight)
            .map(|b| *b)
            .map_err(|_| ConfigError::MissingBlueprint {
                node_type,
                stage: context.stage,
            })
    }
}
