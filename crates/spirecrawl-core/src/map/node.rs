//! Map nodes and their types.

use serde::{Deserialize, Serialize};

use super::point::{Point, Position};

/// What the player meets when entering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Minion,
    Boss,
    Regen,
    Treasure,
    Shop,
}

impl NodeType {
    pub const ALL: [NodeType; 5] = [
        NodeType::Minion,
        NodeType::Boss,
        NodeType::Regen,
        NodeType::Treasure,
        NodeType::Shop,
    ];

    /// Battle nodes keep traversal locked until the battle reports back.
    pub fn is_battle(self) -> bool {
        matches!(self, NodeType::Minion | NodeType::Boss)
    }

    pub fn label(self) -> &'static str {
        match self {
            NodeType::Minion => "Minion",
            NodeType::Boss => "Boss",
            NodeType::Regen => "Regen",
            NodeType::Treasure => "Treasure",
            NodeType::Shop => "Shop",
        }
    }
}

/// One node of the map graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub point: Point,
    pub node_type: NodeType,
    /// Id of the content blueprint bound at generation time
    pub blueprint_id: String,
    pub position: Position,
    /// Edges into the next layer, in insertion order
    pub outgoing: Vec<Point>,
}

impl Node {
    pub fn new(point: Point, node_type: NodeType, blueprint_id: &str, position: Position) -> Self {
        Self {
            point,
            node_type,
            blueprint_id: blueprint_id.to_string(),
            position,
            outgoing: Vec::new(),
        }
    }

    /// Add an edge to `to`. Returns false if the edge already existed.
    pub fn connect(&mut self, to: Point) -> bool {
        if self.outgoing.contains(&to) {
            return false;
        }
        self.outgoing.push(to);
        true
    }

    pub fn is_connected_to(&self, to: &Point) -> bool {
        self.outgoing.contains(to)
    }
}
