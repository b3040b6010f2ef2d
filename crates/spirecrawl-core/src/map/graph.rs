//! The layered map graph plus the player's recorded path.

use std::collections::{HashMap, HashSet};

use super::node::{Node, NodeType};
use super::point::Point;
use crate::error::IntegrityError;
use crate::generation::BlueprintCatalog;

/// Where the player is in the two-state traversal machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalState {
    /// No node visited yet; only layer 0 is attainable
    AwaitingFirstMove,
    /// At least one node visited; each accepted move stays here
    Traversing,
}

/// A generated map: nodes indexed by point, and the visited path.
#[derive(Debug, Clone)]
pub struct Map {
    nodes: Vec<Node>,
    index: HashMap<Point, usize>,
    path: Vec<Point>,
}

impl Map {
    /// Build from nodes the generator produced. Later duplicates of a point
    /// shadow earlier ones in the index, so untrusted input must go through
    /// [`Map::from_parts`].
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        let index = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.point, i))
            .collect();
        Self {
            nodes,
            index,
            path: Vec::new(),
        }
    }

    /// Build from untrusted parts (e.g. a decoded save), checking every
    /// graph and path invariant.
    pub fn from_parts(nodes: Vec<Node>, path: Vec<Point>) -> Result<Self, IntegrityError> {
        let mut index = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.point, i).is_some() {
                return Err(IntegrityError::DuplicatePoint { point: node.point });
            }
        }
        let map = Self { nodes, index, path };
        map.check_integrity()?;
        Ok(map)
    }

    /// All nodes, in generation order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, point: Point) -> Option<&Node> {
        self.index.get(&point).map(|&i| &self.nodes[i])
    }

    pub(crate) fn node_mut(&mut self, point: Point) -> Option<&mut Node> {
        match self.index.get(&point) {
            Some(&i) => Some(&mut self.nodes[i]),
            None => None,
        }
    }

    pub fn contains(&self, point: Point) -> bool {
        self.index.contains_key(&point)
    }

    /// Visited points, oldest first.
    pub fn path(&self) -> &[Point] {
        &self.path
    }

    pub fn last_visited(&self) -> Option<Point> {
        self.path.last().copied()
    }

    pub fn traversal_state(&self) -> TraversalState {
        if self.path.is_empty() {
            TraversalState::AwaitingFirstMove
        } else {
            TraversalState::Traversing
        }
    }

    /// Append a visited point. Callers check reachability first.
    pub(crate) fn record_visit(&mut self, point: Point) {
        self.path.push(point);
    }

    pub fn layer_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|n| n.point.y.saturating_add(1))
            .max()
            .unwrap_or(0)
            .max(0) as usize
    }

    /// Nodes of one layer, ordered by x.
    pub fn layer(&self, y: i32) -> Vec<&Node> {
        let mut layer: Vec<&Node> = self.nodes.iter().filter(|n| n.point.y == y).collect();
        layer.sort_by_key(|n| n.point.x);
        layer
    }

    /// Outgoing edges of `point`; empty for unknown points.
    pub fn outgoing(&self, point: Point) -> &[Point] {
        self.node(point).map(|n| n.outgoing.as_slice()).unwrap_or(&[])
    }

    /// Points with an edge into `point`.
    pub fn incoming(&self, point: Point) -> Vec<Point> {
        self.nodes
            .iter()
            .filter(|n| n.is_connected_to(&point))
            .map(|n| n.point)
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.outgoing.len()).sum()
    }

    /// The unique boss of the terminal layer.
    ///
    /// On a map that passed [`Map::check_integrity`] there is exactly one;
    /// otherwise the lowest-x boss is returned so the answer stays stable.
    pub fn stage_boss(&self) -> Option<&Node> {
        let terminal = self.layer_count() as i32 - 1;
        self.nodes
            .iter()
            .filter(|n| n.point.y == terminal && n.node_type == NodeType::Boss)
            .min_by_key(|n| n.point.x)
    }

    /// A stage is complete once its boss point has been reached.
    pub fn is_stage_complete(&self) -> bool {
        match self.stage_boss() {
            Some(boss) => self.path.contains(&boss.point),
            None => false,
        }
    }

    /// Points the player may move to next.
    pub fn attainable_points(&self) -> Vec<Point> {
        match self.last_visited() {
            Some(last) => self.outgoing(last).to_vec(),
            None => self.layer(0).iter().map(|n| n.point).collect(),
        }
    }

    /// Check every structural invariant of the graph and the path.
    pub fn check_integrity(&self) -> Result<(), IntegrityError> {
        if self.nodes.is_empty() {
            return Err(IntegrityError::EmptyMap);
        }

        let mut occupied = HashSet::new();
        for node in &self.nodes {
            if node.point.x < 0 || node.point.y < 0 {
                return Err(IntegrityError::NegativeCoordinate { point: node.point });
            }
            if node.point.y == i32::MAX {
                return Err(IntegrityError::CoordinateOutOfRange { point: node.point });
            }
            occupied.insert(node.point.y);
        }

        let layer_count = self.layer_count() as i32;
        let terminal = layer_count - 1;
        // Layers are contiguous from 0, so the first gap is at most the
        // number of distinct layers.
        if occupied.len() != layer_count as usize {
            let gap = (0..=occupied.len() as i32).find(|y| !occupied.contains(y));
            return Err(IntegrityError::EmptyLayer {
                layer: gap.unwrap_or(terminal),
            });
        }

        let mut has_incoming = HashSet::new();
        for node in &self.nodes {
            let mut seen = HashSet::new();
            for &to in &node.outgoing {
                if !seen.insert(to) {
                    return Err(IntegrityError::DuplicateEdge {
                        from: node.point,
                        to,
                    });
                }
                if !self.contains(to) {
                    return Err(IntegrityError::DanglingEdge {
                        from: node.point,
                        to,
                    });
                }
                if !node.point.precedes(&to) {
                    return Err(IntegrityError::NonAdjacentEdge {
                        from: node.point,
                        to,
                    });
                }
                has_incoming.insert(to);
            }
            if node.point.y < terminal && node.outgoing.is_empty() {
                return Err(IntegrityError::DeadEnd { point: node.point });
            }
        }
        if let Some(node) = self
            .nodes
            .iter()
            .find(|n| n.point.y > 0 && !has_incoming.contains(&n.point))
        {
            return Err(IntegrityError::Unreachable { point: node.point });
        }

        let mut terminal_bosses = 0;
        for node in self.nodes.iter().filter(|n| n.node_type == NodeType::Boss) {
            if node.point.y != terminal {
                return Err(IntegrityError::BossOutsideTerminalLayer { point: node.point });
            }
            terminal_bosses += 1;
        }
        match terminal_bosses {
            0 => return Err(IntegrityError::MissingStageBoss),
            1 => {}
            count => return Err(IntegrityError::MultipleStageBosses { count }),
        }

        self.check_path()
    }

    fn check_path(&self) -> Result<(), IntegrityError> {
        let Some(&first) = self.path.first() else {
            return Ok(());
        };
        if first.y != 0 {
            return Err(IntegrityError::PathStart { point: first });
        }
        for &point in &self.path {
            if !self.contains(point) {
                return Err(IntegrityError::PathUnknownPoint { point });
            }
        }
        for step in self.path.windows(2) {
            let (from, to) = (step[0], step[1]);
            if !self.outgoing(from).contains(&to) {
                return Err(IntegrityError::PathBroken { from, to });
            }
        }
        Ok(())
    }

    /// Check that every node's blueprint exists and matches its type.
    pub fn check_blueprints(&self, catalog: &BlueprintCatalog<'_>) -> Result<(), IntegrityError> {
        for node in &self.nodes {
            let Some(blueprint) = catalog.get(&node.blueprint_id) else {
                return Err(IntegrityError::UnknownBlueprint {
                    point: node.point,
                    blueprint_id: node.blueprint_id.clone(),
                });
            };
            if blueprint.node_type() != node.node_type {
                return Err(IntegrityError::BlueprintMismatch {
                    point: node.point,
                    node_type: node.node_type,
                    blueprint_id: node.blueprint_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Two maps are equal when they hold the same nodes (in any order) and the
/// same path.
impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
            && self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .all(|n| other.node(n.point).is_some_and(|o| o == n))
    }
}
