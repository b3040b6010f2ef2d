//! Graph generation - builds a layered stage map from a [`MapConfig`].
//!
//! Generation is a pure function of the config, the stage number and the
//! random source. Layers are built in order; each new layer is connected to
//! the previous one by a nearest-neighbour pass, and once all layers exist a
//! fixed number of extra edges is sprinkled in for branching.

use rand::seq::SliceRandom;
use rand::Rng;

use super::config::MapConfig;
use super::layers::LayerSpec;
use crate::error::ConfigError;
use crate::map::{Map, Node, NodeType, Point, Position};

/// Generate the map for `stage` (0-based, unbounded).
pub fn generate_map<R: Rng + ?Sized>(
    config: &MapConfig,
    stage: u32,
    rng: &mut R,
) -> Result<Map, ConfigError> {
    config.validate()?;

    let context = config.context_for(stage);
    let catalog = config.catalog();

    let mut layers: Vec<Vec<Node>> = Vec::with_capacity(config.layers.len());
    let mut layer_y = 0.0f32;

    for (index, spec) in config.layers.iter().enumerate() {
        if index > 0 {
            layer_y += spec.distance_from_previous.sample(rng);
        }

        let previous_count = layers.last().map(Vec::len);
        let count = spec
            .resolved_count(previous_count)
            .ok_or(ConfigError::MissingNodeCount { layer: index })?;

        let xs = layer_x_positions(spec, count, rng);
        let mut nodes = Vec::with_capacity(count);
        for (i, x) in xs.iter().enumerate() {
            let node_type = roll_node_type(spec, &config.reward_types, rng);
            let blueprint = catalog.choose(node_type, context, rng)?;
            nodes.push(Node::new(
                Point::new(i as i32, index as i32),
                node_type,
                &blueprint.id,
                Position::new(*x, layer_y),
            ));
        }

        if let Some(previous) = layers.last_mut() {
            let previous_xs: Vec<f32> = previous.iter().map(|n| n.position.x).collect();
            for (from, to) in connect_layers(&previous_xs, &xs) {
                previous[from].connect(nodes[to].point);
            }
        }

        layers.push(nodes);
    }

    let mut map = Map::from_nodes(layers.into_iter().flatten().collect());
    let base_edges = map.edge_count();
    add_extra_paths(&mut map, config.extra_paths, rng)?;

    log::info!(
        "Generated map '{}' for stage {}: {} layers, {} nodes, {} edges ({} extra)",
        config.name,
        stage,
        map.layer_count(),
        map.nodes().len(),
        map.edge_count(),
        map.edge_count() - base_edges,
    );

    Ok(map)
}

/// Evenly spaced x positions centred on 0, each jittered by up to
/// `randomize_position × spacing`. Jitter stays under half the spacing, so
/// the order never changes.
fn layer_x_positions<R: Rng + ?Sized>(spec: &LayerSpec, count: usize, rng: &mut R) -> Vec<f32> {
    let spacing = spec.nodes_apart_distance;
    let jitter = spec.randomize_position * spacing;
    let offset = (count as f32 - 1.0) / 2.0;

    (0..count)
        .map(|i| {
            let base = (i as f32 - offset) * spacing;
            if jitter > 0.0 {
                base + rng.gen_range(-jitter..=jitter)
            } else {
                base
            }
        })
        .collect()
}

fn roll_node_type<R: Rng + ?Sized>(spec: &LayerSpec, reward_types: &[NodeType], rng: &mut R) -> NodeType {
    if spec.draws_rewards() && rng.gen::<f32>() < spec.randomize_nodes {
        if let Some(reward) = reward_types.choose(rng) {
            return *reward;
        }
    }
    spec.node_type
}

/// Index of the entry in `xs` closest to `x`; ties go to the lowest index.
fn nearest(xs: &[f32], x: f32) -> Option<usize> {
    xs.iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (*a - x).abs().total_cmp(&(*b - x).abs()))
        .map(|(i, _)| i)
}

/// Minimal connection between two adjacent layers, as `(from, to)` index
/// pairs into `previous` and `current`.
///
/// Every previous node links to its nearest current node, then every
/// current node still lacking an incoming edge is linked from its nearest
/// previous node. The result covers both layers and contains no duplicates.
pub fn connect_layers(previous: &[f32], current: &[f32]) -> Vec<(usize, usize)> {
    let mut edges = Vec::with_capacity(previous.len().max(current.len()));
    let mut covered = vec![false; current.len()];

    for (from, &x) in previous.iter().enumerate() {
        if let Some(to) = nearest(current, x) {
            edges.push((from, to));
            covered[to] = true;
        }
    }

    for (to, &x) in current.iter().enumerate() {
        if covered[to] {
            continue;
        }
        if let Some(from) = nearest(previous, x) {
            edges.push((from, to));
        }
    }

    edges
}

/// Add exactly `count` edges between adjacent-layer pairs that are not yet
/// connected, chosen uniformly.
fn add_extra_paths<R: Rng + ?Sized>(map: &mut Map, count: usize, rng: &mut R) -> Result<(), ConfigError> {
    if count == 0 {
        return Ok(());
    }

    let mut candidates: Vec<(Point, Point)> = Vec::new();
    for from in map.nodes() {
        for to in map.layer(from.point.y + 1) {
            if !from.is_connected_to(&to.point) {
                candidates.push((from.point, to.point));
            }
        }
    }

    if candidates.len() < count {
        return Err(ConfigError::ExtraPathsExceedCapacity {
            requested: count,
            available: candidates.len(),
        });
    }

    let chosen: Vec<(Point, Point)> = candidates.choose_multiple(rng, count).copied().collect();
    for (from, to) in chosen {
        if let Some(node) = map.node_mut(from) {
            node.connect(to);
        }
    }
    Ok(())
}
