//! Traversal validation - accepts or rejects a player's move.
//!
//! Two states: before the first move only layer 0 is attainable; after it,
//! only the outgoing edges of the last visited node. A rejected move leaves
//! the path untouched.

use crate::error::InvalidMove;
use crate::map::{Map, Point, TraversalState};

/// A move that was recorded on the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    pub entered: Point,
    /// What the player may choose next, for the presentation layer
    pub attainable: Vec<Point>,
}

/// Validate `candidate` against the map and, if valid, append it to the path.
pub fn select_node(map: &mut Map, candidate: Point) -> Result<Accepted, InvalidMove> {
    check_move(map, candidate)?;

    map.record_visit(candidate);
    let attainable = map.attainable_points();
    log::debug!(
        "Moved to {} ({} choices next)",
        candidate,
        attainable.len()
    );

    Ok(Accepted {
        entered: candidate,
        attainable,
    })
}

/// The validation half of [`select_node`], without mutation.
pub fn check_move(map: &Map, candidate: Point) -> Result<(), InvalidMove> {
    match (map.traversal_state(), map.last_visited()) {
        (TraversalState::Traversing, Some(last)) => {
            if map.outgoing(last).contains(&candidate) {
                Ok(())
            } else {
                Err(InvalidMove::NotReachable {
                    from: last,
                    to: candidate,
                })
            }
        }
        _ => {
            if candidate.y != 0 {
                Err(InvalidMove::OutOfStartLayer { point: candidate })
            } else if !map.contains(candidate) {
                Err(InvalidMove::UnknownNode { point: candidate })
            } else {
                Ok(())
            }
        }
    }
}

/// Attainable points for the current path.
pub fn attainable_nodes(map: &Map) -> Vec<Point> {
    map.attainable_points()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{Node, NodeType, Position};

    fn node(x: i32, y: i32, node_type: NodeType, outgoing: &[(i32, i32)]) -> Node {
        let mut n = Node::new(Point::new(x, y), node_type, "bp", Position::default());
        for &(ox, oy) in outgoing {
            n.connect(Point::new(ox, oy));
        }
        n
    }

    /// Three wide, four layers deep, with (1,2) branching to (0,3) and (2,3).
    fn corridor_map() -> Map {
        let mut nodes = vec![
            node(0, 0, NodeType::Minion, &[(0, 1)]),
            node(1, 0, NodeType::Minion, &[(1, 1)]),
            node(2, 0, NodeType::Minion, &[(2, 1)]),
            node(0, 1, NodeType::Minion, &[(0, 2)]),
            node(1, 1, NodeType::Minion, &[(1, 2)]),
            node(2, 1, NodeType::Minion, &[(2, 2)]),
            node(0, 2, NodeType::Shop, &[(0, 3)]),
            node(1, 2, NodeType::Regen, &[(0, 3), (2, 3)]),
            node(2, 2, NodeType::Treasure, &[(2, 3)]),
            node(0, 3, NodeType::Minion, &[(0, 4)]),
            node(1, 3, NodeType::Minion, &[(0, 4)]),
            node(2, 3, NodeType::Minion, &[(0, 4)]),
            node(0, 4, NodeType::Boss, &[]),
        ];
        // (1,3) needs an incoming edge to be reachable
        nodes[6].connect(Point::new(1, 3));
        Map::from_parts(nodes, vec![]).unwrap()
    }

    #[test]
    fn test_first_move_must_be_layer_zero() {
        let mut map = corridor_map();
        assert_eq!(
            select_node(&mut map, Point::new(0, 1)),
            Err(InvalidMove::OutOfStartLayer {
                point: Point::new(0, 1)
            })
        );
        assert!(map.path().is_empty());

        let accepted = select_node(&mut map, Point::new(1, 0)).unwrap();
        assert_eq!(accepted.entered, Point::new(1, 0));
        assert_eq!(accepted.attainable, vec![Point::new(1, 1)]);
        assert_eq!(map.path(), &[Point::new(1, 0)]);
    }

    #[test]
    fn test_first_move_to_missing_start_node() {
        let mut map = corridor_map();
        assert_eq!(
            select_node(&mut map, Point::new(9, 0)),
            Err(InvalidMove::UnknownNode {
                point: Point::new(9, 0)
            })
        );
        assert!(map.path().is_empty());
    }

    #[test]
    fn test_only_outgoing_edges_accepted() {
        let mut map = corridor_map();
        for p in [Point::new(1, 0), Point::new(1, 1), Point::new(1, 2)] {
            select_node(&mut map, p).unwrap();
        }
        let before = map.path().to_vec();

        assert_eq!(
            select_node(&mut map, Point::new(1, 3)),
            Err(InvalidMove::NotReachable {
                from: Point::new(1, 2),
                to: Point::new(1, 3)
            })
        );
        assert_eq!(map.path(), before.as_slice());

        let accepted = select_node(&mut map, Point::new(2, 3)).unwrap();
        assert_eq!(accepted.attainable, vec![Point::new(0, 4)]);
        assert_eq!(map.last_visited(), Some(Point::new(2, 3)));
        assert_eq!(map.path().len(), 4);
    }

    #[test]
    fn test_cannot_revisit_or_skip() {
        let mut map = corridor_map();
        select_node(&mut map, Point::new(0, 0)).unwrap();
        assert!(select_node(&mut map, Point::new(0, 0)).is_err());
        assert!(select_node(&mut map, Point::new(0, 2)).is_err());
        assert!(select_node(&mut map, Point::new(1, 0)).is_err());
        assert_eq!(map.path().len(), 1);
    }

    #[test]
    fn test_reaching_boss_completes_stage() {
        let mut map = corridor_map();
        for p in [
            Point::new(0, 0),
            Point::new(0, 1),
            Point::new(0, 2),
            Point::new(1, 3),
            Point::new(0, 4),
        ] {
            select_node(&mut map, p).unwrap();
        }
        assert!(map.is_stage_complete());
        assert!(attainable_nodes(&map).is_empty());
    }
}
