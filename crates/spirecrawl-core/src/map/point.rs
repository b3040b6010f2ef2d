//! Grid coordinates of map nodes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A node's identity on the map grid.
///
/// `y` is the layer index (0 = start layer), `x` the node's index within
/// its layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// True if `other` is in the layer directly after this one.
    pub fn precedes(&self, other: &Point) -> bool {
        self.y.checked_add(1) == Some(other.y)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Presentation-space position of a node (layout units, not pixels).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
