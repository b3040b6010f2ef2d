//! Map data model - points, nodes and the layered graph.
//!
//! Edges are stored as sets of [`Point`]s rather than node references, so the
//! graph owns no cycles and serializes as plain data.

mod graph;
mod node;
mod point;

pub use graph::*;
pub use node::*;
pub use point::*;
