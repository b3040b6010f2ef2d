//! Generation - procedural creation of stage maps from a declarative config.

mod catalog;
mod config;
mod graph;
mod layers;

pub use catalog::*;
pub use config::*;
pub use graph::*;
pub use layers::*;
