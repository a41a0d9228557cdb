//! Narrow phase collision detection and collision response.

mod data;
mod detection;
mod geometry;
mod handling;
mod mesh;

pub use data::*;
pub use detection::*;
pub use geometry::*;
pub use handling::*;
pub use mesh::*;
