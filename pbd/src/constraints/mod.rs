//! Position constraints and their projection rules.

mod area;
mod collision;
mod constant_density;
mod dihedral;
mod distance;
mod fem;
mod linear_projection;
mod volume;

pub use area::*;
pub use collision::*;
pub use constant_density::*;
pub use dihedral::*;
pub use distance::*;
pub use fem::*;
pub use linear_projection::*;
pub use volume::*;
