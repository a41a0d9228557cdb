//! Position based dynamics for deformable bodies.
//!
//! Bodies are stored as particle sets ([`BodyState`]) with attached position constraints. A
//! [`Solver`] advances all bodies by predicting positions, detecting and resolving collisions
//! and iteratively projecting constraints before recovering velocities.

pub mod collision;
mod constraint;
pub mod constraints;
mod ids;
pub mod material;
mod model;
mod solver;
mod state;

pub mod test_utils;

pub type TetMesh = geo::mesh::TetMesh<f64>;
pub type TriMesh = geo::mesh::TriMesh<f64>;

pub use self::constraint::*;
pub use self::ids::*;
pub use self::material::*;
pub use self::model::*;
pub use self::solver::*;
pub use self::state::*;

/// Threshold below which lengths, areas, volumes and gradient norms are considered degenerate.
pub const EPS: f64 = 1e-6;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Size mismatch error")]
    SizeMismatch,
    #[error("Degenerate reference element detected: {:?}", .degens[0])]
    DegenerateReferenceElement { degens: Vec<usize> },
    #[error("Invalid parameter: {name:?}")]
    InvalidParameter { name: String },
    #[error("Model has no {expected} elements for this constraint type")]
    MeshTypeMismatch { expected: String },
    #[error("Unknown model id: {id:?}")]
    UnknownModel { id: usize },
}
