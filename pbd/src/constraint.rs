use crate::constraints::*;
use crate::BodyState;

/// Common interface of all position constraints acting within a single body.
pub trait PositionConstraint {
    /// Vertex indices participating in this constraint.
    fn vertices(&self) -> &[usize];

    /// Project the participating vertices toward satisfying the constraint.
    ///
    /// Returns the magnitude of the constraint value before the correction when the projection
    /// was applied, and `None` when the constraint could not be projected (e.g. all vertices
    /// are fixed or the configuration is degenerate).
    fn solve_position(&self, state: &mut BodyState) -> Option<f64>;
}

/// Kind tag of a structural constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConstraintType {
    Distance,
    Area,
    Dihedral,
    Volume,
    FemTet,
    FemHex,
    ConstantDensity,
}

/// A structural constraint owned by a body.
#[derive(Clone, Debug, PartialEq)]
pub enum Constraint {
    Distance(DistanceConstraint),
    Area(AreaConstraint),
    Dihedral(DihedralConstraint),
    Volume(VolumeConstraint),
    FemTet(FemTetConstraint),
    FemHex(FemHexConstraint),
    ConstantDensity(ConstantDensityConstraint),
}

impl Constraint {
    pub fn constraint_type(&self) -> ConstraintType {
        match self {
            Constraint::Distance(_) => ConstraintType::Distance,
            Constraint::Area(_) => ConstraintType::Area,
            Constraint::Dihedral(_) => ConstraintType::Dihedral,
            Constraint::Volume(_) => ConstraintType::Volume,
            Constraint::FemTet(_) => ConstraintType::FemTet,
            Constraint::FemHex(_) => ConstraintType::FemHex,
            Constraint::ConstantDensity(_) => ConstraintType::ConstantDensity,
        }
    }

    /// Recompute rest data from the initial configuration of the given state.
    pub fn reset(&mut self, state: &BodyState) {
        match self {
            Constraint::Distance(c) => c.reset(state),
            Constraint::Area(c) => c.reset(state),
            Constraint::Dihedral(c) => c.reset(state),
            Constraint::Volume(c) => c.reset(state),
            // FEM rest data is validated at construction; a failed reset keeps the old data.
            Constraint::FemTet(c) => {
                if !c.reset(state) {
                    log::warn!("Degenerate tetrahedron on reset: {:?}", c.vertices);
                }
            }
            Constraint::FemHex(c) => {
                if !c.reset(state) {
                    log::warn!("Degenerate hexahedron on reset: {:?}", c.vertices);
                }
            }
            Constraint::ConstantDensity(_) => {}
        }
    }
}

impl PositionConstraint for Constraint {
    fn vertices(&self) -> &[usize] {
        match self {
            Constraint::Distance(c) => c.vertices(),
            Constraint::Area(c) => c.vertices(),
            Constraint::Dihedral(c) => c.vertices(),
            Constraint::Volume(c) => c.vertices(),
            Constraint::FemTet(c) => c.vertices(),
            Constraint::FemHex(c) => c.vertices(),
            Constraint::ConstantDensity(c) => c.vertices(),
        }
    }

    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        match self {
            Constraint::Distance(c) => c.solve_position(state),
            Constraint::Area(c) => c.solve_position(state),
            Constraint::Dihedral(c) => c.solve_position(state),
            Constraint::Volume(c) => c.solve_position(state),
            Constraint::FemTet(c) => c.solve_position(state),
            Constraint::FemHex(c) => c.solve_position(state),
            Constraint::ConstantDensity(c) => c.solve_position(state),
        }
    }
}

macro_rules! impl_from_constraint {
    ($($variant:ident($ty:ty)),* $(,)*) => {
        $(
            impl From<$ty> for Constraint {
                fn from(c: $ty) -> Constraint {
                    Constraint::$variant(c)
                }
            }
        )*
    }
}

impl_from_constraint!(
    Distance(DistanceConstraint),
    Area(AreaConstraint),
    Dihedral(DihedralConstraint),
    Volume(VolumeConstraint),
    FemTet(FemTetConstraint),
    FemHex(FemHexConstraint),
    ConstantDensity(ConstantDensityConstraint),
);

/// Apply `x_k -= scale * w_k * grad_k` to every movable vertex.
pub(crate) fn apply_correction<const N: usize>(
    state: &mut BodyState,
    vertices: &[usize; N],
    grads: &[na::Vector3<f64>; N],
    scale: f64,
) {
    for (&v, g) in vertices.iter().zip(grads.iter()) {
        let w = state.inv_mass(v);
        if w > 0.0 {
            *state.vertex_position_mut(v) -= g * (scale * w);
        }
    }
}

/// Weighted squared gradient norm `Σ w_k |grad_k|²`.
pub(crate) fn weighted_gradient_norm<const N: usize>(
    state: &BodyState,
    vertices: &[usize; N],
    grads: &[na::Vector3<f64>; N],
) -> f64 {
    vertices
        .iter()
        .zip(grads.iter())
        .map(|(&v, g)| state.inv_mass(v) * g.norm_squared())
        .sum()
}

/// Sum of the inverse masses of the given vertices.
pub(crate) fn inv_mass_sum<const N: usize>(state: &BodyState, vertices: &[usize; N]) -> f64 {
    vertices.iter().map(|&v| state.inv_mass(v)).sum()
}

/// Whether a weighted gradient norm is too small to divide by.
///
/// `reference` is the norm a well shaped element of the same size and masses would have, so
/// the test does not depend on the units of the model. A zero reference only rejects a zero
/// or non-finite norm.
pub(crate) fn is_degenerate(sum: f64, reference: f64) -> bool {
    !(sum > crate::EPS * reference) || !sum.is_finite()
}

/// Whether `|a x b|` is negligible relative to `|a| |b|`, i.e. the vectors are parallel or one
/// of them vanishes.
pub(crate) fn is_parallel(a: &na::Vector3<f64>, b: &na::Vector3<f64>) -> bool {
    let scale = a.norm() * b.norm();
    !(a.cross(b).norm() > crate::EPS * scale)
}

/// Gather the current positions of the given vertices.
pub(crate) fn gather<const N: usize>(
    state: &BodyState,
    vertices: &[usize; N],
) -> [na::Vector3<f64>; N] {
    let mut out = [na::Vector3::zeros(); N];
    for (o, &v) in out.iter_mut().zip(vertices.iter()) {
        *o = *state.vertex_position(v);
    }
    out
}

/// Gather the initial positions of the given vertices.
pub(crate) fn gather_initial<const N: usize>(
    state: &BodyState,
    vertices: &[usize; N],
) -> [na::Vector3<f64>; N] {
    let mut out = [na::Vector3::zeros(); N];
    for (o, &v) in out.iter_mut().zip(vertices.iter()) {
        *o = *state.initial_vertex_position(v);
    }
    out
}
