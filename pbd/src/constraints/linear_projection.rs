use crate::BodyState;
use na::{Matrix3, Vector3};

/// Restricts the motion of a single vertex to an affine subspace.
///
/// After each solver pass the vertex is mapped to `value + P (x - value)`, where `P` is an
/// orthogonal projector. The identity projector leaves the vertex free and the zero projector
/// pins it to `value`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearProjection {
    node_id: usize,
    projector: Matrix3<f64>,
    value: Vector3<f64>,
}

impl LinearProjection {
    /// A free projection for the given vertex, or a pinned one if `is_fixed` is set.
    pub fn new(node_id: usize, is_fixed: bool) -> Self {
        LinearProjection {
            node_id,
            projector: if is_fixed {
                Matrix3::zeros()
            } else {
                Matrix3::identity()
            },
            value: Vector3::zeros(),
        }
    }

    /// Restrict motion to the plane orthogonal to `p - q`.
    pub fn set_projection(&mut self, node_id: usize, p: Vector3<f64>, q: Vector3<f64>) {
        self.node_id = node_id;
        match (p - q).try_normalize(0.0) {
            Some(n) => self.projector = Matrix3::identity() - n * n.transpose(),
            None => log::warn!(
                "Degenerate projection direction for vertex {}; projector unchanged",
                node_id
            ),
        }
    }

    pub fn set_projector_to_dirichlet(&mut self, node_id: usize) {
        self.node_id = node_id;
        self.projector = Matrix3::zeros();
    }

    pub fn set_value(&mut self, value: Vector3<f64>) {
        self.value = value;
    }

    /// Restore the identity projector and zero target.
    pub fn reset(&mut self) {
        self.projector = Matrix3::identity();
        self.value = Vector3::zeros();
    }

    pub fn node_id(&self) -> usize {
        self.node_id
    }

    pub fn projector(&self) -> &Matrix3<f64> {
        &self.projector
    }

    pub fn value(&self) -> &Vector3<f64> {
        &self.value
    }

    pub fn apply(&self, state: &mut BodyState) {
        let x = state.vertex_position_mut(self.node_id);
        *x = self.value + self.projector * (*x - self.value);
    }
}
