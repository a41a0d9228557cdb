use crate::constraint::{
    apply_correction, gather, gather_initial, inv_mass_sum, is_degenerate, weighted_gradient_norm,
};
use crate::{BodyState, PositionConstraint};
use na::Vector3;

/// Preserves the signed volume of a tetrahedron.
#[derive(Clone, Debug, PartialEq)]
pub struct VolumeConstraint {
    pub vertices: [usize; 4],
    pub rest_volume: f64,
    pub stiffness: f64,
}

pub(crate) fn signed_volume(x: &[Vector3<f64>; 4]) -> f64 {
    (x[1] - x[0]).cross(&(x[2] - x[0])).dot(&(x[3] - x[0])) / 6.0
}

impl VolumeConstraint {
    pub fn new(state: &BodyState, vertices: [usize; 4], stiffness: f64) -> Self {
        let mut c = VolumeConstraint {
            vertices,
            rest_volume: 0.0,
            stiffness,
        };
        c.reset(state);
        c
    }

    pub fn reset(&mut self, state: &BodyState) {
        self.rest_volume = signed_volume(&gather_initial(state, &self.vertices));
    }

    /// Weighted gradient norm of a well shaped tetrahedron with the rest volume and the current
    /// masses. Face gradients scale with the square of the edge length.
    fn reference_norm(&self, state: &BodyState) -> f64 {
        let l2 = (6.0 * self.rest_volume.abs()).powf(2.0 / 3.0);
        inv_mass_sum(state, &self.vertices) * l2 * l2 / 36.0
    }
}

impl PositionConstraint for VolumeConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let [x1, x2, x3, x4] = gather(state, &self.vertices);
        let onesixth = 1.0 / 6.0;
        let grads = [
            (x2 - x3).cross(&(x4 - x2)) * onesixth,
            (x3 - x1).cross(&(x4 - x1)) * onesixth,
            (x4 - x1).cross(&(x2 - x1)) * onesixth,
            (x2 - x1).cross(&(x3 - x1)) * onesixth,
        ];
        let sum = weighted_gradient_norm(state, &self.vertices, &grads);
        if is_degenerate(sum, self.reference_norm(state)) {
            return None;
        }
        let c = grads[3].dot(&(x4 - x1)) - self.rest_volume;
        apply_correction(state, &self.vertices, &grads, self.stiffness * c / sum);
        Some(c.abs())
    }
}
