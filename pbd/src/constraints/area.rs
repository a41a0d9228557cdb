use crate::constraint::{
    apply_correction, gather, gather_initial, inv_mass_sum, is_degenerate, is_parallel,
    weighted_gradient_norm,
};
use crate::{BodyState, PositionConstraint};
use na::Vector3;

/// Preserves the area of a triangle.
#[derive(Clone, Debug, PartialEq)]
pub struct AreaConstraint {
    pub vertices: [usize; 3],
    pub rest_area: f64,
    pub stiffness: f64,
}

fn triangle_area(x: &[Vector3<f64>; 3]) -> f64 {
    0.5 * (x[1] - x[0]).cross(&(x[2] - x[0])).norm()
}

impl AreaConstraint {
    pub fn new(state: &BodyState, vertices: [usize; 3], stiffness: f64) -> Self {
        let mut c = AreaConstraint {
            vertices,
            rest_area: 0.0,
            stiffness,
        };
        c.reset(state);
        c
    }

    pub fn reset(&mut self, state: &BodyState) {
        self.rest_area = triangle_area(&gather_initial(state, &self.vertices));
    }
}

impl PositionConstraint for AreaConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let x = gather(state, &self.vertices);
        if is_parallel(&(x[1] - x[0]), &(x[2] - x[0])) {
            return None;
        }
        let n = (x[1] - x[0]).cross(&(x[2] - x[0]));
        let area = 0.5 * n.norm();
        let n = n / (2.0 * area);

        // Each gradient is half the opposite edge rotated into the triangle plane.
        let grads = [
            n.cross(&(x[2] - x[1])) * 0.5,
            n.cross(&(x[0] - x[2])) * 0.5,
            n.cross(&(x[1] - x[0])) * 0.5,
        ];
        let sum = weighted_gradient_norm(state, &self.vertices, &grads);
        // Gradients are half edges, so their squared norms scale with the area.
        let reference = inv_mass_sum(state, &self.vertices) * self.rest_area;
        if is_degenerate(sum, reference) {
            return None;
        }
        let c = area - self.rest_area;
        apply_correction(state, &self.vertices, &grads, self.stiffness * c / sum);
        Some(c.abs())
    }
}
