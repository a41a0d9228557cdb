use crate::constraint::{
    apply_correction, gather, gather_initial, is_degenerate, is_parallel, weighted_gradient_norm,
};
use crate::{BodyState, PositionConstraint};
use na::Vector3;

/// Preserves the bending angle between two triangles sharing an edge.
///
/// Vertices are ordered as the two vertices opposite the shared edge followed by the two
/// vertices of the shared edge: the triangles are `(v0, v2, v3)` and `(v1, v3, v2)`.
#[derive(Clone, Debug, PartialEq)]
pub struct DihedralConstraint {
    pub vertices: [usize; 4],
    pub rest_angle: f64,
    pub stiffness: f64,
}

/// Signed angle between the two triangle normals about the shared edge.
fn dihedral_angle(x: &[Vector3<f64>; 4]) -> Option<f64> {
    let e = x[3] - x[2];
    let l = e.norm();
    if is_parallel(&(x[2] - x[0]), &(x[3] - x[0])) || is_parallel(&(x[3] - x[1]), &(x[2] - x[1])) {
        return None;
    }
    let n1 = (x[2] - x[0]).cross(&(x[3] - x[0])).normalize();
    let n2 = (x[3] - x[1]).cross(&(x[2] - x[1])).normalize();
    Some(n1.cross(&n2).dot(&e).atan2(l * n1.dot(&n2)))
}

impl DihedralConstraint {
    pub fn new(state: &BodyState, vertices: [usize; 4], stiffness: f64) -> Self {
        let mut c = DihedralConstraint {
            vertices,
            rest_angle: 0.0,
            stiffness,
        };
        c.reset(state);
        c
    }

    pub fn reset(&mut self, state: &BodyState) {
        self.rest_angle = dihedral_angle(&gather_initial(state, &self.vertices)).unwrap_or_else(|| {
            log::warn!("Degenerate dihedral rest configuration: {:?}", self.vertices);
            0.0
        });
    }
}

impl PositionConstraint for DihedralConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let [i0, i1, _, _] = self.vertices;
        if state.inv_mass(i0) == 0.0 && state.inv_mass(i1) == 0.0 {
            return None;
        }
        let [p0, p1, p2, p3] = gather(state, &self.vertices);

        let e = p3 - p2;
        let e1 = p3 - p0;
        let e2 = p0 - p2;
        let e3 = p3 - p1;
        let e4 = p1 - p2;
        // Collapsed wings also cover a vanishing hinge edge.
        if is_parallel(&e1, &e) || is_parallel(&e, &e3) {
            return None;
        }
        let l = e.norm();
        let n1 = e1.cross(&e);
        let n2 = e.cross(&e3);
        let a1 = n1.norm();
        let a2 = n2.norm();
        let n1 = n1 / a1;
        let n2 = n2 / a2;

        let grads = [
            n1 * (-l / a1),
            n2 * (-l / a2),
            n1 * (e.dot(&e1) / (a1 * l)) + n2 * (e.dot(&e3) / (a2 * l)),
            n1 * (e.dot(&e2) / (a1 * l)) + n2 * (e.dot(&e4) / (a2 * l)),
        ];
        let sum = weighted_gradient_norm(state, &self.vertices, &grads);
        if is_degenerate(sum, 0.0) {
            return None;
        }
        let c = n1.cross(&n2).dot(&e).atan2(l * n1.dot(&n2)) - self.rest_angle;
        apply_correction(state, &self.vertices, &grads, self.stiffness * c / sum);
        Some(c.abs())
    }
}
