use crate::{BodyState, PositionConstraint, EPS};

/// Keeps two vertices at their rest distance.
#[derive(Clone, Debug, PartialEq)]
pub struct DistanceConstraint {
    pub vertices: [usize; 2],
    pub rest_length: f64,
    pub stiffness: f64,
}

impl DistanceConstraint {
    pub fn new(state: &BodyState, vertices: [usize; 2], stiffness: f64) -> Self {
        let mut c = DistanceConstraint {
            vertices,
            rest_length: 0.0,
            stiffness,
        };
        c.reset(state);
        c
    }

    pub fn reset(&mut self, state: &BodyState) {
        let [a, b] = self.vertices;
        self.rest_length =
            (state.initial_vertex_position(b) - state.initial_vertex_position(a)).norm();
    }
}

impl PositionConstraint for DistanceConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let [i0, i1] = self.vertices;
        let w0 = state.inv_mass(i0);
        let w1 = state.inv_mass(i1);
        let wsum = w0 + w1;
        if wsum == 0.0 {
            return None;
        }

        let d = state.vertex_position(i1) - state.vertex_position(i0);
        let len = d.norm();
        if !(len > EPS * self.rest_length) {
            log::trace!("Coincident distance constraint vertices: {:?}", self.vertices);
            return None;
        }
        let n = d / len;
        let c = len - self.rest_length;
        let delta = n * (self.stiffness * c / wsum);

        if w0 > 0.0 {
            *state.vertex_position_mut(i0) += delta * w0;
        }
        if w1 > 0.0 {
            *state.vertex_position_mut(i1) -= delta * w1;
        }
        Some(c.abs())
    }
}
