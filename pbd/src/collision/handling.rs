//! Collision response: penalty forces and position constraints.

use super::*;
use crate::constraints::CollisionConstraint;
use crate::ModelId;
use na::Vector3;
use utils::SpinLock;

/// Force accumulator shared between detection workers.
#[derive(Debug)]
pub struct ForceAccumulator {
    force: SpinLock<Vector3<f64>>,
}

impl ForceAccumulator {
    pub fn new() -> Self {
        ForceAccumulator {
            force: SpinLock::new(Vector3::zeros()),
        }
    }

    pub fn add(&self, f: Vector3<f64>) {
        *self.force.lock() += f;
    }

    pub fn get(&self) -> Vector3<f64> {
        *self.force.lock()
    }

    /// Return the accumulated force and reset it to zero.
    pub fn take(&self) -> Vector3<f64> {
        std::mem::replace(&mut *self.force.lock(), Vector3::zeros())
    }
}

impl Default for ForceAccumulator {
    fn default() -> Self {
        ForceAccumulator::new()
    }
}

impl Clone for ForceAccumulator {
    fn clone(&self) -> Self {
        ForceAccumulator {
            force: SpinLock::new(self.get()),
        }
    }
}

impl PartialEq for ForceAccumulator {
    fn eq(&self, other: &Self) -> bool {
        self.get() == other.get()
    }
}

/// Magnitude of the penalty force for a given penetration depth.
#[inline]
pub fn penalty_magnitude(penetration_depth: f64, stiffness: f64) -> f64 {
    stiffness * ((penetration_depth + 1.0).powi(2) - 1.0)
}

/// Converts point-direction contacts of one side into a net penalty force.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PenaltyHandler {
    pub side: Side,
    pub stiffness: f64,
}

impl PenaltyHandler {
    pub fn new(side: Side, stiffness: f64) -> Self {
        PenaltyHandler { side, stiffness }
    }

    /// Net force on this handler's side.
    pub fn compute_force(&self, data: &CollisionData) -> Vector3<f64> {
        data.side(self.side)
            .point_direction()
            .iter()
            .fold(Vector3::zeros(), |acc, c| {
                acc + c.direction * penalty_magnitude(c.penetration_depth, self.stiffness)
            })
    }

    /// Add the net force into the accumulator of the moving object.
    pub fn process(&self, data: &CollisionData, accumulator: &ForceAccumulator) {
        let f = self.compute_force(data);
        if f != Vector3::zeros() {
            accumulator.add(f);
        }
    }
}

/// Builds collision constraints from detected contacts for one interaction pair.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PbdCollisionHandler {
    pub first: ModelId,
    /// Second body, or `None` for an immovable analytic obstacle.
    pub second: Option<ModelId>,
    pub proximity: f64,
    pub stiffness: [f64; 2],
}

impl PbdCollisionHandler {
    /// Append one constraint per contact record to `out`.
    ///
    /// `first_positions` are the positions of the first body at detection time. They are used
    /// to place the obstacle tangent plane for vertex-direction contacts.
    pub fn generate_constraints(
        &self,
        data: &CollisionData,
        first_positions: &[Vector3<f64>],
        out: &mut Vec<CollisionConstraint>,
    ) {
        let [k1, _] = self.stiffness;
        for c in data.side(Side::A).vertex_direction() {
            let x = first_positions[c.vertex];
            out.push(CollisionConstraint::point_plane(
                self.first,
                c.vertex,
                x + c.direction * c.penetration_depth,
                c.direction,
                k1,
            ));
        }

        let second = match self.second {
            Some(second) => second,
            None => {
                if !data.vertex_triangle().is_empty() || !data.edge_edge().is_empty() {
                    log::warn!("Mesh contacts against an analytic obstacle are ignored");
                }
                return;
            }
        };
        for c in data.vertex_triangle() {
            out.push(CollisionConstraint::point_triangle(
                self.first,
                c.vertex,
                second,
                c.triangle,
                self.proximity,
                self.stiffness,
            ));
        }
        for c in data.edge_edge() {
            out.push(CollisionConstraint::edge_edge(
                self.first,
                c.edge_a,
                second,
                c.edge_b,
                self.proximity,
                self.stiffness,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::CollisionKind;
    use crate::IdAllocator;
    use approx::assert_relative_eq;

    fn contact(depth: f64, dir: Vector3<f64>) -> PointDirectionContact {
        PointDirectionContact {
            point: Vector3::zeros(),
            direction: dir,
            penetration_depth: depth,
        }
    }

    #[test]
    fn penalty_force_is_monotone_and_signed() {
        let handler_a = PenaltyHandler::new(Side::A, 10.0);
        let handler_b = PenaltyHandler::new(Side::B, 10.0);
        let mut prev = 0.0;
        for &depth in [0.0, 0.1, 0.2, 0.5, 1.0].iter() {
            let mut data = CollisionData::new();
            data.add_point_direction(Side::A, contact(depth, -Vector3::y()));
            data.add_point_direction(Side::B, contact(depth, Vector3::y()));
            let fa = handler_a.compute_force(&data);
            let fb = handler_b.compute_force(&data);
            assert!(fb[1] >= prev);
            assert_relative_eq!(fa, -fb);
            prev = fb[1];
        }
        assert_relative_eq!(penalty_magnitude(0.5, 2.0), 2.5);
    }

    #[test]
    fn accumulator_take_resets() {
        let acc = ForceAccumulator::new();
        let handler = PenaltyHandler::new(Side::B, 1.0);
        let mut data = CollisionData::new();
        data.add_point_direction(Side::B, contact(1.0, Vector3::x()));
        handler.process(&data, &acc);
        handler.process(&data, &acc);
        assert_relative_eq!(acc.get(), Vector3::new(6.0, 0.0, 0.0));
        assert_relative_eq!(acc.take(), Vector3::new(6.0, 0.0, 0.0));
        assert_eq!(acc.get(), Vector3::zeros());
    }

    #[test]
    fn constraints_from_records() {
        let mut ids = IdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        let mut data = CollisionData::new();
        data.add_vertex_direction(
            Side::A,
            VertexDirectionContact {
                vertex: 0,
                direction: Vector3::y(),
                penetration_depth: 0.25,
            },
        );
        data.add_vertex_triangle(VertexTriangleContact {
            vertex: 1,
            triangle: [0, 1, 2],
            penetration_depth: 0.1,
        });
        data.add_edge_edge(EdgeEdgeContact {
            edge_a: [0, 1],
            edge_b: [2, 3],
            penetration_depth: 0.1,
        });
        let positions = vec![Vector3::new(1.0, -0.25, 0.0), Vector3::zeros()];
        let handler = PbdCollisionHandler {
            first: a,
            second: Some(b),
            proximity: 0.1,
            stiffness: [1.0, 0.5],
        };
        let mut out = Vec::new();
        handler.generate_constraints(&data, &positions, &mut out);
        assert_eq!(out.len(), 3);
        match &out[0].kind {
            CollisionKind::PointPlane { plane_point, .. } => {
                assert_relative_eq!(*plane_point, Vector3::new(1.0, 0.0, 0.0))
            }
            kind => panic!("unexpected {:?}", kind),
        }
        assert_eq!(out[1].second, Some(b));
        assert_eq!(out[2].second_vertices(), &[2, 3]);

        // Without a second body only the analytic contacts survive.
        let handler = PbdCollisionHandler {
            second: None,
            ..handler
        };
        out.clear();
        handler.generate_constraints(&data, &positions, &mut out);
        assert_eq!(out.len(), 1);
    }
}
