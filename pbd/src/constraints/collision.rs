//! Short lived constraints resolving contacts between bodies.

use crate::constraint::{is_degenerate, is_parallel};
use crate::{BodyState, ModelId, EPS};
use na::Vector3;

/// Indexed access to body states.
pub trait BodyArena {
    fn body(&self, id: ModelId) -> &BodyState;
    fn body_mut(&mut self, id: ModelId) -> &mut BodyState;
}

impl BodyArena for [BodyState] {
    fn body(&self, id: ModelId) -> &BodyState {
        &self[id.index()]
    }
    fn body_mut(&mut self, id: ModelId) -> &mut BodyState {
        &mut self[id.index()]
    }
}

/// Geometric configuration of a collision constraint.
#[derive(Clone, Debug, PartialEq)]
pub enum CollisionKind {
    /// A vertex of the first body against a triangle of the second.
    PointTriangle { point: usize, triangle: [usize; 3] },
    /// An edge of the first body against an edge of the second.
    EdgeEdge { edge_a: [usize; 2], edge_b: [usize; 2] },
    /// A vertex of the first body against an immovable plane.
    PointPlane {
        point: usize,
        plane_point: Vector3<f64>,
        normal: Vector3<f64>,
    },
}

/// Inequality constraint between particles of two bodies.
///
/// The second body is absent for contacts against analytic obstacles. Both ids may refer to
/// the same body for self collisions.
#[derive(Clone, Debug, PartialEq)]
pub struct CollisionConstraint {
    pub first: ModelId,
    pub second: Option<ModelId>,
    pub kind: CollisionKind,
    pub proximity: f64,
    /// Contact stiffness of the first and second body.
    pub stiffness: [f64; 2],
}

impl CollisionConstraint {
    pub fn point_triangle(
        first: ModelId,
        point: usize,
        second: ModelId,
        triangle: [usize; 3],
        proximity: f64,
        stiffness: [f64; 2],
    ) -> Self {
        CollisionConstraint {
            first,
            second: Some(second),
            kind: CollisionKind::PointTriangle { point, triangle },
            proximity,
            stiffness,
        }
    }

    pub fn edge_edge(
        first: ModelId,
        edge_a: [usize; 2],
        second: ModelId,
        edge_b: [usize; 2],
        proximity: f64,
        stiffness: [f64; 2],
    ) -> Self {
        CollisionConstraint {
            first,
            second: Some(second),
            kind: CollisionKind::EdgeEdge { edge_a, edge_b },
            proximity,
            stiffness,
        }
    }

    pub fn point_plane(
        first: ModelId,
        point: usize,
        plane_point: Vector3<f64>,
        normal: Vector3<f64>,
        stiffness: f64,
    ) -> Self {
        CollisionConstraint {
            first,
            second: None,
            kind: CollisionKind::PointPlane {
                point,
                plane_point,
                normal,
            },
            proximity: 0.0,
            stiffness: [stiffness, 0.0],
        }
    }

    /// Vertices of the first body.
    pub fn first_vertices(&self) -> &[usize] {
        match &self.kind {
            CollisionKind::PointTriangle { point, .. } => std::slice::from_ref(point),
            CollisionKind::EdgeEdge { edge_a, .. } => edge_a,
            CollisionKind::PointPlane { point, .. } => std::slice::from_ref(point),
        }
    }

    /// Vertices of the second body. Empty for analytic obstacles.
    pub fn second_vertices(&self) -> &[usize] {
        match &self.kind {
            CollisionKind::PointTriangle { triangle, .. } => triangle,
            CollisionKind::EdgeEdge { edge_b, .. } => edge_b,
            CollisionKind::PointPlane { .. } => &[],
        }
    }

    /// Project the participating vertices out of contact.
    ///
    /// Returns the constraint violation before correction, `Some(0.0)` when the contact is
    /// already separated, and `None` when the configuration cannot be projected.
    pub fn solve_position<B: BodyArena + ?Sized>(&self, bodies: &mut B) -> Option<f64> {
        match &self.kind {
            CollisionKind::PointTriangle { point, triangle } => {
                self.solve_point_triangle(bodies, *point, triangle)
            }
            CollisionKind::EdgeEdge { edge_a, edge_b } => {
                self.solve_edge_edge(bodies, edge_a, edge_b)
            }
            CollisionKind::PointPlane {
                point,
                plane_point,
                normal,
            } => self.solve_point_plane(bodies, *point, plane_point, normal),
        }
    }

    fn solve_point_triangle<B: BodyArena + ?Sized>(
        &self,
        bodies: &mut B,
        point: usize,
        triangle: &[usize; 3],
    ) -> Option<f64> {
        let second = self.second?;
        let (x0, w0) = read(bodies, self.first, point);
        let [(x1, w1), (x2, w2), (x3, w3)] = triangle.map(|v| read(bodies, second, v));

        let e1 = x2 - x1;
        let e2 = x3 - x1;
        if is_parallel(&e1, &e2) {
            return None;
        }
        let n = e1.cross(&e2);
        let nn = n.norm_squared();
        let d = x0 - x1;
        let u = n.dot(&d.cross(&e2)) / nn;
        let v = n.dot(&e1.cross(&d)) / nn;
        if u < 0.0 || v < 0.0 || u + v > 1.0 {
            return None;
        }
        let b = [1.0 - u - v, u, v];
        let n = n / nn.sqrt();

        let c = n.dot(&d) - self.proximity;
        if c >= 0.0 {
            return Some(0.0);
        }
        let sum = w0 + w1 * b[0] * b[0] + w2 * b[1] * b[1] + w3 * b[2] * b[2];
        if is_degenerate(sum, 0.0) {
            return None;
        }
        let s = c / sum;
        let [k1, k2] = self.stiffness;
        add(bodies, self.first, point, n * (-k1 * s * w0));
        for ((&vtx, &w), &bk) in triangle.iter().zip([w1, w2, w3].iter()).zip(b.iter()) {
            add(bodies, second, vtx, n * (k2 * s * w * bk));
        }
        Some(c.abs())
    }

    fn solve_edge_edge<B: BodyArena + ?Sized>(
        &self,
        bodies: &mut B,
        edge_a: &[usize; 2],
        edge_b: &[usize; 2],
    ) -> Option<f64> {
        let second = self.second?;
        let [(x0, w0), (x1, w1)] = edge_a.map(|v| read(bodies, self.first, v));
        let [(x2, w2), (x3, w3)] = edge_b.map(|v| read(bodies, second, v));

        let (s, t) = segment_closest_parameters(&x0, &x1, &x2, &x3)?;
        if !(0.0..=1.0).contains(&s) || !(0.0..=1.0).contains(&t) {
            return None;
        }
        let p = x0 + (x1 - x0) * s;
        let q = x2 + (x3 - x2) * t;
        let n = q - p;
        let l = n.norm();
        // Crossing edges have no separating direction.
        if !(l > EPS * (x1 - x0).norm().max((x3 - x2).norm())) {
            return None;
        }
        let n = n / l;

        let c = l - self.proximity;
        if c >= 0.0 {
            return Some(0.0);
        }
        let sum = w0 * (1.0 - s) * (1.0 - s) + w1 * s * s + w2 * (1.0 - t) * (1.0 - t) + w3 * t * t;
        if is_degenerate(sum, 0.0) {
            return None;
        }
        let lambda = c / sum;
        let [k1, k2] = self.stiffness;
        add(bodies, self.first, edge_a[0], n * (k1 * lambda * w0 * (1.0 - s)));
        add(bodies, self.first, edge_a[1], n * (k1 * lambda * w1 * s));
        add(bodies, second, edge_b[0], n * (-k2 * lambda * w2 * (1.0 - t)));
        add(bodies, second, edge_b[1], n * (-k2 * lambda * w3 * t));
        Some(c.abs())
    }

    fn solve_point_plane<B: BodyArena + ?Sized>(
        &self,
        bodies: &mut B,
        point: usize,
        plane_point: &Vector3<f64>,
        normal: &Vector3<f64>,
    ) -> Option<f64> {
        let (x, w) = read(bodies, self.first, point);
        if w == 0.0 {
            return None;
        }
        let c = (x - plane_point).dot(normal);
        if c >= 0.0 {
            return Some(0.0);
        }
        add(bodies, self.first, point, normal * (-self.stiffness[0] * c));
        Some(c.abs())
    }
}

/// Parameters `(s, t)` of the closest points between the lines through `x0, x1` and `x2, x3`.
///
/// Parallel lines use the midpoint of the first segment. Returns `None` for degenerate
/// segments.
pub fn segment_closest_parameters(
    x0: &Vector3<f64>,
    x1: &Vector3<f64>,
    x2: &Vector3<f64>,
    x3: &Vector3<f64>,
) -> Option<(f64, f64)> {
    let d1 = x1 - x0;
    let d2 = x3 - x2;
    let r = x0 - x2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    if !(a > 0.0 && e > 0.0) {
        return None;
    }
    let b = d1.dot(&d2);
    let c = d1.dot(&r);
    let f = d2.dot(&r);
    let denom = a * e - b * b;
    let s = if denom < EPS * a * e {
        0.5
    } else {
        (b * f - c * e) / denom
    };
    let t = (b * s + f) / e;
    Some((s, t))
}

fn read<B: BodyArena + ?Sized>(bodies: &B, id: ModelId, v: usize) -> (Vector3<f64>, f64) {
    let body = bodies.body(id);
    (*body.vertex_position(v), body.inv_mass(v))
}

fn add<B: BodyArena + ?Sized>(bodies: &mut B, id: ModelId, v: usize, delta: Vector3<f64>) {
    let body = bodies.body_mut(id);
    if body.inv_mass(v) > 0.0 {
        *body.vertex_position_mut(v) += delta;
    }
}
