//! Proximity queries between triangulated surfaces.

use super::*;
use crate::constraints::segment_closest_parameters;
use crate::constraint::is_parallel;
use na::Vector3;

/// Project `x` onto the plane of a triangle.
///
/// Returns the signed distance along the triangle normal (right handed winding) and the
/// barycentric coordinates of the projection, or `None` if the projection falls outside the
/// triangle or the triangle is degenerate.
pub fn project_on_triangle(x: &Vector3<f64>, tri: &[Vector3<f64>; 3]) -> Option<(f64, [f64; 3])> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    if is_parallel(&e1, &e2) {
        return None;
    }
    let n = e1.cross(&e2);
    let nn = n.norm_squared();
    let d = x - tri[0];
    let u = n.dot(&d.cross(&e2)) / nn;
    let v = n.dot(&e1.cross(&d)) / nn;
    if u < 0.0 || v < 0.0 || u + v > 1.0 {
        return None;
    }
    Some((n.dot(&d) / nn.sqrt(), [1.0 - u - v, u, v]))
}

fn triangle_boxes(mesh: &SurfaceMeshRef, pad: f64) -> Vec<Aabb> {
    mesh.triangles
        .iter()
        .map(|tri| Aabb::from_points(tri.iter().map(|&v| &mesh.positions[v])).padded(pad))
        .collect()
}

fn edge_boxes(positions: &[Vector3<f64>], edges: &[[usize; 2]], pad: f64) -> Vec<Aabb> {
    edges
        .iter()
        .map(|e| Aabb::from_points(e.iter().map(|&v| &positions[v])).padded(pad))
        .collect()
}

/// Vertices of `points` within `proximity` of the front side of triangles of `mesh`.
///
/// Vertices behind a triangle by less than `proximity` are also reported so that shallow
/// penetrations are resolved. The penetration depth is `proximity - distance`.
pub fn point_set_to_mesh(
    points: &[Vector3<f64>],
    mesh: &SurfaceMeshRef,
    proximity: f64,
    data: &mut CollisionData,
) {
    let mesh_box = mesh.bounding_box().padded(proximity);
    let boxes = triangle_boxes(mesh, proximity);
    for (vertex, x) in points.iter().enumerate() {
        if !mesh_box.contains(x) {
            continue;
        }
        for (t, tri) in mesh.triangles.iter().enumerate() {
            if !boxes[t].contains(x) {
                continue;
            }
            if let Some((dist, _)) = project_on_triangle(x, &mesh.triangle(t)) {
                if dist.abs() <= proximity {
                    data.add_vertex_triangle(VertexTriangleContact {
                        vertex,
                        triangle: *tri,
                        penetration_depth: proximity - dist,
                    });
                }
            }
        }
    }
}

/// Vertex-triangle and edge-edge proximity contacts between two distinct surfaces.
///
/// Vertices of `a` are tested against triangles of `b`, and unique edges of `a` against
/// unique edges of `b`. Edge contacts are only reported when the closest points lie strictly
/// inside both edges.
pub fn mesh_to_mesh(
    a: &SurfaceMeshRef,
    b: &SurfaceMeshRef,
    proximity: f64,
    data: &mut CollisionData,
) {
    if !a
        .bounding_box()
        .padded(proximity)
        .intersects(&b.bounding_box())
    {
        return;
    }

    point_set_to_mesh(a.positions, b, proximity, data);

    let boxes_a = edge_boxes(a.positions, a.edges, proximity);
    let boxes_b = edge_boxes(b.positions, b.edges, 0.0);
    for (ea, box_a) in a.edges.iter().zip(boxes_a.iter()) {
        let x0 = &a.positions[ea[0]];
        let x1 = &a.positions[ea[1]];
        for (eb, box_b) in b.edges.iter().zip(boxes_b.iter()) {
            if !box_a.intersects(box_b) {
                continue;
            }
            let x2 = &b.positions[eb[0]];
            let x3 = &b.positions[eb[1]];
            let (s, t) = match segment_closest_parameters(x0, x1, x2, x3) {
                Some(st) => st,
                None => continue,
            };
            if s <= 0.0 || s >= 1.0 || t <= 0.0 || t >= 1.0 {
                continue;
            }
            let p = x0 + (x1 - x0) * s;
            let q = x2 + (x3 - x2) * t;
            let dist = (q - p).norm();
            if dist <= proximity {
                data.add_edge_edge(EdgeEdgeContact {
                    edge_a: *ea,
                    edge_b: *eb,
                    penetration_depth: proximity - dist,
                });
            }
        }
    }
}
