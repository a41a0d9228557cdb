use super::*;
use crate::EPS;
use na::Vector3;

/// Narrow phase test to run between two geometries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DetectorType {
    /// Side A is a plane, side B a sphere.
    PlaneToSphere,
    SphereToSphere,
    /// Side A is a point set (or mesh vertices), side B an immovable plane.
    PointSetToPlane,
    /// Side A is a point set (or mesh vertices), side B an immovable sphere.
    PointSetToSphere,
    /// Side A is a point set or surface mesh, side B a surface mesh.
    MeshToMesh,
}

/// A configured narrow phase detector.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionDetection {
    pub detector: DetectorType,
    /// Contact distance used by mesh detectors.
    pub proximity: f64,
}

impl CollisionDetection {
    pub fn new(detector: DetectorType) -> Self {
        CollisionDetection {
            detector,
            proximity: 0.0,
        }
    }

    pub fn with_proximity(self, proximity: f64) -> Self {
        CollisionDetection { proximity, ..self }
    }

    /// Clear `data` and fill it with the contacts between `a` and `b`.
    ///
    /// Geometry types not supported by the detector leave `data` empty.
    pub fn compute(&self, a: &Geometry, b: &Geometry, data: &mut CollisionData) {
        data.clear();
        match (self.detector, a, b) {
            (DetectorType::PlaneToSphere, Geometry::Plane(p), Geometry::Sphere(s)) => {
                plane_to_sphere(p, s, data)
            }
            (DetectorType::SphereToSphere, Geometry::Sphere(sa), Geometry::Sphere(sb)) => {
                sphere_to_sphere(sa, sb, data)
            }
            (DetectorType::PointSetToPlane, a, Geometry::Plane(p)) if a.points().is_some() => {
                point_set_to_plane(a.points().unwrap_or(&[]), p, data)
            }
            (DetectorType::PointSetToSphere, a, Geometry::Sphere(s)) if a.points().is_some() => {
                point_set_to_sphere(a.points().unwrap_or(&[]), s, data)
            }
            (DetectorType::MeshToMesh, Geometry::SurfaceMesh(ma), Geometry::SurfaceMesh(mb)) => {
                mesh_to_mesh(ma, mb, self.proximity, data)
            }
            (DetectorType::MeshToMesh, Geometry::PointSet(pa), Geometry::SurfaceMesh(mb)) => {
                point_set_to_mesh(pa, mb, self.proximity, data)
            }
            (detector, a, b) => log::warn!(
                "{:?} detector does not support {:?} against {:?}",
                detector,
                a.geometry_type(),
                b.geometry_type()
            ),
        }
    }
}

/// Plane against sphere.
///
/// Side A (the plane) is pushed away from the sphere and side B (the sphere) away from the
/// plane.
pub fn plane_to_sphere(plane: &Plane, sphere: &Sphere, data: &mut CollisionData) {
    let mut d = (sphere.center - plane.point).dot(&plane.normal);
    let mut dir = plane.normal;
    if d < 0.0 {
        d = -d;
        dir = -dir;
    }
    let penetration_depth = sphere.radius - d;
    if penetration_depth < 0.0 {
        return;
    }
    data.add_point_direction(
        Side::A,
        PointDirectionContact {
            point: sphere.center - dir * d,
            direction: -dir,
            penetration_depth,
        },
    );
    data.add_point_direction(
        Side::B,
        PointDirectionContact {
            point: sphere.center - dir * sphere.radius,
            direction: dir,
            penetration_depth,
        },
    );
}

/// Sphere against sphere.
///
/// Contact points lie on each surface along the centre line. Coincident centres use the +Y
/// axis as the separating direction.
pub fn sphere_to_sphere(a: &Sphere, b: &Sphere, data: &mut CollisionData) {
    let dir_ab = b.center - a.center;
    let d = dir_ab.norm();
    let penetration_depth = a.radius + b.radius - d;
    if penetration_depth < 0.0 {
        return;
    }
    let dir_ab = if !(d > EPS * (a.radius + b.radius)) {
        Vector3::y()
    } else {
        dir_ab / d
    };
    data.add_point_direction(
        Side::A,
        PointDirectionContact {
            point: a.center + dir_ab * a.radius,
            direction: -dir_ab,
            penetration_depth,
        },
    );
    data.add_point_direction(
        Side::B,
        PointDirectionContact {
            point: b.center - dir_ab * b.radius,
            direction: dir_ab,
            penetration_depth,
        },
    );
}

/// Vertices below an immovable plane.
///
/// Records are vertex-direction contacts on side A pointing along the plane normal.
pub fn point_set_to_plane(points: &[Vector3<f64>], plane: &Plane, data: &mut CollisionData) {
    for (vertex, x) in points.iter().enumerate() {
        let penetration_depth = -plane.signed_distance(x);
        if penetration_depth >= 0.0 {
            data.add_vertex_direction(
                Side::A,
                VertexDirectionContact {
                    vertex,
                    direction: plane.normal,
                    penetration_depth,
                },
            );
        }
    }
}

/// Vertices inside an immovable sphere.
///
/// Records are vertex-direction contacts on side A pointing radially outward. A vertex at the
/// centre is pushed along +Y.
pub fn point_set_to_sphere(points: &[Vector3<f64>], sphere: &Sphere, data: &mut CollisionData) {
    for (vertex, x) in points.iter().enumerate() {
        let r = x - sphere.center;
        let dist = r.norm();
        let penetration_depth = sphere.radius - dist;
        if penetration_depth >= 0.0 {
            let direction = if !(dist > EPS * sphere.radius) {
                Vector3::y()
            } else {
                r / dist
            };
            data.add_vertex_direction(
                Side::A,
                VertexDirectionContact {
                    vertex,
                    direction,
                    penetration_depth,
                },
            );
        }
    }
}

/// Intersect a ray with a plane.
///
/// Returns the intersection point if the ray is not parallel to the plane and the plane lies
/// in front of the ray origin.
pub fn ray_plane(ray: &Ray, plane: &Plane) -> Option<Vector3<f64>> {
    let denom = ray.direction.dot(&plane.normal);
    if !(denom.abs() > EPS * ray.direction.norm()) {
        return None;
    }
    let t = (plane.point - ray.origin).dot(&plane.normal) / denom;
    if t > 0.0 {
        Some(ray.origin + ray.direction * t)
    } else {
        None
    }
}
