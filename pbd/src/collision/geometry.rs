use crate::EPS;
use na::Vector3;
use serde::{Deserialize, Serialize};

/// Infinite plane through `point` with unit `normal`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub point: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Build a plane, normalizing the given normal. A zero normal falls back to +Y.
    pub fn new(point: Vector3<f64>, normal: Vector3<f64>) -> Self {
        let normal = normal.try_normalize(EPS).unwrap_or_else(|| {
            log::warn!("Degenerate plane normal {:?}; using +Y", normal);
            Vector3::y()
        });
        Plane { point, normal }
    }

    /// Signed distance of `x` from the plane, positive on the normal side.
    pub fn signed_distance(&self, x: &Vector3<f64>) -> f64 {
        (x - self.point).dot(&self.normal)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vector3<f64>,
    pub radius: f64,
}

impl Sphere {
    pub fn new(center: Vector3<f64>, radius: f64) -> Self {
        Sphere { center, radius }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vector3<f64>,
    pub direction: Vector3<f64>,
}

/// Borrowed view of a triangulated surface.
#[derive(Copy, Clone, Debug)]
pub struct SurfaceMeshRef<'a> {
    pub positions: &'a [Vector3<f64>],
    pub triangles: &'a [[usize; 3]],
    /// Unique edges of the triangles.
    pub edges: &'a [[usize; 2]],
}

impl<'a> SurfaceMeshRef<'a> {
    pub fn triangle(&self, t: usize) -> [Vector3<f64>; 3] {
        self.triangles[t].map(|v| self.positions[v])
    }

    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(self.positions)
    }
}

/// Geometry participating in collision detection.
#[derive(Copy, Clone, Debug)]
pub enum Geometry<'a> {
    Plane(Plane),
    Sphere(Sphere),
    PointSet(&'a [Vector3<f64>]),
    SurfaceMesh(SurfaceMeshRef<'a>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Plane,
    Sphere,
    PointSet,
    SurfaceMesh,
}

impl Geometry<'_> {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Plane(_) => GeometryType::Plane,
            Geometry::Sphere(_) => GeometryType::Sphere,
            Geometry::PointSet(_) => GeometryType::PointSet,
            Geometry::SurfaceMesh(_) => GeometryType::SurfaceMesh,
        }
    }

    /// Vertex positions of discrete geometry.
    pub fn points(&self) -> Option<&[Vector3<f64>]> {
        match self {
            Geometry::PointSet(p) => Some(*p),
            Geometry::SurfaceMesh(m) => Some(m.positions),
            _ => None,
        }
    }
}

/// Axis aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Aabb {
    /// An inverted box containing nothing.
    pub fn empty() -> Self {
        Aabb {
            min: Vector3::repeat(f64::INFINITY),
            max: Vector3::repeat(f64::NEG_INFINITY),
        }
    }

    pub fn from_points<'p>(points: impl IntoIterator<Item = &'p Vector3<f64>>) -> Self {
        let mut aabb = Aabb::empty();
        for p in points {
            aabb.add_point(p);
        }
        aabb
    }

    pub fn add_point(&mut self, p: &Vector3<f64>) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Grow the box by `pad` in every direction.
    pub fn padded(&self, pad: f64) -> Self {
        Aabb {
            min: self.min.add_scalar(-pad),
            max: self.max.add_scalar(pad),
        }
    }

    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }
}
