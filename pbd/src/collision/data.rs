use na::Vector3;

/// Contact point on an analytic surface with the direction its side must move to separate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointDirectionContact {
    pub point: Vector3<f64>,
    pub direction: Vector3<f64>,
    pub penetration_depth: f64,
}

/// A body vertex in contact with an immovable surface.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexDirectionContact {
    pub vertex: usize,
    pub direction: Vector3<f64>,
    pub penetration_depth: f64,
}

/// A vertex of the first body near a triangle of the second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct VertexTriangleContact {
    pub vertex: usize,
    pub triangle: [usize; 3],
    pub penetration_depth: f64,
}

/// An edge of the first body near an edge of the second.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EdgeEdgeContact {
    pub edge_a: [usize; 2],
    pub edge_b: [usize; 2],
    pub penetration_depth: f64,
}

/// One of the two participants of a collision pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    A,
    B,
}

/// Contact records belonging to one side of a collision pair.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SideData {
    point_direction: Vec<PointDirectionContact>,
    vertex_direction: Vec<VertexDirectionContact>,
}

impl SideData {
    pub fn point_direction(&self) -> &[PointDirectionContact] {
        &self.point_direction
    }

    pub fn vertex_direction(&self) -> &[VertexDirectionContact] {
        &self.vertex_direction
    }

    pub fn len(&self) -> usize {
        self.point_direction.len() + self.vertex_direction.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        self.point_direction.clear();
        self.vertex_direction.clear();
    }
}

/// Contact records of a single collision pair, repopulated on every detection pass.
///
/// Records with negative penetration depth are never stored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CollisionData {
    side_a: SideData,
    side_b: SideData,
    vertex_triangle: Vec<VertexTriangleContact>,
    edge_edge: Vec<EdgeEdgeContact>,
}

impl CollisionData {
    pub fn new() -> Self {
        CollisionData::default()
    }

    pub fn clear(&mut self) {
        self.side_a.clear();
        self.side_b.clear();
        self.vertex_triangle.clear();
        self.edge_edge.clear();
    }

    pub fn side(&self, side: Side) -> &SideData {
        match side {
            Side::A => &self.side_a,
            Side::B => &self.side_b,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideData {
        match side {
            Side::A => &mut self.side_a,
            Side::B => &mut self.side_b,
        }
    }

    pub fn vertex_triangle(&self) -> &[VertexTriangleContact] {
        &self.vertex_triangle
    }

    pub fn edge_edge(&self) -> &[EdgeEdgeContact] {
        &self.edge_edge
    }

    /// Total number of records stored.
    pub fn len(&self) -> usize {
        self.side_a.len() + self.side_b.len() + self.vertex_triangle.len() + self.edge_edge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `false` and drops the record if its depth is negative.
    pub fn add_point_direction(&mut self, side: Side, contact: PointDirectionContact) -> bool {
        if contact.penetration_depth < 0.0 {
            return false;
        }
        self.side_mut(side).point_direction.push(contact);
        true
    }

    /// Returns `false` and drops the record if its depth is negative.
    pub fn add_vertex_direction(&mut self, side: Side, contact: VertexDirectionContact) -> bool {
        if contact.penetration_depth < 0.0 {
            return false;
        }
        self.side_mut(side).vertex_direction.push(contact);
        true
    }

    /// Returns `false` and drops the record if its depth is negative.
    pub fn add_vertex_triangle(&mut self, contact: VertexTriangleContact) -> bool {
        if contact.penetration_depth < 0.0 {
            return false;
        }
        self.vertex_triangle.push(contact);
        true
    }

    /// Returns `false` and drops the record if its depth is negative.
    pub fn add_edge_edge(&mut self, contact: EdgeEdgeContact) -> bool {
        if contact.penetration_depth < 0.0 {
            return false;
        }
        self.edge_edge.push(contact);
        true
    }
}
