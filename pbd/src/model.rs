use crate::collision::{ForceAccumulator, SurfaceMeshRef};
use crate::constraints::*;
use crate::{
    BodyState, Constraint, DensityParameters, ElasticityParameters, Error, FemMaterial, ModelId,
    PositionConstraint, TetMesh, TriMesh,
};
use ahash::{AHashMap, AHashSet};
use geo::mesh::VertexPositions;
use na::Vector3;
use serde::{Deserialize, Serialize};

/// Per-body configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Mass assigned to every vertex. Zero fixes the whole body.
    pub uniform_mass: f64,
    /// Vertices with zero inverse mass.
    pub fixed_nodes: Vec<usize>,
    /// Viscous damping coefficient in `[0, 1]` applied during position prediction.
    pub viscous_damping: f64,
    /// Contact distance used when this body collides with other bodies.
    pub proximity: f64,
    /// Fraction of a contact correction applied to this body, in `(0, 1]`.
    pub contact_stiffness: f64,
    pub elasticity: ElasticityParameters,
    /// Fluid parameters used by the constant density constraint.
    pub density: DensityParameters,
}

impl Default for ModelParams {
    fn default() -> Self {
        ModelParams {
            uniform_mass: 1.0,
            fixed_nodes: Vec::new(),
            viscous_damping: 0.0,
            proximity: 0.1,
            contact_stiffness: 1.0,
            elasticity: ElasticityParameters::default(),
            density: DensityParameters::default(),
        }
    }
}

const TET_EDGES: [[usize; 2]; 6] = [[0, 1], [0, 2], [0, 3], [1, 2], [1, 3], [2, 3]];
/// Outward faces of a positively oriented tetrahedron.
const TET_FACES: [[usize; 3]; 4] = [[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
const HEX_EDGES: [[usize; 2]; 12] = [
    [0, 1],
    [1, 2],
    [2, 3],
    [3, 0],
    [4, 5],
    [5, 6],
    [6, 7],
    [7, 4],
    [0, 4],
    [1, 5],
    [2, 6],
    [3, 7],
];
/// Outward faces of a positively oriented hexahedron in VTK order.
const HEX_FACES: [[usize; 4]; 6] = [
    [0, 3, 2, 1],
    [4, 5, 6, 7],
    [0, 1, 5, 4],
    [1, 2, 6, 5],
    [2, 3, 7, 6],
    [3, 0, 4, 7],
];

/// A simulated body: particle state, element topology and the constraints acting on it.
#[derive(Clone, Debug)]
pub struct PbdModel {
    state: BodyState,
    params: ModelParams,
    tets: Vec<[usize; 4]>,
    hexes: Vec<[usize; 8]>,
    triangles: Vec<[usize; 3]>,
    /// Outward oriented boundary triangles used for collisions.
    surface_triangles: Vec<[usize; 3]>,
    surface_edges: Vec<[usize; 2]>,
    constraints: Vec<Constraint>,
    projections: Vec<LinearProjection>,
    external_force: ForceAccumulator,
}

impl PbdModel {
    /// A body without topology, such as a particle system.
    pub fn new(positions: Vec<[f64; 3]>, params: ModelParams) -> Result<Self, Error> {
        PbdModel::build(positions, Vec::new(), Vec::new(), Vec::new(), params)
    }

    pub fn from_tetmesh(mesh: &TetMesh, params: ModelParams) -> Result<Self, Error> {
        let tets = mesh.cell_iter().cloned().collect();
        PbdModel::build(
            mesh.vertex_positions().to_vec(),
            tets,
            Vec::new(),
            Vec::new(),
            params,
        )
    }

    pub fn from_trimesh(mesh: &TriMesh, params: ModelParams) -> Result<Self, Error> {
        let triangles = mesh.face_iter().cloned().collect();
        PbdModel::build(
            mesh.vertex_positions().to_vec(),
            Vec::new(),
            Vec::new(),
            triangles,
            params,
        )
    }

    /// A volumetric body made of hexahedra with nodes in VTK order.
    pub fn from_hexahedra(
        positions: Vec<[f64; 3]>,
        hexes: Vec<[usize; 8]>,
        params: ModelParams,
    ) -> Result<Self, Error> {
        PbdModel::build(positions, Vec::new(), hexes, Vec::new(), params)
    }

    fn build(
        positions: Vec<[f64; 3]>,
        tets: Vec<[usize; 4]>,
        hexes: Vec<[usize; 8]>,
        triangles: Vec<[usize; 3]>,
        params: ModelParams,
    ) -> Result<Self, Error> {
        let n = positions.len();
        let in_range = |cell: &[usize]| cell.iter().all(|&v| v < n);
        if !tets.iter().all(|c| in_range(&c[..]))
            || !hexes.iter().all(|c| in_range(&c[..]))
            || !triangles.iter().all(|c| in_range(&c[..]))
        {
            return Err(Error::SizeMismatch);
        }
        validate_params(&params, n)?;

        let mut state = BodyState::new(positions);
        state.set_uniform_mass(params.uniform_mass);
        for &i in params.fixed_nodes.iter() {
            state.set_fixed_point(i);
        }

        let mut surface_triangles = triangles.clone();
        surface_triangles.extend(tet_boundary(&tets, &state));
        surface_triangles.extend(hex_boundary(&hexes, &state));
        let surface_edges = unique_edges(surface_triangles.iter().flat_map(|t| {
            [[t[0], t[1]], [t[1], t[2]], [t[2], t[0]]]
        }));

        Ok(PbdModel {
            state,
            params,
            tets,
            hexes,
            triangles,
            surface_triangles,
            surface_edges,
            constraints: Vec::new(),
            projections: Vec::new(),
            external_force: ForceAccumulator::new(),
        })
    }

    /*
     * Constraint initialization
     */

    /// Add a distance constraint for every unique element edge.
    pub fn init_distance_constraints(&mut self, stiffness: f64) -> Result<usize, Error> {
        validate_stiffness(stiffness)?;
        let edges = unique_edges(
            self.tets
                .iter()
                .flat_map(|t| TET_EDGES.map(|[a, b]| [t[a], t[b]]))
                .chain(
                    self.hexes
                        .iter()
                        .flat_map(|h| HEX_EDGES.map(|[a, b]| [h[a], h[b]])),
                )
                .chain(
                    self.triangles
                        .iter()
                        .flat_map(|t| [[t[0], t[1]], [t[1], t[2]], [t[2], t[0]]]),
                ),
        );
        if edges.is_empty() {
            return Err(Error::MeshTypeMismatch {
                expected: "edge".to_string(),
            });
        }
        let count = edges.len();
        for e in edges {
            let c = DistanceConstraint::new(&self.state, e, stiffness);
            self.constraints.push(c.into());
        }
        log::debug!("Added {} distance constraints", count);
        Ok(count)
    }

    /// Add an area constraint for every triangle.
    pub fn init_area_constraints(&mut self, stiffness: f64) -> Result<usize, Error> {
        validate_stiffness(stiffness)?;
        self.require_triangles()?;
        for &tri in self.triangles.iter() {
            let c = AreaConstraint::new(&self.state, tri, stiffness);
            self.constraints.push(c.into());
        }
        Ok(self.triangles.len())
    }

    /// Add a bending constraint for every interior edge shared by exactly two triangles.
    pub fn init_dihedral_constraints(&mut self, stiffness: f64) -> Result<usize, Error> {
        validate_stiffness(stiffness)?;
        self.require_triangles()?;

        let mut order = Vec::new();
        let mut edge_tris: AHashMap<[usize; 2], Vec<usize>> = AHashMap::new();
        for (t, tri) in self.triangles.iter().enumerate() {
            for k in 0..3 {
                let key = sorted_edge([tri[k], tri[(k + 1) % 3]]);
                let entry = edge_tris.entry(key).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                entry.push(t);
            }
        }

        let mut count = 0;
        for key in order {
            let tris = &edge_tris[&key];
            if tris.len() != 2 {
                continue;
            }
            let t0 = self.triangles[tris[0]];
            let t1 = self.triangles[tris[1]];
            let (o0, e) = match opposite_vertex(&t0, key) {
                Some(k) => (t0[k], [t0[(k + 1) % 3], t0[(k + 2) % 3]]),
                None => continue,
            };
            let o1 = match opposite_vertex(&t1, key) {
                Some(k) => t1[k],
                None => continue,
            };
            let c = DihedralConstraint::new(&self.state, [o0, o1, e[0], e[1]], stiffness);
            self.constraints.push(c.into());
            count += 1;
        }
        Ok(count)
    }

    /// Add a volume constraint for every tetrahedron.
    pub fn init_volume_constraints(&mut self, stiffness: f64) -> Result<usize, Error> {
        validate_stiffness(stiffness)?;
        if self.tets.is_empty() {
            return Err(Error::MeshTypeMismatch {
                expected: "tetrahedral".to_string(),
            });
        }
        for &tet in self.tets.iter() {
            let c = VolumeConstraint::new(&self.state, tet, stiffness);
            self.constraints.push(c.into());
        }
        Ok(self.tets.len())
    }

    /// Add an FEM constraint for every tetrahedron and hexahedron.
    ///
    /// Fails without adding anything if any reference element is degenerate.
    pub fn init_fem_constraints(&mut self, material: FemMaterial) -> Result<usize, Error> {
        if self.tets.is_empty() && self.hexes.is_empty() {
            return Err(Error::MeshTypeMismatch {
                expected: "volumetric".to_string(),
            });
        }
        let elasticity = self.params.elasticity;
        let mut degens = Vec::new();
        let mut new_constraints = Vec::with_capacity(self.tets.len() + self.hexes.len());
        for (i, &tet) in self.tets.iter().enumerate() {
            match FemTetConstraint::new(&self.state, tet, material, elasticity) {
                Some(c) => new_constraints.push(Constraint::from(c)),
                None => degens.push(i),
            }
        }
        for (i, &hex) in self.hexes.iter().enumerate() {
            match FemHexConstraint::new(&self.state, hex, material, elasticity) {
                Some(c) => new_constraints.push(Constraint::from(c)),
                None => degens.push(self.tets.len() + i),
            }
        }
        if !degens.is_empty() {
            log::warn!("Found {} degenerate reference elements", degens.len());
            return Err(Error::DegenerateReferenceElement { degens });
        }
        let count = new_constraints.len();
        self.constraints.extend(new_constraints);
        Ok(count)
    }

    /// Add a single constraint keeping the density of all particles near the rest density.
    ///
    /// Topology is ignored so this works on any vertex set, including bare particle systems.
    pub fn init_constant_density_constraint(&mut self, stiffness: f64) -> Result<usize, Error> {
        validate_stiffness(stiffness)?;
        if self.state.num_vertices() == 0 {
            return Err(Error::MeshTypeMismatch {
                expected: "particle".to_string(),
            });
        }
        let c = ConstantDensityConstraint::new(&self.state, self.params.density, stiffness);
        self.constraints.push(c.into());
        Ok(1)
    }

    pub fn add_constraint(&mut self, constraint: impl Into<Constraint>) {
        self.constraints.push(constraint.into());
    }

    pub fn add_linear_projection(&mut self, projection: LinearProjection) -> Result<(), Error> {
        if projection.node_id() >= self.state.num_vertices() {
            return Err(Error::InvalidParameter {
                name: "projection node".to_string(),
            });
        }
        self.projections.push(projection);
        Ok(())
    }

    /// Pin a vertex to its initial position with a Dirichlet projection.
    pub fn pin_vertex(&mut self, i: usize) -> Result<(), Error> {
        if i >= self.state.num_vertices() {
            return Err(Error::InvalidParameter {
                name: "pinned vertex".to_string(),
            });
        }
        let mut projection = LinearProjection::new(i, true);
        projection.set_value(*self.state.initial_vertex_position(i));
        self.projections.push(projection);
        Ok(())
    }

    /// Recompute the rest data of all constraints from the initial configuration.
    pub fn reset_constraints(&mut self) {
        for c in self.constraints.iter_mut() {
            c.reset(&self.state);
        }
    }

    fn require_triangles(&self) -> Result<(), Error> {
        if self.triangles.is_empty() {
            Err(Error::MeshTypeMismatch {
                expected: "triangle".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /*
     * Accessors
     */

    pub fn state(&self) -> &BodyState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut BodyState {
        &mut self.state
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn projections(&self) -> &[LinearProjection] {
        &self.projections
    }

    pub fn tets(&self) -> &[[usize; 4]] {
        &self.tets
    }

    pub fn hexes(&self) -> &[[usize; 8]] {
        &self.hexes
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn surface_triangles(&self) -> &[[usize; 3]] {
        &self.surface_triangles
    }

    pub fn surface_edges(&self) -> &[[usize; 2]] {
        &self.surface_edges
    }

    pub fn surface_mesh(&self) -> SurfaceMeshRef {
        SurfaceMeshRef {
            positions: self.state.positions(),
            triangles: &self.surface_triangles,
            edges: &self.surface_edges,
        }
    }

    pub fn external_force(&self) -> &ForceAccumulator {
        &self.external_force
    }

    /// Mean of the current vertex positions.
    pub fn centroid(&self) -> Vector3<f64> {
        let n = self.state.num_vertices();
        if n == 0 {
            return Vector3::zeros();
        }
        self.state.positions().iter().sum::<Vector3<f64>>() / n as f64
    }

    /*
     * Time integration
     */

    /// Predict positions from velocities, gravity and the accumulated external force.
    ///
    /// The external force is distributed over the free mass of the body and then cleared.
    pub fn integrate_position(&mut self, dt: f64, gravity: Vector3<f64>) {
        let force = self.external_force.take();
        let mass = self.state.total_free_mass();
        let extra = if mass > 0.0 {
            force / mass
        } else {
            Vector3::zeros()
        };
        self.state
            .integrate_position(dt, gravity, extra, self.params.viscous_damping);
    }

    pub fn update_velocity(&mut self, dt: f64) {
        self.state.update_velocity(dt);
    }

    /// Project every structural constraint once in declaration order.
    ///
    /// Returns the largest residual among the constraints that were projected.
    pub fn project_constraints(&mut self) -> Option<f64> {
        let PbdModel {
            state, constraints, ..
        } = self;
        constraints
            .iter()
            .filter_map(|c| c.solve_position(state))
            .fold(None, |max, r| Some(max.map_or(r, |m: f64| m.max(r))))
    }

    pub fn apply_projections(&mut self) {
        for p in self.projections.iter() {
            p.apply(&mut self.state);
        }
    }
}

impl BodyArena for [PbdModel] {
    fn body(&self, id: ModelId) -> &BodyState {
        &self[id.index()].state
    }
    fn body_mut(&mut self, id: ModelId) -> &mut BodyState {
        &mut self[id.index()].state
    }
}

fn validate_params(params: &ModelParams, num_vertices: usize) -> Result<(), Error> {
    let invalid = |name: &str| {
        Err(Error::InvalidParameter {
            name: name.to_string(),
        })
    };
    if !(params.uniform_mass >= 0.0) {
        return invalid("uniform_mass");
    }
    if !(0.0..=1.0).contains(&params.viscous_damping) {
        return invalid("viscous_damping");
    }
    if !(params.proximity >= 0.0) {
        return invalid("proximity");
    }
    if !(params.contact_stiffness > 0.0 && params.contact_stiffness <= 1.0) {
        return invalid("contact_stiffness");
    }
    if !params.elasticity.is_valid() {
        return invalid("elasticity");
    }
    if !params.density.is_valid() {
        return invalid("density");
    }
    if params.fixed_nodes.iter().any(|&i| i >= num_vertices) {
        return invalid("fixed_nodes");
    }
    Ok(())
}

fn validate_stiffness(stiffness: f64) -> Result<(), Error> {
    if stiffness > 0.0 && stiffness <= 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter {
            name: "stiffness".to_string(),
        })
    }
}

#[inline]
fn sorted_edge([a, b]: [usize; 2]) -> [usize; 2] {
    if a < b {
        [a, b]
    } else {
        [b, a]
    }
}

/// Local index of the triangle vertex not on the given edge.
fn opposite_vertex(tri: &[usize; 3], edge: [usize; 2]) -> Option<usize> {
    (0..3).find(|&k| tri[k] != edge[0] && tri[k] != edge[1])
}

/// Unique undirected edges in order of first appearance.
fn unique_edges(edges: impl IntoIterator<Item = [usize; 2]>) -> Vec<[usize; 2]> {
    let mut seen = AHashSet::new();
    edges
        .into_iter()
        .map(sorted_edge)
        .filter(|&e| e[0] != e[1] && seen.insert(e))
        .collect()
}

/// Faces that belong to exactly one tetrahedron, oriented outward.
fn tet_boundary(tets: &[[usize; 4]], state: &BodyState) -> Vec<[usize; 3]> {
    let faces = tets.iter().flat_map(|tet| {
        let x = tet.map(|v| *state.initial_vertex_position(v));
        let positive = (x[1] - x[0]).cross(&(x[2] - x[0])).dot(&(x[3] - x[0])) >= 0.0;
        TET_FACES.map(|[a, b, c]| {
            if positive {
                vec![tet[a], tet[b], tet[c]]
            } else {
                vec![tet[a], tet[c], tet[b]]
            }
        })
    });
    boundary_faces(faces)
        .into_iter()
        .map(|f| [f[0], f[1], f[2]])
        .collect()
}

/// Quadrilateral faces that belong to exactly one hexahedron, oriented outward and split into
/// triangles.
fn hex_boundary(hexes: &[[usize; 8]], state: &BodyState) -> Vec<[usize; 3]> {
    let faces = hexes.iter().flat_map(|hex| {
        let x = hex.map(|v| *state.initial_vertex_position(v));
        // Sign of the jacobian at the centre follows the triple product of the axis averages.
        let dx = (x[1] + x[2] + x[5] + x[6]) - (x[0] + x[3] + x[4] + x[7]);
        let dy = (x[2] + x[3] + x[6] + x[7]) - (x[0] + x[1] + x[4] + x[5]);
        let dz = (x[4] + x[5] + x[6] + x[7]) - (x[0] + x[1] + x[2] + x[3]);
        let positive = dx.cross(&dy).dot(&dz) >= 0.0;
        HEX_FACES.map(|[a, b, c, d]| {
            if positive {
                vec![hex[a], hex[b], hex[c], hex[d]]
            } else {
                vec![hex[a], hex[d], hex[c], hex[b]]
            }
        })
    });
    boundary_faces(faces)
        .into_iter()
        .flat_map(|q| [[q[0], q[1], q[2]], [q[0], q[2], q[3]]])
        .collect()
}

/// Faces occurring exactly once, in order of appearance.
fn boundary_faces(faces: impl Iterator<Item = Vec<usize>>) -> Vec<Vec<usize>> {
    let faces: Vec<_> = faces.collect();
    let mut counts: AHashMap<Vec<usize>, usize> = AHashMap::new();
    for f in faces.iter() {
        let mut key = f.clone();
        key.sort_unstable();
        *counts.entry(key).or_insert(0) += 1;
    }
    faces
        .into_iter()
        .filter(|f| {
            let mut key = f.clone();
            key.sort_unstable();
            counts.get(&key) == Some(&1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use crate::ConstraintType;
    use approx::assert_relative_eq;

    #[test]
    fn one_tet_topology() -> Result<(), Error> {
        let model = PbdModel::from_tetmesh(&make_one_tet_mesh(), ModelParams::default())?;
        assert_eq!(model.surface_triangles().len(), 4);
        assert_eq!(model.surface_edges().len(), 6);
        // Every boundary triangle faces away from the centroid.
        let c = model.centroid();
        for tri in model.surface_triangles() {
            let x = tri.map(|v| *model.state().vertex_position(v));
            let n = (x[1] - x[0]).cross(&(x[2] - x[0]));
            assert!(n.dot(&(x[0] - c)) > 0.0);
        }
        Ok(())
    }

    #[test]
    fn three_tet_interior_faces_are_removed() -> Result<(), Error> {
        let mesh = make_three_tet_mesh();
        let model = PbdModel::from_tetmesh(&mesh, ModelParams::default())?;
        // Three tets have 12 faces, two of which are shared.
        assert_eq!(model.surface_triangles().len(), 8);
        Ok(())
    }

    #[test]
    fn box_surface_faces_outward() -> Result<(), Error> {
        let mesh = make_box_tetmesh(2);
        let model = PbdModel::from_tetmesh(&mesh, ModelParams::default())?;
        // 6 sides of 2x2 quads split into two triangles each.
        assert_eq!(model.surface_triangles().len(), 48);
        let c = model.centroid();
        for tri in model.surface_triangles() {
            let x = tri.map(|v| *model.state().vertex_position(v));
            let n = (x[1] - x[0]).cross(&(x[2] - x[0]));
            let mid = (x[0] + x[1] + x[2]) / 3.0;
            assert!(n.dot(&(mid - c)) > 0.0);
        }
        Ok(())
    }

    #[test]
    fn hex_surface() -> Result<(), Error> {
        let (positions, hexes) = make_hex_block(2, 1, 1);
        let model = PbdModel::from_hexahedra(positions, hexes, ModelParams::default())?;
        // 10 boundary quads.
        assert_eq!(model.surface_triangles().len(), 20);
        let c = model.centroid();
        for tri in model.surface_triangles() {
            let x = tri.map(|v| *model.state().vertex_position(v));
            let n = (x[1] - x[0]).cross(&(x[2] - x[0]));
            let mid = (x[0] + x[1] + x[2]) / 3.0;
            assert!(n.dot(&(mid - c)) > 0.0);
        }
        Ok(())
    }

    #[test]
    fn constraint_counts() -> Result<(), Error> {
        let mut model = PbdModel::from_tetmesh(&make_one_tet_mesh(), ModelParams::default())?;
        assert_eq!(model.init_distance_constraints(1.0)?, 6);
        assert_eq!(model.init_volume_constraints(1.0)?, 1);
        assert_eq!(model.init_fem_constraints(FemMaterial::StVK)?, 1);
        assert!(matches!(
            model.init_area_constraints(1.0),
            Err(Error::MeshTypeMismatch { .. })
        ));
        assert_eq!(model.constraints().len(), 8);

        let mut cloth = PbdModel::from_trimesh(&make_grid_trimesh(2, 2), ModelParams::default())?;
        // A 2x2 grid has 9 vertices, 8 triangles and 16 edges, 8 of them interior.
        assert_eq!(cloth.init_distance_constraints(0.5)?, 16);
        assert_eq!(cloth.init_area_constraints(1.0)?, 8);
        assert_eq!(cloth.init_dihedral_constraints(0.1)?, 8);
        assert!(matches!(
            cloth.init_volume_constraints(1.0),
            Err(Error::MeshTypeMismatch { .. })
        ));
        Ok(())
    }

    #[test]
    fn degenerate_elements_are_reported() {
        let mesh = TetMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2, 3]],
        );
        let mut model = PbdModel::from_tetmesh(&mesh, ModelParams::default()).unwrap();
        match model.init_fem_constraints(FemMaterial::NeoHookean) {
            Err(Error::DegenerateReferenceElement { degens }) => assert_eq!(degens, vec![0]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(model.constraints().is_empty());
    }

    #[test]
    fn invalid_params() {
        let mesh = make_one_tet_mesh();
        let params = ModelParams {
            fixed_nodes: vec![7],
            ..ModelParams::default()
        };
        assert!(matches!(
            PbdModel::from_tetmesh(&mesh, params),
            Err(Error::InvalidParameter { .. })
        ));
        let params = ModelParams {
            viscous_damping: 1.5,
            ..ModelParams::default()
        };
        assert!(PbdModel::from_tetmesh(&mesh, params).is_err());
        assert!(matches!(
            PbdModel::from_hexahedra(
                vec![[0.0; 3]; 3],
                vec![[0, 1, 2, 3, 4, 5, 6, 7]],
                ModelParams::default()
            ),
            Err(Error::SizeMismatch)
        ));
    }

    #[test]
    fn external_force_is_consumed_by_prediction() -> Result<(), Error> {
        let mut model = PbdModel::new(vec![[0.0; 3], [1.0, 0.0, 0.0]], ModelParams::default())?;
        model.external_force().add(Vector3::new(4.0, 0.0, 0.0));
        model.integrate_position(0.5, Vector3::zeros());
        // Acceleration is 4 / 2 on each vertex.
        assert_relative_eq!(model.state().velocities()[0], Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(model.external_force().get(), Vector3::zeros());
        Ok(())
    }

    #[test]
    fn constant_density_on_particles() -> Result<(), Error> {
        // A 3x3x3 lattice packed more densely than the rest density.
        let positions: Vec<_> = (0..27)
            .map(|i| [(i % 3) as f64, ((i / 3) % 3) as f64, (i / 9) as f64].map(|x| x * 0.02))
            .collect();
        let params = ModelParams {
            density: DensityParameters {
                rest_density: 1000.0,
                ..DensityParameters::default()
            },
            ..ModelParams::default()
        };
        let mut model = PbdModel::new(positions, params)?;
        assert!(model.init_constant_density_constraint(0.0).is_err());
        assert_eq!(model.init_constant_density_constraint(1.0)?, 1);
        assert_eq!(model.constraints()[0].constraint_type(), ConstraintType::ConstantDensity);
        assert_eq!(model.constraints()[0].vertices().len(), 27);

        let first = model.project_constraints().unwrap();
        assert!(first > 0.0);
        for _ in 0..10 {
            model.project_constraints();
        }
        assert!(model.project_constraints().unwrap() < first);

        let empty = ModelParams::default();
        assert!(PbdModel::new(Vec::new(), empty)?
            .init_constant_density_constraint(1.0)
            .is_err());
        let bad = ModelParams {
            density: DensityParameters {
                kernel_radius: 0.0,
                ..DensityParameters::default()
            },
            ..ModelParams::default()
        };
        assert!(PbdModel::new(vec![[0.0; 3]], bad).is_err());
        Ok(())
    }

    #[test]
    fn pinned_vertex_returns_to_rest() -> Result<(), Error> {
        let mut model = PbdModel::new(vec![[0.0, 1.0, 0.0]], ModelParams::default())?;
        model.pin_vertex(0)?;
        *model.state_mut().vertex_position_mut(0) = Vector3::new(3.0, 3.0, 3.0);
        model.apply_projections();
        assert_eq!(*model.state().vertex_position(0), Vector3::new(0.0, 1.0, 0.0));
        assert!(model.pin_vertex(1).is_err());
        Ok(())
    }
}
