//! Meshes and parameter presets shared by unit tests, integration tests and benchmarks.

use crate::{ModelParams, SimParams, TetMesh, TriMesh};
use geo::mesh::VertexPositions;

/*
 * Setup code
 */

pub const STATIC_PARAMS: SimParams = SimParams {
    time_step: 0.01,
    gravity: [0.0, 0.0, 0.0],
    max_iterations: 20,
    tolerance: 0.0,
};

pub const DYNAMIC_PARAMS: SimParams = SimParams {
    gravity: [0.0, -9.81, 0.0],
    ..STATIC_PARAMS
};

/// Light bodies used by the stress tests and benchmarks.
pub fn soft_model_params() -> ModelParams {
    ModelParams {
        uniform_mass: 0.1,
        ..ModelParams::default()
    }
}

pub fn make_one_tet_mesh() -> TetMesh {
    let verts = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
    ];
    TetMesh::new(verts, vec![[0, 2, 1, 3]])
}

pub fn make_one_deformed_tet_mesh() -> TetMesh {
    let mut mesh = make_one_tet_mesh();
    mesh.vertex_positions_mut()[3][2] = 2.0;
    mesh
}

pub fn make_three_tet_mesh() -> TetMesh {
    let verts = vec![
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 0.0, 2.0],
        [1.0, 0.0, 2.0],
    ];
    TetMesh::new(verts, vec![[5, 2, 4, 0], [3, 2, 5, 0], [1, 0, 3, 5]])
}

/// A unit cube split into `n` cells per side, each cell cut into six tetrahedra around its
/// main diagonal.
pub fn make_box_tetmesh(n: usize) -> TetMesh {
    assert!(n > 0);
    let h = 1.0 / n as f64;
    let m = n + 1;
    let idx = |i: usize, j: usize, k: usize| i + m * (j + m * k);

    let mut verts = Vec::with_capacity(m * m * m);
    for k in 0..m {
        for j in 0..m {
            for i in 0..m {
                verts.push([i as f64 * h, j as f64 * h, k as f64 * h]);
            }
        }
    }

    // Axis orders for the six monotone paths from the low corner to the high corner.
    const PATHS: [[usize; 3]; 6] = [
        [0, 1, 2],
        [0, 2, 1],
        [1, 0, 2],
        [1, 2, 0],
        [2, 0, 1],
        [2, 1, 0],
    ];

    let mut tets = Vec::with_capacity(6 * n * n * n);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                for path in PATHS.iter() {
                    let mut corner = [i, j, k];
                    let mut tet = [idx(i, j, k); 4];
                    for (step, &axis) in path.iter().enumerate() {
                        corner[axis] += 1;
                        tet[step + 1] = idx(corner[0], corner[1], corner[2]);
                    }
                    tets.push(tet);
                }
            }
        }
    }
    TetMesh::new(verts, tets)
}

/// A block of `nx` by `ny` by `nz` unit hexahedra with vertices in VTK order.
pub fn make_hex_block(nx: usize, ny: usize, nz: usize) -> (Vec<[f64; 3]>, Vec<[usize; 8]>) {
    let idx = |i: usize, j: usize, k: usize| i + (nx + 1) * (j + (ny + 1) * k);

    let mut verts = Vec::with_capacity((nx + 1) * (ny + 1) * (nz + 1));
    for k in 0..=nz {
        for j in 0..=ny {
            for i in 0..=nx {
                verts.push([i as f64, j as f64, k as f64]);
            }
        }
    }

    let mut hexes = Vec::with_capacity(nx * ny * nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                hexes.push([
                    idx(i, j, k),
                    idx(i + 1, j, k),
                    idx(i + 1, j + 1, k),
                    idx(i, j + 1, k),
                    idx(i, j, k + 1),
                    idx(i + 1, j, k + 1),
                    idx(i + 1, j + 1, k + 1),
                    idx(i, j + 1, k + 1),
                ]);
            }
        }
    }
    (verts, hexes)
}

/// A unit square in the xz-plane split into `nx` by `nz` cells of two triangles each.
///
/// Triangle normals point along +y.
pub fn make_grid_trimesh(nx: usize, nz: usize) -> TriMesh {
    let idx = |i: usize, k: usize| i + (nx + 1) * k;

    let mut verts = Vec::with_capacity((nx + 1) * (nz + 1));
    for k in 0..=nz {
        for i in 0..=nx {
            verts.push([i as f64 / nx as f64, 0.0, k as f64 / nz as f64]);
        }
    }

    let mut tris = Vec::with_capacity(2 * nx * nz);
    for k in 0..nz {
        for i in 0..nx {
            let v00 = idx(i, k);
            let v10 = idx(i + 1, k);
            let v01 = idx(i, k + 1);
            let v11 = idx(i + 1, k + 1);
            tris.push([v00, v01, v11]);
            tris.push([v00, v11, v10]);
        }
    }
    TriMesh::new(verts, tris)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::mesh::topology::{NumCells, NumFaces, NumVertices};

    #[test]
    fn mesh_sizes() {
        let mesh = make_box_tetmesh(2);
        assert_eq!(mesh.num_vertices(), 27);
        assert_eq!(mesh.num_cells(), 48);

        let (verts, hexes) = make_hex_block(2, 1, 1);
        assert_eq!(verts.len(), 12);
        assert_eq!(hexes.len(), 2);

        let grid = make_grid_trimesh(3, 2);
        assert_eq!(grid.num_vertices(), 12);
        assert_eq!(grid.num_faces(), 12);
    }
}
