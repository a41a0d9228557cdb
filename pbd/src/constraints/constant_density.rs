//! Incompressibility constraint for particle fluids.
//!
//! One constraint covers every particle of a body. Densities are estimated with SPH kernels over
//! the neighbours found in a uniform grid, and all particles are moved together in a Jacobi step
//! that pushes each density toward the rest density.

use crate::{BodyState, DensityParameters, PositionConstraint};
use ahash::AHashMap;
use na::Vector3;
use rayon::prelude::*;
use std::f64::consts::PI;

#[derive(Clone, Debug, PartialEq)]
pub struct ConstantDensityConstraint {
    /// Particles of the fluid. Neighbour lists and per particle buffers are indexed by position
    /// in this list.
    pub vertices: Vec<usize>,
    pub params: DensityParameters,
    pub stiffness: f64,
    poly6_coeff: f64,
    spiky_coeff: f64,
}

impl ConstantDensityConstraint {
    /// Constrain every particle of the given state.
    pub fn new(state: &BodyState, params: DensityParameters, stiffness: f64) -> Self {
        let h = params.kernel_radius;
        ConstantDensityConstraint {
            vertices: (0..state.num_vertices()).collect(),
            params,
            stiffness,
            poly6_coeff: 315.0 / (64.0 * PI * h.powi(9)),
            spiky_coeff: 15.0 / (PI * h.powi(6)),
        }
    }

    /// Poly6 density kernel.
    #[inline]
    fn poly6(&self, r: &Vector3<f64>) -> f64 {
        let h2 = self.params.kernel_radius * self.params.kernel_radius;
        let r2 = r.norm_squared();
        if r2 >= h2 {
            0.0
        } else {
            self.poly6_coeff * (h2 - r2).powi(3)
        }
    }

    /// Gradient of the spiky kernel with respect to the first particle, where `r = x_i - x_j`.
    #[inline]
    fn spiky_gradient(&self, r: &Vector3<f64>) -> Vector3<f64> {
        let h = self.params.kernel_radius;
        let len = r.norm();
        if !(len > 0.0) || len >= h {
            return Vector3::zeros();
        }
        r * (-3.0 * self.spiky_coeff * (h - len).powi(2) / len)
    }

    fn cell(&self, x: &Vector3<f64>) -> [i64; 3] {
        let h = self.params.kernel_radius;
        [
            (x[0] / h).floor() as i64,
            (x[1] / h).floor() as i64,
            (x[2] / h).floor() as i64,
        ]
    }

    /// Particles within the kernel radius of each particle, sorted by their position in
    /// `vertices`.
    pub fn neighbors(&self, state: &BodyState) -> Vec<Vec<usize>> {
        let h = self.params.kernel_radius;
        let mut grid: AHashMap<[i64; 3], Vec<usize>> = AHashMap::new();
        for (k, &v) in self.vertices.iter().enumerate() {
            grid.entry(self.cell(state.vertex_position(v)))
                .or_default()
                .push(k);
        }

        self.vertices
            .par_iter()
            .enumerate()
            .map(|(k, &v)| {
                let x = state.vertex_position(v);
                let [i, j, l] = self.cell(x);
                let mut nbrs = Vec::new();
                for di in -1..=1 {
                    for dj in -1..=1 {
                        for dl in -1..=1 {
                            if let Some(bucket) = grid.get(&[i + di, j + dj, l + dl]) {
                                nbrs.extend(bucket.iter().copied().filter(|&m| {
                                    m != k
                                        && (state.vertex_position(self.vertices[m]) - x).norm() < h
                                }));
                            }
                        }
                    }
                }
                nbrs.sort_unstable();
                nbrs
            })
            .collect()
    }

    /// Kernel density estimate of every particle from its neighbours.
    pub fn densities(&self, state: &BodyState, neighbors: &[Vec<usize>]) -> Vec<f64> {
        self.vertices
            .par_iter()
            .zip(neighbors.par_iter())
            .map(|(&v, nbrs)| {
                let x = state.vertex_position(v);
                nbrs.iter()
                    .map(|&m| self.poly6(&(x - state.vertex_position(self.vertices[m]))))
                    .sum()
            })
            .collect()
    }
}

impl PositionConstraint for ConstantDensityConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    /// Returns the largest `|ρ/ρ₀ - 1|` among particles that have neighbours.
    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let rest_density = self.params.rest_density;
        let neighbors = self.neighbors(state);
        if neighbors.iter().all(Vec::is_empty) {
            return None;
        }
        let densities = self.densities(state, &neighbors);

        let residual = densities
            .iter()
            .zip(neighbors.iter())
            .filter(|(_, nbrs)| !nbrs.is_empty())
            .map(|(&rho, _)| (rho / rest_density - 1.0).abs())
            .fold(0.0, f64::max);

        let shared: &BodyState = state;
        let position = |m: usize| shared.vertex_position(self.vertices[m]);
        let lambdas: Vec<f64> = neighbors
            .par_iter()
            .enumerate()
            .map(|(k, nbrs)| {
                if nbrs.is_empty() {
                    return 0.0;
                }
                let c = densities[k] / rest_density - 1.0;
                let grad_sum: f64 = nbrs
                    .iter()
                    .map(|&m| self.spiky_gradient(&(position(k) - position(m))).norm_squared())
                    .sum();
                -c / (grad_sum / rest_density + self.params.relaxation)
            })
            .collect();

        let deltas: Vec<Vector3<f64>> = neighbors
            .par_iter()
            .enumerate()
            .map(|(k, nbrs)| {
                nbrs.iter().fold(Vector3::zeros(), |acc, &m| {
                    acc + self.spiky_gradient(&(position(k) - position(m)))
                        * (lambdas[k] + lambdas[m])
                }) * (self.stiffness / rest_density)
            })
            .collect();

        for (&v, dx) in self.vertices.iter().zip(deltas.iter()) {
            if state.inv_mass(v) > 0.0 {
                *state.vertex_position_mut(v) += dx;
            }
        }
        Some(residual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// A cube of `n³` particles with the given spacing.
    fn particle_block(n: usize, spacing: f64) -> BodyState {
        let mut positions = Vec::new();
        for i in 0..n {
            for j in 0..n {
                for k in 0..n {
                    positions.push([i as f64, j as f64, k as f64].map(|x| x * spacing));
                }
            }
        }
        BodyState::new(positions)
    }

    fn extent(state: &BodyState) -> f64 {
        let (lo, hi) = state
            .positions()
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                (lo.min(x[0]), hi.max(x[0]))
            });
        hi - lo
    }

    fn centroid(state: &BodyState) -> Vector3<f64> {
        state.positions().iter().sum::<Vector3<f64>>() / state.num_vertices() as f64
    }

    #[test]
    fn kernels_vanish_outside_support() {
        let state = particle_block(1, 1.0);
        let c = ConstantDensityConstraint::new(&state, DensityParameters::default(), 1.0);
        let h = c.params.kernel_radius;
        assert_relative_eq!(c.poly6(&Vector3::zeros()), c.poly6_coeff * h.powi(6));
        assert_eq!(c.poly6(&Vector3::new(h, 0.0, 0.0)), 0.0);
        assert_eq!(c.spiky_gradient(&Vector3::zeros()), Vector3::zeros());
        assert_eq!(c.spiky_gradient(&Vector3::new(0.0, 0.0, h)), Vector3::zeros());

        // The gradient points from the first particle toward the second.
        let g = c.spiky_gradient(&Vector3::new(0.5 * h, 0.0, 0.0));
        assert!(g[0] < 0.0);
        assert_eq!((g[1], g[2]), (0.0, 0.0));
    }

    #[test]
    fn grid_neighbors_match_brute_force() {
        let mut state = particle_block(4, 0.07);
        // Break the lattice symmetry so some pairs straddle cell boundaries.
        for (i, x) in state.positions_mut().iter_mut().enumerate() {
            x[1] += 0.013 * (i % 5) as f64;
        }
        let c = ConstantDensityConstraint::new(&state, DensityParameters::default(), 1.0);
        let h = c.params.kernel_radius;
        let nbrs = c.neighbors(&state);
        for (k, list) in nbrs.iter().enumerate() {
            let expected: Vec<usize> = (0..state.num_vertices())
                .filter(|&m| {
                    m != k && (state.positions()[m] - state.positions()[k]).norm() < h
                })
                .collect();
            assert_eq!(list, &expected);
        }
    }

    #[test]
    fn compressed_block_expands() {
        let mut state = particle_block(4, 0.02);
        let c = ConstantDensityConstraint::new(&state, DensityParameters::default(), 1.0);
        let nbrs = c.neighbors(&state);
        let densities = c.densities(&state, &nbrs);
        assert!(densities.iter().all(|&rho| rho > c.params.rest_density));

        let width = extent(&state);
        let center = centroid(&state);
        let first = c.solve_position(&mut state).unwrap();
        assert!(first > 0.0);
        for _ in 0..10 {
            c.solve_position(&mut state);
        }
        assert!(extent(&state) > width);
        // Pairwise corrections are equal and opposite.
        assert_relative_eq!(centroid(&state), center, epsilon = 1e-12);

        let nbrs = c.neighbors(&state);
        let after = c.densities(&state, &nbrs);
        assert!(after.iter().sum::<f64>() < densities.iter().sum::<f64>());
    }

    #[test]
    fn fixed_particles_do_not_move() {
        let mut state = particle_block(3, 0.02);
        state.set_fixed_point(0);
        state.set_fixed_point(13);
        let c = ConstantDensityConstraint::new(&state, DensityParameters::default(), 1.0);
        let before = state.positions().to_vec();
        assert!(c.solve_position(&mut state).is_some());
        assert_eq!(state.positions()[0], before[0]);
        assert_eq!(state.positions()[13], before[13]);
        assert_ne!(state.positions()[26], before[26]);
    }

    #[test]
    fn isolated_particles_are_noop() {
        let mut state = particle_block(3, 0.5);
        let c = ConstantDensityConstraint::new(&state, DensityParameters::default(), 1.0);
        let before = state.clone();
        assert_eq!(c.solve_position(&mut state), None);
        assert_eq!(state, before);
    }
}
