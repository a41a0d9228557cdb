//! Energy based FEM constraints for tetrahedral and hexahedral elements.
//!
//! The constraint value is the element strain energy `C = V Ψ(F)` and the projection drives it
//! toward zero along the energy gradient.

use crate::constraint::{
    apply_correction, gather, gather_initial, is_degenerate, weighted_gradient_norm,
};
use crate::{BodyState, ElasticityParameters, FemMaterial, PositionConstraint, EPS};
use na::{Matrix3, Vector3};

/// Tetrahedral FEM constraint.
#[derive(Clone, Debug, PartialEq)]
pub struct FemTetConstraint {
    pub vertices: [usize; 4],
    /// Rest volume of the element.
    pub volume: f64,
    /// Inverse of the rest shape matrix with columns `(p0 - p3, p1 - p3, p2 - p3)`.
    pub inv_rest_matrix: Matrix3<f64>,
    pub material: FemMaterial,
    pub elasticity: ElasticityParameters,
}

fn tet_shape_matrix(x: &[Vector3<f64>; 4]) -> Matrix3<f64> {
    Matrix3::from_columns(&[x[0] - x[3], x[1] - x[3], x[2] - x[3]])
}

/// Whether the determinant is negligible relative to the product of the column lengths, which
/// is independent of the element size.
fn is_flat(m: &Matrix3<f64>) -> bool {
    let scale: f64 = m.column_iter().map(|c| c.norm()).product();
    !(m.determinant().abs() > EPS * scale)
}

impl FemTetConstraint {
    /// Build the constraint from the initial configuration.
    ///
    /// Returns `None` if the reference element is degenerate.
    pub fn new(
        state: &BodyState,
        vertices: [usize; 4],
        material: FemMaterial,
        elasticity: ElasticityParameters,
    ) -> Option<Self> {
        let mut c = FemTetConstraint {
            vertices,
            volume: 0.0,
            inv_rest_matrix: Matrix3::identity(),
            material,
            elasticity,
        };
        if c.reset(state) {
            Some(c)
        } else {
            None
        }
    }

    /// Recompute rest data, returning `false` if the reference element is degenerate.
    #[allow(non_snake_case)]
    pub fn reset(&mut self, state: &BodyState) -> bool {
        let Dm = tet_shape_matrix(&gather_initial(state, &self.vertices));
        if is_flat(&Dm) {
            return false;
        }
        let det = Dm.determinant();
        match Dm.try_inverse() {
            Some(inv) => {
                self.inv_rest_matrix = inv;
                self.volume = det.abs() / 6.0;
                true
            }
            None => false,
        }
    }

    /// Deformation gradient of the element in the current configuration.
    pub fn deformation_gradient(&self, state: &BodyState) -> Matrix3<f64> {
        tet_shape_matrix(&gather(state, &self.vertices)) * self.inv_rest_matrix
    }
}

impl PositionConstraint for FemTetConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    #[allow(non_snake_case)]
    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let F = self.deformation_gradient(state);
        let (psi, P) = match self.material.energy_and_stress(&F, self.elasticity) {
            Some(r) => r,
            None => {
                log::trace!("Skipping tet outside material domain: {:?}", self.vertices);
                return None;
            }
        };

        let H = P * self.inv_rest_matrix.transpose() * self.volume;
        let g0 = H.column(0).into_owned();
        let g1 = H.column(1).into_owned();
        let g2 = H.column(2).into_owned();
        let grads = [g0, g1, g2, -(g0 + g1 + g2)];

        let sum = weighted_gradient_norm(state, &self.vertices, &grads);
        if is_degenerate(sum, 0.0) {
            return None;
        }
        let c = self.volume * psi;
        apply_correction(state, &self.vertices, &grads, c / sum);
        Some(c.abs())
    }
}

/// Natural coordinates of the hexahedron nodes in VTK order: bottom face counter-clockwise
/// followed by the top face.
const HEX_NODES: [[f64; 3]; 8] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [1.0, 1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
    [1.0, -1.0, 1.0],
    [1.0, 1.0, 1.0],
    [-1.0, 1.0, 1.0],
];

/// Hexahedral FEM constraint with trilinear shape functions evaluated at the element centre.
#[derive(Clone, Debug, PartialEq)]
pub struct FemHexConstraint {
    pub vertices: [usize; 8],
    /// Rest volume of the element.
    pub volume: f64,
    /// Material space gradients of the shape functions at the element centre.
    pub shape_gradients: [Vector3<f64>; 8],
    pub material: FemMaterial,
    pub elasticity: ElasticityParameters,
}

impl FemHexConstraint {
    /// Build the constraint from the initial configuration.
    ///
    /// Returns `None` if the reference element is degenerate.
    pub fn new(
        state: &BodyState,
        vertices: [usize; 8],
        material: FemMaterial,
        elasticity: ElasticityParameters,
    ) -> Option<Self> {
        let mut c = FemHexConstraint {
            vertices,
            volume: 0.0,
            shape_gradients: [Vector3::zeros(); 8],
            material,
            elasticity,
        };
        if c.reset(state) {
            Some(c)
        } else {
            None
        }
    }

    /// Recompute rest data, returning `false` if the reference element is degenerate.
    pub fn reset(&mut self, state: &BodyState) -> bool {
        let x = gather_initial(state, &self.vertices);
        // Derivatives of the trilinear shape functions at the centre are xi_a / 8.
        let dn_dxi = HEX_NODES.map(|xi| Vector3::from(xi) * 0.125);
        let jac = x
            .iter()
            .zip(dn_dxi.iter())
            .fold(Matrix3::zeros(), |acc, (x, dn)| acc + x * dn.transpose());
        if is_flat(&jac) {
            return false;
        }
        let det = jac.determinant();
        let jac_inv_tr = match jac.try_inverse() {
            Some(inv) => inv.transpose(),
            None => return false,
        };
        self.shape_gradients = dn_dxi.map(|dn| jac_inv_tr * dn);
        self.volume = 8.0 * det.abs();
        true
    }

    /// Deformation gradient at the element centre in the current configuration.
    pub fn deformation_gradient(&self, state: &BodyState) -> Matrix3<f64> {
        gather(state, &self.vertices)
            .iter()
            .zip(self.shape_gradients.iter())
            .fold(Matrix3::zeros(), |acc, (x, dn)| acc + x * dn.transpose())
    }
}

impl PositionConstraint for FemHexConstraint {
    fn vertices(&self) -> &[usize] {
        &self.vertices
    }

    #[allow(non_snake_case)]
    fn solve_position(&self, state: &mut BodyState) -> Option<f64> {
        let F = self.deformation_gradient(state);
        let (psi, P) = match self.material.energy_and_stress(&F, self.elasticity) {
            Some(r) => r,
            None => {
                log::trace!("Skipping hex outside material domain: {:?}", self.vertices);
                return None;
            }
        };

        let PV = P * self.volume;
        let grads = self.shape_gradients.map(|dn| PV * dn);
        let sum = weighted_gradient_norm(state, &self.vertices, &grads);
        if is_degenerate(sum, 0.0) {
            return None;
        }
        let c = self.volume * psi;
        apply_correction(state, &self.vertices, &grads, c / sum);
        Some(c.abs())
    }
}
