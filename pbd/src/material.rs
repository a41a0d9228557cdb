//! Elastic material laws used by the FEM constraints.

use crate::EPS;
use na::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElasticityParameters {
    /// First Lame parameter. Measured in Pa = N/m² = kg/(ms²).
    pub lambda: f64,
    /// Second Lame parameter. Measured in Pa = N/m² = kg/(ms²).
    pub mu: f64,
}

impl ElasticityParameters {
    pub fn scaled(self, scale: f64) -> ElasticityParameters {
        ElasticityParameters {
            lambda: self.lambda * scale,
            mu: self.mu * scale,
        }
    }

    /// Bulk modulus measures the material's resistance to expansion and compression, i.e. its
    /// incompressibility. The larger the value, the more incompressible the material is.
    /// Think of this as "Volume Stiffness".
    /// Shear modulus measures the material's resistance to shear deformation. The larger the
    /// value, the more it resists changes in shape. Think of this as "Shape Stiffness".
    pub fn from_bulk_shear(bulk: f64, shear: f64) -> Self {
        ElasticityParameters {
            lambda: bulk - 2.0 * shear / 3.0,
            mu: shear,
        }
    }

    pub fn from_young_poisson(young: f64, poisson: f64) -> Self {
        ElasticityParameters {
            lambda: young * poisson / ((1.0 + poisson) * (1.0 - 2.0 * poisson)),
            mu: young / (2.0 * (1.0 + poisson)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mu >= 0.0 && self.lambda.is_finite() && self.mu.is_finite()
    }
}

impl Default for ElasticityParameters {
    fn default() -> Self {
        ElasticityParameters::from_young_poisson(1000.0, 0.3)
    }
}

/// SPH parameters of a particle fluid.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityParameters {
    /// Support radius of the smoothing kernels. Particles farther apart do not interact.
    pub kernel_radius: f64,
    /// Target density in kernel units.
    pub rest_density: f64,
    /// Regularization added to the denominator of the density multipliers.
    pub relaxation: f64,
}

impl DensityParameters {
    pub fn is_valid(&self) -> bool {
        self.kernel_radius > 0.0
            && self.kernel_radius.is_finite()
            && self.rest_density > 0.0
            && self.rest_density.is_finite()
            && self.relaxation >= 0.0
            && self.relaxation.is_finite()
    }
}

impl Default for DensityParameters {
    fn default() -> Self {
        DensityParameters {
            kernel_radius: 0.2,
            rest_density: 6378.0,
            relaxation: 600.0,
        }
    }
}

/// Constitutive model of an FEM element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FemMaterial {
    /// Small strain linear elasticity.
    Linear,
    /// Linear elasticity in the rotated frame of the polar decomposition.
    Corotational,
    /// St. Venant-Kirchhoff.
    StVK,
    NeoHookean,
}

impl Default for FemMaterial {
    fn default() -> Self {
        FemMaterial::StVK
    }
}

impl FemMaterial {
    /// Evaluate the energy density `Ψ(F)` and the first Piola-Kirchhoff stress `P(F)`.
    ///
    /// Returns `None` when the deformation gradient is outside the domain of the material law
    /// (inverted for Neo-Hookean, singular for co-rotational).
    #[allow(non_snake_case)]
    pub fn energy_and_stress(
        self,
        F: &Matrix3<f64>,
        params: ElasticityParameters,
    ) -> Option<(f64, Matrix3<f64>)> {
        let ElasticityParameters { lambda, mu } = params;
        let I = Matrix3::identity();
        match self {
            FemMaterial::Linear => {
                let eps = (F + F.transpose()) * 0.5 - I;
                let tr = eps.trace();
                let psi = mu * eps.norm_squared() + 0.5 * lambda * tr * tr;
                let P = eps * (2.0 * mu) + I * (lambda * tr);
                Some((psi, P))
            }
            FemMaterial::StVK => {
                let E = (F.transpose() * F - I) * 0.5;
                let tr = E.trace();
                let psi = mu * E.norm_squared() + 0.5 * lambda * tr * tr;
                let P = F * (E * (2.0 * mu) + I * (lambda * tr));
                Some((psi, P))
            }
            FemMaterial::Corotational => {
                let svd = F.svd(true, true);
                let mut U = svd.u?;
                let V_t = svd.v_t?;
                let mut sigma = svd.singular_values;
                // Keep R a proper rotation by flipping the smallest singular direction.
                if (U * V_t).determinant() < 0.0 {
                    let k = sigma.imin();
                    U.column_mut(k).neg_mut();
                    sigma[k] = -sigma[k];
                }
                if sigma.iter().any(|s| s.abs() < EPS) {
                    return None;
                }
                let R = U * V_t;
                let J = sigma.product();
                let sigma_inv = Vector3::new(1.0 / sigma[0], 1.0 / sigma[1], 1.0 / sigma[2]);
                let F_inv_tr = U * Matrix3::from_diagonal(&sigma_inv) * V_t;
                let psi = mu * (F - R).norm_squared() + 0.5 * lambda * (J - 1.0) * (J - 1.0);
                let P = (F - R) * (2.0 * mu) + F_inv_tr * (lambda * (J - 1.0) * J);
                Some((psi, P))
            }
            FemMaterial::NeoHookean => {
                let J = F.determinant();
                if J <= 0.0 {
                    return None;
                }
                let F_inv_tr = F.try_inverse()?.transpose();
                let logJ = J.ln();
                let psi =
                    0.5 * mu * (F.norm_squared() - 3.0) - mu * logJ + 0.5 * lambda * logJ * logJ;
                let P = (F - F_inv_tr) * mu + F_inv_tr * (lambda * logJ);
                Some((psi, P))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ALL: [FemMaterial; 4] = [
        FemMaterial::Linear,
        FemMaterial::Corotational,
        FemMaterial::StVK,
        FemMaterial::NeoHookean,
    ];

    #[test]
    fn young_poisson_conversion() {
        let p = ElasticityParameters::from_young_poisson(1000.0, 0.25);
        assert_relative_eq!(p.mu, 400.0, max_relative = 1e-12);
        assert_relative_eq!(p.lambda, 400.0, max_relative = 1e-12);
        let q = ElasticityParameters::from_bulk_shear(1000.0, 300.0);
        assert_relative_eq!(q.lambda, 800.0, max_relative = 1e-12);
    }

    #[test]
    fn identity_is_stress_free() {
        let params = ElasticityParameters::default();
        for mat in ALL.iter() {
            let (psi, p) = mat
                .energy_and_stress(&Matrix3::identity(), params)
                .unwrap();
            assert_relative_eq!(psi, 0.0, epsilon = 1e-10);
            assert_relative_eq!(p.norm(), 0.0, epsilon = 1e-10);
        }
    }

    /// Compare the stress against a central difference of the energy density.
    #[allow(non_snake_case)]
    #[test]
    fn stress_is_energy_derivative() {
        let params = ElasticityParameters {
            lambda: 2.0,
            mu: 3.0,
        };
        let F = Matrix3::new(1.1, 0.05, 0.0, -0.02, 0.95, 0.1, 0.03, 0.0, 1.2);
        let h = 1e-6;
        for mat in ALL.iter() {
            let (_, P) = mat.energy_and_stress(&F, params).unwrap();
            for r in 0..3 {
                for c in 0..3 {
                    let mut Fp = F;
                    let mut Fm = F;
                    Fp[(r, c)] += h;
                    Fm[(r, c)] -= h;
                    let (psi_p, _) = mat.energy_and_stress(&Fp, params).unwrap();
                    let (psi_m, _) = mat.energy_and_stress(&Fm, params).unwrap();
                    let fd = (psi_p - psi_m) / (2.0 * h);
                    assert_relative_eq!(P[(r, c)], fd, epsilon = 1e-5, max_relative = 1e-4);
                }
            }
        }
    }

    #[test]
    fn inverted_neo_hookean_is_rejected() {
        let f = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        assert!(FemMaterial::NeoHookean
            .energy_and_stress(&f, ElasticityParameters::default())
            .is_none());
    }

    #[test]
    fn singular_corotational_is_rejected() {
        let f = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, 0.0));
        assert!(FemMaterial::Corotational
            .energy_and_stress(&f, ElasticityParameters::default())
            .is_none());
    }
}
