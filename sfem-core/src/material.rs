//! Isotropic linear elastic material.

use crate::error::{Error, Result};
use nalgebra::{Matrix2, Matrix3, Matrix6};

/// Material properties of one element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    /// Young's modulus E.
    pub youngs_modulus: f64,
    /// Poisson's ratio ν (dimensionless).
    pub poissons_ratio: f64,
}

impl Material {
    /// Create a new isotropic linear elastic material.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] unless E > 0 and -1 < ν < 0.5.
    pub fn new(youngs_modulus: f64, poissons_ratio: f64) -> Result<Self> {
        if !(youngs_modulus > 0.0) {
            return Err(Error::Config(format!(
                "Young's modulus must be positive, got {}",
                youngs_modulus
            )));
        }
        if !(poissons_ratio > -1.0 && poissons_ratio < 0.5) {
            return Err(Error::Config(format!(
                "Poisson's ratio must be in range (-1, 0.5), got {}",
                poissons_ratio
            )));
        }
        Ok(Self {
            youngs_modulus,
            poissons_ratio,
        })
    }

    /// Shear modulus G = E / (2(1 + ν)).
    pub fn shear_modulus(&self) -> f64 {
        self.youngs_modulus / (2.0 * (1.0 + self.poissons_ratio))
    }

    /// 3D constitutive matrix for isotropic linear elasticity.
    ///
    /// σ = D ε in Voigt notation `[xx, yy, zz, xy, xz, yz]` with engineering shear strains.
    pub fn constitutive_3d(&self) -> Matrix6<f64> {
        let e = self.youngs_modulus;
        let nu = self.poissons_ratio;

        let c11 = e * (1.0 - nu) / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let c12 = c11 * nu / (1.0 - nu);
        let c44 = c11 * (1.0 - 2.0 * nu) / (2.0 * (1.0 - nu));

        Matrix6::new(
            c11, c12, c12, 0.0, 0.0, 0.0,
            c12, c11, c12, 0.0, 0.0, 0.0,
            c12, c12, c11, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, c44, 0.0, 0.0,
            0.0, 0.0, 0.0, 0.0, c44, 0.0,
            0.0, 0.0, 0.0, 0.0, 0.0, c44,
        )
    }

    /// Plane stress constitutive matrix for `[xx, yy, xy]`.
    pub fn constitutive_plane_stress(&self) -> Matrix3<f64> {
        let e = self.youngs_modulus;
        let nu = self.poissons_ratio;

        let factor = e / (1.0 - nu * nu);

        Matrix3::new(
            factor,         factor * nu, 0.0,
            factor * nu,    factor,      0.0,
            0.0,            0.0,         factor * (1.0 - nu) / 2.0,
        )
    }

    /// Transverse shear matrix of plates and shells, G·I₂.
    pub fn constitutive_shear(&self) -> Matrix2<f64> {
        Matrix2::identity() * self.shear_modulus()
    }
}
