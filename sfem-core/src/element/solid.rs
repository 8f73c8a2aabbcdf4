//! 3D solids: 4-node tetrahedron (Tet4) and 8-node hexahedron (Hex8).
//!
//! Three dofs per node (u, v, w). Strains in Voigt order
//! `[εxx, εyy, εzz, γxy, γxz, γyz]`; Tet4 is a constant strain element,
//! Hex8 is the trilinear brick integrated with 2×2×2 Gauss points.

use crate::element::shape::{Shape, ShapeKind};
use crate::element::{physical_gradients, ElementParameters, FiniteElement};
use crate::error::{Error, Result};
use crate::material::Material;
use nalgebra::{DMatrix, DVector};

/// Linear isoparametric solid element.
#[derive(Debug, Clone)]
pub struct Solid {
    shape: Shape,
    material: Material,
}

impl Solid {
    /// Create an element of `kind` on nodal coordinates `x` (n × 3).
    pub fn new(kind: ShapeKind, x: &DMatrix<f64>, params: &ElementParameters) -> Result<Self> {
        if !matches!(kind, ShapeKind::Tet4 | ShapeKind::Hex8) {
            return Err(Error::Config(format!("solid element cannot use {:?} shape", kind)));
        }
        Ok(Self {
            shape: Shape::new(kind, x)?,
            material: params.material,
        })
    }

    /// Strain-displacement matrix (6 × 3n) from physical derivatives `g` (3 × n).
    pub(crate) fn strain_displacement(g: &DMatrix<f64>) -> DMatrix<f64> {
        let n = g.ncols();
        let mut b = DMatrix::zeros(6, 3 * n);

        for j in 0..n {
            let col = j * 3;
            let (dx, dy, dz) = (g[(0, j)], g[(1, j)], g[(2, j)]);

            // ε_xx = ∂u/∂x
            b[(0, col)] = dx;
            // ε_yy = ∂v/∂y
            b[(1, col + 1)] = dy;
            // ε_zz = ∂w/∂z
            b[(2, col + 2)] = dz;
            // γ_xy = ∂u/∂y + ∂v/∂x
            b[(3, col)] = dy;
            b[(3, col + 1)] = dx;
            // γ_xz = ∂u/∂z + ∂w/∂x
            b[(4, col)] = dz;
            b[(4, col + 2)] = dx;
            // γ_yz = ∂v/∂z + ∂w/∂y
            b[(5, col + 1)] = dz;
            b[(5, col + 2)] = dy;
        }

        b
    }
}

impl FiniteElement for Solid {
    fn n_nodes(&self) -> usize {
        self.shape.size()
    }

    fn dofs_per_node(&self) -> usize {
        3
    }

    fn n_results(&self) -> usize {
        12
    }

    fn stiffness(&self) -> Result<DMatrix<f64>> {
        let d = self.material.constitutive_3d();
        let n_dofs = self.n_dofs();
        let mut k = DMatrix::zeros(n_dofs, n_dofs);

        for (i, gp) in self.shape.points().iter().enumerate() {
            let (g, det_j) = physical_gradients(&self.shape, i)?;
            let b = Self::strain_displacement(&g);

            // K += Bᵀ D B |J| w
            let db = d * &b;
            k += b.transpose() * db * (det_j.abs() * gp.weight);
        }

        Ok(k)
    }

    fn calculate(&self, u: &DVector<f64>) -> DMatrix<f64> {
        let d = self.material.constitutive_3d();
        let n = self.n_nodes();
        let mut res = DMatrix::zeros(12, n);

        for i in 0..n {
            let b = Self::strain_displacement(&self.shape.nodal_gradients(i));
            let strain = &b * u;
            let stress = d * &strain;
            for r in 0..6 {
                res[(r, i)] = strain[r];
                res[(r + 6, i)] = stress[r];
            }
        }

        res
    }
}
