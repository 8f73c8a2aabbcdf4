//! Plane stress triangle (Tri3) and quadrilateral (Quad4).
//!
//! Two dofs per node (u, v). Strains are `[εxx, εyy, γxy]`:
//!
//! ```text
//! B_j = [ ∂N_j/∂x      0     ]
//!       [    0      ∂N_j/∂y  ]
//!       [ ∂N_j/∂y   ∂N_j/∂x  ]
//!
//! K = Σ_gp w · t · |J| · Bᵀ D B
//! ```

use crate::element::shape::{Shape, ShapeKind};
use crate::element::{physical_gradients, ElementParameters, FiniteElement};
use crate::error::{Error, Result};
use crate::material::Material;
use nalgebra::{DMatrix, DVector};

/// Plane stress element with linear (Tri3) or bilinear (Quad4) interpolation.
#[derive(Debug, Clone)]
pub struct PlaneStress {
    shape: Shape,
    material: Material,
    thickness: f64,
}

impl PlaneStress {
    /// Create an element of `kind` on nodal coordinates `x` (n × 2).
    pub fn new(kind: ShapeKind, x: &DMatrix<f64>, params: &ElementParameters) -> Result<Self> {
        if !matches!(kind, ShapeKind::Tri3 | ShapeKind::Quad4) {
            return Err(Error::Config(format!(
                "plane stress element cannot use {:?} shape",
                kind
            )));
        }
        Ok(Self {
            shape: Shape::new(kind, x)?,
            material: params.material,
            thickness: params.thickness,
        })
    }

    /// Strain-displacement matrix from physical derivatives `g` (2 × n).
    pub(crate) fn strain_displacement(g: &DMatrix<f64>) -> DMatrix<f64> {
        let n = g.ncols();
        let mut b = DMatrix::zeros(3, 2 * n);
        for j in 0..n {
            let col = 2 * j;
            let (dx, dy) = (g[(0, j)], g[(1, j)]);
            b[(0, col)] = dx;
            b[(1, col + 1)] = dy;
            b[(2, col)] = dy;
            b[(2, col + 1)] = dx;
        }
        b
    }
}

impl FiniteElement for PlaneStress {
    fn n_nodes(&self) -> usize {
        self.shape.size()
    }

    fn dofs_per_node(&self) -> usize {
        2
    }

    fn n_results(&self) -> usize {
        6
    }

    fn stiffness(&self) -> Result<DMatrix<f64>> {
        let d = self.material.constitutive_plane_stress();
        let n_dofs = self.n_dofs();
        let mut k = DMatrix::zeros(n_dofs, n_dofs);

        for (i, gp) in self.shape.points().iter().enumerate() {
            let (g, det_j) = physical_gradients(&self.shape, i)?;
            let b = Self::strain_displacement(&g);
            let db = d * &b;
            k += b.transpose() * db * (gp.weight * self.thickness * det_j.abs());
        }

        Ok(k)
    }

    fn calculate(&self, u: &DVector<f64>) -> DMatrix<f64> {
        let d = self.material.constitutive_plane_stress();
        let n = self.n_nodes();
        let mut res = DMatrix::zeros(6, n);

        for i in 0..n {
            let b = Self::strain_displacement(&self.shape.nodal_gradients(i));
            let strain = &b * u;
            let stress = d * &strain;
            for r in 0..3 {
                res[(r, i)] = strain[r];
                res[(r + 3, i)] = stress[r];
            }
        }

        res
    }
}
