//! Two-node axial bar (Bar2).
//!
//! One translational dof per node. The element parameter `thickness` is
//! the cross-section area A, so that
//!
//! ```text
//! K = ∫ Bᵀ E B A dx = (E A / L) [[1, -1], [-1, 1]]
//! ```

use crate::element::shape::{Shape, ShapeKind};
use crate::element::{physical_gradients, ElementParameters, FiniteElement};
use crate::error::Result;
use crate::material::Material;
use nalgebra::{DMatrix, DVector};

/// Two-node bar element.
#[derive(Debug, Clone)]
pub struct Bar2 {
    shape: Shape,
    material: Material,
    area: f64,
}

impl Bar2 {
    /// Create a bar on nodal coordinates `x` (2 × 1).
    pub fn new(x: &DMatrix<f64>, params: &ElementParameters) -> Result<Self> {
        Ok(Self {
            shape: Shape::new(ShapeKind::Line2, x)?,
            material: params.material,
            area: params.thickness,
        })
    }
}

impl FiniteElement for Bar2 {
    fn n_nodes(&self) -> usize {
        2
    }

    fn dofs_per_node(&self) -> usize {
        1
    }

    fn n_results(&self) -> usize {
        2
    }

    fn stiffness(&self) -> Result<DMatrix<f64>> {
        let e = self.material.youngs_modulus;
        let mut k = DMatrix::zeros(2, 2);

        for (i, gp) in self.shape.points().iter().enumerate() {
            let (b, det_j) = physical_gradients(&self.shape, i)?;
            k += b.transpose() * &b * (gp.weight * self.area * det_j.abs() * e);
        }

        Ok(k)
    }

    fn calculate(&self, u: &DVector<f64>) -> DMatrix<f64> {
        let e = self.material.youngs_modulus;
        let mut res = DMatrix::zeros(2, 2);

        for i in 0..2 {
            let strain = (self.shape.nodal_gradients(i) * u)[0];
            res[(0, i)] = strain;
            res[(1, i)] = e * strain;
        }

        res
    }
}
