//! Flat shell elements (ShellTri3, ShellQuad4).
//!
//! Six dofs per node: three translations and three rotations in global
//! axes. The element is formulated in a local frame `(vx, vy, vz)` built from
//! its first three nodes (see [`local_basis`]) as the superposition of
//!
//! - a plane stress membrane acting on the in-plane translations,
//! - a Mindlin plate: bending curvatures from the in-plane rotations and
//!   transverse shear coupling the normal translation to those rotations.
//!
//! ```text
//! K_local = Σ_gp w |J| ( t Bmᵀ D Bm + t³/12 Bpᵀ D Bp + 5t/6 Bcᵀ Ds Bc )
//! K       = Mᵀ K_local M
//! ```
//!
//! The rotation about the normal (drilling) has no stiffness of its own; its
//! diagonal is set to a fraction of the largest diagonal entry.

use crate::element::shape::{Shape, ShapeKind};
use crate::element::{physical_gradients, ElementParameters, FiniteElement};
use crate::error::{Error, Result};
use crate::linalg::{expand_basis, local_basis};
use crate::material::Material;
use nalgebra::{DMatrix, DVector, Matrix3};

const DOFS: usize = 6;

/// Flat shell element on a Tri3 or Quad4 surface interpolation.
#[derive(Debug, Clone)]
pub struct Shell {
    shape: Shape,
    /// Rows are the local axes in global coordinates.
    basis: Matrix3<f64>,
    material: Material,
    thickness: f64,
    drilling_factor: f64,
}

/// Membrane, bending and shear strain-displacement matrices at one point.
struct ShellB {
    membrane: DMatrix<f64>,
    bending: DMatrix<f64>,
    shear: DMatrix<f64>,
}

impl Shell {
    /// Create an element of `kind` on global nodal coordinates `x` (n × 3).
    pub fn new(kind: ShapeKind, x: &DMatrix<f64>, params: &ElementParameters) -> Result<Self> {
        if !matches!(kind, ShapeKind::Tri3 | ShapeKind::Quad4) {
            return Err(Error::Config(format!("shell element cannot use {:?} shape", kind)));
        }
        if x.ncols() != 3 || x.nrows() != kind.size() {
            return Err(Error::Numeric(format!(
                "shell element needs {}x3 coordinates, got {}x{}",
                kind.size(),
                x.nrows(),
                x.ncols()
            )));
        }
        let basis = local_basis(x)?;
        let local = DMatrix::from_fn(x.nrows(), 3, |i, k| {
            (0..3).map(|m| basis[(k, m)] * x[(i, m)]).sum::<f64>()
        });

        Ok(Self {
            shape: Shape::new(kind, &local)?,
            basis,
            material: params.material,
            thickness: params.thickness,
            drilling_factor: params.drilling_factor,
        })
    }

    /// Local frame, rows `(vx, vy, vz)`.
    pub fn basis(&self) -> &Matrix3<f64> {
        &self.basis
    }

    /// Strain-displacement matrices from physical derivatives `g` (2 × n) and shape values `n`.
    fn strain_displacement(g: &DMatrix<f64>, n: &[f64]) -> ShellB {
        let size = g.ncols();
        let mut membrane = DMatrix::zeros(3, DOFS * size);
        let mut bending = DMatrix::zeros(3, DOFS * size);
        let mut shear = DMatrix::zeros(2, DOFS * size);

        for j in 0..size {
            let col = DOFS * j;
            let (dx, dy) = (g[(0, j)], g[(1, j)]);

            membrane[(0, col)] = dx;
            membrane[(1, col + 1)] = dy;
            membrane[(2, col)] = dy;
            membrane[(2, col + 1)] = dx;

            bending[(0, col + 3)] = dx;
            bending[(1, col + 4)] = dy;
            bending[(2, col + 3)] = dy;
            bending[(2, col + 4)] = dx;

            shear[(0, col + 2)] = dx;
            shear[(0, col + 3)] = n[j];
            shear[(1, col + 2)] = dy;
            shear[(1, col + 4)] = n[j];
        }

        ShellB {
            membrane,
            bending,
            shear,
        }
    }

    fn transform(&self) -> DMatrix<f64> {
        expand_basis(&self.basis, 2 * self.shape.size())
    }

    /// Symmetric 3×3 tensor from local in-plane components and transverse components.
    fn local_tensor(plane: [f64; 3], transverse: [f64; 2]) -> Matrix3<f64> {
        Matrix3::new(
            plane[0], plane[2], transverse[0],
            plane[2], plane[1], transverse[1],
            transverse[0], transverse[1], 0.0,
        )
    }
}

/// Output order (xx, yy, zz, xy, xz, yz) as tensor indices.
const COMPONENTS: [(usize, usize); 6] = [(0, 0), (1, 1), (2, 2), (0, 1), (0, 2), (1, 2)];

impl FiniteElement for Shell {
    fn n_nodes(&self) -> usize {
        self.shape.size()
    }

    fn dofs_per_node(&self) -> usize {
        DOFS
    }

    fn n_results(&self) -> usize {
        12
    }

    fn stiffness(&self) -> Result<DMatrix<f64>> {
        let t = self.thickness;
        let d = self.material.constitutive_plane_stress();
        let ds = self.material.constitutive_shear();
        let n_dofs = self.n_dofs();
        let mut k = DMatrix::zeros(n_dofs, n_dofs);

        for (i, gp) in self.shape.points().iter().enumerate() {
            let (g, det_j) = physical_gradients(&self.shape, i)?;
            let values: Vec<f64> = (0..self.shape.size()).map(|j| self.shape.shape(i, j)).collect();
            let b = Self::strain_displacement(&g, &values);
            let scale = gp.weight * det_j.abs();

            k += b.membrane.transpose() * (d * &b.membrane) * (t * scale);
            k += b.bending.transpose() * (d * &b.bending) * (t.powi(3) / 12.0 * scale);
            k += b.shear.transpose() * (ds * &b.shear) * (5.0 * t / 6.0 * scale);
        }

        let drilling = self.drilling_factor * k.diagonal().max();
        for j in 0..self.shape.size() {
            let r = DOFS * (j + 1) - 1;
            k[(r, r)] = drilling;
        }

        let m = self.transform();
        Ok(m.transpose() * k * m)
    }

    fn calculate(&self, u: &DVector<f64>) -> DMatrix<f64> {
        let t = self.thickness;
        let d = self.material.constitutive_plane_stress();
        let ds = self.material.constitutive_shear();
        let n = self.n_nodes();
        let lu = self.transform() * u;
        let mut res = DMatrix::zeros(12, n);

        for i in 0..n {
            let values: Vec<f64> = (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect();
            let b = Self::strain_displacement(&self.shape.nodal_gradients(i), &values);

            let strain_m = &b.membrane * &lu;
            // Bending strains at the outer fibre z = t/2.
            let strain_p = &b.bending * &lu * (0.5 * t);
            let strain_c = &b.shear * &lu;
            let stress_m = d * &strain_m;
            let stress_p = d * &strain_p;
            let stress_c = ds * &strain_c;

            // Strain tensors carry half of the engineering shear strains.
            let strain = Self::local_tensor(
                [
                    strain_m[0] + strain_p[0],
                    strain_m[1] + strain_p[1],
                    0.5 * (strain_m[2] + strain_p[2]),
                ],
                [0.5 * strain_c[0], 0.5 * strain_c[1]],
            );
            let stress = Self::local_tensor(
                [
                    stress_m[0] + stress_p[0],
                    stress_m[1] + stress_p[1],
                    stress_m[2] + stress_p[2],
                ],
                [stress_c[0], stress_c[1]],
            );

            let strain = self.basis.transpose() * strain * self.basis;
            let stress = self.basis.transpose() * stress * self.basis;

            for (r, &(a, c)) in COMPONENTS.iter().enumerate() {
                let engineering = if a == c { 1.0 } else { 2.0 };
                res[(r, i)] = engineering * strain[(a, c)];
                res[(r + 6, i)] = stress[(a, c)];
            }
        }

        res
    }
}
