//! Shape function bundles.
//!
//! A [`Shape`] couples the reference-element interpolation of one element
//! type with the physical nodal coordinates of one element:
//!
//! - natural shape values and derivatives at the quadrature points
//!   (used to integrate stiffness),
//! - the Jacobian of the natural → physical mapping,
//! - physical derivatives at the nodes (used for strain recovery).
//!
//! Physical derivatives at the nodes come from fitting the monomial basis
//! `φ` of the element through the nodes: with `P[i, m] = φ_m(x_i)` the
//! coefficient matrix `C = P⁻¹` gives `N_j = Σ_m C[m, j] φ_m`. For Quad4 and
//! Hex8 the basis contains cross terms, so these derivatives vary from node
//! to node.
//!
//! # Node Numbering
//!
//! ```text
//!   Quad4            Hex8
//!                       7-------6
//!   3-------2          /|      /|
//!   |       |         4-------5 |
//!   |       |         | 3-----|-2
//!   0-------1         |/      |/
//!                     0-------1
//! ```

use crate::element::gauss::{gauss_bar, gauss_hex, gauss_quad, gauss_tet, gauss_tri, GaussPoint};
use crate::error::{Error, Result};
use crate::linalg::invert;
use nalgebra::DMatrix;

/// Natural coordinates of the Quad4 / Hex8 nodes.
const XI: [f64; 8] = [-1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0];
const ETA: [f64; 8] = [-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0];
const PSI: [f64; 8] = [-1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0];

/// Pivot tolerance, relative to the largest basis value, when fitting the nodal polynomial.
const FIT_TOLERANCE: f64 = 1e-12;

/// Reference element geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// Two-node line.
    Line2,
    /// Three-node triangle.
    Tri3,
    /// Four-node quadrilateral.
    Quad4,
    /// Four-node tetrahedron.
    Tet4,
    /// Eight-node hexahedron.
    Hex8,
}

impl ShapeKind {
    /// Number of nodes.
    pub fn size(self) -> usize {
        match self {
            ShapeKind::Line2 => 2,
            ShapeKind::Tri3 => 3,
            ShapeKind::Quad4 | ShapeKind::Tet4 => 4,
            ShapeKind::Hex8 => 8,
        }
    }

    /// Number of natural (and physical) coordinates.
    pub fn dim(self) -> usize {
        match self {
            ShapeKind::Line2 => 1,
            ShapeKind::Tri3 | ShapeKind::Quad4 => 2,
            ShapeKind::Tet4 | ShapeKind::Hex8 => 3,
        }
    }

    fn quadrature(self) -> Vec<GaussPoint> {
        match self {
            ShapeKind::Line2 => gauss_bar(),
            ShapeKind::Tri3 => gauss_tri(),
            ShapeKind::Quad4 => gauss_quad(2),
            ShapeKind::Tet4 => gauss_tet(),
            ShapeKind::Hex8 => gauss_hex(2),
        }
    }

    /// Shape values N_j at natural point `p`.
    pub fn values(self, p: [f64; 3]) -> Vec<f64> {
        let [xi, eta, psi] = p;
        match self {
            ShapeKind::Line2 => vec![0.5 * (1.0 - xi), 0.5 * (1.0 + xi)],
            ShapeKind::Tri3 => vec![1.0 - xi - eta, xi, eta],
            ShapeKind::Quad4 => (0..4)
                .map(|j| 0.25 * (1.0 + XI[j] * xi) * (1.0 + ETA[j] * eta))
                .collect(),
            ShapeKind::Tet4 => vec![1.0 - xi - eta - psi, xi, eta, psi],
            ShapeKind::Hex8 => (0..8)
                .map(|j| 0.125 * (1.0 + XI[j] * xi) * (1.0 + ETA[j] * eta) * (1.0 + PSI[j] * psi))
                .collect(),
        }
    }

    /// Natural derivatives at `p`, one row per natural coordinate, one column per node.
    pub fn gradients(self, p: [f64; 3]) -> DMatrix<f64> {
        let [xi, eta, psi] = p;
        match self {
            ShapeKind::Line2 => DMatrix::from_row_slice(1, 2, &[-0.5, 0.5]),
            ShapeKind::Tri3 => DMatrix::from_row_slice(2, 3, &[-1.0, 1.0, 0.0, -1.0, 0.0, 1.0]),
            ShapeKind::Quad4 => DMatrix::from_fn(2, 4, |r, j| match r {
                0 => 0.25 * XI[j] * (1.0 + ETA[j] * eta),
                _ => 0.25 * (1.0 + XI[j] * xi) * ETA[j],
            }),
            ShapeKind::Tet4 => DMatrix::from_row_slice(
                3,
                4,
                &[
                    -1.0, 1.0, 0.0, 0.0, //
                    -1.0, 0.0, 1.0, 0.0, //
                    -1.0, 0.0, 0.0, 1.0,
                ],
            ),
            ShapeKind::Hex8 => DMatrix::from_fn(3, 8, |r, j| {
                let fx = 1.0 + XI[j] * xi;
                let fy = 1.0 + ETA[j] * eta;
                let fz = 1.0 + PSI[j] * psi;
                match r {
                    0 => 0.125 * XI[j] * fy * fz,
                    1 => 0.125 * fx * ETA[j] * fz,
                    _ => 0.125 * fx * fy * PSI[j],
                }
            }),
        }
    }

    /// Monomial basis φ at physical point `p`.
    fn monomials(self, p: [f64; 3]) -> Vec<f64> {
        let [x, y, z] = p;
        match self {
            ShapeKind::Line2 => vec![1.0, x],
            ShapeKind::Tri3 => vec![1.0, x, y],
            ShapeKind::Quad4 => vec![1.0, x, y, x * y],
            ShapeKind::Tet4 => vec![1.0, x, y, z],
            ShapeKind::Hex8 => vec![1.0, x, y, z, x * y, x * z, y * z, x * y * z],
        }
    }

    /// Physical derivatives of the monomial basis at `p`, one row per coordinate.
    fn monomial_gradients(self, p: [f64; 3]) -> DMatrix<f64> {
        let [x, y, z] = p;
        match self {
            ShapeKind::Line2 => DMatrix::from_row_slice(1, 2, &[0.0, 1.0]),
            ShapeKind::Tri3 => DMatrix::from_row_slice(2, 3, &[0.0, 1.0, 0.0, 0.0, 0.0, 1.0]),
            ShapeKind::Quad4 => {
                DMatrix::from_row_slice(2, 4, &[0.0, 1.0, 0.0, y, 0.0, 0.0, 1.0, x])
            }
            ShapeKind::Tet4 => DMatrix::from_row_slice(
                3,
                4,
                &[
                    0.0, 1.0, 0.0, 0.0, //
                    0.0, 0.0, 1.0, 0.0, //
                    0.0, 0.0, 0.0, 1.0,
                ],
            ),
            ShapeKind::Hex8 => DMatrix::from_row_slice(
                3,
                8,
                &[
                    0.0, 1.0, 0.0, 0.0, y, z, 0.0, y * z, //
                    0.0, 0.0, 1.0, 0.0, x, 0.0, z, x * z, //
                    0.0, 0.0, 0.0, 1.0, 0.0, x, y, x * y,
                ],
            ),
        }
    }
}

/// Shape functions of one element.
#[derive(Debug, Clone)]
pub struct Shape {
    kind: ShapeKind,
    /// Nodal coordinates, `size × dim`.
    x: DMatrix<f64>,
    /// Nodal coordinates relative to the centroid, used for the polynomial fit.
    centered: DMatrix<f64>,
    /// Monomial coefficients, `C[(m, j)]` for basis function m of node j.
    c: DMatrix<f64>,
    points: Vec<GaussPoint>,
}

impl Shape {
    /// Build the shape bundle for nodal coordinates `x` (`size × dim`, extra columns ignored).
    pub fn new(kind: ShapeKind, x: &DMatrix<f64>) -> Result<Self> {
        let (size, dim) = (kind.size(), kind.dim());
        if x.nrows() != size || x.ncols() < dim {
            return Err(Error::Numeric(format!(
                "{:?} shape needs {}x{} coordinates, got {}x{}",
                kind,
                size,
                dim,
                x.nrows(),
                x.ncols()
            )));
        }
        let x = x.columns(0, dim).into_owned();

        let mut centered = x.clone();
        for k in 0..dim {
            let mean = x.column(k).mean();
            centered.column_mut(k).add_scalar_mut(-mean);
        }

        let mut p = DMatrix::zeros(size, size);
        for i in 0..size {
            for (m, value) in kind.monomials(Self::padded(&centered, i)).into_iter().enumerate() {
                p[(i, m)] = value;
            }
        }
        let c = invert(&p, FIT_TOLERANCE * p.amax().max(1.0)).map_err(|_| {
            Error::Numeric(format!("degenerate {:?} element: nodal polynomial fit is singular", kind))
        })?;

        Ok(Self {
            kind,
            x,
            centered,
            c,
            points: kind.quadrature(),
        })
    }

    fn padded(x: &DMatrix<f64>, i: usize) -> [f64; 3] {
        let mut p = [0.0; 3];
        for (k, value) in p.iter_mut().enumerate().take(x.ncols()) {
            *value = x[(i, k)];
        }
        p
    }

    /// Reference geometry.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        self.kind.size()
    }

    /// Number of coordinates.
    pub fn dim(&self) -> usize {
        self.kind.dim()
    }

    /// Nodal coordinates.
    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    /// Quadrature points.
    pub fn points(&self) -> &[GaussPoint] {
        &self.points
    }

    /// Weight of integration point `i`.
    pub fn weight(&self, i: usize) -> f64 {
        self.points[i].weight
    }

    /// N_j at integration point `i`.
    pub fn shape(&self, i: usize, j: usize) -> f64 {
        self.kind.values(self.points[i].coords)[j]
    }

    /// ∂N_j/∂ξ at integration point `i`.
    pub fn shape_dxi(&self, i: usize, j: usize) -> f64 {
        self.kind.gradients(self.points[i].coords)[(0, j)]
    }

    /// ∂N_j/∂η at integration point `i`.
    pub fn shape_deta(&self, i: usize, j: usize) -> f64 {
        self.kind.gradients(self.points[i].coords)[(1, j)]
    }

    /// ∂N_j/∂ψ at integration point `i`.
    pub fn shape_dpsi(&self, i: usize, j: usize) -> f64 {
        self.kind.gradients(self.points[i].coords)[(2, j)]
    }

    /// Natural derivatives at integration point `i` (`dim × size`).
    pub fn natural_gradients(&self, i: usize) -> DMatrix<f64> {
        self.kind.gradients(self.points[i].coords)
    }

    /// Jacobian at integration point `i`: `J[(r, k)] = Σ_j ∂N_j/∂ξ_r · x_jk`.
    pub fn jacobian(&self, i: usize) -> DMatrix<f64> {
        self.natural_gradients(i) * &self.x
    }

    /// Physical derivatives `∂N_j/∂x_k` at node `i` (`dim × size`).
    pub fn nodal_gradients(&self, i: usize) -> DMatrix<f64> {
        self.kind.monomial_gradients(Self::padded(&self.centered, i)) * &self.c
    }

    /// ∂N_j/∂x at node `i`.
    pub fn shape_dx(&self, i: usize, j: usize) -> f64 {
        self.nodal_gradients(i)[(0, j)]
    }

    /// ∂N_j/∂y at node `i`.
    pub fn shape_dy(&self, i: usize, j: usize) -> f64 {
        self.nodal_gradients(i)[(1, j)]
    }

    /// ∂N_j/∂z at node `i`.
    pub fn shape_dz(&self, i: usize, j: usize) -> f64 {
        self.nodal_gradients(i)[(2, j)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> DMatrix<f64> {
        DMatrix::from_row_slice(4, 2, &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0, 1.0])
    }

    fn unit_cube() -> DMatrix<f64> {
        DMatrix::from_row_slice(
            8,
            3,
            &[
                0.0, 0.0, 0.0, //
                1.0, 0.0, 0.0, //
                1.0, 1.0, 0.0, //
                0.0, 1.0, 0.0, //
                0.0, 0.0, 1.0, //
                1.0, 0.0, 1.0, //
                1.0, 1.0, 1.0, //
                0.0, 1.0, 1.0,
            ],
        )
    }

    fn all_kinds() -> Vec<(ShapeKind, DMatrix<f64>)> {
        vec![
            (ShapeKind::Line2, DMatrix::from_row_slice(2, 1, &[1.0, 3.0])),
            (
                ShapeKind::Tri3,
                DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 2.0, 0.5, 0.5, 1.5]),
            ),
            (ShapeKind::Quad4, unit_square()),
            (
                ShapeKind::Tet4,
                DMatrix::from_row_slice(
                    4,
                    3,
                    &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
                ),
            ),
            (ShapeKind::Hex8, unit_cube()),
        ]
    }

    #[test]
    fn test_partition_of_unity() {
        for (kind, x) in all_kinds() {
            let shape = Shape::new(kind, &x).unwrap();
            for i in 0..shape.points().len() {
                let sum: f64 = (0..shape.size()).map(|j| shape.shape(i, j)).sum();
                assert_relative_eq!(sum, 1.0, epsilon = 1e-14);
                for r in 0..shape.dim() {
                    let dsum: f64 = shape.natural_gradients(i).row(r).sum();
                    assert_relative_eq!(dsum, 0.0, epsilon = 1e-14);
                }
            }
        }
    }

    #[test]
    fn test_quad_and_hex_shape_at_nodes() {
        for j in 0..4 {
            let n = ShapeKind::Quad4.values([XI[j], ETA[j], 0.0]);
            for (k, value) in n.iter().enumerate() {
                assert_relative_eq!(*value, if j == k { 1.0 } else { 0.0 }, epsilon = 1e-14);
            }
        }
        for j in 0..8 {
            let n = ShapeKind::Hex8.values([XI[j], ETA[j], PSI[j]]);
            for (k, value) in n.iter().enumerate() {
                assert_relative_eq!(*value, if j == k { 1.0 } else { 0.0 }, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_jacobian_of_unit_primitives() {
        let quad = Shape::new(ShapeKind::Quad4, &unit_square()).unwrap();
        assert_relative_eq!(quad.jacobian(0).determinant(), 0.25, epsilon = 1e-14);

        let hex = Shape::new(ShapeKind::Hex8, &unit_cube()).unwrap();
        let j = hex.jacobian(3);
        for r in 0..3 {
            for k in 0..3 {
                assert_relative_eq!(j[(r, k)], if r == k { 0.5 } else { 0.0 }, epsilon = 1e-14);
            }
        }
    }

    #[test]
    fn test_nodal_gradients_reproduce_linear_fields() {
        for (kind, x) in all_kinds() {
            let shape = Shape::new(kind, &x).unwrap();
            let dim = shape.dim();
            for i in 0..shape.size() {
                let grad = shape.nodal_gradients(i);
                // Σ_j ∂N_j/∂x_r · x_jk = δ_rk
                let g = &grad * shape.x();
                for r in 0..dim {
                    for k in 0..dim {
                        assert_relative_eq!(
                            g[(r, k)],
                            if r == k { 1.0 } else { 0.0 },
                            epsilon = 1e-12
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_quad_nodal_derivatives_vary_by_node() {
        let shape = Shape::new(ShapeKind::Quad4, &unit_square()).unwrap();
        // N_2 = x y on the unit square: ∂N_2/∂x = y
        assert_relative_eq!(shape.shape_dx(0, 2), 0.0, epsilon = 1e-14);
        assert_relative_eq!(shape.shape_dx(3, 2), 1.0, epsilon = 1e-14);
        assert_relative_eq!(shape.shape_dy(1, 2), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_degenerate_geometry_rejected() {
        let x = DMatrix::from_row_slice(3, 2, &[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]);
        assert!(Shape::new(ShapeKind::Tri3, &x).is_err());
        let short = DMatrix::from_row_slice(2, 2, &[0.0, 0.0, 1.0, 0.0]);
        assert!(Shape::new(ShapeKind::Tri3, &short).is_err());
    }
}
