//! Finite element trait and implementations.
//!
//! The [`FiniteElement`] trait defines the interface the assembler works with:
//! a local stiffness matrix and per-node strain/stress recovery.
//!
//! # Submodules
//!
//! - [`gauss`] - Gauss quadrature rules
//! - [`shape`] - Shape function bundles
//! - [`bar`] - Two-node axial bar
//! - [`plane_stress`] - Tri3 / Quad4 plane stress
//! - [`solid`] - Tet4 / Hex8 solids
//! - [`shell`] - ShellTri3 / ShellQuad4 flat shells

use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::FeType;
use nalgebra::{DMatrix, DVector};

pub mod bar;
pub mod gauss;
pub mod plane_stress;
pub mod shape;
pub mod shell;
pub mod solid;

pub use bar::Bar2;
pub use gauss::GaussPoint;
pub use plane_stress::PlaneStress;
pub use shape::{Shape, ShapeKind};
pub use shell::Shell;
pub use solid::Solid;

/// Default drilling stiffness, as a fraction of the largest diagonal entry of a shell stiffness.
pub const DEFAULT_DRILLING_FACTOR: f64 = 1e-3;

/// Scalar properties of one element, evaluated at its centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementParameters {
    /// Elastic constants.
    pub material: Material,
    /// Thickness of 2D elements and shells, cross-section area of bars.
    pub thickness: f64,
    /// Drilling stiffness factor of shells.
    pub drilling_factor: f64,
}

impl ElementParameters {
    /// Parameters with the default drilling factor.
    pub fn new(material: Material, thickness: f64) -> Self {
        Self {
            material,
            thickness,
            drilling_factor: DEFAULT_DRILLING_FACTOR,
        }
    }
}

/// Finite element interface.
///
/// Elements are built for one set of nodal coordinates and parameters and
/// must be thread-safe (Send + Sync) so that assembly workers can own them.
pub trait FiniteElement: Send + Sync {
    /// Number of nodes in this element.
    fn n_nodes(&self) -> usize;

    /// Degrees of freedom per node.
    fn dofs_per_node(&self) -> usize;

    /// Total degrees of freedom for this element.
    fn n_dofs(&self) -> usize {
        self.n_nodes() * self.dofs_per_node()
    }

    /// Number of rows returned by [`FiniteElement::calculate`]: strain components then stress components.
    fn n_results(&self) -> usize;

    /// Local stiffness matrix of shape (n_dofs, n_dofs).
    fn stiffness(&self) -> Result<DMatrix<f64>>;

    /// Strains and stresses at the nodes for the element displacement vector `u`.
    ///
    /// Returns an `n_results × n_nodes` matrix.
    fn calculate(&self, u: &DVector<f64>) -> DMatrix<f64>;
}

/// Create the element kernel for `fe_type` on nodal coordinates `x` (one row per node).
pub fn create_element(
    fe_type: FeType,
    x: &DMatrix<f64>,
    params: &ElementParameters,
) -> Result<Box<dyn FiniteElement>> {
    let element: Box<dyn FiniteElement> = match fe_type {
        FeType::Bar2 => Box::new(Bar2::new(x, params)?),
        FeType::Tri3 => Box::new(PlaneStress::new(ShapeKind::Tri3, x, params)?),
        FeType::Quad4 => Box::new(PlaneStress::new(ShapeKind::Quad4, x, params)?),
        FeType::Tet4 => Box::new(Solid::new(ShapeKind::Tet4, x, params)?),
        FeType::Hex8 => Box::new(Solid::new(ShapeKind::Hex8, x, params)?),
        FeType::ShellTri3 => Box::new(Shell::new(ShapeKind::Tri3, x, params)?),
        FeType::ShellQuad4 => Box::new(Shell::new(ShapeKind::Quad4, x, params)?),
    };
    Ok(element)
}

/// Physical shape derivatives at integration point `i` and the Jacobian determinant.
///
/// Returns `(J⁻¹ · ∂N/∂ξ, det J)`; the derivative matrix is `dim × size`.
/// A negative determinant (inverted node ordering) is accepted and logged;
/// callers integrate with `|det J|`.
pub(crate) fn physical_gradients(shape: &Shape, i: usize) -> Result<(DMatrix<f64>, f64)> {
    let j = shape.jacobian(i);
    let det = j.determinant();
    let scale = j.norm().powi(shape.dim() as i32);
    if !(det.abs() > f64::EPSILON * scale) {
        return Err(Error::Numeric(format!(
            "degenerate {:?} element: Jacobian determinant {} at integration point {}",
            shape.kind(),
            det,
            i
        )));
    }
    if det < 0.0 && i == 0 && shape.dim() > 1 {
        log::warn!(
            "inverted {:?} element: Jacobian determinant {} (check node ordering)",
            shape.kind(),
            det
        );
    }
    let inv = j.try_inverse().ok_or_else(|| {
        Error::Numeric(format!("degenerate {:?} element: singular Jacobian", shape.kind()))
    })?;
    Ok((inv * shape.natural_gradients(i), det))
}
