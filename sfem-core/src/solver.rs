//! Linear system solvers.
//!
//! A solver owns the global stiffness matrix K and the load vector f while
//! they are assembled, applies Dirichlet conditions, and is consumed by the
//! final factorization.
//!
//! # Solver Backends
//!
//! - [`DenseCholeskySolver`]: dense lower-triangle storage factorized with
//!   nalgebra's Cholesky. The reference backend.
//! - [`SparseCholeskySolver`](crate::sparse::SparseCholeskySolver): lower
//!   triangular CSC storage shaped by the mesh map, factorized with faer's
//!   sparse LLᵀ.
//!
//! Both store only entries with `row >= col`; contributions to the upper
//! triangle are dropped since the matrix is symmetric.

use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::sparse::SparseCholeskySolver;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Linear solver interface.
pub trait Solver: Send {
    /// System order N.
    fn size(&self) -> usize;

    /// Add `value` to K[i, j]; only the lower triangle (i ≥ j) is stored.
    fn add_matrix(&mut self, i: usize, j: usize, value: f64) -> Result<()>;

    /// Add `value` to f[i].
    fn add_vector(&mut self, i: usize, value: f64) -> Result<()>;

    /// Prescribe u[i] = `value`.
    ///
    /// Zeroes row and column i except the diagonal, moving the column into
    /// the right-hand side, and sets f[i] = value · K[i, i]. Structural zeros
    /// stay untouched. Call at most once per equation: a second call would
    /// lift against columns that are already zeroed.
    fn set_boundary_condition(&mut self, i: usize, value: f64) -> Result<()>;

    /// Current value of K[i, j] (symmetric access).
    fn matrix(&self, i: usize, j: usize) -> f64;

    /// Current value of f[i].
    fn vector(&self, i: usize) -> f64;

    /// Factorize K and solve K u = f.
    fn solve(self: Box<Self>) -> Result<DVector<f64>>;

    /// Solver name for diagnostics.
    fn name(&self) -> &str;
}

/// Solver backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverType {
    /// Dense Cholesky.
    #[default]
    Dense,
    /// Sparse Cholesky on the mesh-map sparsity pattern.
    Sparse,
}

impl FromStr for SolverType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(SolverType::Dense),
            "sparse" => Ok(SolverType::Sparse),
            other => Err(Error::Config(format!("unknown solver '{}'", other))),
        }
    }
}

impl fmt::Display for SolverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverType::Dense => "dense",
            SolverType::Sparse => "sparse",
        })
    }
}

/// Create a solver of `solver_type` sized for `mesh`.
///
/// The mesh map must have been built for the sparse backend.
pub fn create_solver(solver_type: SolverType, mesh: &Mesh) -> Result<Box<dyn Solver>> {
    let n = mesh.n_nodes() * mesh.dof();
    let solver: Box<dyn Solver> = match solver_type {
        SolverType::Dense => Box::new(DenseCholeskySolver::new(n)),
        SolverType::Sparse => Box::new(SparseCholeskySolver::new(mesh.mesh_map(), mesh.dof())?),
    };
    log::debug!("{} solver with {} equations", solver.name(), n);
    Ok(solver)
}

fn out_of_range(i: usize, n: usize) -> Error {
    Error::Assembly(format!("equation index {} out of range (system order {})", i, n))
}

/// Reject a Cholesky factor whose squared diagonal ratio falls below machine precision.
fn check_conditioning(min_diag: f64, max_diag: f64) -> Result<()> {
    if max_diag <= 0.0 || (min_diag / max_diag).powi(2) < f64::EPSILON {
        return Err(Error::Numeric(format!(
            "matrix is near-singular (factor diagonal range {:e}..{:e})",
            min_diag, max_diag
        )));
    }
    Ok(())
}

/// Dense Cholesky solver storing the lower triangle of K.
#[derive(Debug, Clone)]
pub struct DenseCholeskySolver {
    k: DMatrix<f64>,
    f: DVector<f64>,
}

impl DenseCholeskySolver {
    /// Zero system of order `n`.
    pub fn new(n: usize) -> Self {
        Self {
            k: DMatrix::zeros(n, n),
            f: DVector::zeros(n),
        }
    }

    fn check(&self, i: usize) -> Result<()> {
        if i < self.f.len() {
            Ok(())
        } else {
            Err(out_of_range(i, self.f.len()))
        }
    }
}

impl Solver for DenseCholeskySolver {
    fn size(&self) -> usize {
        self.f.len()
    }

    fn add_matrix(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        self.check(i)?;
        self.check(j)?;
        if i >= j {
            self.k[(i, j)] += value;
        }
        Ok(())
    }

    fn add_vector(&mut self, i: usize, value: f64) -> Result<()> {
        self.check(i)?;
        self.f[i] += value;
        Ok(())
    }

    fn set_boundary_condition(&mut self, i: usize, value: f64) -> Result<()> {
        self.check(i)?;
        let n = self.size();
        for j in 0..n {
            if j == i {
                continue;
            }
            let (r, c) = if i > j { (i, j) } else { (j, i) };
            let entry = self.k[(r, c)];
            if entry != 0.0 {
                self.f[j] -= entry * value;
                self.k[(r, c)] = 0.0;
            }
        }
        self.f[i] = value * self.k[(i, i)];
        Ok(())
    }

    fn matrix(&self, i: usize, j: usize) -> f64 {
        if i >= j {
            self.k[(i, j)]
        } else {
            self.k[(j, i)]
        }
    }

    fn vector(&self, i: usize) -> f64 {
        self.f[i]
    }

    fn solve(self: Box<Self>) -> Result<DVector<f64>> {
        let n = self.size();
        if n == 0 {
            return Ok(DVector::zeros(0));
        }

        let Self { k, f } = *self;
        let cholesky = k
            .cholesky()
            .ok_or_else(|| Error::Numeric("matrix is not positive definite".into()))?;

        let diagonal = cholesky.l_dirty().diagonal();
        check_conditioning(diagonal.min(), diagonal.max())?;

        let u = cholesky.solve(&f);
        if u.iter().all(|v| v.is_finite()) {
            Ok(u)
        } else {
            Err(Error::Numeric("solution is not finite".into()))
        }
    }

    fn name(&self) -> &str {
        "dense Cholesky (nalgebra)"
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Fill a solver with the lower triangle of `k` and the vector `f`.
    pub fn load(solver: &mut dyn Solver, k: &DMatrix<f64>, f: &[f64]) {
        for i in 0..k.nrows() {
            for j in 0..k.ncols() {
                if k[(i, j)] != 0.0 {
                    solver.add_matrix(i, j, k[(i, j)]).unwrap();
                }
            }
            solver.add_vector(i, f[i]).unwrap();
        }
    }

    /// Tridiagonal SPD matrix [2 -1; -1 2 -1; ...] of order n.
    pub fn tridiagonal(n: usize) -> DMatrix<f64> {
        DMatrix::from_fn(n, n, |i, j| match i.abs_diff(j) {
            0 => 2.0,
            1 => -1.0,
            _ => 0.0,
        })
    }
}
