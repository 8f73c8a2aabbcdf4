//! Sparse Cholesky solver.
//!
//! The lower triangle of K is stored in CSC format. Its structure comes from
//! the mesh map: column `v·dof + a` holds the rows `u·dof + b ≥ v·dof + a` of
//! every vertex `u ≥ v` sharing an element with `v`, which covers every entry
//! an element can scatter.

use crate::error::{Error, Result};
use crate::solver::Solver;
use faer::linalg::cholesky::llt::factor::LltError;
use faer::prelude::*;
use faer::sparse::linalg::solvers::{Llt, SymbolicLlt};
use faer::sparse::linalg::LltError as SparseLltError;
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use nalgebra::DVector;
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CscMatrix;

/// Sparse LLᵀ solver on the mesh-map sparsity pattern.
#[derive(Debug, Clone)]
pub struct SparseCholeskySolver {
    k: CscMatrix<f64>,
    f: DVector<f64>,
    dof: usize,
    /// For each vertex u, the vertices w ≤ u sharing an element with u.
    lower: Vec<Vec<usize>>,
}

impl SparseCholeskySolver {
    /// Build the structure from a mesh map and the dofs per vertex.
    pub fn new(mesh_map: &[Vec<usize>], dof: usize) -> Result<Self> {
        let n = mesh_map.len() * dof;
        let mut offsets = Vec::with_capacity(n + 1);
        let mut rows = Vec::new();
        let mut lower = vec![Vec::new(); mesh_map.len()];

        offsets.push(0);
        for (v, neighbours) in mesh_map.iter().enumerate() {
            for &u in neighbours {
                lower[u].push(v);
            }
            for a in 0..dof {
                let col = v * dof + a;
                for &u in neighbours {
                    rows.extend((0..dof).map(|b| u * dof + b).filter(|&row| row >= col));
                }
                offsets.push(rows.len());
            }
        }

        let nnz = rows.len();
        let pattern = SparsityPattern::try_from_offsets_and_indices(n, n, offsets, rows)
            .map_err(|e| Error::Assembly(format!("invalid sparsity pattern: {}", e)))?;
        let k = CscMatrix::try_from_pattern_and_values(pattern, vec![0.0; nnz])
            .map_err(|e| Error::Assembly(format!("invalid sparse matrix: {}", e)))?;
        log::debug!("sparse structure: {} equations, {} stored entries", n, nnz);

        Ok(Self {
            k,
            f: DVector::zeros(n),
            dof,
            lower,
        })
    }

    /// Number of stored entries of the lower triangle.
    pub fn nnz(&self) -> usize {
        self.k.nnz()
    }

    /// Storage position of K[row, col] with row ≥ col.
    fn position(&self, row: usize, col: usize) -> Option<usize> {
        let offsets = self.k.col_offsets();
        let start = *offsets.get(col)?;
        let end = *offsets.get(col + 1)?;
        self.k.row_indices()[start..end]
            .binary_search(&row)
            .ok()
            .map(|p| start + p)
    }

    /// Clear K[row, col] (row ≥ col), lifting its product with `value` from f[other].
    fn clear_entry(&mut self, row: usize, col: usize, other: usize, value: f64) {
        if let Some(p) = self.position(row, col) {
            let entry = self.k.values()[p];
            if entry != 0.0 {
                self.f[other] -= entry * value;
                self.k.values_mut()[p] = 0.0;
            }
        }
    }

    fn to_faer(&self) -> SparseColMat<usize, f64> {
        let n = self.f.len();
        // SAFETY: offsets and sorted row indices come from a validated nalgebra pattern.
        unsafe {
            SparseColMat::new(
                SymbolicSparseColMat::new_unchecked(
                    n,
                    n,
                    self.k.col_offsets().to_vec(),
                    None,
                    self.k.row_indices().to_vec(),
                ),
                self.k.values().to_vec(),
            )
        }
    }
}

impl Solver for SparseCholeskySolver {
    fn size(&self) -> usize {
        self.f.len()
    }

    fn add_matrix(&mut self, i: usize, j: usize, value: f64) -> Result<()> {
        if i < j {
            return Ok(());
        }
        let p = self.position(i, j).ok_or_else(|| {
            Error::Assembly(format!("entry ({}, {}) is outside the sparsity pattern", i, j))
        })?;
        self.k.values_mut()[p] += value;
        Ok(())
    }

    fn add_vector(&mut self, i: usize, value: f64) -> Result<()> {
        let n = self.f.len();
        let entry = self
            .f
            .get_mut(i)
            .ok_or_else(|| Error::Assembly(format!("equation index {} out of range ({})", i, n)))?;
        *entry += value;
        Ok(())
    }

    fn set_boundary_condition(&mut self, i: usize, value: f64) -> Result<()> {
        let n = self.f.len();
        if i >= n {
            return Err(Error::Assembly(format!("equation index {} out of range ({})", i, n)));
        }

        // Row i left of the diagonal: columns of vertices w ≤ vertex(i).
        let dof = self.dof;
        let columns: Vec<usize> = self.lower[i / dof]
            .iter()
            .flat_map(|&w| (0..dof).map(move |b| w * dof + b))
            .filter(|&col| col < i)
            .collect();
        for col in columns {
            self.clear_entry(i, col, col, value);
        }

        // Column i below the diagonal.
        let start = self.k.col_offsets()[i];
        let end = self.k.col_offsets()[i + 1];
        let rows: Vec<usize> = self.k.row_indices()[start..end]
            .iter()
            .copied()
            .filter(|&row| row != i)
            .collect();
        for row in rows {
            self.clear_entry(row, i, row, value);
        }

        self.f[i] = value * self.matrix(i, i);
        Ok(())
    }

    fn matrix(&self, i: usize, j: usize) -> f64 {
        let (row, col) = if i >= j { (i, j) } else { (j, i) };
        self.position(row, col).map_or(0.0, |p| self.k.values()[p])
    }

    fn vector(&self, i: usize) -> f64 {
        self.f[i]
    }

    fn solve(self: Box<Self>) -> Result<DVector<f64>> {
        let n = self.f.len();
        if n == 0 {
            return Ok(DVector::zeros(0));
        }

        let csc = self.to_faer();
        let csc_ref = csc.as_ref();

        let symbolic = SymbolicLlt::try_new(csc_ref.symbolic(), faer::Side::Lower)
            .map_err(|e| Error::Numeric(format!("symbolic Cholesky analysis failed: {:?}", e)))?;

        let llt = Llt::try_new_with_symbolic(symbolic, csc_ref, faer::Side::Lower).map_err(
            |e| match e {
                SparseLltError::Generic(err) => {
                    Error::Numeric(format!("sparse Cholesky error: {:?}", err))
                }
                SparseLltError::Numeric(LltError::NonPositivePivot { index }) => Error::Numeric(
                    format!("matrix is not positive definite (pivot {})", index),
                ),
            },
        )?;

        let mut x = faer::Mat::from_fn(n, 1, |i, _| self.f[i]);
        llt.solve_in_place(x.as_mut());

        let u = DVector::from_fn(n, |i, _| x[(i, 0)]);
        if u.iter().all(|v| v.is_finite()) {
            Ok(u)
        } else {
            Err(Error::Numeric("matrix is near-singular: solution is not finite".into()))
        }
    }

    fn name(&self) -> &str {
        "sparse Cholesky (faer LLᵀ)"
    }
}
