//! Strain and stress recovery from the displacement solution.
//!
//! The leading `dof` rows of the result matrix are the nodal displacements
//! (and rotations for shells). Every element evaluates strains and stresses
//! at its nodes; each vertex averages the contributions of its incident
//! elements. Averaged strains and stresses below ε in magnitude are snapped
//! to zero.

use crate::assembly::Assembler;
use crate::error::{Error, Result};
use crate::parallel::fan_in;
use crate::results::result_names;
use nalgebra::{DMatrix, DVector};

/// Nodal result matrix (`result_names(fe_type).len()` rows, one column per vertex).
pub fn recover(assembler: &Assembler, u: &DVector<f64>) -> Result<DMatrix<f64>> {
    let mesh = assembler.mesh();
    let dof = mesh.dof();
    let n_nodes = mesh.n_nodes();
    let rows = result_names(mesh.fe_type()).len();
    if u.len() != n_nodes * dof {
        return Err(Error::Assembly(format!(
            "solution has {} entries, expected {}",
            u.len(),
            n_nodes * dof
        )));
    }

    let mut values = DMatrix::zeros(rows, n_nodes);
    for v in 0..n_nodes {
        for d in 0..dof {
            values[(d, v)] = u[v * dof + d];
        }
    }

    let mut counts = vec![0usize; n_nodes];
    fan_in(
        "Computing strains and stresses",
        assembler.params().threads(),
        mesh.n_elements(),
        |j| {
            let element = assembler.element(j)?;
            Ok(element.calculate(&assembler.element_displacements(j, u)))
        },
        |j, res| {
            if res.nrows() + dof != rows {
                return Err(Error::Assembly(format!(
                    "element {} returned {} result rows, expected {}",
                    j,
                    res.nrows(),
                    rows - dof
                )));
            }
            for (a, &v) in mesh.elements()[j].iter().enumerate() {
                for r in 0..res.nrows() {
                    values[(dof + r, v)] += res[(r, a)];
                }
                counts[v] += 1;
            }
            Ok(())
        },
    )?;

    // Only strains and stresses are averaged and snapped; displacements are kept as solved.
    let eps = assembler.params().eps();
    for (v, &count) in counts.iter().enumerate() {
        for r in dof..rows {
            let x = &mut values[(r, v)];
            if count > 0 {
                *x /= count as f64;
            }
            if x.abs() < eps {
                *x = 0.0;
            }
        }
    }
    Ok(values)
}
