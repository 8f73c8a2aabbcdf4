//! Named nodal result fields.

use crate::error::{Error, Result};
use crate::mesh::FeType;
use crate::output::format_exp;
use nalgebra::DMatrix;
use std::fmt;

const BAR: &[&str] = &["U", "Exx", "Sxx"];
const PLANE: &[&str] = &["U", "V", "Exx", "Eyy", "Exy", "Sxx", "Syy", "Sxy"];
const SOLID: &[&str] = &[
    "U", "V", "W", "Exx", "Eyy", "Ezz", "Exy", "Exz", "Eyz", "Sxx", "Syy", "Szz", "Sxy", "Sxz",
    "Syz",
];
const SHELL: &[&str] = &[
    "U", "V", "W", "Tx", "Ty", "Tz", "Exx", "Eyy", "Ezz", "Exy", "Exz", "Eyz", "Sxx", "Syy",
    "Szz", "Sxy", "Sxz", "Syz",
];

/// Field names produced for elements of `fe_type`, in row order.
///
/// Nodal dofs come first, then strains, then stresses. Shear strains are
/// engineering strains.
pub fn result_names(fe_type: FeType) -> &'static [&'static str] {
    match fe_type {
        FeType::Bar2 => BAR,
        FeType::Tri3 | FeType::Quad4 => PLANE,
        FeType::Tet4 | FeType::Hex8 => SOLID,
        FeType::ShellTri3 | FeType::ShellQuad4 => SHELL,
    }
}

/// Nodal results of a static analysis: one row per field, one column per vertex.
#[derive(Debug, Clone)]
pub struct Results {
    fe_type: FeType,
    values: DMatrix<f64>,
}

impl Results {
    pub fn new(fe_type: FeType, values: DMatrix<f64>) -> Result<Self> {
        let expected = result_names(fe_type).len();
        if values.nrows() != expected {
            return Err(Error::Assembly(format!(
                "{} results need {} rows, got {}",
                fe_type,
                expected,
                values.nrows()
            )));
        }
        Ok(Self { fe_type, values })
    }

    pub fn fe_type(&self) -> FeType {
        self.fe_type
    }

    pub fn names(&self) -> &'static [&'static str] {
        result_names(self.fe_type)
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn n_nodes(&self) -> usize {
        self.values.ncols()
    }

    fn row(&self, name: &str) -> Option<usize> {
        self.names().iter().position(|&n| n == name)
    }

    /// Values of field `name` over all vertices.
    pub fn field(&self, name: &str) -> Option<Vec<f64>> {
        let row = self.row(name)?;
        Some(self.values.row(row).iter().copied().collect())
    }

    /// Value of field `name` at `vertex`.
    pub fn value(&self, name: &str, vertex: usize) -> Option<f64> {
        let row = self.row(name)?;
        (vertex < self.n_nodes()).then(|| self.values[(row, vertex)])
    }

    /// Per-field minimum and maximum.
    pub fn summary(&self) -> Summary {
        let fields = self
            .names()
            .iter()
            .zip(self.values.row_iter())
            .map(|(&name, row)| FieldSummary {
                name,
                min: row.min(),
                max: row.max(),
            })
            .collect();
        Summary { fields }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSummary {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Min/max table of all result fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub fields: Vec<FieldSummary>,
}

impl Summary {
    pub fn get(&self, name: &str) -> Option<&FieldSummary> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Fun:\tmin\t\tmax")?;
        for field in &self.fields {
            writeln!(
                f,
                "{}\t{}\t{}",
                field.name,
                format_exp(field.min, 6, true),
                format_exp(field.max, 6, true)
            )?;
        }
        Ok(())
    }
}
