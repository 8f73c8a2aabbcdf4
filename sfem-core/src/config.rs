//! JSON problem files.
//!
//! A problem file names the mesh, the run settings and the parameter records
//! as condition lines `value;predicate;directions`:
//!
//! ```json
//! {
//!   "mesh": "beam.mesh",
//!   "solver": "sparse",
//!   "variables": { "L": 10.0 },
//!   "young_modulus": ["203200"],
//!   "poisson_ratio": ["0.27"],
//!   "thickness": ["1"],
//!   "boundary_conditions": ["0;x == 0;X|Y"],
//!   "point_loads": ["-1;x == L;Y"]
//! }
//! ```

use crate::analysis::StaticAnalysis;
use crate::error::{Error, Result};
use crate::params::ParamKind;
use crate::solver::SolverType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProblemConfig {
    /// Mesh file, relative to the problem file.
    pub mesh: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eps: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    #[serde(default)]
    pub solver: SolverType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drilling_factor: Option<f64>,
    #[serde(default)]
    pub variables: BTreeMap<String, f64>,
    #[serde(default)]
    pub young_modulus: Vec<String>,
    #[serde(default)]
    pub poisson_ratio: Vec<String>,
    #[serde(default)]
    pub thickness: Vec<String>,
    #[serde(default)]
    pub boundary_conditions: Vec<String>,
    #[serde(default)]
    pub point_loads: Vec<String>,
    #[serde(default)]
    pub volume_loads: Vec<String>,
    #[serde(default)]
    pub surface_loads: Vec<String>,
    #[serde(default)]
    pub pressure_loads: Vec<String>,
}

impl ProblemConfig {
    /// Parse a problem from JSON text; the mesh path is kept as written.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a problem file and resolve the mesh path against its directory.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::parse(&std::fs::read_to_string(path)?)
            .map_err(|e| e.at(path.display()))?;
        if config.mesh.is_relative() {
            if let Some(dir) = path.parent() {
                config.mesh = dir.join(&config.mesh);
            }
        }
        Ok(config)
    }

    /// Condition lines grouped by kind, with the JSON field name of each group.
    pub fn conditions(&self) -> [(&'static str, ParamKind, &[String]); 8] {
        [
            ("young_modulus", ParamKind::YoungModulus, self.young_modulus.as_slice()),
            ("poisson_ratio", ParamKind::PoissonRatio, self.poisson_ratio.as_slice()),
            ("thickness", ParamKind::Thickness, self.thickness.as_slice()),
            ("boundary_conditions", ParamKind::BoundaryCondition, self.boundary_conditions.as_slice()),
            ("point_loads", ParamKind::PointLoad, self.point_loads.as_slice()),
            ("volume_loads", ParamKind::VolumeLoad, self.volume_loads.as_slice()),
            ("surface_loads", ParamKind::SurfaceLoad, self.surface_loads.as_slice()),
            ("pressure_loads", ParamKind::PressureLoad, self.pressure_loads.as_slice()),
        ]
    }

    /// Configure an analysis without loading the mesh.
    pub fn apply(&self, analysis: &mut StaticAnalysis) -> Result<()> {
        if let Some(eps) = self.eps {
            analysis.set_eps(eps)?;
        }
        if let Some(threads) = self.threads {
            analysis.set_num_threads(threads)?;
        }
        if let Some(factor) = self.drilling_factor {
            analysis.set_drilling_factor(factor)?;
        }
        analysis.set_solver(self.solver);
        for (name, &value) in &self.variables {
            analysis.add_variable(name.clone(), value);
        }
        for (field, kind, lines) in self.conditions() {
            for (i, line) in lines.iter().enumerate() {
                analysis
                    .add_condition(kind, line)
                    .map_err(|e| e.at(format!("{}[{}]", field, i)))?;
            }
        }
        Ok(())
    }

    /// Load the mesh and configure a ready-to-run analysis.
    pub fn build(&self) -> Result<StaticAnalysis> {
        if self.mesh.as_os_str().is_empty() {
            return Err(Error::Config("problem has no mesh".into()));
        }
        let mut analysis = StaticAnalysis::new();
        self.apply(&mut analysis)?;
        analysis.set_mesh(&self.mesh)?;
        Ok(analysis)
    }
}
