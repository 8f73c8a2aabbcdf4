//! Static analysis driver.
//!
//! [`StaticAnalysis`] collects the mesh, the parameter records and the run
//! settings, then runs the pipeline: global stiffness, point loads, volume
//! loads, surface and pressure loads, boundary conditions, solve, strain and
//! stress recovery.

use crate::assembly::{check_required_parameters, Assembler};
use crate::element::DEFAULT_DRILLING_FACTOR;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::output::save_results;
use crate::params::{parse_condition, Direction, FemParameters, ParamKind};
use crate::results::Results;
use crate::solver::{create_solver, SolverType};
use crate::stress::recover;
use std::path::Path;
use std::time::Instant;

/// Whether records of `kind` act along coordinate axes.
pub fn is_directional(kind: ParamKind) -> bool {
    matches!(
        kind,
        ParamKind::BoundaryCondition
            | ParamKind::PointLoad
            | ParamKind::VolumeLoad
            | ParamKind::SurfaceLoad
    )
}

/// A static linear-elastic analysis of one mesh.
///
/// Holds the mesh, the parameter records (materials, loads, boundary
/// conditions), the run settings and the results of the last successful
/// [`calculate`](Self::calculate).
///
/// # Example
///
/// ```ignore
/// let mut analysis = StaticAnalysis::new();
/// analysis.set_mesh("beam.mesh")?;
/// analysis.add_young_modulus("203200", "")?;
/// analysis.add_thickness("1", "")?;
/// analysis.add_boundary_condition("0", "x == 0", Direction::ALL)?;
/// analysis.add_point_load("-1", "x == 10", Direction::Y)?;
/// let results = analysis.calculate()?;
/// println!("{}", results.summary());
/// analysis.save_result("beam.res")?;
/// ```
#[derive(Debug, Clone)]
pub struct StaticAnalysis {
    mesh: Option<Mesh>,
    params: FemParameters,
    solver: SolverType,
    drilling_factor: f64,
    results: Option<Results>,
}

impl Default for StaticAnalysis {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticAnalysis {
    /// Empty analysis: no mesh, no records, dense solver, ε = 1e-10 and one
    /// worker per rayon thread.
    pub fn new() -> Self {
        Self {
            mesh: None,
            params: FemParameters::new(),
            solver: SolverType::default(),
            drilling_factor: DEFAULT_DRILLING_FACTOR,
            results: None,
        }
    }

    /// Analysis of an already built mesh.
    pub fn with_mesh(mesh: Mesh) -> Self {
        let mut analysis = Self::new();
        analysis.mesh = Some(mesh);
        analysis
    }

    /// Load the mesh from a `.mesh`, `.vol` or `.msh` file.
    ///
    /// Replaces any previous mesh and discards earlier results. Parameter
    /// records and settings are kept.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `MeshFormat` if it is malformed or the
    /// extension is unknown.
    pub fn set_mesh(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.mesh = Some(Mesh::load(path)?);
        self.results = None;
        Ok(())
    }

    /// The loaded mesh, if any.
    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    /// Parameter records, variables and run settings.
    pub fn params(&self) -> &FemParameters {
        &self.params
    }

    /// Tolerance below which recovered strains and stresses snap to zero.
    ///
    /// # Errors
    ///
    /// `Config` unless `eps` is positive and finite.
    pub fn set_eps(&mut self, eps: f64) -> Result<()> {
        self.params.set_eps(eps)
    }

    /// Number of worker threads of every assembly and recovery stage.
    ///
    /// # Errors
    ///
    /// `Config` if `threads` is zero.
    pub fn set_num_threads(&mut self, threads: usize) -> Result<()> {
        self.params.set_threads(threads)
    }

    /// Linear solver backend used by the next run.
    pub fn set_solver(&mut self, solver: SolverType) {
        self.solver = solver;
    }

    /// Selected solver backend.
    pub fn solver(&self) -> SolverType {
        self.solver
    }

    /// Drilling stiffness factor of shell elements, relative to the largest
    /// diagonal entry of the element stiffness.
    ///
    /// # Errors
    ///
    /// `Config` unless `factor` is positive and finite.
    pub fn set_drilling_factor(&mut self, factor: f64) -> Result<()> {
        if !(factor > 0.0 && factor.is_finite()) {
            return Err(Error::Config(format!(
                "drilling factor must be positive, got {}",
                factor
            )));
        }
        self.drilling_factor = factor;
        Ok(())
    }

    /// Define a named scalar usable in every value and predicate expression.
    /// Redefining a name replaces its value.
    pub fn add_variable(&mut self, name: impl Into<String>, value: f64) {
        self.params.add_variable(name, value);
    }

    /// Young's modulus `value` where `predicate` holds (everywhere if empty).
    ///
    /// Material records are resolved per element at its centroid; the first
    /// record whose predicate holds wins.
    ///
    /// # Errors
    ///
    /// `Parse` if either expression is malformed.
    pub fn add_young_modulus(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.params.add_young_modulus(value, predicate)
    }

    /// Poisson's ratio, resolved like [`add_young_modulus`](Self::add_young_modulus).
    pub fn add_poisson_ratio(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.params.add_poisson_ratio(value, predicate)
    }

    /// Thickness of plane and shell elements, or the cross-section area of bars.
    pub fn add_thickness(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.params.add_thickness(value, predicate)
    }

    /// Prescribed displacement `value` along `direction` at every vertex where
    /// `predicate` holds.
    ///
    /// When several records match the same vertex and axis, the first one
    /// added is applied.
    pub fn add_boundary_condition(
        &mut self,
        value: &str,
        predicate: &str,
        direction: Direction,
    ) -> Result<()> {
        self.params.add_boundary_condition(value, predicate, direction)
    }

    /// Nodal force along `direction` at every vertex where `predicate` holds.
    /// Matching records add up.
    pub fn add_point_load(&mut self, value: &str, predicate: &str, direction: Direction) -> Result<()> {
        self.params.add_point_load(value, predicate, direction)
    }

    /// Force per unit volume (per unit area for plane and shell elements,
    /// per unit length for bars), distributed equally to the element nodes.
    pub fn add_volume_load(&mut self, value: &str, predicate: &str, direction: Direction) -> Result<()> {
        self.params.add_volume_load(value, predicate, direction)
    }

    /// Force per unit area on boundary elements whose nodes all satisfy
    /// `predicate`.
    pub fn add_surface_load(
        &mut self,
        value: &str,
        predicate: &str,
        direction: Direction,
    ) -> Result<()> {
        self.params.add_surface_load(value, predicate, direction)
    }

    /// Pressure along the outward normal of matching boundary elements.
    pub fn add_pressure_load(&mut self, value: &str, predicate: &str) -> Result<()> {
        self.params.add_pressure_load(value, predicate)
    }

    /// Add a record of `kind` from a `value;predicate;directions` line.
    ///
    /// Loads and boundary conditions need at least one direction; material
    /// records must not carry one. Pressure always acts along the normal.
    pub fn add_condition(&mut self, kind: ParamKind, line: &str) -> Result<()> {
        let (value, predicate, direction) = parse_condition(line)?;
        let direction = match kind {
            ParamKind::PressureLoad => Direction::ALL,
            _ if is_directional(kind) && direction.is_empty() => {
                return Err(Error::Config(format!(
                    "{:?} '{}' needs at least one direction",
                    kind, line
                )))
            }
            _ if !is_directional(kind) && !direction.is_empty() => {
                return Err(Error::Config(format!(
                    "{:?} '{}' does not take directions",
                    kind, line
                )))
            }
            _ => direction,
        };
        self.params.add_param(kind, &value, &predicate, direction)
    }

    /// Run the analysis.
    ///
    /// Stages run in order: global stiffness, point loads, volume loads,
    /// surface and pressure loads, boundary conditions, solve, then strain and
    /// stress recovery with nodal averaging.
    ///
    /// # Returns
    ///
    /// The nodal results, also kept for [`results`](Self::results) and
    /// [`save_result`](Self::save_result).
    ///
    /// # Errors
    ///
    /// `Config` without a mesh or a required material record, `Evaluation` when
    /// an expression fails at some point, `Numeric` for a singular or
    /// degenerate system. Any failure aborts the run; the partial system is
    /// dropped and previous results are cleared.
    pub fn calculate(&mut self) -> Result<&Results> {
        self.results = None;
        let start = Instant::now();
        log::info!("Using {} threads", self.params.threads());

        let mesh = self
            .mesh
            .as_mut()
            .ok_or_else(|| Error::Config("no mesh loaded".into()))?;
        mesh.create_mesh_map();
        let mesh = &*mesh;
        check_required_parameters(mesh.fe_type(), &self.params)?;

        let assembler = Assembler::new(mesh, &self.params, self.drilling_factor);
        let mut solver = create_solver(self.solver, mesh)?;
        assembler.stiffness(solver.as_mut())?;
        assembler.point_loads(solver.as_mut())?;
        assembler.volume_loads(solver.as_mut())?;
        assembler.surface_loads(solver.as_mut())?;
        assembler.boundary_conditions(solver.as_mut())?;

        let solve_start = Instant::now();
        log::info!("Solving {} equations ({})", solver.size(), solver.name());
        let u = solver.solve()?;
        log::info!(
            "Solving: done in {:.3} sec",
            solve_start.elapsed().as_secs_f64()
        );

        let results = Results::new(mesh.fe_type(), recover(&assembler, &u)?)?;
        for line in results.summary().to_string().lines() {
            log::info!("{}", line);
        }
        log::info!("Total time: {:.3} sec", start.elapsed().as_secs_f64());
        Ok(self.results.insert(results))
    }

    /// Results of the last successful run.
    pub fn results(&self) -> Option<&Results> {
        self.results.as_ref()
    }

    /// Write the result file of the last successful run.
    ///
    /// # Errors
    ///
    /// `Config` if nothing has been calculated yet, `Io` on write failure.
    pub fn save_result(&self, path: impl AsRef<Path>) -> Result<()> {
        match (&self.mesh, &self.results) {
            (Some(mesh), Some(results)) => save_results(path, mesh, results),
            _ => Err(Error::Config("no results to save; run the analysis first".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::FeType;
    use crate::types::Point3;
    use approx::assert_relative_eq;

    fn bar(n: usize) -> Mesh {
        let mut mesh = Mesh::new(FeType::Bar2);
        for i in 0..=n {
            mesh.add_node(Point3::new(i as f64 / n as f64, 0.0, 0.0));
        }
        for i in 0..n {
            mesh.add_element(vec![i, i + 1]).unwrap();
        }
        mesh
    }

    #[test]
    fn test_bar_under_tip_load() {
        let mut analysis = StaticAnalysis::with_mesh(bar(5));
        analysis.add_variable("F", 2.0);
        analysis.add_young_modulus("100", "").unwrap();
        analysis.add_thickness("0.5", "").unwrap();
        analysis.add_condition(ParamKind::BoundaryCondition, "0;x == 0;X").unwrap();
        analysis.add_condition(ParamKind::PointLoad, "F;x == 1;x").unwrap();
        analysis.set_num_threads(2).unwrap();

        let results = analysis.calculate().unwrap();
        // u = F x / (E A)
        for v in 0..=5 {
            let x = v as f64 / 5.0;
            assert_relative_eq!(results.value("U", v).unwrap(), 2.0 * x / 50.0, epsilon = 1e-12);
            assert_relative_eq!(results.value("Sxx", v).unwrap(), 4.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_displacements_below_eps_are_reported() {
        // Stiff steel bar: tip displacement 5e-11 is below the default eps.
        let mut analysis = StaticAnalysis::with_mesh(bar(1));
        analysis.add_young_modulus("2e11", "").unwrap();
        analysis.add_thickness("1", "").unwrap();
        analysis.add_condition(ParamKind::BoundaryCondition, "0;x == 0;X").unwrap();
        analysis.add_condition(ParamKind::PointLoad, "10;x == 1;X").unwrap();

        let results = analysis.calculate().unwrap();
        assert_relative_eq!(results.value("U", 1).unwrap(), 5e-11, max_relative = 1e-9);
        assert_relative_eq!(results.value("Sxx", 1).unwrap(), 10.0, max_relative = 1e-9);
        assert_eq!(results.value("Exx", 1).unwrap(), 0.0);
    }

    #[test]
    fn test_first_boundary_condition_wins() {
        let mut analysis = StaticAnalysis::with_mesh(bar(2));
        analysis.add_young_modulus("1", "").unwrap();
        analysis.add_thickness("1", "").unwrap();
        analysis.add_condition(ParamKind::BoundaryCondition, "0.25;x == 0;X").unwrap();
        analysis.add_condition(ParamKind::BoundaryCondition, "5;x < 0.1;X").unwrap();
        analysis.add_condition(ParamKind::PointLoad, "1;x == 1;X").unwrap();

        let results = analysis.calculate().unwrap();
        assert_relative_eq!(results.value("U", 0).unwrap(), 0.25, epsilon = 1e-12);
        assert_relative_eq!(results.value("U", 2).unwrap(), 1.25, epsilon = 1e-12);
        assert_relative_eq!(results.value("Sxx", 1).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_missing_mesh_and_parameters() {
        let mut analysis = StaticAnalysis::new();
        assert!(matches!(analysis.calculate(), Err(Error::Config(_))));

        let mut analysis = StaticAnalysis::with_mesh(bar(2));
        analysis.add_young_modulus("1", "").unwrap();
        assert!(matches!(analysis.calculate(), Err(Error::Config(_))));
        assert!(analysis.results().is_none());
        assert!(analysis.save_result("unused.res").is_err());
    }

    #[test]
    fn test_unconstrained_system_fails() {
        let mut analysis = StaticAnalysis::with_mesh(bar(1));
        analysis.add_young_modulus("1", "").unwrap();
        analysis.add_thickness("1", "").unwrap();
        analysis.add_point_load("1", "x == 1", Direction::X).unwrap();
        assert!(matches!(analysis.calculate(), Err(Error::Numeric(_))));
    }

    #[test]
    fn test_condition_directions_are_checked() {
        let mut analysis = StaticAnalysis::new();
        assert!(analysis.add_condition(ParamKind::PointLoad, "1;x > 0").is_err());
        assert!(analysis.add_condition(ParamKind::YoungModulus, "1;;X").is_err());
        assert!(analysis.add_condition(ParamKind::PressureLoad, "1;y == 0").is_ok());
        assert!(analysis.add_condition(ParamKind::Thickness, "0.1").is_ok());
        assert_eq!(analysis.params().params()[0].direction(), Direction::ALL);
    }

    #[test]
    fn test_settings_are_validated() {
        let mut analysis = StaticAnalysis::new();
        assert!(analysis.set_eps(0.0).is_err());
        assert!(analysis.set_num_threads(0).is_err());
        assert!(analysis.set_drilling_factor(-1.0).is_err());
        analysis.set_solver(SolverType::Sparse);
        assert_eq!(analysis.solver(), SolverType::Sparse);
    }
}
