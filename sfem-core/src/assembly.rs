//! Parallel assembly of the global system.
//!
//! Each stage runs through [`fan_in`]: workers compute per-item
//! contributions (element stiffness matrices, load vectors, constrained
//! dofs) from the read-only mesh and parameters, and the calling thread
//! scatters them into the solver.
//!
//! Stage order is fixed by [`crate::analysis::StaticAnalysis`]: stiffness,
//! point loads, volume loads, surface and pressure loads, boundary
//! conditions. Load and boundary stages are skipped when no parameter of
//! their kind exists.

use crate::element::{create_element, ElementParameters, FiniteElement};
use crate::error::{Error, Result};
use crate::material::Material;
use crate::mesh::{FeType, Mesh};
use crate::parallel::fan_in;
use crate::params::{Direction, FemParameters, ParamKind};
use crate::solver::Solver;
use nalgebra::DVector;

/// Load vector contributions `(equation, value)`.
type Contributions = Vec<(usize, f64)>;

/// Whether elements of `fe_type` need a thickness (cross-section area for bars).
pub fn needs_thickness(fe_type: FeType) -> bool {
    fe_type.dim() < 3 || fe_type.is_shell()
}

/// Check that the material parameters `fe_type` requires are configured.
pub fn check_required_parameters(fe_type: FeType, params: &FemParameters) -> Result<()> {
    let mut required = vec![(ParamKind::YoungModulus, "Young's modulus")];
    if fe_type != FeType::Bar2 {
        required.push((ParamKind::PoissonRatio, "Poisson's ratio"));
    }
    if needs_thickness(fe_type) {
        required.push((ParamKind::Thickness, "thickness"));
    }
    for (kind, name) in required {
        if !params.find_parameter(kind) {
            return Err(Error::Config(format!(
                "{} is required for {} elements",
                name, fe_type
            )));
        }
    }
    Ok(())
}

/// Equation numbers of the nodes of one element.
pub fn element_dofs(nodes: &[usize], dof: usize) -> Vec<usize> {
    nodes
        .iter()
        .flat_map(|&n| (0..dof).map(move |d| n * dof + d))
        .collect()
}

fn push_directed(
    out: &mut Contributions,
    vertex: usize,
    dof: usize,
    dim: usize,
    direction: Direction,
    vector: [f64; 3],
) {
    out.extend(direction.axes(dim).map(|l| (vertex * dof + l, vector[l])));
}

/// Read-only assembly context shared by the workers.
pub struct Assembler<'a> {
    mesh: &'a Mesh,
    params: &'a FemParameters,
    drilling_factor: f64,
}

impl<'a> Assembler<'a> {
    pub fn new(mesh: &'a Mesh, params: &'a FemParameters, drilling_factor: f64) -> Self {
        Self {
            mesh,
            params,
            drilling_factor,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        self.mesh
    }

    pub fn params(&self) -> &FemParameters {
        self.params
    }

    fn threads(&self) -> usize {
        self.params.threads()
    }

    /// Material and thickness of element `index`, evaluated at its centroid.
    pub fn element_parameters(&self, index: usize) -> Result<ElementParameters> {
        let fe_type = self.mesh.fe_type();
        let center = self.mesh.fe_center(index);
        let e = self.params.get_param_value(&center, ParamKind::YoungModulus)?;
        let nu = self.params.get_param_value(&center, ParamKind::PoissonRatio)?;
        let thickness = if needs_thickness(fe_type) {
            let t = self.params.get_param_value(&center, ParamKind::Thickness)?;
            if !(t > 0.0) {
                return Err(Error::Config(format!("thickness must be positive, got {}", t)));
            }
            t
        } else {
            1.0
        };
        Ok(ElementParameters {
            material: Material::new(e, nu)?,
            thickness,
            drilling_factor: self.drilling_factor,
        })
    }

    /// Element kernel for element `index`.
    pub fn element(&self, index: usize) -> Result<Box<dyn FiniteElement>> {
        let build = || {
            let params = self.element_parameters(index)?;
            create_element(self.mesh.fe_type(), &self.mesh.fe_coord(index), &params)
        };
        build().map_err(|e| e.at(format!("element {}", index)))
    }

    /// Assemble the global stiffness matrix.
    pub fn stiffness(&self, solver: &mut dyn Solver) -> Result<()> {
        let dof = self.mesh.dof();
        fan_in(
            "Assembling global stiffness matrix",
            self.threads(),
            self.mesh.n_elements(),
            |j| self.element(j)?.stiffness().map_err(|e| e.at(format!("element {}", j))),
            |j, k| {
                let dofs = element_dofs(&self.mesh.elements()[j], dof);
                for (a, &row) in dofs.iter().enumerate() {
                    for (b, &col) in dofs.iter().enumerate() {
                        solver.add_matrix(row, col, k[(a, b)])?;
                    }
                }
                Ok(())
            },
        )
    }

    fn add_contributions(
        &self,
        stage: &str,
        count: usize,
        solver: &mut dyn Solver,
        produce: impl Fn(usize) -> Result<Contributions> + Sync,
    ) -> Result<()> {
        let mut unmatched = true;
        fan_in(stage, self.threads(), count, produce, |_, items| {
            unmatched &= items.is_empty();
            for (i, value) in items {
                solver.add_vector(i, value)?;
            }
            Ok(())
        })?;
        if unmatched && count > 0 {
            log::warn!("{}: no parameter matched any item", stage);
        }
        Ok(())
    }

    /// Concentrated loads at the vertices.
    pub fn point_loads(&self, solver: &mut dyn Solver) -> Result<()> {
        if !self.params.find_parameter(ParamKind::PointLoad) {
            return Ok(());
        }
        let (dof, dim) = (self.mesh.dof(), self.mesh.dim());
        self.add_contributions("Computing point loads", self.mesh.n_nodes(), solver, |v| {
            let env = self.params.environment(self.mesh.coords(v));
            let mut out = Vec::new();
            for param in self.params.of_kind(ParamKind::PointLoad) {
                if param.applies(&env)? {
                    let value = param.value(&env)?;
                    push_directed(&mut out, v, dof, dim, param.direction(), [value; 3]);
                }
            }
            Ok(out)
        })
        .map_err(|e| e.at("point loads"))
    }

    /// Volume loads, spread equally over the element nodes.
    pub fn volume_loads(&self, solver: &mut dyn Solver) -> Result<()> {
        if !self.params.find_parameter(ParamKind::VolumeLoad) {
            return Ok(());
        }
        let (dof, dim) = (self.mesh.dof(), self.mesh.dim());
        self.add_contributions("Computing volume loads", self.mesh.n_elements(), solver, |j| {
            let center = self.mesh.fe_center(j);
            let env = self.params.environment(&center);
            let nodes = &self.mesh.elements()[j];
            let share = self.mesh.fe_volume(j) / nodes.len() as f64;
            let mut out = Vec::new();
            for param in self.params.of_kind(ParamKind::VolumeLoad) {
                if param.applies(&env)? {
                    let value = param.value(&env)? * share;
                    for &n in nodes {
                        push_directed(&mut out, n, dof, dim, param.direction(), [value; 3]);
                    }
                }
            }
            Ok(out)
        })
        .map_err(|e| e.at("volume loads"))
    }

    /// Surface and pressure loads on boundary elements whose every node satisfies the predicate.
    ///
    /// Pressure acts along the outward normal; surface loads act along the
    /// selected axes. The value is evaluated at the first node.
    pub fn surface_loads(&self, solver: &mut dyn Solver) -> Result<()> {
        let is_surface = |kind: ParamKind| matches!(kind, ParamKind::SurfaceLoad | ParamKind::PressureLoad);
        if !self.params.params().iter().any(|p| is_surface(p.kind())) {
            return Ok(());
        }
        let (dof, dim) = (self.mesh.dof(), self.mesh.dim());
        let count = self.mesh.n_boundary_elements();
        self.add_contributions("Computing surface loads", count, solver, |j| {
            let nodes = &self.mesh.boundary_elements()[j];
            let share = self.mesh.be_volume(j) / nodes.len() as f64;
            let mut out = Vec::new();
            for param in self.params.params().iter().filter(|p| is_surface(p.kind())) {
                let mut applies = true;
                for &n in nodes {
                    if !param.applies(&self.params.environment(self.mesh.coords(n)))? {
                        applies = false;
                        break;
                    }
                }
                if !applies {
                    continue;
                }
                let value = param.value(&self.params.environment(self.mesh.coords(nodes[0])))?;
                let axis = if param.kind() == ParamKind::PressureLoad {
                    self.mesh.be_normal(j)
                } else {
                    nalgebra::Vector3::new(1.0, 1.0, 1.0)
                };
                let vector = [0, 1, 2].map(|l| axis[l] * value * share);
                for &n in nodes {
                    push_directed(&mut out, n, dof, dim, param.direction(), vector);
                }
            }
            Ok(out)
        })
        .map_err(|e| e.at("surface loads"))
    }

    /// Dirichlet conditions at the vertices.
    ///
    /// Each equation is constrained once, with the value of the first record
    /// (in insertion order) that matches the vertex on that axis.
    pub fn boundary_conditions(&self, solver: &mut dyn Solver) -> Result<()> {
        if !self.params.find_parameter(ParamKind::BoundaryCondition) {
            return Ok(());
        }
        let (dof, dim) = (self.mesh.dof(), self.mesh.dim());
        let mut constrained = 0usize;
        fan_in(
            "Applying boundary conditions",
            self.threads(),
            self.mesh.n_nodes(),
            |v| {
                let env = self.params.environment(self.mesh.coords(v));
                let mut out: Contributions = Vec::new();
                for param in self.params.of_kind(ParamKind::BoundaryCondition) {
                    if param.applies(&env)? {
                        let value = param.value(&env)?;
                        // First matching record per equation wins.
                        for l in param.direction().axes(dim) {
                            let i = v * dof + l;
                            if !out.iter().any(|&(j, _)| j == i) {
                                out.push((i, value));
                            }
                        }
                    }
                }
                Ok(out)
            },
            |_, items: Contributions| {
                for (i, value) in items {
                    solver.set_boundary_condition(i, value)?;
                    constrained += 1;
                }
                Ok(())
            },
        )
        .map_err(|e| e.at("boundary conditions"))?;

        if constrained == 0 {
            log::warn!("boundary conditions matched no vertex; the system is likely singular");
        } else {
            log::debug!("{} equations constrained", constrained);
        }
        Ok(())
    }

    /// Displacements of the nodes of element `index`.
    pub fn element_displacements(&self, index: usize, u: &DVector<f64>) -> DVector<f64> {
        let dofs = element_dofs(&self.mesh.elements()[index], self.mesh.dof());
        DVector::from_iterator(dofs.len(), dofs.iter().map(|&i| u[i]))
    }
}
