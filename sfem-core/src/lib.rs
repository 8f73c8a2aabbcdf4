//! sfem core: static linear-elastic finite element analysis.
//!
//! Given a mesh, material parameters, constraints and loads, the engine
//! assembles the symmetric system K·u = f in parallel, solves it, and
//! recovers nodal strains and stresses.
//!
//! # Architecture
//!
//! - [`expression`]: arithmetic/logical expressions for parameter values and
//!   predicates over the coordinates `x`, `y`, `z` and user variables.
//! - [`element`]: the [`FiniteElement`] trait and kernels for bars, plane
//!   stress triangles and quads, tetrahedra, hexahedra and flat shells.
//! - [`mesh`]: the [`Mesh`] model with native, Netgen and Gmsh loaders.
//! - [`params`]: parameter records ([`FemParameters`]).
//! - [`solver`] / [`sparse`]: dense and sparse Cholesky backends behind the
//!   [`Solver`] trait.
//! - [`assembly`] / [`stress`]: the parallel stages of the pipeline.
//! - [`analysis`]: the [`StaticAnalysis`] driver; [`config`] reads JSON
//!   problem files; [`output`] writes result files.
//!
//! ```no_run
//! use sfem_core::{Direction, StaticAnalysis};
//!
//! let mut analysis = StaticAnalysis::new();
//! analysis.set_mesh("plate.mesh")?;
//! analysis.add_young_modulus("203200", "")?;
//! analysis.add_poisson_ratio("0.27", "")?;
//! analysis.add_thickness("1", "")?;
//! analysis.add_boundary_condition("0", "x == 0", Direction::X | Direction::Y)?;
//! analysis.add_point_load("-1", "x == 10", Direction::Y)?;
//! let results = analysis.calculate()?;
//! println!("{}", results.summary());
//! # Ok::<(), sfem_core::Error>(())
//! ```

pub mod analysis;
pub mod assembly;
pub mod config;
pub mod element;
pub mod error;
pub mod expression;
pub mod linalg;
pub mod material;
pub mod mesh;
pub mod output;
pub mod parallel;
pub mod params;
pub mod progress;
pub mod results;
pub mod solver;
pub mod sparse;
pub mod stress;
pub mod types;

pub use analysis::StaticAnalysis;
pub use config::ProblemConfig;
pub use element::{create_element, ElementParameters, FiniteElement};
pub use error::{Error, Result};
pub use expression::Expression;
pub use material::Material;
pub use mesh::{FeType, Mesh};
pub use params::{Direction, FemParameters, ParamKind};
pub use results::{Results, Summary};
pub use solver::{Solver, SolverType};
pub use types::Point3;
