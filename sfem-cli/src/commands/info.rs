//! Mesh statistics.

use anyhow::{Context, Result};
use clap::Args;
use sfem_core::Mesh;
use std::path::PathBuf;

#[derive(Args)]
pub struct InfoArgs {
    /// Mesh file (.mesh, .vol or .msh)
    pub mesh: PathBuf,

    /// Also check that every element has a positive measure
    #[arg(long)]
    pub validate: bool,
}

pub fn execute(args: InfoArgs) -> Result<()> {
    let mesh = Mesh::load(&args.mesh)
        .with_context(|| format!("failed to load {}", args.mesh.display()))?;

    println!("Element type:       {} ({})", mesh.fe_type(), mesh.fe_type().name());
    println!("Vertices:           {}", mesh.n_nodes());
    println!("Elements:           {}", mesh.n_elements());
    println!("Boundary elements:  {}", mesh.n_boundary_elements());
    println!("Degrees of freedom: {}", mesh.n_nodes() * mesh.dof());
    if let Some((min, max)) = mesh.bounds() {
        let dim = mesh.dim();
        println!("Bounds min:         {:?}", &min.as_slice()[..dim]);
        println!("Bounds max:         {:?}", &max.as_slice()[..dim]);
    }

    if args.validate {
        mesh.validate().context("mesh validation failed")?;
        println!("Mesh is valid");
    }
    Ok(())
}
