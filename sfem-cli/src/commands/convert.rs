//! Mesh conversion to the native `.mesh` format.

use anyhow::{bail, Context, Result};
use clap::Args;
use sfem_core::Mesh;
use std::path::PathBuf;

#[derive(Args)]
pub struct ConvertArgs {
    /// Input mesh (.mesh, .vol or .msh)
    pub input: PathBuf,

    /// Output file (.mesh)
    pub output: PathBuf,
}

pub fn execute(args: ConvertArgs) -> Result<()> {
    if args.output.extension().and_then(|e| e.to_str()) != Some("mesh") {
        bail!("output must be a .mesh file: {}", args.output.display());
    }
    let mesh = Mesh::load(&args.input)
        .with_context(|| format!("failed to load {}", args.input.display()))?;
    mesh.save(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!(
        "converted {} -> {} ({}, {} elements)",
        args.input.display(),
        args.output.display(),
        mesh.fe_type(),
        mesh.n_elements()
    );
    Ok(())
}
