//! Run an analysis from a JSON problem file.

use anyhow::{Context, Result};
use clap::Args;
use sfem_core::{ProblemConfig, SolverType};
use std::path::PathBuf;

#[derive(Args)]
pub struct RunArgs {
    /// Problem file (JSON)
    pub problem: PathBuf,

    /// Result file; defaults to the problem file with a `.res` extension
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Worker threads per assembly stage
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Tolerance below which strains and stresses are snapped to zero
    #[arg(long)]
    pub eps: Option<f64>,

    /// Linear solver backend
    #[arg(long, value_parser = parse_solver)]
    pub solver: Option<SolverType>,
}

fn parse_solver(s: &str) -> std::result::Result<SolverType, String> {
    s.parse().map_err(|e: sfem_core::Error| e.to_string())
}

pub fn execute(args: RunArgs) -> Result<()> {
    let mut config = ProblemConfig::from_file(&args.problem)
        .with_context(|| format!("failed to read problem {}", args.problem.display()))?;
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.eps.is_some() {
        config.eps = args.eps;
    }
    if let Some(solver) = args.solver {
        config.solver = solver;
    }

    let mut analysis = config
        .build()
        .with_context(|| format!("failed to set up {}", args.problem.display()))?;
    let results = analysis.calculate().context("analysis failed")?;
    print!("{}", results.summary());

    let output = args
        .output
        .unwrap_or_else(|| args.problem.with_extension("res"));
    analysis
        .save_result(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}
