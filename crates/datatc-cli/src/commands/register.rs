use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use datatc_core::ProjectRegistry;

#[derive(Args)]
pub struct RegisterArgs {
    /// Project name
    pub name: String,

    /// Root directory of the project's data
    pub path: PathBuf,
}

pub fn run(args: &RegisterArgs, registry: &ProjectRegistry) -> Result<()> {
    let root = registry
        .register(&args.name, &args.path)
        .with_context(|| format!("Failed to register project '{}'", args.name))?;
    println!("Registered '{}' -> {}", args.name, root.display());
    Ok(())
}
