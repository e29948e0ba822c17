use anyhow::{Context, Result};
use clap::Args;
use datatc_core::ProjectRegistry;

use crate::output::format::format_paths;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct FindArgs {
    /// Registered project name (or a directory path)
    pub project: String,

    /// Case-insensitive part of the name to look for
    pub hint: String,
}

pub fn run(args: &FindArgs, registry: &ProjectRegistry, format: OutputFormat) -> Result<()> {
    let root = super::open_project(registry, &args.project)?;
    let found = root
        .find(&args.hint)
        .with_context(|| format!("Failed to search project '{}'", args.project))?;
    if found.is_empty() {
        anyhow::bail!("Nothing in '{}' matches '{}'", args.project, args.hint);
    }
    println!("{}", format_paths(&found, format));
    Ok(())
}
