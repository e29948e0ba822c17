use anyhow::{Context, Result};
use clap::Args;
use datatc_core::ProjectRegistry;

use crate::output::format::format_listing;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct LsArgs {
    /// Registered project name (or a directory path)
    pub project: String,

    /// Entries to descend into, matched by name or unique substring
    pub subpath: Vec<String>,

    /// Expand every directory
    #[arg(long)]
    pub full: bool,
}

pub fn run(args: &LsArgs, registry: &ProjectRegistry, format: OutputFormat) -> Result<()> {
    let root = super::open_project(registry, &args.project)?;
    let node = super::navigate(&root, &args.subpath)?;
    let listing = node
        .ls(args.full)
        .with_context(|| format!("Failed to list {}", node.path().display()))?;
    print!("{}", format_listing(&listing, format));
    Ok(())
}
