use anyhow::{Context, Result};
use datatc_core::ProjectRegistry;

use crate::output::format::format_projects;
use crate::output::OutputFormat;

pub fn run(registry: &ProjectRegistry, format: OutputFormat) -> Result<()> {
    let projects = registry
        .list()
        .with_context(|| format!("Failed to read {}", registry.path().display()))?;
    println!("{}", format_projects(&projects, format));
    Ok(())
}
