use anyhow::{Context, Result};
use clap::Args;
use datatc_core::ProjectRegistry;

#[derive(Args)]
pub struct UnregisterArgs {
    /// Project name
    pub name: String,
}

pub fn run(args: &UnregisterArgs, registry: &ProjectRegistry) -> Result<()> {
    let root = registry
        .remove(&args.name)
        .with_context(|| format!("Failed to unregister project '{}'", args.name))?;
    println!("Removed '{}' ({})", args.name, root.display());
    Ok(())
}
