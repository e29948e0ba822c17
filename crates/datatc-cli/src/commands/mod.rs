pub mod find;
pub mod info;
pub mod latest;
pub mod ls;
pub mod projects;
pub mod register;
pub mod unregister;

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;
use datatc_core::{DataContext, DirectoryNode, ProjectRegistry};

#[derive(Subcommand)]
pub enum Commands {
    /// List registered projects
    Projects,
    /// Register a project name for a data directory
    Register(register::RegisterArgs),
    /// Forget a registered project
    Unregister(unregister::UnregisterArgs),
    /// List a project's data tree
    Ls(ls::LsArgs),
    /// Print the most recent entry of a directory
    Latest(latest::LatestArgs),
    /// Show the transform history of a self-aware unit
    Info(info::InfoArgs),
    /// Search a project for entries whose name contains a hint
    Find(find::FindArgs),
}

pub fn registry(path: Option<&Path>) -> Result<ProjectRegistry> {
    match path {
        Some(path) => Ok(ProjectRegistry::open(path)),
        None => ProjectRegistry::open_default().context("Failed to locate the project registry"),
    }
}

pub fn open_project(registry: &ProjectRegistry, project: &str) -> Result<DirectoryNode> {
    let root = DirectoryNode::open_project(project, registry, DataContext::default().into_shared())
        .with_context(|| format!("Failed to open project '{project}'"))?;
    tracing::debug!("Opened project '{project}' at {}", root.path().display());
    Ok(root)
}

/// Follow `subpath` from `root` one selection at a time.
pub fn navigate<'a>(root: &'a DirectoryNode, subpath: &[String]) -> Result<&'a DirectoryNode> {
    let mut node = root;
    for hint in subpath {
        node = node
            .get(hint)
            .with_context(|| format!("Failed to select '{hint}' in {}", node.breadcrumb()))?;
    }
    Ok(node)
}
