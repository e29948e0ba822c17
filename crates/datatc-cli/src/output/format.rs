use std::path::{Path, PathBuf};

use datatc_core::provenance::UnitInfo;
use datatc_core::Listing;
use serde_json::json;

use super::OutputFormat;

pub fn format_projects(projects: &[(String, PathBuf)], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let map: serde_json::Map<String, serde_json::Value> = projects
                .iter()
                .map(|(name, path)| (name.clone(), json!(path.display().to_string())))
                .collect();
            serde_json::to_string_pretty(&map).unwrap_or_default()
        }
        OutputFormat::Text => format_projects_text(projects),
    }
}

fn format_projects_text(projects: &[(String, PathBuf)]) -> String {
    if projects.is_empty() {
        return "No projects registered.".to_string();
    }
    let width = projects.iter().map(|(n, _)| n.len()).max().unwrap_or(0);
    projects
        .iter()
        .map(|(name, path)| format!("{name:<width$}  {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_listing(listing: &Listing, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let mut out = serde_json::to_string_pretty(listing).unwrap_or_default();
            out.push('\n');
            out
        }
        OutputFormat::Text => listing.to_string(),
    }
}

pub fn format_path(path: &Path, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => json!({ "path": path.display().to_string() }).to_string(),
        OutputFormat::Text => path.display().to_string(),
    }
}

pub fn format_paths(paths: &[PathBuf], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let list: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            serde_json::to_string_pretty(&list).unwrap_or_default()
        }
        OutputFormat::Text => paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_unit_info(info: &UnitInfo, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => {
            let steps: Vec<_> = info
                .provenance
                .transform_steps
                .iter()
                .map(|r| r.info())
                .collect();
            let value = json!({
                "path": info.path.display().to_string(),
                "tag": info.tag(),
                "interface_version": info.provenance.interface_version,
                "data_file": info.provenance.data_file,
                "source_file": info.provenance.source_file,
                "steps": steps,
            });
            let mut out = serde_json::to_string_pretty(&value).unwrap_or_default();
            out.push('\n');
            out
        }
        OutputFormat::Text => format_unit_info_text(info),
    }
}

fn format_unit_info_text(info: &UnitInfo) -> String {
    let mut out = String::new();
    out.push_str(&format!("Unit:  {}\n", info.path.display()));
    if let Some(tag) = info.tag() {
        out.push_str(&format!("Tag:   {tag}\n"));
    }
    out.push_str(&format!(
        "Data:  {} ({})\n",
        info.provenance.data_file,
        info.data_type()
    ));
    out.push_str(&format!(
        "Steps: {}\n\n",
        info.provenance.transform_steps.len()
    ));
    out.push_str(&info.view_steps());
    out
}
