//! Reading and writing local `*.site.json` project files.

use anyhow::{anyhow, Context, Result};
use sitecraft_document::{check_invariants, Project};
use sitecraft_plans::{PlanCatalog, PlanTier, UsageSnapshot};
use sitecraft_workspace::PROJECT_FILE_SUFFIX;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `path` itself when it is a file, otherwise every project file below it
pub fn find_site_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.exists() {
        return Err(anyhow!("Path does not exist: {}", path.display()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(PROJECT_FILE_SUFFIX) && !n.starts_with('.'))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Parse a project file; block payloads are schema-checked while parsing
pub fn read_project(path: &Path) -> Result<Project> {
    let content = fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let project: Project =
        serde_json::from_str(&content).with_context(|| format!("Invalid project file {}", path.display()))?;
    check_invariants(&project).with_context(|| format!("Invalid project file {}", path.display()))?;
    Ok(project)
}

/// Write through a temp file and rename, so a crash never leaves half a file
pub fn write_project(path: &Path, project: &Project) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid project path: {}", path.display()))?;
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    fs::write(&tmp, serde_json::to_string_pretty(project)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Usage for local checks: the project counts as the customer's only site
pub fn local_usage(project: &Project, plan: PlanTier) -> UsageSnapshot {
    UsageSnapshot::new(project.customer_id.clone(), plan, 1).with_pages(project.id.clone(), project.pages.len() as u32)
}

/// Keep the catalog alongside the usage it is checked against
pub struct LocalPlan {
    pub catalog: PlanCatalog,
    pub usage: UsageSnapshot,
}

impl LocalPlan {
    pub fn new(project: &Project, plan: PlanTier, catalog: PlanCatalog) -> Self {
        Self {
            catalog,
            usage: local_usage(project, plan),
        }
    }

    pub fn gate(&self) -> sitecraft_plans::PlanGate<'_, UsageSnapshot> {
        sitecraft_plans::PlanGate::new(&self.catalog, &self.usage)
    }
}
