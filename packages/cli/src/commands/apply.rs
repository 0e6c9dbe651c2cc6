use crate::config::Config;
use crate::site_files::{read_project, write_project, LocalPlan};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use sitecraft_document::{Document, Project};
use sitecraft_editor::{ApplyReport, Changeset, EditSession, GateContext, OperationId};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Project file to edit
    pub project: String,

    /// Changeset JSON file
    pub changeset: String,

    /// Only accept these operation ids; the rest are dismissed
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Show the outcome without writing the project file
    #[arg(long)]
    pub dry_run: bool,
}

pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let project_path = PathBuf::from(cwd).join(&args.project);
    let changeset_path = PathBuf::from(cwd).join(&args.changeset);

    let project = read_project(&project_path)?;
    let changeset: Changeset = serde_json::from_str(
        &fs::read_to_string(&changeset_path).with_context(|| format!("Cannot read {}", changeset_path.display()))?,
    )
    .with_context(|| format!("Invalid changeset {}", changeset_path.display()))?;

    let changeset_id = changeset.id.clone();
    let total = changeset.operations.len();

    println!(
        "{} changeset {} ({} operations)",
        "🔧 Applying".bright_blue().bold(),
        changeset_id,
        total
    );

    let report = apply_changeset(project, changeset, &args.only, &config)?;

    for op_id in &report.applied {
        println!("  {} {}", "✓".green(), op_id);
    }
    for op_id in &report.skipped {
        println!("  {} {} {}", "-".dimmed(), op_id, "(dismissed)".dimmed());
    }
    for rejection in &report.rejected {
        println!("  {} {} - {}", "✗".red(), rejection.operation, rejection.error.to_string().red());
    }

    println!();
    if args.dry_run {
        println!("{} Dry run, {} not written", "ℹ️".bright_blue(), args.project);
    } else if report.applied.is_empty() {
        println!("{} Nothing applied", "⚠️".yellow());
    } else {
        write_project(&project_path, report.document.project())?;
        println!(
            "{} Applied {} of {} operations to {}",
            "✅".green(),
            report.applied.len(),
            total,
            args.project
        );
    }

    Ok(())
}

/// Propose `changeset` against `project`, dismiss everything not listed in
/// `only` (when given) and accept the rest under the configured plan
pub fn apply_changeset(project: Project, changeset: Changeset, only: &[String], config: &Config) -> Result<ApplyReport> {
    let plan = LocalPlan::new(&project, config.plan, config.catalog());
    let gate = plan.gate();
    let ctx = GateContext::new(project.customer_id.clone(), &gate);

    let changeset_id = changeset.id.clone();
    let proposed: Vec<OperationId> = changeset.operations.iter().map(|op| op.id.clone()).collect();
    for only in only {
        if !proposed.iter().any(|id| id.as_str() == only) {
            return Err(anyhow!("Operation {only} is not part of changeset {changeset_id}"));
        }
    }

    let mut session = EditSession::new(Document::new(project)?);
    session.propose(changeset)?;

    if !only.is_empty() {
        for op_id in &proposed {
            if !only.iter().any(|o| o == op_id.as_str()) {
                session.dismiss(op_id)?;
            }
        }
    }

    Ok(session.apply_all(&changeset_id, &ctx)?)
}
