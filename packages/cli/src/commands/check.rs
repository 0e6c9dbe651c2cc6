use crate::config::Config;
use crate::site_files::{find_site_files, read_project, LocalPlan};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sitecraft_document::Project;
use sitecraft_plans::{resolve_settings, Decision, Feature, Gate};
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Project file or directory (defaults to the configured srcDir)
    pub path: Option<String>,
}

pub fn check(args: CheckArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let input = match &args.path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    };

    println!("{}", "🔍 Checking projects...".bright_blue().bold());
    let files = find_site_files(&input)?;

    let mut error_count = 0;
    for file in &files {
        let relative_path = file.strip_prefix(cwd).unwrap_or(file);
        match read_project(file) {
            Ok(project) => {
                let warnings = plan_warnings(&project, &config)?;
                if warnings.is_empty() {
                    println!("  {} {}", "✓".green(), relative_path.display());
                } else {
                    println!("  {} {}", "⚠️".yellow(), relative_path.display());
                    for warning in warnings {
                        println!("      {}", warning.yellow());
                    }
                }
            }
            Err(e) => {
                error_count += 1;
                eprintln!("  {} {} - {}", "✗".red(), relative_path.display(), format!("{e:#}").red());
            }
        }
    }

    println!();
    if error_count == 0 {
        println!("{} {} projects are valid", "✅".green(), files.len());
        Ok(())
    } else {
        Err(anyhow!("{error_count} of {} projects are invalid", files.len()))
    }
}

/// Things the configured plan would not allow, without failing the check
pub fn plan_warnings(project: &Project, config: &Config) -> Result<Vec<String>> {
    let plan = LocalPlan::new(project, config.plan, config.catalog());
    let gate = plan.gate();
    let customer = &project.customer_id;
    let mut warnings = Vec::new();

    let limits = plan.catalog.limits(config.plan);
    if !limits.allows_pages(project.pages.len() as u32) {
        warnings.push(format!(
            "{} pages exceed the {} plan limit",
            project.pages.len(),
            config.plan
        ));
    }

    for page in &project.pages {
        for block in &page.blocks {
            let Some(feature) = block.kind().required_feature() else {
                continue;
            };
            let feature: Feature = feature.parse()?;
            if let Decision::Denied(denial) = gate.check_feature_gate(customer, feature)? {
                warnings.push(format!("{}/{}: {}", page.slug, block.id(), denial));
            }
        }
    }

    let resolved = resolve_settings(&project.settings, customer, &gate)?;
    if resolved != project.settings {
        warnings.push(format!(
            "Some site settings are not included in the {} plan and will be ignored",
            config.plan
        ));
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::init::sample_project;
    use sitecraft_plans::PlanTier;
    use sitecraft_schema::{create_default, BlockType, IdGenerator};

    #[test]
    fn test_sample_project_has_no_warnings() {
        let project = sample_project("Acme");
        assert!(plan_warnings(&project, &Config::default()).unwrap().is_empty());
    }

    #[test]
    fn test_gated_blocks_and_settings_warn() {
        let mut project = sample_project("Acme");
        let mut ids = IdGenerator::resume(project.id.as_str(), project.block_sequence);
        project.pages[0].blocks.push(create_default(BlockType::Product, &mut ids));
        project.settings.footer_text = Some("Since 1982".into());

        let warnings = plan_warnings(&project, &Config::default()).unwrap();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("ecommerce"));

        let business = Config {
            plan: PlanTier::Business,
            ..Config::default()
        };
        assert!(plan_warnings(&project, &business).unwrap().is_empty());
    }
}
