use crate::config::Config;
use crate::site_files::{find_site_files, read_project, LocalPlan};
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use sitecraft_document::Project;
use sitecraft_plans::resolve_settings;
use sitecraft_workspace::{build_site, Site};
use std::path::{Path, PathBuf};

#[derive(Debug, Args)]
pub struct RenderArgs {
    /// Project file or directory (defaults to the configured srcDir)
    pub path: Option<String>,

    /// Print one page to stdout instead of writing files
    #[arg(long)]
    pub stdout: bool,

    /// Page slug to print with --stdout (defaults to the home page)
    #[arg(long)]
    pub page: Option<String>,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub out_dir: Option<String>,

    /// Compact output without indentation (overrides config)
    #[arg(long)]
    pub compact: bool,
}

pub fn render(args: RenderArgs, cwd: &str) -> Result<()> {
    let mut config = Config::load(cwd)?;
    if args.compact {
        config.pretty = false;
    }

    let input = match &args.path {
        Some(path) => PathBuf::from(cwd).join(path),
        None => config.get_src_dir(cwd),
    };
    let out_dir = match &args.out_dir {
        Some(dir) => PathBuf::from(cwd).join(dir),
        None => config.get_out_dir(cwd),
    };

    let files = find_site_files(&input)?;

    if args.stdout {
        let [file] = files.as_slice() else {
            return Err(anyhow!("--stdout needs exactly one project file, found {}", files.len()));
        };
        let project = read_project(file)?;
        let site = render_project(&project, &config)?;
        let page = match &args.page {
            Some(slug) => project
                .page_by_slug(slug)
                .ok_or_else(|| anyhow!("No page with slug '{slug}'"))?,
            None => project
                .home_page()
                .ok_or_else(|| anyhow!("Project has no home page"))?,
        };
        let rendered = site
            .page(&page.file_name())
            .ok_or_else(|| anyhow!("Page was not rendered: {}", page.slug))?;
        print!("{}", rendered.html);
        return Ok(());
    }

    println!("{}", "🔨 Rendering sites...".bright_blue().bold());

    if files.is_empty() {
        println!("{}", "⚠️  No .site.json files found".yellow());
        return Ok(());
    }

    println!("Found {} projects", files.len());

    let mut success_count = 0;
    let mut error_count = 0;

    for file in &files {
        let relative_path = file.strip_prefix(cwd).unwrap_or(file);
        match render_file(file, &out_dir, &config) {
            Ok((output_dir, pages)) => {
                success_count += 1;
                println!(
                    "  {} {} → {} ({} pages)",
                    "✓".green(),
                    relative_path.display(),
                    output_dir.display(),
                    pages
                );
            }
            Err(e) => {
                error_count += 1;
                eprintln!(
                    "  {} {} - {}",
                    "✗".red(),
                    relative_path.display(),
                    format!("{e:#}").red()
                );
            }
        }
    }

    println!();
    if error_count == 0 {
        println!("{} Rendered {} projects successfully", "✅".green(), success_count);
        Ok(())
    } else {
        println!(
            "{} Rendered {} projects, {} errors",
            "⚠️".yellow(),
            success_count,
            error_count
        );
        Err(anyhow!("{error_count} projects failed to render"))
    }
}

/// Render a project with its settings limited to the configured plan
pub fn render_project(project: &Project, config: &Config) -> Result<Site> {
    let plan = LocalPlan::new(project, config.plan, config.catalog());
    let mut resolved = project.clone();
    resolved.settings = resolve_settings(&project.settings, &project.customer_id, &plan.gate())?;
    Ok(build_site(&resolved, &config.render_options()))
}

fn render_file(file: &Path, out_dir: &Path, config: &Config) -> Result<(PathBuf, usize)> {
    let project = read_project(file)?;
    let site = render_project(&project, config)?;

    let target = out_dir.join(project.id.as_str());
    let written = site.write_to(&target)?;
    Ok((target, written.len()))
}
