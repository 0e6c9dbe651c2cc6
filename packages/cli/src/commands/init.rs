use crate::config::{Config, DEFAULT_CONFIG_NAME};
use crate::site_files::write_project;
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use sitecraft_document::{Page, Project, Seo};
use sitecraft_plans::PlanTier;
use sitecraft_schema::{create_default, BlockType, IdGenerator};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Business name shown in the sample site
    #[arg(short, long, default_value = "My Business")]
    pub name: String,

    /// Plan local projects are checked against (starter, pro, business)
    #[arg(short, long, default_value = "starter")]
    pub plan: PlanTier,

    /// Project directory
    #[arg(short, long, default_value = "sites")]
    pub src_dir: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Sitecraft project...".bright_blue().bold());

    let src_dir = PathBuf::from(cwd).join(&args.src_dir);
    if !src_dir.exists() {
        fs::create_dir_all(&src_dir)?;
        println!("  {} Created {}/", "✓".green(), args.src_dir);
    }

    let sample_file = src_dir.join("my-site.site.json");
    if !sample_file.exists() {
        write_project(&sample_file, &sample_project(&args.name))?;
        println!("  {} Created my-site.site.json", "✓".green());
    }

    let config = Config {
        src_dir: args.src_dir.clone(),
        plan: args.plan,
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/my-site.site.json", args.src_dir);
    println!("  2. Run: sitecraft render");
    println!("  3. Open {}/my-site/index.html", config.out_dir);

    Ok(())
}

/// Home and contact pages filled with placeholder blocks
pub fn sample_project(name: &str) -> Project {
    let mut project = Project::new("my-site", "local", name);
    let mut ids = IdGenerator::new(project.id.as_str());

    project.seo = Seo {
        title: Some(name.to_string()),
        description: Some(format!("Welcome to {name}")),
        social_image: None,
    };

    let home = &mut project.pages[0];
    for kind in [BlockType::Hero, BlockType::Features, BlockType::Cta, BlockType::Footer] {
        home.blocks.push(create_default(kind, &mut ids));
    }

    let mut contact = Page::new("contact", "contact", "Contact");
    contact.blocks.push(create_default(BlockType::Form, &mut ids));
    project.pages.push(contact);

    project.block_sequence = ids.count();
    project
}
