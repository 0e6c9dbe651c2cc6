use serde::{Deserialize, Serialize};
use sitecraft_compiler_html::RenderOptions;
use sitecraft_plans::{PlanCatalog, PlanTier};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_NAME: &str = "sitecraft.config.json";

/// Sitecraft configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Directory searched for `*.site.json` project files
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Where rendered sites are written
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Pretty print HTML
    #[serde(default = "default_pretty")]
    pub pretty: bool,

    /// Plan the local projects are checked against
    #[serde(default = "default_plan")]
    pub plan: PlanTier,

    /// Custom plan limits; the built-in catalog when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plans: Option<PlanCatalog>,
}

fn default_src_dir() -> String {
    "sites".to_string()
}

fn default_out_dir() -> String {
    "public".to_string()
}

fn default_pretty() -> bool {
    true
}

fn default_plan() -> PlanTier {
    PlanTier::Starter
}

impl Config {
    /// Load config from a directory
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            // Return default config if none exists
            Ok(Config::default())
        }
    }

    pub fn get_src_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.src_dir)
    }

    pub fn get_out_dir(&self, cwd: &str) -> PathBuf {
        PathBuf::from(cwd).join(&self.out_dir)
    }

    pub fn catalog(&self) -> PlanCatalog {
        self.plans.clone().unwrap_or_default()
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            pretty: self.pretty,
            ..RenderOptions::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            out_dir: default_out_dir(),
            pretty: default_pretty(),
            plan: default_plan(),
            plans: None,
        }
    }
}
