use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use texforge_compiler::Engine;

pub const DEFAULT_CONFIG_NAME: &str = "texforge.config.json";

/// Texforge configuration file format
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Primary compile endpoint
    #[serde(default = "default_primary_url")]
    pub primary_url: String,

    /// Fallback compile endpoint
    #[serde(default = "default_secondary_url")]
    pub secondary_url: String,

    /// Endpoint that streams corrected source for failing documents
    #[serde(default = "default_fix_url")]
    pub fix_url: String,

    /// Compile engine (pdflatex, xelatex, lualatex)
    #[serde(default)]
    pub engine: Engine,

    /// Automatic repair attempts per compile run
    #[serde(default = "default_max_repair_attempts")]
    pub max_repair_attempts: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_primary_url() -> String {
    "https://latexonline.cc/compile".to_string()
}

fn default_secondary_url() -> String {
    "https://texlive2020.latexonline.cc/compile".to_string()
}

fn default_fix_url() -> String {
    "http://localhost:3000/api/fix".to_string()
}

fn default_max_repair_attempts() -> u32 {
    1
}

fn default_timeout_secs() -> u64 {
    60
}

impl Config {
    /// Load config from a directory, falling back to defaults when no
    /// config file exists.
    pub fn load(cwd: &str) -> anyhow::Result<Self> {
        let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_url: default_primary_url(),
            secondary_url: default_secondary_url(),
            fix_url: default_fix_url(),
            engine: Engine::default(),
            max_repair_attempts: default_max_repair_attempts(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
