// crates/lmine-cli/src/config.rs
//
// Runtime configuration for the lmine CLI.
// Loaded from a TOML file or populated with sensible defaults.

use serde::Deserialize;
use std::fs;

use lmine_core::EngineParams;

use crate::error::CliError;
use crate::output::OutputFormat;

/// Runtime configuration for the CLI.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Default output format: "table" or "json".
    #[serde(default)]
    pub output: OutputFormat,

    /// Engine parameters used when a scenario carries none of its own.
    #[serde(default)]
    pub engine: Option<EngineParams>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            output: OutputFormat::default(),
            engine: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from a TOML file at the given path (`~` expanded).
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &str) -> Result<Self, CliError> {
        let contents = fs::read_to_string(expand_tilde(path))?;
        Self::parse(&contents)
    }

    pub fn parse(contents: &str) -> Result<Self, CliError> {
        let config: CliConfig = toml::from_str(contents)?;
        if let Some(engine) = &config.engine {
            engine.validate()?;
        }
        Ok(config)
    }
}

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return format!("{}/{}", home.display(), rest);
        }
    }
    path.to_string()
}
