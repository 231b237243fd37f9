//! Configuration management for the grading runner
//!
//! Loads output and grading settings from TOML files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use rubric::PassPolicy;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub grading: GradingConfig,
}

/// Where and how reports are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Pretty-print JSON reports
    #[serde(default = "default_true")]
    pub pretty: bool,
    /// Write `summary.json` after batch runs
    #[serde(default = "default_true")]
    pub write_summary: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            pretty: true,
            write_summary: true,
        }
    }
}

/// Overrides applied to every exam's pass policy
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GradingConfig {
    /// Replaces the exam's `overall_min_pct` when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_min_pct_override: Option<f64>,
}

// Default value functions
fn default_true() -> bool { true }
fn default_output_dir() -> String { "results/reports".to_string() }

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["config/grading.toml", "../config/grading.toml"];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("Loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("Using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Apply the grading overrides to an exam's policy
    pub fn apply_to(&self, policy: &PassPolicy) -> PassPolicy {
        match self.grading.overall_min_pct_override {
            Some(pct) => policy.clone().overall_min_pct(pct),
            None => policy.clone(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}
