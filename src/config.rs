use crate::error::{RefineryError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub silver: SilverSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SilverSettings {
    /// Directory holding landed raw NDJSON tables.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Directory the cleaned tables and validation reports are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Abort the run on a failed validation report instead of writing anyway.
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,
    /// Inclusive bounds for the hours-worked range check.
    #[serde(default = "default_min_hours")]
    pub min_hours_worked: f64,
    #[serde(default = "default_max_hours")]
    pub max_hours_worked: f64,
}

fn default_data_root() -> String {
    "data/landing".to_string()
}

fn default_output_dir() -> String {
    "output/silver".to_string()
}

fn default_fail_fast() -> bool {
    true
}

fn default_min_hours() -> f64 {
    0.0
}

fn default_max_hours() -> f64 {
    24.0
}

impl Default for SilverSettings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            output_dir: default_output_dir(),
            fail_fast: default_fail_fast(),
            min_hours_worked: default_min_hours(),
            max_hours_worked: default_max_hours(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = "config.toml";
        if !Path::new(config_path).exists() {
            return Ok(Config::default());
        }
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            RefineryError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: Config = toml::from_str(&config_content)?;
        Ok(config)
    }
}
