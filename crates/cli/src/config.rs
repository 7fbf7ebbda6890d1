//! TOML configuration for the `markscreen` binary.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults of the underlying crates.

use anyhow::{Context, Result};
use markscreen_features::PhoneticAlgorithm;
use markscreen_risk::ClassifierConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScreenConfig {
    pub classifier: ClassifierConfig,
    pub phonetic: PhoneticConfig,
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PhoneticConfig {
    pub algorithm: PhoneticAlgorithm,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Local CSV dataset, used alone or as the HTTP fallback
    pub csv_path: PathBuf,
    /// HTTP registry search service
    pub http_url: Option<String>,
    pub timeout_secs: u64,
    /// Maximum records requested from the registry
    pub limit: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("marcas.csv"),
            http_url: None,
            timeout_secs: 30,
            limit: 100,
        }
    }
}

impl ScreenConfig {
    /// Load config from a TOML string, falling back to defaults for missing fields.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
    }
}
