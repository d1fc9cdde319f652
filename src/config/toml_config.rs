use crate::core::geometry::DEFAULT_DATASET_CANDIDATES;
use crate::domain::model::BoundingBox;
use crate::utils::error::{AisError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_FEED_ENDPOINT: &str = "https://meri.digitraffic.fi/api/ais/v1/locations";
pub const DEFAULT_TABLE: &str = "vessel_positions";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub source: SourceConfig,
    pub region: BoundingBox,
    pub boundaries: BoundaryConfig,
    pub store: StoreConfig,
    pub export: ExportConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_FEED_ENDPOINT.to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundaryConfig {
    pub directory: String,
    pub candidates: Vec<String>,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            directory: ".".to_string(),
            candidates: DEFAULT_DATASET_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl BoundaryConfig {
    pub fn directory(&self) -> PathBuf {
        PathBuf::from(&self.directory)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: Option<String>,
    pub key: Option<String>,
    pub table: String,
    pub timeout_seconds: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key: None,
            table: DEFAULT_TABLE.to_string(),
            timeout_seconds: 60,
        }
    }
}

impl StoreConfig {
    pub fn is_configured(&self) -> bool {
        self.url.is_some() && self.key.is_some()
    }

    /// (url, key), or the first missing one as an error.
    pub fn credentials(&self) -> Result<(&str, &str)> {
        let url = validation::validate_required_field("store.url", &self.url)?;
        let key = validation::validate_required_field("store.key", &self.key)?;
        Ok((url.as_str(), key.as_str()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub output_path: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: "data/ais".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// Loads the TOML file, then fills unset store settings from the environment.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        let mut config = Self::from_toml_str(&content)?;
        config.apply_env();
        Ok(config)
    }

    /// Like [`TomlConfig::from_file`], but a missing file means built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            return Self::from_file(path);
        }
        tracing::debug!(
            "Config file {} not found, using defaults",
            path.as_ref().display()
        );
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| AisError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| AisError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    fn apply_env(&mut self) {
        let unresolved = |value: &Option<String>| {
            value
                .as_deref()
                .map_or(true, |v| v.trim().is_empty() || v.contains("${"))
        };

        if unresolved(&self.store.url) {
            self.store.url = std::env::var("SUPABASE_URL").ok();
        }
        if unresolved(&self.store.key) {
            self.store.key = std::env::var("SUPABASE_KEY").ok();
        }
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_positive_number(
            "source.timeout_seconds",
            self.source.timeout_seconds as usize,
            1,
        )?;
        validation::validate_bbox("region", &self.region)?;
        validation::validate_path("boundaries.directory", &self.boundaries.directory)?;
        if self.boundaries.candidates.is_empty() {
            return Err(AisError::InvalidConfigValueError {
                field: "boundaries.candidates".to_string(),
                value: "[]".to_string(),
                reason: "at least one dataset file name is required".to_string(),
            });
        }
        validation::validate_file_extensions(
            "boundaries.candidates",
            &self.boundaries.candidates,
            &["geojson", "json"],
        )?;
        if let Some(url) = &self.store.url {
            validation::validate_url("store.url", url)?;
        }
        validation::validate_non_empty_string("store.table", &self.store.table)?;
        if self.export.enabled {
            validation::validate_path("export.output_path", &self.export.output_path)?;
        }
        Ok(())
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
