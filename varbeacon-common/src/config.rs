//! Configuration loading
//!
//! The config file path is resolved in priority order:
//! 1. Command-line argument
//! 2. `VARBEACON_CONFIG` environment variable
//! 3. Platform config file (`~/.config/varbeacon/config.toml`, then
//!    `/etc/varbeacon/config.toml` on Linux)
//! 4. Compiled defaults
//!
//! A missing config file is not fatal: a warning is logged and the compiled
//! defaults are used.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::engine::coarsener::{OntologyFallback, DEFAULT_COARSE_DEPTH};
use crate::engine::orchestrator::EngineSettings;
use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "VARBEACON_CONFIG";

fn default_bind_addr() -> String {
    "127.0.0.1:5740".to_string()
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("varbeacon").join("beacon.db"))
        .unwrap_or_else(|| PathBuf::from("./varbeacon.db"))
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_coarse_depth() -> usize {
    DEFAULT_COARSE_DEPTH
}

/// Top-level beacon configuration (`config.toml`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Address the query service listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database holding cases, variants, clients and the audit log
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub engine: EngineSettings,

    #[serde(default)]
    pub ontology: OntologyConfig,

    #[serde(default)]
    pub beacon: BeaconMetadata,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            database_path: default_database_path(),
            logging: LoggingConfig::default(),
            engine: EngineSettings::default(),
            ontology: OntologyConfig::default(),
            beacon: BeaconMetadata::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Phenotype ontology used for coarsening
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyConfig {
    /// OBO file, e.g. `hp.obo`; without one every coarsening degrades
    #[serde(default)]
    pub obo_path: Option<PathBuf>,

    /// Depth below the root that coarse terms are taken from
    #[serde(default = "default_coarse_depth")]
    pub coarse_depth: usize,

    #[serde(default)]
    pub on_failure: OntologyFallback,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            obo_path: None,
            coarse_depth: DEFAULT_COARSE_DEPTH,
            on_failure: OntologyFallback::default(),
        }
    }
}

/// Beacon self-description served by the info endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconMetadata {
    pub id: String,
    pub name: String,
    pub api_version: String,
    pub organization: Organization,
    pub datasets: Vec<Dataset>,
}

impl Default for BeaconMetadata {
    fn default() -> Self {
        Self {
            id: "varbeacon".to_string(),
            name: "Variant Beacon".to_string(),
            api_version: "v1.0.0".to_string(),
            organization: Organization::default(),
            datasets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub contact_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub id: String,
    pub name: String,
    pub assembly_id: String,
    pub create_date_time: String,
    pub update_date_time: String,
}

impl BeaconConfig {
    /// Parse a config file's contents
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Read and parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }
}

/// Platform config file, if one exists
fn platform_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("varbeacon").join("config.toml"));
    if let Some(path) = user_config.filter(|p| p.exists()) {
        return Some(path);
    }
    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/varbeacon/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }
    None
}

/// Config file path by priority: CLI argument, environment, platform location
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    platform_config_file()
}

/// Load the configuration, falling back to compiled defaults
///
/// A resolved path that does not exist logs a warning and yields defaults; a
/// file that exists but fails to parse is an error.
pub fn load_config(cli_arg: Option<&Path>) -> Result<BeaconConfig> {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using compiled defaults");
        return Ok(BeaconConfig::default());
    };

    if !path.exists() {
        warn!(path = %path.display(), "Config file not found, using compiled defaults");
        return Ok(BeaconConfig::default());
    }

    let config = BeaconConfig::from_file(&path)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = BeaconConfig::from_toml_str("").unwrap();
        assert_eq!(config, BeaconConfig::default());
        assert_eq!(config.engine.default_assembly, "GRCh37");
        assert_eq!(config.engine.public_key, "public");
        assert_eq!(config.ontology.coarse_depth, 4);
        assert_eq!(config.ontology.on_failure, OntologyFallback::ExactTerm);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections() {
        let config = BeaconConfig::from_toml_str(
            r#"
            bind_addr = "0.0.0.0:8080"

            [ontology]
            obo_path = "/data/hp.obo"
            on_failure = "omit"

            [beacon]
            id = "de.example.beacon"

            [[beacon.datasets]]
            id = "cases"
            assembly_id = "GRCh37"
            "#,
        )
        .unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.ontology.obo_path, Some(PathBuf::from("/data/hp.obo")));
        assert_eq!(config.ontology.coarse_depth, 4);
        assert_eq!(config.ontology.on_failure, OntologyFallback::Omit);
        assert_eq!(config.beacon.id, "de.example.beacon");
        assert_eq!(config.beacon.name, "Variant Beacon");
        assert_eq!(config.beacon.datasets.len(), 1);
        assert_eq!(config.beacon.datasets[0].assembly_id, "GRCh37");
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        let err = BeaconConfig::from_toml_str("bind_addr = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_cli_path_takes_priority() {
        let path = Path::new("/tmp/varbeacon-cli.toml");
        assert_eq!(resolve_config_path(Some(path)), Some(path.to_path_buf()));
    }
}
