//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Application configuration for the sizing tools."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn default_rcd_group_size() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_store_directory() -> PathBuf {
    PathBuf::from("target/projects")
}

fn default_reports_directory() -> PathBuf {
    PathBuf::from("reports")
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::StructuredJson
}

/// Primary configuration object shared by the CLI and the HTTP surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub reports: ReportsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &str = "INSTAL_CONFIG";

    /// Load configuration, respecting the `INSTAL_CONFIG` override. Falls back
    /// to defaults when no candidate exists.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            let path = candidate.as_ref();
            if path.exists() {
                let config = Self::from_path(path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path.to_path_buf()),
                });
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(LoadedAppConfig {
            config: AppConfig::default(),
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        contents
            .parse::<AppConfig>()
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        if self.engine.rcd_group_size == 0 {
            return Err(anyhow!("engine.rcd_group_size must be at least 1"));
        }
        if let Some(dir) = &self.catalog.directory {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow!(
                    "catalog directory {} is not a directory",
                    dir.display()
                ));
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Where lookup tables come from; builtin tables when unset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Defaults applied when a request leaves the options unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_rcd_group_size")]
    pub rcd_group_size: usize,
    #[serde(default = "default_true")]
    pub include_upstream_rcd: bool,
    #[serde(default = "default_true")]
    pub include_pe_conductor: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rcd_group_size: default_rcd_group_size(),
            include_upstream_rcd: true,
            include_pe_conductor: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_directory")]
    pub directory: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: default_store_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    #[serde(default = "default_reports_directory")]
    pub directory: PathBuf,
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            directory: default_reports_directory(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: AppConfig = "".parse().unwrap();
        assert_eq!(config.engine.rcd_group_size, 4);
        assert!(config.engine.include_upstream_rcd);
        assert!(config.engine.include_pe_conductor);
        assert_eq!(config.store.directory, PathBuf::from("target/projects"));
        assert_eq!(config.reports.directory, PathBuf::from("reports"));
        assert!(config.catalog.directory.is_none());
        assert_eq!(config.logging.format, LogFormat::StructuredJson);
    }

    #[test]
    fn sections_override_defaults() {
        let config: AppConfig = r#"
            [engine]
            rcd_group_size = 3
            include_upstream_rcd = false

            [logging]
            format = "pretty"
            file_prefix = "instal"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.engine.rcd_group_size, 3);
        assert!(!config.engine.include_upstream_rcd);
        assert!(config.engine.include_pe_conductor);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.logging.file_prefix.as_deref(), Some("instal"));
    }

    #[test]
    fn zero_group_size_is_rejected() {
        let err = "[engine]\nrcd_group_size = 0\n".parse::<AppConfig>().unwrap_err();
        assert!(err.to_string().contains("rcd_group_size"));
    }
}
