//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Error types for catalog loading and report export."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcEngineError>;

/// Failures of the I/O surfaces around the engine. The sizing computation
/// itself is infallible and reports adverse conditions through its output.
#[derive(Debug, Error)]
pub enum CalcEngineError {
    #[error("catalog file {0} not found")]
    MissingCatalog(PathBuf),
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    SerializationFailed(#[from] serde_json::Error),
    #[error("yaml serialization error: {0}")]
    YamlSerializationFailed(#[from] serde_yaml::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
