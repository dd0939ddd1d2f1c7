//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Project store for saved calculations and materials."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Projects hold an ordered list of saved calculations ("partidas"), each
//! with its original input, computed output and derived material rows. The
//! sizing engine never touches this store; callers persist its results.

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the project store.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Wrapper for IO errors encountered while reading/writing project files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for CSV export issues.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// Reported when a project file fails integrity verification.
    #[error("project file hash mismatch")]
    HashMismatch,
    /// The project id is not a plain file name inside the store.
    #[error("invalid project id {0:?}")]
    InvalidProjectId(String),
    /// The requested project does not exist in the store.
    #[error("project {0} not found")]
    ProjectNotFound(String),
    /// The requested partida does not exist in the project.
    #[error("partida {partida} not found in project {project}")]
    PartidaNotFound {
        /// Project identifier.
        project: String,
        /// Partida identifier.
        partida: String,
    },
}

pub mod materials;
pub mod project;
pub mod store;

pub use materials::{aggregate_materials, export_csv, normalize_label};
pub use project::{
    MaterialRow, MaterialUnit, Partida, PartidaKind, Project, ProjectMetaPatch, SaveCalculation,
    SketchData,
};
pub use store::{ProjectStore, STORE_VERSION};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_identifiers() {
        let err = PersistenceError::PartidaNotFound {
            project: "prj_1".into(),
            partida: "pt_9".into(),
        };
        assert_eq!(format!("{err}"), "partida pt_9 not found in project prj_1");
    }
}
