//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "File-backed project store with integrity hashes."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::{
    project::{Project, ProjectMetaPatch, SaveCalculation, SketchData},
    PersistenceError, Result,
};

/// Current project file envelope version.
pub const STORE_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ProjectEnvelope {
    version: u16,
    updated_at: DateTime<Utc>,
    hash: String,
    project: Project,
}

/// Directory of projects, one JSON file per project.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// Open a store rooted at `root`; the directory is created on first write.
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding the project files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create and persist an empty project.
    pub fn create_project(
        &self,
        name: &str,
        client: Option<String>,
        site_address: Option<String>,
    ) -> Result<Project> {
        let project = Project::new(name, client, site_address);
        self.write(&project)?;
        debug!(project = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    /// All readable projects, most recently updated first. Files that fail to
    /// parse or verify are skipped.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut projects = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            match read_envelope(&path) {
                Ok(project) => projects.push(project),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping project file"),
            }
        }
        projects.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(projects)
    }

    /// Load one project.
    pub fn get_project(&self, id: &str) -> Result<Project> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(PersistenceError::ProjectNotFound(id.to_owned()));
        }
        read_envelope(&path)
    }

    /// Delete a project file.
    pub fn remove_project(&self, id: &str) -> Result<()> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Err(PersistenceError::ProjectNotFound(id.to_owned()));
        }
        fs::remove_file(path)?;
        debug!(project = %id, "project removed");
        Ok(())
    }

    /// Apply the fields present in `patch`.
    pub fn update_project_meta(&self, id: &str, patch: ProjectMetaPatch) -> Result<Project> {
        self.modify(id, |project| {
            if let Some(name) = patch.name {
                let name = name.trim();
                if !name.is_empty() {
                    project.name = name.to_owned();
                }
            }
            if patch.client.is_some() {
                project.client = patch.client;
            }
            if patch.site_address.is_some() {
                project.site_address = patch.site_address;
            }
            Ok(())
        })
    }

    /// Save a calculation, replacing any partida with the same title.
    pub fn save_or_update_calculation(
        &self,
        id: &str,
        payload: SaveCalculation,
    ) -> Result<Project> {
        self.modify(id, |project| {
            project.upsert_calculation(payload);
            Ok(())
        })
    }

    /// Remove one partida.
    pub fn remove_partida(&self, id: &str, partida_id: &str) -> Result<Project> {
        self.modify(id, |project| {
            let before = project.partidas.len();
            project.partidas.retain(|p| p.id != partida_id);
            if project.partidas.len() == before {
                return Err(PersistenceError::PartidaNotFound {
                    project: project.id.clone(),
                    partida: partida_id.to_owned(),
                });
            }
            Ok(())
        })
    }

    /// Merge `sketch` into the project's sketch.
    pub fn upsert_sketch(&self, id: &str, sketch: SketchData) -> Result<Project> {
        self.modify(id, |project| {
            project.sketch.get_or_insert_with(SketchData::default).merge(sketch);
            Ok(())
        })
    }

    fn modify<F>(&self, id: &str, change: F) -> Result<Project>
    where
        F: FnOnce(&mut Project) -> Result<()>,
    {
        let mut project = self.get_project(id)?;
        change(&mut project)?;
        project.updated_at = Utc::now();
        self.write(&project)?;
        Ok(project)
    }

    /// Ids name a file directly inside the store root.
    fn path_for(&self, id: &str) -> Result<PathBuf> {
        let plain = !id.is_empty()
            && id != "."
            && !id.contains("..")
            && !id.contains(['/', '\\', ':'])
            && Path::new(id).components().count() == 1;
        if !plain {
            return Err(PersistenceError::InvalidProjectId(id.to_owned()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    fn write(&self, project: &Project) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        let envelope = ProjectEnvelope {
            version: STORE_VERSION,
            updated_at: project.updated_at,
            hash: compute_hash(project)?,
            project: project.clone(),
        };

        let path = self.path_for(&project.id)?;
        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &envelope)?;
            writer.flush()?;
        }
        fs::rename(tmp, path)?;
        Ok(())
    }
}

fn read_envelope(path: &Path) -> Result<Project> {
    let bytes = fs::read(path)?;
    let envelope: ProjectEnvelope = serde_json::from_slice(&bytes)?;
    if envelope.hash != compute_hash(&envelope.project)? {
        return Err(PersistenceError::HashMismatch);
    }
    Ok(envelope.project)
}

fn compute_hash(project: &Project) -> Result<String> {
    let serialized = serde_json::to_vec(project)?;
    let mut hasher = Sha256::new();
    hasher.update(serialized);
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::PartidaKind;
    use serde_json::json;
    use tempfile::tempdir;

    fn calculation(title: &str) -> SaveCalculation {
        SaveCalculation {
            title: title.into(),
            kind: PartidaKind::Electrical,
            inputs: json!({"circuits": []}),
            outputs: json!({"circuits": []}),
            materials: Vec::new(),
        }
    }

    #[test]
    fn create_and_reload_project() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        let created = store
            .create_project("Casa Norte", Some("Ana".into()), None)
            .unwrap();
        assert!(created.id.starts_with("prj_"));

        let loaded = store.get_project(&created.id).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn tampered_file_fails_verification_and_is_skipped_when_listing() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        let project = store.create_project("Casa", None, None).unwrap();
        let path = dir.path().join(format!("{}.json", project.id));

        let text = fs::read_to_string(&path).unwrap();
        fs::write(&path, text.replace("\"Casa\"", "\"Otra\"")).unwrap();

        assert!(matches!(
            store.get_project(&project.id),
            Err(PersistenceError::HashMismatch)
        ));
        assert!(store.list_projects().unwrap().is_empty());
    }

    #[test]
    fn missing_partida_is_reported() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        let project = store.create_project("Casa", None, None).unwrap();
        store
            .save_or_update_calculation(&project.id, calculation("Planta baja"))
            .unwrap();

        let err = store.remove_partida(&project.id, "pt_missing").unwrap_err();
        assert!(matches!(err, PersistenceError::PartidaNotFound { .. }));
        assert_eq!(store.get_project(&project.id).unwrap().partidas.len(), 1);
    }

    #[test]
    fn full_precision_floats_survive_reload() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path());
        let project = store.create_project("Casa", None, None).unwrap();
        let values: Vec<f64> = (0..5000)
            .map(|i| i as f64 * 0.1234567891234567 / 7.0)
            .collect();
        let mut payload = calculation("Planta baja");
        payload.inputs = json!({ "samples": values });
        store.save_or_update_calculation(&project.id, payload).unwrap();

        let loaded = store.get_project(&project.id).unwrap();
        assert_eq!(loaded.partidas[0].inputs["samples"], json!(values));
        assert_eq!(store.list_projects().unwrap().len(), 1);
    }

    #[test]
    fn ids_cannot_escape_the_store() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("projects");
        let store = ProjectStore::open(&root);
        store.create_project("Casa", None, None).unwrap();
        let outside = dir.path().join("x.json");
        fs::write(&outside, "{}").unwrap();

        for id in ["../x", "..", "a/b", "a\\b", ""] {
            assert!(matches!(
                store.remove_project(id),
                Err(PersistenceError::InvalidProjectId(_))
            ));
            assert!(matches!(
                store.get_project(id),
                Err(PersistenceError::InvalidProjectId(_))
            ));
        }
        assert!(outside.exists());
    }

    #[test]
    fn missing_store_lists_nothing() {
        let dir = tempdir().unwrap();
        let store = ProjectStore::open(dir.path().join("absent"));
        assert!(store.list_projects().unwrap().is_empty());
        assert!(matches!(
            store.get_project("prj_x"),
            Err(PersistenceError::ProjectNotFound(_))
        ));
    }
}
