//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Loading of lookup tables and engine input from disk."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::{fs, path::Path};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    errors::{CalcEngineError, Result},
    model::ElectricalInput,
    tables::LookupTables,
};

pub const AMPACITY_FILE: &str = "ampacity.json";
pub const VOLTAGE_DROP_FILE: &str = "voltage_drop.json";
pub const CIRCUIT_TYPES_FILE: &str = "circuit_types.json";
pub const BREAKERS_FILE: &str = "breakers.json";
pub const RCD_FILE: &str = "rcd.json";
pub const APPLIANCES_FILE: &str = "appliances.json";
pub const INSTALLATIONS_FILE: &str = "installations.json";
pub const EARTHING_FILE: &str = "earthing.json";

/// Read a complete table set from `dir`. Every table except earthing is
/// required.
pub fn load_tables_from_dir(dir: impl AsRef<Path>) -> Result<LookupTables> {
    let dir = dir.as_ref();
    debug!(catalog_dir = %dir.display(), "loading lookup tables");
    Ok(LookupTables {
        ampacity: read_required(dir, AMPACITY_FILE)?,
        voltage_drop: read_required(dir, VOLTAGE_DROP_FILE)?,
        circuit_types: read_required(dir, CIRCUIT_TYPES_FILE)?,
        breakers: read_required(dir, BREAKERS_FILE)?,
        rcd: read_required(dir, RCD_FILE)?,
        appliances: read_required(dir, APPLIANCES_FILE)?,
        installations: read_required(dir, INSTALLATIONS_FILE)?,
        earthing: read_optional(dir, EARTHING_FILE)?,
    })
}

/// Tables from `dir`, or the bundled set when no directory is given.
pub fn load_tables(dir: Option<&Path>) -> Result<LookupTables> {
    match dir {
        Some(dir) => load_tables_from_dir(dir),
        None => LookupTables::builtin(),
    }
}

/// Engine input as JSON, or YAML when the document does not start with `{`.
pub fn load_input_from_file(path: impl AsRef<Path>) -> Result<ElectricalInput> {
    let data = fs::read_to_string(path)?;
    let input = if data.trim_start().starts_with('{') {
        serde_json::from_str(&data)?
    } else {
        serde_yaml::from_str(&data).map_err(CalcEngineError::YamlSerializationFailed)?
    };
    Ok(input)
}

fn read_required<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(CalcEngineError::MissingCatalog(path));
    }
    let data = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&data)?)
}

fn read_optional<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<Option<T>> {
    match read_required(dir, file) {
        Ok(value) => Ok(Some(value)),
        Err(CalcEngineError::MissingCatalog(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_builtin(dir: &Path) {
        let tables = LookupTables::builtin().unwrap();
        let write = |name: &str, value: serde_json::Value| {
            fs::write(dir.join(name), serde_json::to_string_pretty(&value).unwrap()).unwrap();
        };
        write(AMPACITY_FILE, serde_json::to_value(&tables.ampacity).unwrap());
        write(VOLTAGE_DROP_FILE, serde_json::to_value(&tables.voltage_drop).unwrap());
        write(CIRCUIT_TYPES_FILE, serde_json::to_value(&tables.circuit_types).unwrap());
        write(BREAKERS_FILE, serde_json::to_value(&tables.breakers).unwrap());
        write(RCD_FILE, serde_json::to_value(&tables.rcd).unwrap());
        write(APPLIANCES_FILE, serde_json::to_value(&tables.appliances).unwrap());
        write(INSTALLATIONS_FILE, serde_json::to_value(&tables.installations).unwrap());
    }

    #[test]
    fn loads_directory_without_optional_earthing() {
        let dir = tempdir().unwrap();
        write_builtin(dir.path());
        let tables = load_tables_from_dir(dir.path()).unwrap();
        assert!(tables.earthing.is_none());
        assert_eq!(
            tables.ampacity.sections(),
            LookupTables::builtin().unwrap().ampacity.sections()
        );
    }

    #[test]
    fn missing_required_table_is_reported() {
        let dir = tempdir().unwrap();
        write_builtin(dir.path());
        fs::remove_file(dir.path().join(BREAKERS_FILE)).unwrap();
        match load_tables_from_dir(dir.path()) {
            Err(CalcEngineError::MissingCatalog(path)) => {
                assert!(path.ends_with(BREAKERS_FILE));
            }
            other => panic!("unexpected result {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn input_accepts_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("input.yaml");
        fs::write(
            &path,
            "system: three_phase_400\ncircuits:\n  - id: m1\n    type_id: motor\n    length_m: 20\n    installation_id: wall_conduit\n    load:\n      kind: direct\n      power_w: 4000\n",
        )
        .unwrap();
        let input = load_input_from_file(&path).unwrap();
        assert_eq!(input.circuits.len(), 1);
        assert_eq!(input.circuits[0].type_id, "motor");
    }
}
