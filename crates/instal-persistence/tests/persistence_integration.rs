//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Store round trips with real sizing results."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use instal_calc_engine::{
    compute,
    model::{CircuitInput, ElectricalInput, Load},
    tables::LookupTables,
};
use instal_persistence::{
    export_csv, MaterialRow, PartidaKind, ProjectMetaPatch, ProjectStore, SaveCalculation,
    SketchData,
};
use serde_json::json;
use tempfile::tempdir;

fn house() -> ElectricalInput {
    let circuits = ["c1", "c2"]
        .iter()
        .map(|id| CircuitInput {
            id: (*id).into(),
            name: None,
            type_id: "sockets".into(),
            room: None,
            system: None,
            length_m: 12.4,
            installation_id: "wall_conduit".into(),
            loaded_conductors: None,
            load: Load::Direct { power_w: 1500.0 },
            power_factor: None,
            simultaneity: None,
            manual_section_mm2: None,
        })
        .collect();
    ElectricalInput {
        circuits,
        ..ElectricalInput::default()
    }
}

#[test]
fn sizing_results_are_saved_and_exported() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = ProjectStore::open(dir.path());
    let tables = LookupTables::builtin()?;
    let input = house();
    let output = compute(&input, &tables);

    let project = store.create_project("Casa Sur", Some("Luis".into()), None)?;
    let payload = SaveCalculation {
        title: "Tablero principal".into(),
        kind: PartidaKind::Electrical,
        inputs: serde_json::to_value(&input)?,
        outputs: serde_json::to_value(&output)?,
        materials: output.bom.iter().map(MaterialRow::from).collect(),
    };
    store.save_or_update_calculation(&project.id, payload.clone())?;
    let saved = store.save_or_update_calculation(&project.id, payload)?;
    assert_eq!(saved.partidas.len(), 1);

    let csv = export_csv(&saved)?;
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Item,Quantity,Unit"));
    assert_eq!(lines.count(), output.bom.len());
    assert!(csv.contains(",26,m"));
    Ok(())
}

#[test]
fn listing_orders_by_last_update() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let store = ProjectStore::open(dir.path());
    let first = store.create_project("Primero", None, None)?;
    let second = store.create_project("", None, None)?;
    assert_eq!(second.name, "Untitled project");

    store.update_project_meta(
        &first.id,
        ProjectMetaPatch {
            site_address: Some("Calle 5".into()),
            ..ProjectMetaPatch::default()
        },
    )?;
    store.upsert_sketch(
        &first.id,
        SketchData {
            json: Some(json!({"walls": 4})),
            png_data_url: None,
        },
    )?;

    let listed = store.list_projects()?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[0].site_address.as_deref(), Some("Calle 5"));
    assert!(listed[0].sketch.is_some());

    store.remove_project(&second.id)?;
    assert_eq!(store.list_projects()?.len(), 1);
    Ok(())
}
