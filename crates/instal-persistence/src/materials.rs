//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Material aggregation and CSV export."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::collections::HashMap;

use crate::{
    project::{MaterialRow, MaterialUnit, Project},
    Result,
};

/// Trim and collapse inner whitespace.
pub fn normalize_label(label: &str) -> String {
    label.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Merge rows by normalised label and unit, summing quantities rounded to
/// three decimals. First-seen order is kept.
pub fn aggregate_materials(rows: &[MaterialRow]) -> Vec<MaterialRow> {
    let mut index: HashMap<(String, MaterialUnit), usize> = HashMap::new();
    let mut merged: Vec<MaterialRow> = Vec::new();

    for row in rows {
        let label = normalize_label(&row.label);
        match index.get(&(label.clone(), row.unit)) {
            Some(&position) => merged[position].qty += row.qty,
            None => {
                index.insert((label.clone(), row.unit), merged.len());
                merged.push(MaterialRow {
                    label,
                    ..row.clone()
                });
            }
        }
    }

    for row in &mut merged {
        row.qty = round3(row.qty);
    }
    merged
}

/// Aggregated materials of the whole project as CSV
/// (`Item,Quantity,Unit`).
pub fn export_csv(project: &Project) -> Result<String> {
    let rows = aggregate_materials(&project.all_materials());
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Item", "Quantity", "Unit"])?;
    for row in &rows {
        let qty = row.qty.to_string();
        writer.write_record([row.label.as_str(), qty.as_str(), row.unit.as_str()])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn round3(value: f64) -> f64 {
    ((value + f64::EPSILON) * 1000.0).round() / 1000.0
}
