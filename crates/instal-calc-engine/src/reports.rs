//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "JSON and CSV export of sizing results."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::{fs, io::Write, path::Path};

use serde::Serialize;
use serde_json::json;
use tracing::info;

use crate::{bom::BomLine, errors::Result, CalcSummary};

pub const ELECTRICAL_REPORT: &str = "electrical.json";
pub const BOM_REPORT: &str = "bom.csv";

#[derive(Debug)]
pub struct ReportExporter<'a> {
    summary: &'a CalcSummary,
}

impl<'a> ReportExporter<'a> {
    pub fn new(summary: &'a CalcSummary) -> Self {
        Self { summary }
    }

    pub fn export_all(&self, output_dir: &Path) -> Result<()> {
        if !output_dir.exists() {
            fs::create_dir_all(output_dir)?;
        }

        let timestamp = self.summary.timestamp.to_rfc3339();
        let report = ReportEnvelope {
            timestamp: &timestamp,
            label: self.summary.label.clone(),
            schema: electrical_schema(),
            data: &self.summary.output,
        };
        write_json(output_dir.join(ELECTRICAL_REPORT), &report)?;

        let file = fs::File::create(output_dir.join(BOM_REPORT))?;
        write_bom_csv(file, &self.summary.output.bom)?;

        info!("Reports exported to {}", output_dir.display());
        Ok(())
    }
}

/// Write `lines` as CSV with a `code,description,quantity,unit` header.
pub fn write_bom_csv<W: Write>(writer: W, lines: &[BomLine]) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["code", "description", "quantity", "unit"])?;
    for line in lines {
        let quantity = line.quantity.to_string();
        csv.write_record([
            line.code.as_str(),
            line.description.as_str(),
            quantity.as_str(),
            line.unit.as_str(),
        ])?;
    }
    csv.flush()?;
    Ok(())
}

#[derive(Debug, Serialize)]
struct ReportEnvelope<'a, T: Serialize> {
    timestamp: &'a str,
    label: Option<String>,
    schema: serde_json::Value,
    data: &'a T,
}

fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let serialized = serde_json::to_string_pretty(value)?;
    fs::write(path, serialized)?;
    Ok(())
}

fn run_properties() -> serde_json::Value {
    json!({
        "voltage_v": {"type": "number"},
        "length_m": {"type": "number"},
        "method": {"type": "string", "enum": ["B2", "D1", "D2"]},
        "loaded_conductors": {"type": "integer", "enum": [2, 3]},
        "power_w": {"type": "number"},
        "power_factor": {"type": "number"},
        "design_current_a": {"type": "number"},
        "section_mm2": {"type": "number"},
        "ampacity_a": {"type": "number"},
        "breaker_a": {"type": "number"},
        "voltage_drop_pct": {"type": ["number", "null"]},
        "max_voltage_drop_pct": {"type": "number"},
        "ok": {"type": "boolean"},
        "reason": {"type": "string"}
    })
}

fn electrical_schema() -> serde_json::Value {
    let mut circuit = run_properties();
    circuit["id"] = json!({"type": "string"});
    circuit["name"] = json!({"type": ["string", "null"]});
    circuit["type_id"] = json!({"type": "string"});
    circuit["room"] = json!({"type": ["string", "null"]});
    circuit["manual_section"] = json!({"type": "boolean"});

    let mut feeder = run_properties();
    feeder["cable"] = json!({"type": "string", "enum": ["surface_run_copper", "direct_buried"]});

    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "ElectricalOutput",
        "type": "object",
        "properties": {
            "circuits": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": circuit,
                    "required": ["id", "type_id", "section_mm2", "breaker_a", "ok"]
                }
            },
            "feeder": {
                "type": ["object", "null"],
                "properties": feeder
            },
            "bom": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "code": {"type": "string"},
                        "description": {"type": "string"},
                        "quantity": {"type": "number"},
                        "unit": {"type": "string", "enum": ["m", "u"]}
                    },
                    "required": ["code", "description", "quantity", "unit"]
                }
            },
            "warnings": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["circuits", "bom", "warnings"]
    })
}
