//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Sizing engine for residential electrical circuits."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Given a set of circuits and the reference [`tables::LookupTables`], the
//! engine selects a conductor section and breaker rating for every circuit
//! and for the optional feeder, checks ampacity and voltage drop, and
//! accumulates a bill of materials. [`compute`] is a pure function: no I/O,
//! no shared state, and unsatisfiable constraints come back as failed
//! verdicts rather than errors.
pub mod api;
pub mod bom;
pub mod breaker;
pub mod circuit;
pub mod errors;
pub mod feeder;
pub mod io;
pub mod load;
pub mod model;
pub mod rcd;
pub mod reports;
pub mod section;
pub mod tables;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::{
    bom::aggregate,
    circuit::evaluate_circuit,
    feeder::evaluate_feeder,
    model::{ElectricalInput, ElectricalOutput},
    rcd::rcd_lines,
    reports::ReportExporter,
    tables::LookupTables,
};

pub use errors::{CalcEngineError, Result};

/// Tolerance applied to every boundary comparison of currents, ampacities
/// and percentages.
pub const EPSILON: f64 = 1e-9;

/// Size every circuit, the RCD groups and the feeder.
pub fn compute(input: &ElectricalInput, tables: &LookupTables) -> ElectricalOutput {
    let options = &input.options;
    let include_pe = options.include_pe_conductor();

    let mut warnings = Vec::new();
    let mut lines = Vec::new();
    let mut circuits = Vec::with_capacity(input.circuits.len());
    let mut total_power_w = 0.0;

    for circuit in &input.circuits {
        if let Some(evaluation) =
            evaluate_circuit(circuit, input.system, tables, include_pe, &mut warnings)
        {
            total_power_w += evaluation.power_w;
            lines.extend(evaluation.bom);
            circuits.push(evaluation.result);
        }
    }

    lines.extend(rcd_lines(
        &circuits,
        options.rcd_group_size(),
        &tables.rcd,
        options.include_upstream_rcd(),
    ));

    let feeder = input
        .feeder
        .as_ref()
        .and_then(|feeder| {
            evaluate_feeder(
                feeder,
                input.system,
                total_power_w,
                tables,
                include_pe,
                &mut warnings,
            )
        })
        .map(|evaluation| {
            lines.extend(evaluation.bom);
            evaluation.result
        });

    let output = ElectricalOutput {
        circuits,
        feeder,
        bom: aggregate(&lines),
        warnings,
        earthing: tables.earthing.clone(),
    };
    info!(
        circuits = output.circuits.len(),
        failing = output.failing_circuits().count(),
        bom_lines = output.bom.len(),
        warnings = output.warnings.len(),
        "electrical computation finished"
    );
    output
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CalcSummary {
    pub timestamp: DateTime<Utc>,
    pub label: Option<String>,
    pub output: ElectricalOutput,
}

impl CalcSummary {
    pub fn exporter(&self) -> ReportExporter<'_> {
        ReportExporter::new(self)
    }
}

/// Runs [`compute`] and writes the reports into `output_dir`.
/// When `output_dir` is `None`, the default `reports/` directory is used.
pub fn analyze_with_options(
    input: &ElectricalInput,
    tables: &LookupTables,
    label: Option<&str>,
    output_dir: Option<&std::path::Path>,
) -> Result<CalcSummary> {
    info!("Sizing circuits...");
    let output = compute(input, tables);

    let summary = CalcSummary {
        timestamp: Utc::now(),
        label: label.map(str::to_owned),
        output,
    };

    let default_dir = std::path::Path::new("reports");
    let output_dir = output_dir.unwrap_or(default_dir);
    summary.exporter().export_all(output_dir)?;

    Ok(summary)
}
