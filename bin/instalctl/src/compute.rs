//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Sizing command and shared engine plumbing."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use instal_calc_engine::{
    analyze_with_options, compute,
    io::{load_input_from_file, load_tables},
    model::{ComputeOptions, ElectricalInput, ElectricalOutput},
    tables::LookupTables,
};
use instal_common::config::AppConfig;

#[derive(Debug, Args)]
pub struct ComputeArgs {
    /// Installation description (JSON or YAML).
    #[arg(long, short, value_name = "FILE")]
    input: PathBuf,
    /// Directory with lookup tables; bundled tables when omitted.
    #[arg(long, value_name = "DIR")]
    catalog: Option<PathBuf>,
    /// Write electrical.json and bom.csv into this directory.
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// Export into `reports.directory` when `--output` is not given.
    #[arg(long)]
    export: bool,
    /// Label stored in the exported reports.
    #[arg(long)]
    label: Option<String>,
    /// Print the full result as JSON.
    #[arg(long)]
    json: bool,
}

pub fn run(args: ComputeArgs, config: &AppConfig) -> Result<()> {
    let tables = tables(args.catalog.as_deref(), config)?;
    let input = read_input(&args.input, config)?;

    let report_dir = args
        .output
        .clone()
        .or_else(|| args.export.then(|| config.reports.directory.clone()));

    let output = match &report_dir {
        Some(dir) => {
            let summary = analyze_with_options(
                &input,
                &tables,
                args.label.as_deref(),
                Some(dir.as_path()),
            )
            .with_context(|| format!("unable to export reports to {}", dir.display()))?;
            summary.output
        }
        None => compute(&input, &tables),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_output(&output);
    }
    Ok(())
}

/// Lookup tables from `--catalog`, the configured directory, or the bundled set.
pub fn tables(catalog: Option<&Path>, config: &AppConfig) -> Result<LookupTables> {
    let dir = catalog.or(config.catalog.directory.as_deref());
    load_tables(dir).with_context(|| match dir {
        Some(dir) => format!("unable to load lookup tables from {}", dir.display()),
        None => "unable to load bundled lookup tables".to_owned(),
    })
}

/// Input file with unset options filled from the `[engine]` section.
pub fn read_input(path: &Path, config: &AppConfig) -> Result<ElectricalInput> {
    let mut input = load_input_from_file(path)
        .with_context(|| format!("unable to read input {}", path.display()))?;
    input.options = input.options.or(&engine_defaults(config));
    Ok(input)
}

fn engine_defaults(config: &AppConfig) -> ComputeOptions {
    ComputeOptions {
        rcd_group_size: Some(config.engine.rcd_group_size),
        include_upstream_rcd: Some(config.engine.include_upstream_rcd),
        include_pe_conductor: Some(config.engine.include_pe_conductor),
    }
}

fn print_output(output: &ElectricalOutput) {
    println!(
        "{:<12} {:<14} {:<16} {:>9} {:>8} {:>8} {:>8} {:>6} {:>7}  {}",
        "circuit",
        "room",
        "type",
        "P (W)",
        "Ib (A)",
        "S (mm2)",
        "Iz (A)",
        "In (A)",
        "dV (%)",
        "verdict"
    );
    for c in &output.circuits {
        println!(
            "{:<12} {:<14} {:<16} {:>9.0} {:>8.2} {:>8} {:>8.2} {:>6} {:>7.2}  {}",
            c.id,
            c.room.as_deref().unwrap_or("-"),
            c.type_id,
            c.power_w,
            c.design_current_a,
            c.section_mm2,
            c.ampacity_a,
            c.breaker_a,
            c.voltage_drop_pct,
            verdict(c.ok, c.reason.as_deref())
        );
    }
    if let Some(f) = &output.feeder {
        println!(
            "{:<12} {:<14} {:<16} {:>9.0} {:>8.2} {:>8} {:>8.2} {:>6} {:>7.2}  {}",
            "feeder",
            "-",
            f.method.as_str(),
            f.power_w,
            f.design_current_a,
            f.section_mm2,
            f.ampacity_a,
            f.breaker_a,
            f.voltage_drop_pct,
            verdict(f.ok, f.reason.as_deref())
        );
    }

    println!();
    for line in &output.bom {
        println!(
            "{:>8} {:<2} {:<28} {}",
            line.quantity,
            line.unit.as_str(),
            line.code,
            line.description
        );
    }
    for warning in &output.warnings {
        println!("warning: {}", warning);
    }
}

fn verdict(ok: bool, reason: Option<&str>) -> String {
    match (ok, reason) {
        (true, _) => "ok".to_owned(),
        (false, Some(reason)) => format!("FAIL: {}", reason),
        (false, None) => "FAIL".to_owned(),
    }
}
