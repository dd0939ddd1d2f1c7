//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Feeder sizing from the aggregate installation load."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use tracing::debug;

use crate::{
    bom::BomLine,
    circuit::{resolve_method, size_run, verdict},
    load::design_current,
    model::{clamp_unit, round2, FeederCable, FeederInput, FeederResult, SystemVoltage},
    section::RunSpec,
    tables::LookupTables,
};

/// Copper feeders are never smaller than this.
pub const FEEDER_MIN_SECTION_MM2: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FeederEvaluation {
    pub result: FeederResult,
    pub bom: Vec<BomLine>,
}

/// Size the feeder for `circuits_power_w` (sum of circuit powers after
/// simultaneity). Returns `None` when the feeder is disabled.
pub fn evaluate_feeder(
    feeder: &FeederInput,
    system: SystemVoltage,
    circuits_power_w: f64,
    tables: &LookupTables,
    include_pe_conductor: bool,
    warnings: &mut Vec<String>,
) -> Option<FeederEvaluation> {
    if !feeder.enabled {
        return None;
    }

    let method = resolve_method(&feeder.installation_id, tables, "Feeder", warnings);
    let loaded = system.default_loaded_conductors();
    let power_w = circuits_power_w * clamp_unit(feeder.demand_factor);
    let design_current_a = design_current(power_w, system, feeder.power_factor);

    let run = RunSpec {
        design_current_a,
        max_voltage_drop_pct: feeder.max_voltage_drop_pct,
        length_m: feeder.length_m,
        system,
        method,
        loaded,
        min_section_mm2: FEEDER_MIN_SECTION_MM2,
    };
    let sized = size_run(&run, None, tables);
    let (ok, reason) = verdict(&sized, feeder.max_voltage_drop_pct);
    debug!(
        power_w,
        design_current_a,
        section_mm2 = sized.choice.section_mm2,
        breaker_a = sized.breaker_a,
        ok,
        "feeder sized"
    );

    let cable = FeederCable::for_method(method);
    let conductors = loaded.count() + u8::from(include_pe_conductor);
    let curve = &tables.breakers.default_curve;
    let bom = vec![
        BomLine::feeder_cable(
            conductors,
            sized.choice.section_mm2,
            method,
            feeder.length_m,
            cable.description(),
        ),
        BomLine::main_breaker(system.main_breaker_poles(), sized.breaker_a, curve),
    ];

    let result = FeederResult {
        voltage_v: system.volts(),
        length_m: feeder.length_m,
        method,
        loaded_conductors: loaded,
        power_w: round2(power_w),
        power_factor: round2(feeder.power_factor),
        design_current_a: round2(design_current_a),
        section_mm2: sized.choice.section_mm2,
        ampacity_a: round2(sized.choice.ampacity_a),
        breaker_a: sized.breaker_a,
        voltage_drop_pct: round2(sized.choice.voltage_drop_pct),
        max_voltage_drop_pct: feeder.max_voltage_drop_pct,
        cable,
        ok,
        reason,
    };

    Some(FeederEvaluation { result, bom })
}
