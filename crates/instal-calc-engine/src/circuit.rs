//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Per-circuit sizing pipeline and verdict."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use tracing::{debug, warn};

use crate::{
    bom::BomLine,
    breaker::select_breaker,
    load::{aggregate_load, design_current},
    model::{round2, CircuitInput, CircuitResult, SystemVoltage},
    section::{escalate_for_breaker, evaluate_section, select_section, RunSpec, SectionChoice},
    tables::{LookupTables, Method},
    EPSILON,
};

/// Section and breaker settled for one cable run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizedRun {
    pub choice: SectionChoice,
    pub breaker_a: f64,
}

impl SizedRun {
    pub fn breaker_fits(&self) -> bool {
        self.breaker_a <= self.choice.ampacity_a + EPSILON
    }
}

/// Select section and breaker for `run`. A manual section is evaluated as
/// given and never escalated; otherwise the selected section is escalated
/// until the breaker fits within its ampacity or the table is exhausted.
pub fn size_run(run: &RunSpec, manual_section_mm2: Option<f64>, tables: &LookupTables) -> SizedRun {
    match manual_section_mm2 {
        Some(section) => {
            let choice = evaluate_section(run, section, &tables.ampacity, &tables.voltage_drop);
            let breaker_a = select_breaker(run.design_current_a, choice.ampacity_a, &tables.breakers);
            SizedRun { choice, breaker_a }
        }
        None => {
            let selected = select_section(run, &tables.ampacity, &tables.voltage_drop);
            let breaker_a =
                select_breaker(run.design_current_a, selected.ampacity_a, &tables.breakers);
            let choice = escalate_for_breaker(
                run,
                selected,
                breaker_a,
                &tables.ampacity,
                &tables.voltage_drop,
            );
            SizedRun { choice, breaker_a }
        }
    }
}

/// Pass/fail of a sized run. A voltage drop failure is reported ahead of a
/// breaker that exceeds the ampacity.
pub fn verdict(sized: &SizedRun, max_voltage_drop_pct: f64) -> (bool, Option<String>) {
    let drop = sized.choice.voltage_drop_pct;
    if drop > max_voltage_drop_pct + EPSILON {
        let reason = if drop.is_finite() {
            format!(
                "voltage drop {:.2}% exceeds limit {}%",
                drop, max_voltage_drop_pct
            )
        } else {
            format!(
                "voltage drop unknown for {} mm² exceeds limit {}%",
                sized.choice.section_mm2, max_voltage_drop_pct
            )
        };
        return (false, Some(reason));
    }
    if !sized.breaker_fits() {
        return (
            false,
            Some(format!(
                "breaker rating {} A exceeds ampacity {:.2} A",
                sized.breaker_a, sized.choice.ampacity_a
            )),
        );
    }
    (true, None)
}

/// Installation id resolved through the catalog, or read as a method name.
/// Unknown ids fall back to `B2` with a warning.
pub fn resolve_method(
    installation_id: &str,
    tables: &LookupTables,
    subject: &str,
    warnings: &mut Vec<String>,
) -> Method {
    if let Some(method) = tables.installations.method_for(installation_id) {
        return method;
    }
    if let Ok(method) = installation_id.parse::<Method>() {
        return method;
    }
    warn!(subject, installation_id, "unknown installation id; assuming B2");
    warnings.push(format!(
        "{}: unknown installation '{}', method B2 assumed",
        subject, installation_id
    ));
    Method::default()
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitEvaluation {
    pub result: CircuitResult,
    /// Unrounded power after simultaneity, fed into the feeder total.
    pub power_w: f64,
    pub bom: Vec<BomLine>,
}

/// Size one circuit. Returns `None` when its circuit type is unknown; the
/// reason is appended to `warnings` and the circuit is left out entirely.
pub fn evaluate_circuit(
    circuit: &CircuitInput,
    installation_system: SystemVoltage,
    tables: &LookupTables,
    include_pe_conductor: bool,
    warnings: &mut Vec<String>,
) -> Option<CircuitEvaluation> {
    let subject = format!("Circuit \"{}\"", circuit.label());

    let Some(circuit_type) = tables.circuit_types.get(&circuit.type_id) else {
        warn!(circuit = %circuit.id, type_id = %circuit.type_id, "unknown circuit type; skipping");
        warnings.push(format!(
            "{} has unknown circuit type '{}'",
            subject, circuit.type_id
        ));
        return None;
    };

    let system = circuit.system.unwrap_or(installation_system);
    let method = resolve_method(&circuit.installation_id, tables, &subject, warnings);
    let loaded = circuit
        .loaded_conductors
        .unwrap_or_else(|| system.default_loaded_conductors());

    let load = aggregate_load(circuit, &tables.appliances);
    for id in &load.unknown_appliances {
        warnings.push(format!("{}: appliance '{}' not found in catalog", subject, id));
    }
    let design_current_a = design_current(load.power_w, system, load.power_factor);

    let run = RunSpec {
        design_current_a,
        max_voltage_drop_pct: circuit_type.max_voltage_drop_pct,
        length_m: circuit.length_m,
        system,
        method,
        loaded,
        min_section_mm2: circuit_type.min_section_mm2,
    };

    if let Some(section) = circuit.manual_section_mm2 {
        if section + EPSILON < circuit_type.min_section_mm2 {
            warnings.push(format!(
                "{}: manual section {} mm² is below the {} mm² minimum for '{}'",
                subject, section, circuit_type.min_section_mm2, circuit_type.id
            ));
        }
    }

    let sized = size_run(&run, circuit.manual_section_mm2, tables);
    if circuit.manual_section_mm2.is_none() && !sized.breaker_fits() {
        warn!(
            circuit = %circuit.id,
            breaker_a = sized.breaker_a,
            ampacity_a = sized.choice.ampacity_a,
            "section table exhausted before the breaker fits"
        );
        warnings.push(format!(
            "{}: breaker {} A exceeds ampacity {:.2} A of the largest section",
            subject, sized.breaker_a, sized.choice.ampacity_a
        ));
    }

    let (ok, reason) = verdict(&sized, circuit_type.max_voltage_drop_pct);
    debug!(
        circuit = %circuit.id,
        section_mm2 = sized.choice.section_mm2,
        breaker_a = sized.breaker_a,
        ok,
        "circuit sized"
    );

    let conductors = loaded.count() + u8::from(include_pe_conductor);
    let bom = vec![
        BomLine::cable(conductors, sized.choice.section_mm2, method, circuit.length_m),
        BomLine::breaker(sized.breaker_a, &tables.breakers.default_curve),
    ];

    let result = CircuitResult {
        id: circuit.id.clone(),
        name: circuit.name.clone(),
        type_id: circuit.type_id.clone(),
        room: circuit.room.clone(),
        voltage_v: system.volts(),
        length_m: circuit.length_m,
        method,
        loaded_conductors: loaded,
        power_w: round2(load.power_w),
        power_factor: round2(load.power_factor),
        design_current_a: round2(design_current_a),
        section_mm2: sized.choice.section_mm2,
        ampacity_a: round2(sized.choice.ampacity_a),
        breaker_a: sized.breaker_a,
        voltage_drop_pct: round2(sized.choice.voltage_drop_pct),
        max_voltage_drop_pct: circuit_type.max_voltage_drop_pct,
        manual_section: circuit.manual_section_mm2.is_some(),
        ok,
        reason,
    };

    Some(CircuitEvaluation {
        result,
        power_w: load.power_w,
        bom,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{model::Load, tables::LoadedConductors};

    fn circuit(id: &str, type_id: &str, power_w: f64, length_m: f64) -> CircuitInput {
        CircuitInput {
            id: id.into(),
            name: None,
            type_id: type_id.into(),
            room: None,
            system: None,
            length_m,
            installation_id: "wall_conduit".into(),
            loaded_conductors: None,
            load: Load::Direct { power_w },
            power_factor: Some(1.0),
            simultaneity: None,
            manual_section_mm2: None,
        }
    }

    fn evaluate(c: &CircuitInput, tables: &LookupTables) -> (Option<CircuitEvaluation>, Vec<String>) {
        let mut warnings = Vec::new();
        let evaluation = evaluate_circuit(c, SystemVoltage::SinglePhase230, tables, true, &mut warnings);
        (evaluation, warnings)
    }

    #[test]
    fn sizes_a_small_sockets_circuit() {
        let tables = LookupTables::builtin().unwrap();
        let (evaluation, warnings) = evaluate(&circuit("c1", "sockets", 2300.0, 25.0), &tables);
        let evaluation = evaluation.unwrap();
        assert!(warnings.is_empty());

        let result = &evaluation.result;
        assert_eq!(result.design_current_a, 10.0);
        assert_eq!(result.section_mm2, 2.5);
        assert_eq!(result.breaker_a, 10.0);
        assert_eq!(result.voltage_drop_pct, 0.83);
        assert_eq!(result.loaded_conductors, LoadedConductors::Two);
        assert!(result.ok);
        assert!(result.reason.is_none());

        assert_eq!(evaluation.bom[0].code, "CU-3x2.5mm2-B2");
        assert_eq!(evaluation.bom[0].quantity, 25.0);
        assert_eq!(evaluation.bom[1].code, "MCB-10A-C");
    }

    #[test]
    fn unknown_circuit_type_is_skipped_with_warning() {
        let tables = LookupTables::builtin().unwrap();
        let (evaluation, warnings) = evaluate(&circuit("c9", "sauna", 100.0, 5.0), &tables);
        assert!(evaluation.is_none());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("sauna"));
    }

    #[test]
    fn long_run_fails_on_voltage_drop() {
        let tables = LookupTables::builtin().unwrap();
        let (evaluation, _) = evaluate(&circuit("c2", "sockets", 2300.0, 5000.0), &tables);
        let result = evaluation.unwrap().result;
        assert_eq!(result.section_mm2, 120.0);
        assert!(!result.ok);
        let reason = result.reason.unwrap();
        assert!(reason.starts_with("voltage drop"), "{}", reason);
        assert!(reason.contains("limit 3%"));
    }

    #[test]
    fn escalates_section_until_breaker_fits() {
        let mut tables = LookupTables::builtin().unwrap();
        // Coarse series: 18 A needs 25 A, more than 2.5 mm² carries (23 A).
        tables.breakers.ratings_a = vec![10.0, 25.0, 40.0];
        let (evaluation, warnings) = evaluate(&circuit("c3", "sockets", 18.0 * 230.0, 10.0), &tables);
        let result = evaluation.unwrap().result;
        assert_eq!(result.breaker_a, 25.0);
        assert_eq!(result.section_mm2, 4.0);
        assert_eq!(result.ampacity_a, 30.0);
        assert!(result.ok);
        assert!(warnings.is_empty());
    }

    #[test]
    fn breaker_failure_reported_when_table_exhausted() {
        let mut tables = LookupTables::builtin().unwrap();
        tables.breakers.ratings_a = vec![10.0, 300.0];
        let (evaluation, warnings) = evaluate(&circuit("c4", "sockets", 20.0 * 230.0, 5.0), &tables);
        let result = evaluation.unwrap().result;
        assert_eq!(result.breaker_a, 300.0);
        assert_eq!(result.section_mm2, 120.0);
        assert!(!result.ok);
        assert!(result.reason.unwrap().starts_with("breaker rating 300 A"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn voltage_drop_reason_wins_when_both_fail() {
        let sized = SizedRun {
            choice: SectionChoice {
                section_mm2: 2.5,
                ampacity_a: 23.0,
                voltage_drop_pct: 4.2,
            },
            breaker_a: 32.0,
        };
        let (ok, reason) = verdict(&sized, 3.0);
        assert!(!ok);
        assert_eq!(reason.unwrap(), "voltage drop 4.20% exceeds limit 3%");
    }

    #[test]
    fn manual_section_skips_selection_and_escalation() {
        let tables = LookupTables::builtin().unwrap();
        let mut c = circuit("c5", "sockets", 3450.0, 10.0);
        c.manual_section_mm2 = Some(1.5);
        let (evaluation, warnings) = evaluate(&c, &tables);
        let result = evaluation.unwrap().result;
        assert!(result.manual_section);
        assert_eq!(result.section_mm2, 1.5);
        assert_eq!(result.ampacity_a, 16.5);
        assert_eq!(result.breaker_a, 16.0);
        assert!(result.ok);
        assert!(warnings.iter().any(|w| w.contains("below the 2.5 mm² minimum")));
    }

    #[test]
    fn manual_section_outside_table_fails() {
        let tables = LookupTables::builtin().unwrap();
        let mut c = circuit("c6", "lighting", 500.0, 10.0);
        c.manual_section_mm2 = Some(3.0);
        let (evaluation, _) = evaluate(&c, &tables);
        let result = evaluation.unwrap().result;
        assert_eq!(result.section_mm2, 3.0);
        assert_eq!(result.ampacity_a, 0.0);
        assert!(!result.ok);
    }

    #[test]
    fn unknown_installation_assumes_b2() {
        let tables = LookupTables::builtin().unwrap();
        let mut warnings = Vec::new();
        assert_eq!(resolve_method("D1", &tables, "x", &mut warnings), Method::D1);
        assert!(warnings.is_empty());
        assert_eq!(resolve_method("roof", &tables, "x", &mut warnings), Method::B2);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn three_phase_override_uses_three_loaded_conductors() {
        let tables = LookupTables::builtin().unwrap();
        let mut c = circuit("c7", "motor", 7500.0, 30.0);
        c.system = Some(SystemVoltage::ThreePhase400);
        c.power_factor = Some(0.8);
        let (evaluation, _) = evaluate(&c, &tables);
        let evaluation = evaluation.unwrap();
        assert_eq!(evaluation.result.voltage_v, 400.0);
        assert_eq!(evaluation.result.loaded_conductors, LoadedConductors::Three);
        assert_eq!(evaluation.bom[0].code, "CU-4x2.5mm2-B2");
        assert!(evaluation.result.ok);
    }
}
