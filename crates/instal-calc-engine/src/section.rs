//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Conductor section selection against ampacity and voltage drop."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    model::SystemVoltage,
    tables::{AmpacityTable, LoadedConductors, Method, VoltageDropTable},
    EPSILON,
};

/// Everything the selector needs to know about one cable run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSpec {
    pub design_current_a: f64,
    pub max_voltage_drop_pct: f64,
    pub length_m: f64,
    pub system: SystemVoltage,
    pub method: Method,
    pub loaded: LoadedConductors,
    pub min_section_mm2: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SectionChoice {
    pub section_mm2: f64,
    pub ampacity_a: f64,
    pub voltage_drop_pct: f64,
}

/// Percentage voltage drop of a run, infinite when the section has no
/// coefficient.
pub fn voltage_drop_pct(
    current_a: f64,
    section_mm2: f64,
    length_m: f64,
    system: SystemVoltage,
    table: &VoltageDropTable,
) -> f64 {
    let Some(v_per_a_km) = table.coefficient(section_mm2) else {
        return f64::INFINITY;
    };
    let drop_v = system.drop_factor() * current_a * (length_m / 1000.0) * v_per_a_km;
    100.0 * drop_v / system.volts()
}

/// Ampacity and voltage drop of `run` on a given section.
pub fn evaluate_section(
    run: &RunSpec,
    section_mm2: f64,
    ampacity: &AmpacityTable,
    drops: &VoltageDropTable,
) -> SectionChoice {
    SectionChoice {
        section_mm2,
        ampacity_a: ampacity.ampacity(section_mm2, run.method, run.loaded),
        voltage_drop_pct: voltage_drop_pct(
            run.design_current_a,
            section_mm2,
            run.length_m,
            run.system,
            drops,
        ),
    }
}

/// Smallest section at or above the minimum whose ampacity covers the design
/// current and whose voltage drop is within the limit.
///
/// When no section qualifies the largest one is returned with its actual
/// figures; the caller turns that into a failed verdict.
pub fn select_section(
    run: &RunSpec,
    ampacity: &AmpacityTable,
    drops: &VoltageDropTable,
) -> SectionChoice {
    let sections = ampacity.sections();

    for &section in &sections {
        if section + EPSILON < run.min_section_mm2 {
            continue;
        }
        let candidate = evaluate_section(run, section, ampacity, drops);
        if candidate.ampacity_a <= 0.0 || candidate.ampacity_a + EPSILON < run.design_current_a {
            continue;
        }
        if candidate.voltage_drop_pct <= run.max_voltage_drop_pct + EPSILON {
            debug!(
                section_mm2 = section,
                ampacity_a = candidate.ampacity_a,
                voltage_drop_pct = candidate.voltage_drop_pct,
                "section accepted"
            );
            return candidate;
        }
    }

    match sections.last() {
        Some(&largest) => {
            debug!(
                section_mm2 = largest,
                design_current_a = run.design_current_a,
                "no section satisfies the run; falling back to the largest"
            );
            evaluate_section(run, largest, ampacity, drops)
        }
        None => SectionChoice {
            section_mm2: 0.0,
            ampacity_a: 0.0,
            voltage_drop_pct: f64::INFINITY,
        },
    }
}

/// Step through larger sections until `breaker_a` fits within the ampacity
/// or the table runs out. Returns the last section evaluated.
pub fn escalate_for_breaker(
    run: &RunSpec,
    current: SectionChoice,
    breaker_a: f64,
    ampacity: &AmpacityTable,
    drops: &VoltageDropTable,
) -> SectionChoice {
    if breaker_a <= current.ampacity_a + EPSILON {
        return current;
    }
    let larger = ampacity
        .sections()
        .into_iter()
        .filter(|&s| s > current.section_mm2 + EPSILON);

    let mut choice = current;
    for section in larger {
        choice = evaluate_section(run, section, ampacity, drops);
        debug!(
            section_mm2 = section,
            ampacity_a = choice.ampacity_a,
            breaker_a,
            "escalated section for breaker"
        );
        if breaker_a <= choice.ampacity_a + EPSILON {
            break;
        }
    }
    choice
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{AmpacityRow, ConductorAmpacity, VoltageDropRow};

    fn row(section: f64, b2_two: f64) -> AmpacityRow {
        AmpacityRow {
            section_mm2: section,
            b2: Some(ConductorAmpacity {
                two_loaded: Some(b2_two),
                three_loaded: None,
            }),
            d1: None,
            d2: None,
        }
    }

    fn tables(rows: Vec<AmpacityRow>, drops: &[(f64, f64)]) -> (AmpacityTable, VoltageDropTable) {
        (
            AmpacityTable {
                source: None,
                note: None,
                rows,
            },
            VoltageDropTable {
                source: None,
                rows: drops
                    .iter()
                    .map(|&(section_mm2, v_per_a_km)| VoltageDropRow {
                        section_mm2,
                        v_per_a_km,
                    })
                    .collect(),
            },
        )
    }

    fn run(ib: f64, length_m: f64, max_drop: f64) -> RunSpec {
        RunSpec {
            design_current_a: ib,
            max_voltage_drop_pct: max_drop,
            length_m,
            system: SystemVoltage::SinglePhase230,
            method: Method::B2,
            loaded: LoadedConductors::Two,
            min_section_mm2: 1.5,
        }
    }

    #[test]
    fn drop_formula_matches_hand_calculation() {
        let (_, drops) = tables(vec![], &[(2.5, 3.8)]);
        let pct = voltage_drop_pct(10.0, 2.5, 25.0, SystemVoltage::SinglePhase230, &drops);
        assert!((pct - 0.826_086_956).abs() < 1e-6);

        let three = voltage_drop_pct(10.0, 2.5, 25.0, SystemVoltage::ThreePhase400, &drops);
        let expected = 100.0 * 3f64.sqrt() * 10.0 * 0.025 * 3.8 / 400.0;
        assert!((three - expected).abs() < 1e-9);
    }

    #[test]
    fn missing_coefficient_is_infinite_drop() {
        let (_, drops) = tables(vec![], &[(2.5, 3.8)]);
        let pct = voltage_drop_pct(10.0, 4.0, 25.0, SystemVoltage::SinglePhase230, &drops);
        assert!(pct.is_infinite());
    }

    #[test]
    fn picks_smallest_section_that_meets_both_limits() {
        let (amp, drops) = tables(
            vec![row(1.5, 16.5), row(2.5, 23.0), row(4.0, 30.0)],
            &[(1.5, 6.3), (2.5, 3.8), (4.0, 2.4)],
        );
        let choice = select_section(&run(10.0, 25.0, 3.0), &amp, &drops);
        assert_eq!(choice.section_mm2, 1.5);

        // 1.5 mm² gives 1.37 %, over a 1 % limit; 2.5 mm² gives 0.83 %.
        let choice = select_section(&run(10.0, 25.0, 1.0), &amp, &drops);
        assert_eq!(choice.section_mm2, 2.5);
        assert_eq!(choice.ampacity_a, 23.0);
    }

    #[test]
    fn minimum_section_is_respected() {
        let (amp, drops) = tables(
            vec![row(1.5, 16.5), row(2.5, 23.0)],
            &[(1.5, 6.3), (2.5, 3.8)],
        );
        let mut base = run(5.0, 5.0, 3.0);
        base.min_section_mm2 = 2.5;
        assert_eq!(select_section(&base, &amp, &drops).section_mm2, 2.5);
    }

    #[test]
    fn exact_ampacity_is_accepted() {
        let (amp, drops) = tables(vec![row(2.5, 23.0)], &[(2.5, 3.8)]);
        let mut base = run(23.0, 1.0, 3.0);
        base.min_section_mm2 = 0.0;
        let choice = select_section(&base, &amp, &drops);
        assert_eq!(choice.section_mm2, 2.5);
        assert!(choice.voltage_drop_pct < 3.0);
    }

    #[test]
    fn scans_in_ascending_order_on_unsorted_non_monotonic_table() {
        // Rows out of order, and 6 mm² deliberately carries less than 4 mm².
        let (amp, drops) = tables(
            vec![row(10.0, 52.0), row(6.0, 20.0), row(2.5, 23.0), row(4.0, 30.0)],
            &[(2.5, 3.8), (4.0, 2.4), (6.0, 1.6), (10.0, 0.95)],
        );
        let mut base = run(25.0, 10.0, 3.0);
        base.min_section_mm2 = 0.0;
        let choice = select_section(&base, &amp, &drops);
        assert_eq!(choice.section_mm2, 4.0);

        base.design_current_a = 35.0;
        let choice = select_section(&base, &amp, &drops);
        assert_eq!(choice.section_mm2, 10.0);
    }

    #[test]
    fn falls_back_to_largest_section_when_drop_never_fits() {
        let (amp, drops) = tables(
            vec![row(1.5, 16.5), row(2.5, 23.0), row(4.0, 30.0)],
            &[(1.5, 6.3), (2.5, 3.8), (4.0, 2.4)],
        );
        let choice = select_section(&run(15.0, 400.0, 3.0), &amp, &drops);
        assert_eq!(choice.section_mm2, 4.0);
        assert_eq!(choice.ampacity_a, 30.0);
        assert!(choice.voltage_drop_pct > 3.0);
    }

    #[test]
    fn empty_table_yields_unusable_choice() {
        let (amp, drops) = tables(vec![], &[]);
        let choice = select_section(&run(10.0, 10.0, 3.0), &amp, &drops);
        assert_eq!(choice.ampacity_a, 0.0);
        assert!(choice.voltage_drop_pct.is_infinite());
    }

    #[test]
    fn escalation_stops_at_first_section_that_carries_the_breaker() {
        let (amp, drops) = tables(
            vec![row(1.5, 16.5), row(2.5, 23.0), row(4.0, 30.0), row(6.0, 38.0)],
            &[(1.5, 6.3), (2.5, 3.8), (4.0, 2.4), (6.0, 1.6)],
        );
        let base = run(18.0, 10.0, 3.0);
        let start = evaluate_section(&base, 1.5, &amp, &drops);
        let escalated = escalate_for_breaker(&base, start, 25.0, &amp, &drops);
        assert_eq!(escalated.section_mm2, 4.0);

        let exhausted = escalate_for_breaker(&base, start, 50.0, &amp, &drops);
        assert_eq!(exhausted.section_mm2, 6.0);
        assert_eq!(exhausted.ampacity_a, 38.0);

        let untouched = escalate_for_breaker(&base, start, 16.0, &amp, &drops);
        assert_eq!(untouched, start);
    }
}
