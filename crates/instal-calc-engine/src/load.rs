//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Load aggregation and design current."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use tracing::warn;

use crate::{
    model::{clamp_unit, CircuitInput, Load, SystemVoltage},
    tables::ApplianceCatalog,
};

pub const FALLBACK_POWER_FACTOR: f64 = 0.85;
const MIN_POWER_FACTOR: f64 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedLoad {
    /// Power after the simultaneity factor, in watts.
    pub power_w: f64,
    pub power_factor: f64,
    /// Appliance ids that were not found in the catalog.
    pub unknown_appliances: Vec<String>,
}

pub fn aggregate_load(circuit: &CircuitInput, catalog: &ApplianceCatalog) -> AggregatedLoad {
    let power_factor = circuit
        .power_factor
        .or(catalog.default_power_factor)
        .unwrap_or(FALLBACK_POWER_FACTOR);

    let mut unknown_appliances = Vec::new();
    let declared = match &circuit.load {
        Load::Direct { power_w } => *power_w,
        Load::Itemized {
            base_power_w,
            items,
        } => {
            let mut total = *base_power_w;
            for line in items {
                match catalog.find(line.group, &line.id) {
                    Some(appliance) => total += appliance.watts * line.quantity,
                    None => {
                        warn!(
                            circuit = %circuit.id,
                            appliance = %line.id,
                            group = ?line.group,
                            "appliance not in catalog; contributes no load"
                        );
                        unknown_appliances.push(line.id.clone());
                    }
                }
            }
            total
        }
    };

    AggregatedLoad {
        power_w: declared * simultaneity(circuit.simultaneity),
        power_factor,
        unknown_appliances,
    }
}

/// Simultaneity clamped to `[0, 1]`. Absent or zero means the whole load.
pub fn simultaneity(factor: Option<f64>) -> f64 {
    let k = clamp_unit(factor.unwrap_or(1.0));
    if k > 0.0 {
        k
    } else {
        1.0
    }
}

/// Design current `Ib` drawn by `power_w` at the given power factor.
pub fn design_current(power_w: f64, system: SystemVoltage, power_factor: f64) -> f64 {
    let pf = power_factor.max(MIN_POWER_FACTOR);
    match system {
        SystemVoltage::SinglePhase230 => power_w / (system.volts() * pf),
        SystemVoltage::ThreePhase400 => power_w / (3f64.sqrt() * system.volts() * pf),
    }
}
