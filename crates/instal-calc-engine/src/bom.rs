//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bill of materials lines and their aggregation."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::tables::{Method, RcdDevice};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BomUnit {
    /// Metres of cable.
    #[serde(rename = "m")]
    Meters,
    /// Individual devices.
    #[serde(rename = "u")]
    Units,
}

impl BomUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            BomUnit::Meters => "m",
            BomUnit::Units => "u",
        }
    }
}

impl fmt::Display for BomUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomLine {
    pub code: String,
    pub description: String,
    pub quantity: f64,
    pub unit: BomUnit,
}

impl BomLine {
    pub fn cable(conductors: u8, section_mm2: f64, method: Method, length_m: f64) -> Self {
        Self {
            code: format!("CU-{}x{}mm2-{}", conductors, section_mm2, method),
            description: format!(
                "Copper cable {}x{} mm² ({})",
                conductors, section_mm2, method
            ),
            quantity: cable_length(length_m),
            unit: BomUnit::Meters,
        }
    }

    pub fn breaker(rating_a: f64, curve: &str) -> Self {
        Self {
            code: format!("MCB-{}A-{}", rating_a, curve),
            description: format!("Circuit breaker {} A curve {}", rating_a, curve),
            quantity: 1.0,
            unit: BomUnit::Units,
        }
    }

    pub fn feeder_cable(
        conductors: u8,
        section_mm2: f64,
        method: Method,
        length_m: f64,
        family: &str,
    ) -> Self {
        Self {
            code: format!("FEEDER-{}x{}mm2-{}", conductors, section_mm2, method),
            description: format!("{} {}x{} mm² ({})", family, conductors, section_mm2, method),
            quantity: cable_length(length_m),
            unit: BomUnit::Meters,
        }
    }

    pub fn main_breaker(poles: u8, rating_a: f64, curve: &str) -> Self {
        Self {
            code: format!("MAIN-{}P-{}A", poles, rating_a),
            description: format!(
                "Main breaker {} poles {} A curve {}",
                poles, rating_a, curve
            ),
            quantity: 1.0,
            unit: BomUnit::Units,
        }
    }

    pub fn terminal_rcd(device: &RcdDevice, group: usize, circuits: usize) -> Self {
        Self {
            code: format!("RCD-{}mA-{}", device.sensitivity_ma, device.kind),
            description: format!(
                "Residual current device {} mA type {} (group {}, {} circuits)",
                device.sensitivity_ma, device.kind, group, circuits
            ),
            quantity: 1.0,
            unit: BomUnit::Units,
        }
    }

    pub fn upstream_rcd(device: &RcdDevice) -> Self {
        Self {
            code: format!("RCD-{}mA-{}-S", device.sensitivity_ma, device.kind),
            description: format!(
                "Selective residual current device {} mA type {} (upstream)",
                device.sensitivity_ma, device.kind
            ),
            quantity: 1.0,
            unit: BomUnit::Units,
        }
    }
}

/// Cable is bought by the whole metre.
fn cable_length(length_m: f64) -> f64 {
    if length_m.is_finite() && length_m > 0.0 {
        length_m.ceil()
    } else {
        0.0
    }
}

/// Merge lines sharing `(code, unit)`, summing quantities. The first line of
/// each key keeps its description. Output is ordered by code.
pub fn aggregate(lines: &[BomLine]) -> Vec<BomLine> {
    let mut merged: BTreeMap<(String, BomUnit), BomLine> = BTreeMap::new();
    for line in lines {
        merged
            .entry((line.code.clone(), line.unit))
            .and_modify(|existing| existing.quantity += line.quantity)
            .or_insert_with(|| line.clone());
    }
    merged.into_values().collect()
}
