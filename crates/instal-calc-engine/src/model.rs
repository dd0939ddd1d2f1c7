//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Input and output contract of the sizing engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    bom::BomLine,
    tables::{ApplianceGroup, EarthingConfig, LoadedConductors, Method},
};

pub const DEFAULT_RCD_GROUP_SIZE: usize = 4;

/// Supply system of a circuit or of the whole installation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum SystemVoltage {
    #[default]
    #[serde(rename = "single_phase_230", alias = "monofasico_230")]
    SinglePhase230,
    #[serde(rename = "three_phase_400", alias = "trifasico_400")]
    ThreePhase400,
}

impl SystemVoltage {
    pub fn volts(&self) -> f64 {
        match self {
            SystemVoltage::SinglePhase230 => 230.0,
            SystemVoltage::ThreePhase400 => 400.0,
        }
    }

    /// Length factor of the voltage drop formula: outgoing plus return
    /// conductor for single phase, `√3` for three phase.
    pub fn drop_factor(&self) -> f64 {
        match self {
            SystemVoltage::SinglePhase230 => 2.0,
            SystemVoltage::ThreePhase400 => 3f64.sqrt(),
        }
    }

    pub fn default_loaded_conductors(&self) -> LoadedConductors {
        match self {
            SystemVoltage::SinglePhase230 => LoadedConductors::Two,
            SystemVoltage::ThreePhase400 => LoadedConductors::Three,
        }
    }

    pub fn main_breaker_poles(&self) -> u8 {
        match self {
            SystemVoltage::SinglePhase230 => 2,
            SystemVoltage::ThreePhase400 => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplianceLine {
    #[serde(default)]
    pub group: ApplianceGroup,
    pub id: String,
    pub quantity: f64,
}

/// Declared load of a circuit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Load {
    /// A single declared wattage.
    Direct { power_w: f64 },
    /// Catalog appliances, optionally on top of a declared wattage.
    Itemized {
        #[serde(default)]
        base_power_w: f64,
        items: Vec<ApplianceLine>,
    },
}

impl Default for Load {
    fn default() -> Self {
        Load::Direct { power_w: 0.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitInput {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub type_id: String,
    /// Free-text location used to group circuits in reports.
    #[serde(default)]
    pub room: Option<String>,
    /// Overrides the installation-wide system when set.
    #[serde(default)]
    pub system: Option<SystemVoltage>,
    pub length_m: f64,
    pub installation_id: String,
    #[serde(default)]
    pub loaded_conductors: Option<LoadedConductors>,
    #[serde(default)]
    pub load: Load,
    #[serde(default)]
    pub power_factor: Option<f64>,
    #[serde(default)]
    pub simultaneity: Option<f64>,
    /// Expert mode: a fixed section replaces automatic selection.
    #[serde(default)]
    pub manual_section_mm2: Option<f64>,
}

impl CircuitInput {
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

fn default_feeder_max_drop() -> f64 {
    2.0
}

fn default_feeder_demand() -> f64 {
    0.8
}

fn default_feeder_power_factor() -> f64 {
    0.9
}

/// Supply run from the metering point to the main panel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeederInput {
    pub enabled: bool,
    pub length_m: f64,
    pub installation_id: String,
    #[serde(default = "default_feeder_max_drop")]
    pub max_voltage_drop_pct: f64,
    #[serde(default = "default_feeder_demand")]
    pub demand_factor: f64,
    #[serde(default = "default_feeder_power_factor")]
    pub power_factor: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ComputeOptions {
    #[serde(default)]
    pub rcd_group_size: Option<usize>,
    #[serde(default)]
    pub include_upstream_rcd: Option<bool>,
    #[serde(default)]
    pub include_pe_conductor: Option<bool>,
}

impl ComputeOptions {
    pub fn rcd_group_size(&self) -> usize {
        self.rcd_group_size.unwrap_or(DEFAULT_RCD_GROUP_SIZE).max(1)
    }

    pub fn include_upstream_rcd(&self) -> bool {
        self.include_upstream_rcd.unwrap_or(true)
    }

    pub fn include_pe_conductor(&self) -> bool {
        self.include_pe_conductor.unwrap_or(true)
    }

    /// Fill unset fields from `defaults`.
    pub fn or(&self, defaults: &ComputeOptions) -> ComputeOptions {
        ComputeOptions {
            rcd_group_size: self.rcd_group_size.or(defaults.rcd_group_size),
            include_upstream_rcd: self.include_upstream_rcd.or(defaults.include_upstream_rcd),
            include_pe_conductor: self.include_pe_conductor.or(defaults.include_pe_conductor),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElectricalInput {
    #[serde(default)]
    pub system: SystemVoltage,
    #[serde(default)]
    pub circuits: Vec<CircuitInput>,
    #[serde(default)]
    pub feeder: Option<FeederInput>,
    #[serde(default)]
    pub options: ComputeOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitResult {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub type_id: String,
    #[serde(default)]
    pub room: Option<String>,
    pub voltage_v: f64,
    pub length_m: f64,
    pub method: Method,
    pub loaded_conductors: LoadedConductors,
    pub power_w: f64,
    pub power_factor: f64,
    pub design_current_a: f64,
    pub section_mm2: f64,
    pub ampacity_a: f64,
    pub breaker_a: f64,
    /// `null` when the section has no drop coefficient.
    #[serde(deserialize_with = "drop_or_infinite")]
    pub voltage_drop_pct: f64,
    pub max_voltage_drop_pct: f64,
    pub manual_section: bool,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FeederCable {
    /// Copper conductors in a conduit or tray.
    SurfaceRunCopper,
    /// Armoured cable buried directly in the ground.
    DirectBuried,
}

impl FeederCable {
    pub fn for_method(method: Method) -> Self {
        if method.is_direct_burial() {
            FeederCable::DirectBuried
        } else {
            FeederCable::SurfaceRunCopper
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            FeederCable::SurfaceRunCopper => "Copper conductors in conduit",
            FeederCable::DirectBuried => "Direct-burial armoured cable",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeederResult {
    pub voltage_v: f64,
    pub length_m: f64,
    pub method: Method,
    pub loaded_conductors: LoadedConductors,
    pub power_w: f64,
    pub power_factor: f64,
    pub design_current_a: f64,
    pub section_mm2: f64,
    pub ampacity_a: f64,
    pub breaker_a: f64,
    /// `null` when the section has no drop coefficient.
    #[serde(deserialize_with = "drop_or_infinite")]
    pub voltage_drop_pct: f64,
    pub max_voltage_drop_pct: f64,
    pub cable: FeederCable,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ElectricalOutput {
    pub circuits: Vec<CircuitResult>,
    #[serde(default)]
    pub feeder: Option<FeederResult>,
    pub bom: Vec<BomLine>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub earthing: Option<EarthingConfig>,
}

impl ElectricalOutput {
    /// True when every circuit and the feeder meet their limits.
    pub fn is_ok(&self) -> bool {
        self.circuits.iter().all(|c| c.ok) && self.feeder.as_ref().map_or(true, |f| f.ok)
    }

    pub fn failing_circuits(&self) -> impl Iterator<Item = &CircuitResult> {
        self.circuits.iter().filter(|c| !c.ok)
    }
}

/// Infinite drops serialize as `null`; read them back as infinite.
fn drop_or_infinite<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

pub(crate) fn round2(value: f64) -> f64 {
    if value.is_finite() {
        (value * 100.0).round() / 100.0
    } else {
        value
    }
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
