//! ---
//! ems_section: "08-energy-models-optimization"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Reference lookup tables consumed by the sizing engine."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Lookup tables are plain data: ampacity per installation method, voltage
//! drop coefficients, circuit type limits, the breaker series, RCD devices,
//! the appliance catalog and installation forms. They are bundled into a
//! single immutable [`LookupTables`] context that every engine call borrows.
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::{CalcEngineError, Result};

/// Two sections closer than this are the same table row.
const SECTION_TOLERANCE: f64 = 1e-6;

/// Installation reference method of the ampacity table.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub enum Method {
    /// Conduit on or embedded in a wall.
    #[default]
    B2,
    /// Duct buried in the ground.
    D1,
    /// Cable buried directly in the ground.
    D2,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::B2 => "B2",
            Method::D1 => "D1",
            Method::D2 => "D2",
        }
    }

    pub fn is_direct_burial(&self) -> bool {
        matches!(self, Method::D2)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "B2" => Ok(Method::B2),
            "D1" => Ok(Method::D1),
            "D2" => Ok(Method::D2),
            other => Err(format!("unknown installation method: {}", other)),
        }
    }
}

/// Number of current-carrying conductors in a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub enum LoadedConductors {
    Two,
    Three,
}

impl LoadedConductors {
    pub fn count(&self) -> u8 {
        match self {
            LoadedConductors::Two => 2,
            LoadedConductors::Three => 3,
        }
    }
}

impl TryFrom<u8> for LoadedConductors {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            2 => Ok(LoadedConductors::Two),
            3 => Ok(LoadedConductors::Three),
            other => Err(format!("loaded conductor count must be 2 or 3, got {}", other)),
        }
    }
}

impl From<LoadedConductors> for u8 {
    fn from(value: LoadedConductors) -> Self {
        value.count()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct ConductorAmpacity {
    #[serde(rename = "2", alias = "2c", default, skip_serializing_if = "Option::is_none")]
    pub two_loaded: Option<f64>,
    #[serde(rename = "3", alias = "3c", default, skip_serializing_if = "Option::is_none")]
    pub three_loaded: Option<f64>,
}

impl ConductorAmpacity {
    pub fn get(&self, loaded: LoadedConductors) -> Option<f64> {
        match loaded {
            LoadedConductors::Two => self.two_loaded,
            LoadedConductors::Three => self.three_loaded,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AmpacityRow {
    pub section_mm2: f64,
    #[serde(rename = "B2", default, skip_serializing_if = "Option::is_none")]
    pub b2: Option<ConductorAmpacity>,
    #[serde(rename = "D1", default, skip_serializing_if = "Option::is_none")]
    pub d1: Option<ConductorAmpacity>,
    #[serde(rename = "D2", default, skip_serializing_if = "Option::is_none")]
    pub d2: Option<ConductorAmpacity>,
}

impl AmpacityRow {
    pub fn method(&self, method: Method) -> Option<&ConductorAmpacity> {
        match method {
            Method::B2 => self.b2.as_ref(),
            Method::D1 => self.d1.as_ref(),
            Method::D2 => self.d2.as_ref(),
        }
    }
}

/// Admissible current by section, installation method and loaded conductors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmpacityTable {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub rows: Vec<AmpacityRow>,
}

impl AmpacityTable {
    /// Admissible current in amperes, `0.0` when the table has no value for
    /// this combination (the section is unusable for the method).
    pub fn ampacity(&self, section_mm2: f64, method: Method, loaded: LoadedConductors) -> f64 {
        self.rows
            .iter()
            .find(|row| same_section(row.section_mm2, section_mm2))
            .and_then(|row| row.method(method))
            .and_then(|values| values.get(loaded))
            .unwrap_or(0.0)
    }

    /// Distinct sections in ascending order, regardless of row order.
    pub fn sections(&self) -> Vec<f64> {
        let mut sections: Vec<f64> = self
            .rows
            .iter()
            .map(|row| row.section_mm2)
            .filter(|s| s.is_finite())
            .collect();
        sections.sort_by(|a, b| a.total_cmp(b));
        sections.dedup_by(|a, b| same_section(*a, *b));
        sections
    }

    pub fn contains(&self, section_mm2: f64) -> bool {
        self.rows
            .iter()
            .any(|row| same_section(row.section_mm2, section_mm2))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct VoltageDropRow {
    pub section_mm2: f64,
    pub v_per_a_km: f64,
}

/// Voltage drop coefficient per section, in volts per ampere and kilometre.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoltageDropTable {
    #[serde(default)]
    pub source: Option<String>,
    pub rows: Vec<VoltageDropRow>,
}

impl VoltageDropTable {
    pub fn coefficient(&self, section_mm2: f64) -> Option<f64> {
        self.rows
            .iter()
            .find(|row| same_section(row.section_mm2, section_mm2))
            .map(|row| row.v_per_a_km)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitType {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub max_voltage_drop_pct: f64,
    pub min_section_mm2: f64,
    #[serde(default)]
    pub motor: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitTypes {
    pub types: Vec<CircuitType>,
}

impl CircuitTypes {
    pub fn get(&self, id: &str) -> Option<&CircuitType> {
        self.types.iter().find(|t| t.id == id)
    }
}

fn default_curve() -> String {
    "C".to_owned()
}

/// Standard breaker ratings in amperes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerSeries {
    pub ratings_a: Vec<f64>,
    #[serde(default = "default_curve")]
    pub default_curve: String,
}

impl BreakerSeries {
    pub fn new(ratings_a: impl Into<Vec<f64>>) -> Self {
        Self {
            ratings_a: ratings_a.into(),
            default_curve: default_curve(),
        }
    }

    /// Ratings in ascending order.
    pub fn sorted(&self) -> Vec<f64> {
        let mut ratings = self.ratings_a.clone();
        ratings.sort_by(|a, b| a.total_cmp(b));
        ratings
    }
}

impl Default for BreakerSeries {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum RcdKind {
    AC,
    #[default]
    A,
    B,
    F,
}

impl fmt::Display for RcdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RcdKind::AC => "AC",
            RcdKind::A => "A",
            RcdKind::B => "B",
            RcdKind::F => "F",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RcdDevice {
    pub sensitivity_ma: u32,
    #[serde(default)]
    pub kind: RcdKind,
    #[serde(default)]
    pub selective: bool,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RcdConfig {
    pub terminal: RcdDevice,
    #[serde(default)]
    pub upstream: Option<RcdDevice>,
}

impl Default for RcdConfig {
    fn default() -> Self {
        Self {
            terminal: RcdDevice {
                sensitivity_ma: 30,
                kind: RcdKind::A,
                selective: false,
                note: None,
            },
            upstream: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplianceGroup {
    Lighting,
    #[default]
    Sockets,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appliance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub watts: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplianceCatalog {
    #[serde(default)]
    pub lighting: Vec<Appliance>,
    #[serde(default)]
    pub sockets: Vec<Appliance>,
    #[serde(default)]
    pub fixed: Vec<Appliance>,
    #[serde(default)]
    pub default_power_factor: Option<f64>,
}

impl ApplianceCatalog {
    pub fn group(&self, group: ApplianceGroup) -> &[Appliance] {
        match group {
            ApplianceGroup::Lighting => &self.lighting,
            ApplianceGroup::Sockets => &self.sockets,
            ApplianceGroup::Fixed => &self.fixed,
        }
    }

    pub fn find(&self, group: ApplianceGroup, id: &str) -> Option<&Appliance> {
        self.group(group).iter().find(|a| a.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstallationForm {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub method: Method,
}

/// Maps user-facing installation choices onto reference methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstallationCatalog {
    pub forms: Vec<InstallationForm>,
}

impl InstallationCatalog {
    pub fn method_for(&self, id: &str) -> Option<Method> {
        self.forms.iter().find(|f| f.id == id).map(|f| f.method)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EarthingConfig {
    pub max_resistance_ohm: f64,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub standards: Vec<String>,
}

/// Immutable context passed into every engine call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LookupTables {
    pub ampacity: AmpacityTable,
    pub voltage_drop: VoltageDropTable,
    pub circuit_types: CircuitTypes,
    pub breakers: BreakerSeries,
    #[serde(default)]
    pub rcd: RcdConfig,
    #[serde(default)]
    pub appliances: ApplianceCatalog,
    #[serde(default)]
    pub installations: InstallationCatalog,
    #[serde(default)]
    pub earthing: Option<EarthingConfig>,
}

impl LookupTables {
    /// Tables bundled with the crate (copper, thermoplastic insulation).
    pub fn builtin() -> Result<Self> {
        Ok(Self {
            ampacity: serde_json::from_str(include_str!("../data/ampacity.json"))?,
            voltage_drop: serde_json::from_str(include_str!("../data/voltage_drop.json"))?,
            circuit_types: serde_json::from_str(include_str!("../data/circuit_types.json"))?,
            breakers: serde_json::from_str(include_str!("../data/breakers.json"))?,
            rcd: serde_json::from_str(include_str!("../data/rcd.json"))?,
            appliances: serde_json::from_str(include_str!("../data/appliances.json"))?,
            installations: serde_json::from_str(include_str!("../data/installations.json"))?,
            earthing: Some(serde_json::from_str(include_str!("../data/earthing.json"))?),
        })
    }

    /// Human-readable list of catalog inconsistencies. Empty when the set is
    /// usable as is.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.ampacity.rows.is_empty() {
            issues.push("ampacity table has no rows".to_owned());
        }
        for section in self.ampacity.sections() {
            if self.voltage_drop.coefficient(section).is_none() {
                issues.push(format!(
                    "section {} mm² has no voltage drop coefficient",
                    section
                ));
            }
        }
        if self.ampacity.sections().len() != self.ampacity.rows.len() {
            issues.push("ampacity table lists a section more than once".to_owned());
        }

        if self.breakers.ratings_a.is_empty() {
            issues.push("breaker series is empty".to_owned());
        }
        if self
            .breakers
            .ratings_a
            .windows(2)
            .any(|pair| pair[0] >= pair[1])
        {
            issues.push("breaker series is not strictly ascending".to_owned());
        }

        if self.circuit_types.types.is_empty() {
            issues.push("no circuit types defined".to_owned());
        }
        for circuit_type in &self.circuit_types.types {
            if !self.ampacity.contains(circuit_type.min_section_mm2) {
                issues.push(format!(
                    "circuit type '{}' minimum section {} mm² is not in the ampacity table",
                    circuit_type.id, circuit_type.min_section_mm2
                ));
            }
            if circuit_type.max_voltage_drop_pct <= 0.0 {
                issues.push(format!(
                    "circuit type '{}' has a non-positive voltage drop limit",
                    circuit_type.id
                ));
            }
        }

        if let Some(pf) = self.appliances.default_power_factor {
            if !(0.0..=1.0).contains(&pf) {
                issues.push(format!("default power factor {} outside [0, 1]", pf));
            }
        }

        issues
    }

    /// Fails with [`CalcEngineError::InvalidCatalog`] listing every issue.
    pub fn ensure_valid(&self) -> Result<()> {
        let issues = self.validate();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(CalcEngineError::InvalidCatalog(issues.join("; ")))
        }
    }
}

fn same_section(a: f64, b: f64) -> bool {
    (a - b).abs() < SECTION_TOLERANCE
}
