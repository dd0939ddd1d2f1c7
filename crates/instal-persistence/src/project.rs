//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Project, partida and material records."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use chrono::{DateTime, Utc};
use instal_calc_engine::bom::{BomLine, BomUnit};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unit of a material row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MaterialUnit {
    /// Individual pieces.
    #[default]
    U,
    /// Metres.
    M,
    /// Square metres.
    M2,
    /// Cubic metres.
    M3,
    /// Kilograms.
    Kg,
    /// Litres.
    L,
    /// Centimetres.
    Cm,
    /// Millimetres.
    Mm,
}

impl MaterialUnit {
    /// Short label used in exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialUnit::U => "u",
            MaterialUnit::M => "m",
            MaterialUnit::M2 => "m2",
            MaterialUnit::M3 => "m3",
            MaterialUnit::Kg => "kg",
            MaterialUnit::L => "l",
            MaterialUnit::Cm => "cm",
            MaterialUnit::Mm => "mm",
        }
    }
}

impl From<BomUnit> for MaterialUnit {
    fn from(unit: BomUnit) -> Self {
        match unit {
            BomUnit::Meters => MaterialUnit::M,
            BomUnit::Units => MaterialUnit::U,
        }
    }
}

/// One purchasable item with its quantity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaterialRow {
    /// Optional stable code of the item.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Human readable label, also the aggregation key.
    pub label: String,
    /// Quantity in `unit`.
    pub qty: f64,
    /// Unit of `qty`.
    pub unit: MaterialUnit,
}

impl From<&BomLine> for MaterialRow {
    fn from(line: &BomLine) -> Self {
        Self {
            key: Some(line.code.clone()),
            label: line.description.clone(),
            qty: line.quantity,
            unit: line.unit.into(),
        }
    }
}

/// Kind of saved calculation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PartidaKind {
    /// Electrical sizing.
    #[default]
    Electrical,
    /// Free-form list entered by hand.
    Custom,
}

/// A saved calculation inside a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Partida {
    /// Stable identifier.
    pub id: String,
    /// Title; saving again under the same title replaces the content.
    pub title: String,
    /// Kind of calculation.
    pub kind: PartidaKind,
    /// Input the calculation was made from.
    #[serde(default)]
    pub inputs: serde_json::Value,
    /// Output of the calculation.
    #[serde(default)]
    pub outputs: serde_json::Value,
    /// Materials derived from the output.
    #[serde(default)]
    pub materials: Vec<MaterialRow>,
    /// Creation time, preserved across updates.
    pub created_at: DateTime<Utc>,
    /// Time of the last update.
    pub updated_at: DateTime<Utc>,
}

/// Sketch attached to a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SketchData {
    /// Editable drawing data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<serde_json::Value>,
    /// PNG preview as a data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub png_data_url: Option<String>,
}

impl SketchData {
    /// Overlay the fields present in `other`.
    pub fn merge(&mut self, other: SketchData) {
        if other.json.is_some() {
            self.json = other.json;
        }
        if other.png_data_url.is_some() {
            self.png_data_url = other.png_data_url;
        }
    }
}

/// A customer project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Customer name.
    #[serde(default)]
    pub client: Option<String>,
    /// Address of the site.
    #[serde(default)]
    pub site_address: Option<String>,
    /// Saved calculations in insertion order.
    #[serde(default)]
    pub partidas: Vec<Partida>,
    /// Attached sketch.
    #[serde(default)]
    pub sketch: Option<SketchData>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last modification.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Name used when a project is created with a blank one.
    pub const UNTITLED: &'static str = "Untitled project";

    /// New empty project with a fresh identifier.
    pub fn new(name: &str, client: Option<String>, site_address: Option<String>) -> Self {
        let now = Utc::now();
        let name = name.trim();
        Self {
            id: new_id("prj"),
            name: if name.is_empty() {
                Self::UNTITLED.to_owned()
            } else {
                name.to_owned()
            },
            client,
            site_address,
            partidas: Vec::new(),
            sketch: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Insert `payload` as a new partida, or replace the content of the one
    /// with the same title keeping its id and creation time.
    pub fn upsert_calculation(&mut self, payload: SaveCalculation) {
        let now = Utc::now();
        let SaveCalculation {
            title,
            kind,
            inputs,
            outputs,
            materials,
        } = payload;

        match self.partidas.iter_mut().find(|p| p.title == title) {
            Some(existing) => {
                existing.kind = kind;
                existing.inputs = inputs;
                existing.outputs = outputs;
                existing.materials = materials;
                existing.updated_at = now;
            }
            None => self.partidas.push(Partida {
                id: new_id("pt"),
                title,
                kind,
                inputs,
                outputs,
                materials,
                created_at: now,
                updated_at: now,
            }),
        }
        self.updated_at = now;
    }

    /// Every material row of every partida, in order.
    pub fn all_materials(&self) -> Vec<MaterialRow> {
        self.partidas
            .iter()
            .flat_map(|p| p.materials.iter().cloned())
            .collect()
    }
}

/// Fields of a project that may be edited after creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectMetaPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New customer name.
    #[serde(default)]
    pub client: Option<String>,
    /// New site address.
    #[serde(default)]
    pub site_address: Option<String>,
}

/// Calculation to be saved into a project.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaveCalculation {
    /// Title of the partida.
    pub title: String,
    /// Kind of calculation.
    #[serde(default)]
    pub kind: PartidaKind,
    /// Calculation input.
    pub inputs: serde_json::Value,
    /// Calculation output.
    pub outputs: serde_json::Value,
    /// Derived materials.
    #[serde(default)]
    pub materials: Vec<MaterialRow>,
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
