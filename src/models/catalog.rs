use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ─── Catalog records ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Panel {
    pub id: String,
    pub brand: String,
    /// Rated power (W)
    pub power: u32,
    pub price: u64,
    #[serde(default)]
    pub default_choice: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Inverter {
    pub id: String,
    pub brand: String,
    /// Rated power (kW)
    pub power: f64,
    pub price: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StructureType {
    pub id: String,
    pub l2: bool,
    pub custom_cost: u64,
    pub abs_cost: u64,
}

/// Per-size-band cabling and accessory costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BracketCost {
    pub id: String,
    /// kW, inclusive
    pub min_size: f64,
    /// kW, inclusive
    pub max_size: f64,
    pub dc_cable: u64,
    pub ac_cable: u64,
    pub accessories: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariableCost {
    pub id: String,
    pub cost_name: String,
    pub cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSource {
    /// Every category came from the remote catalog.
    Remote,
    /// Some categories fell back to built-in records.
    Partial,
    Builtin,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub panels: Vec<Panel>,
    pub inverters: Vec<Inverter>,
    pub structure_types: Vec<StructureType>,
    pub bracket_costs: Vec<BracketCost>,
    pub variable_costs: Vec<VariableCost>,
    pub source: CatalogSource,
}

impl Catalog {
    /// Equipment offered when the remote catalog is unavailable.
    pub fn builtin() -> Self {
        Self {
            panels: vec![
                panel("1", "JinkoSolar", 450, 45_000, true),
                panel("2", "LONGi", 545, 58_000, false),
                panel("3", "JA Solar", 800, 85_000, false),
            ],
            inverters: vec![
                inverter("1", "Sungrow", 5.0, 120_000),
                inverter("2", "Huawei", 10.0, 180_000),
                inverter("3", "SMA", 15.0, 250_000),
            ],
            structure_types: vec![StructureType {
                id: "1".into(),
                l2: true,
                custom_cost: 8_000,
                abs_cost: 5_000,
            }],
            bracket_costs: vec![BracketCost {
                id: "1".into(),
                min_size: 1.0,
                max_size: 5.0,
                dc_cable: 300,
                ac_cable: 400,
                accessories: 8_000,
            }],
            variable_costs: vec![
                VariableCost { id: "1".into(), cost_name: "installation".into(), cost: 25_000 },
                VariableCost { id: "2".into(), cost_name: "transport".into(), cost: 15_000 },
            ],
            source: CatalogSource::Builtin,
        }
    }

    /// Bracket band whose inclusive range contains `size_kw`.
    pub fn bracket_for_size(&self, size_kw: f64) -> Option<&BracketCost> {
        self.bracket_costs
            .iter()
            .find(|b| size_kw >= b.min_size && size_kw <= b.max_size)
    }
}

fn panel(id: &str, brand: &str, power: u32, price: u64, default_choice: bool) -> Panel {
    Panel { id: id.into(), brand: brand.into(), power, price, default_choice }
}

fn inverter(id: &str, brand: &str, power: f64, price: u64) -> Inverter {
    Inverter { id: id.into(), brand: brand.into(), power, price }
}
