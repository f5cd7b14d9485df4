use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use utoipa::ToSchema;

// ─── Request ─────────────────────────────────────────────────────────────────

/// Usage and site parameters for a sizing estimate.
///
/// Parsing never fails on a field: numbers may arrive as JSON numbers or
/// numeric strings, and selectors that are not strings are dropped so they
/// fall back to their defaults. The only hard requirement, a positive usage
/// figure, is checked by the engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizingInput {
    /// Monthly consumption in kWh. Required, must be > 0.
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = f64, example = 856)]
    pub monthly_usage: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "Lahore")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "south")]
    pub roof_direction: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "standard")]
    pub roof_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    #[schema(example = "minimal")]
    pub shading: Option<String>,
    /// Pins the system size (kW); skips sizing, margin and rounding.
    #[serde(default, deserialize_with = "lenient_number")]
    #[schema(value_type = Option<f64>)]
    pub force_size: Option<f64>,
}

#[cfg(test)]
impl SizingInput {
    pub fn with_usage(monthly_usage: f64) -> Self {
        Self { monthly_usage: Some(monthly_usage), ..Default::default() }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// ─── Response ────────────────────────────────────────────────────────────────

/// Complete sizing, production and cost estimate.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SizingEstimate {
    /// Headline size in kW (margin applied unless forced).
    pub system_size: f64,
    pub recommended_range: RecommendedRange,
    pub efficiency_factors: EfficiencyFactorsView,
    pub equipment: Equipment,
    pub costs: CostBreakdown,
    pub roof: RoofSummary,
    pub battery: BatteryRecommendation,
    pub production: Production,
    pub consumption: Consumption,
    pub weather: WeatherSummary,
    pub metadata: Metadata,
}

/// `recommended` is not clamped to `[minimum, maximum]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct RecommendedRange {
    pub minimum: f64,
    pub recommended: f64,
    pub maximum: f64,
}

/// Rounded integer percents, except `irradiance` which is raw sun hours.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyFactorsView {
    pub system_efficiency: i64,
    pub irradiance: f64,
    pub direction: i64,
    pub roof_type: i64,
    pub shading: i64,
    pub temperature: i64,
    pub inverter: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    pub panel_options: Vec<PanelOption>,
    pub inverter: InverterSelection,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PanelOption {
    /// Panel rating in W.
    pub power: u32,
    pub count: u64,
    /// m², rounded.
    pub roof_area: u64,
    pub total_cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InverterSelection {
    /// Tier rating in kW.
    pub size: u32,
    pub count: u64,
    pub total_cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    pub panels: u64,
    pub inverter: u64,
    pub dc_cable: u64,
    pub ac_cable: u64,
    pub mounting: u64,
    pub installation: u64,
    pub net_metering: u64,
    pub transport: u64,
    pub total: u64,
}

/// Field names are snake_case on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RoofSummary {
    pub required_area: u64,
    /// Roof factor × 100, unrounded.
    pub layout_efficiency: f64,
    pub optimal_orientation: String,
    /// (1 - shading factor) × 100, unrounded.
    pub shading_impact: f64,
}

/// Fixed-ratio battery suggestion; not derived from a storage model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BatteryRecommendation {
    pub recommended_capacity: f64,
    pub autonomy_days: u32,
    pub estimated_cost: f64,
    pub efficiency_rating: f64,
    pub lifespan_years: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Production {
    pub daily: i64,
    pub monthly: i64,
    pub annual: i64,
    /// January first.
    #[schema(value_type = Vec<i64>)]
    pub by_month: [i64; 12],
    pub peak_sun_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub monthly: f64,
    pub peak: PeakUsage,
    /// `monthly - peak.kWh`, so the two always add back to `monthly`.
    pub off_peak: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PeakUsage {
    pub percentage: u32,
    #[serde(rename = "kWh")]
    pub kwh: i64,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    pub sun_hours: f64,
    pub efficiency: i64,
    pub temperature_impact: i64,
    pub annual_production: i64,
}

/// Resolved selectors, not the raw request values.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub calculation_version: String,
    #[serde(serialize_with = "iso_millis")]
    #[schema(value_type = String, format = DateTime)]
    pub calculation_date: DateTime<Utc>,
    pub location: String,
    pub roof_direction: String,
    pub roof_type: String,
    pub shading: String,
}

/// `2025-03-01T10:15:30.123Z`
fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}
