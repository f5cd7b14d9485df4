//! ============================================================
//!  Solar System Sizing & Costing Engine
//!
//!  Pipeline (each stage feeds the next):
//!   1. Factor resolution – selector keys → irradiance and
//!                          efficiency fractions, combined with
//!                          the fixed system losses
//!   2. Size derivation   – per-kW production, required kW
//!                          rounded up to 0.5 kW, grid margin,
//!                          recommended range
//!   3. Equipment & cost  – panel counts per wattage tier,
//!                          inverter tier, cabling, mounting,
//!                          flat fees, total
//!   4. Output assembly   – monthly curve, consumption split,
//!                          percent views, metadata
//!
//!  Pure: no I/O, no shared mutable state. Only the timestamp
//!  differs between two calls with the same input.
//! ============================================================

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{CalcResult, SizingError};
use crate::models::sizing::{
    BatteryRecommendation, Consumption, CostBreakdown, EfficiencyFactorsView, Equipment,
    InverterSelection, Metadata, PanelOption, PeakUsage, Production, RecommendedRange,
    RoofSummary, SizingEstimate, SizingInput, WeatherSummary,
};
use crate::services::reference_tables::{
    Location, ReferenceTables, RoofDirection, RoofType, Selector, ShadingLevel,
};

/// Sanity limit on the headline size, in either direction. Anything larger
/// is treated as a calculation fault rather than a quote.
const MAX_SYSTEM_KW: f64 = 1.0e9;

// ─── Rounding helpers ────────────────────────────────────────

/// Round up to the next 0.5 kW step.
pub fn ceil_to_half(kw: f64) -> f64 {
    (kw * 2.0).ceil() / 2.0
}

/// Round down to the previous 0.5 kW step.
pub fn floor_to_half(kw: f64) -> f64 {
    (kw * 2.0).floor() / 2.0
}

/// Fraction → whole percent.
fn percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}

// ─── 1. Factor resolution ────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EfficiencyFactors {
    pub location: Location,
    pub roof_direction: RoofDirection,
    pub roof_type: RoofType,
    pub shading: ShadingLevel,
    /// Peak sun hours per day.
    pub irradiance: f64,
    pub direction: f64,
    pub roof: f64,
    pub shading_factor: f64,
    /// System losses × direction × roof × shading.
    pub system_efficiency: f64,
}

pub fn resolve_factors(input: &SizingInput, tables: &ReferenceTables) -> EfficiencyFactors {
    let location = Location::resolve(input.location.as_deref());
    let roof_direction = RoofDirection::resolve(input.roof_direction.as_deref());
    let roof_type = RoofType::resolve(input.roof_type.as_deref());
    let shading = ShadingLevel::resolve(input.shading.as_deref());

    let direction = tables.direction_efficiency(roof_direction);
    let roof = tables.roof_type_efficiency(roof_type);
    let shading_factor = tables.shading_factor(shading);

    EfficiencyFactors {
        location,
        roof_direction,
        roof_type,
        shading,
        irradiance: tables.irradiance(location),
        direction,
        roof,
        shading_factor,
        system_efficiency: tables.losses.combined() * direction * roof * shading_factor,
    }
}

// ─── 2. Size derivation ──────────────────────────────────────

/// Energy produced by 1 kW of installed capacity (kWh).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerKwProduction {
    pub daily: f64,
    pub monthly: f64,
    pub annual: f64,
}

impl PerKwProduction {
    pub fn new(factors: &EfficiencyFactors, tables: &ReferenceTables) -> Self {
        let daily = factors.irradiance * factors.system_efficiency;
        Self {
            daily,
            monthly: daily * tables.days_per_month,
            annual: daily * tables.days_per_year,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeDerivation {
    /// Rounded size before the grid margin (or the forced size).
    pub base_size: f64,
    /// Headline size: margin applied and rounded, or the forced size untouched.
    pub system_size: f64,
    pub range: RecommendedRange,
}

/// Forced sizes bypass rounding and margin. The range always follows the
/// pre-margin size and is not reconciled with the headline figure.
pub fn derive_size(
    monthly_usage: f64,
    force_size: Option<f64>,
    per_kw: &PerKwProduction,
    tables: &ReferenceTables,
) -> SizeDerivation {
    let (base_size, system_size) = match force_size {
        Some(forced) => (forced, forced),
        None => {
            let base = ceil_to_half(monthly_usage / per_kw.monthly);
            (base, ceil_to_half(base * tables.grid_reliability_margin))
        }
    };

    SizeDerivation {
        base_size,
        system_size,
        range: RecommendedRange {
            minimum: floor_to_half(base_size * 0.8).max(1.0),
            recommended: system_size,
            maximum: ceil_to_half(base_size * 1.2),
        },
    }
}

// ─── 3. Equipment & cost ─────────────────────────────────────

/// One option per panel tier, all sized for the same system.
pub fn panel_options(system_size_kw: f64, tables: &ReferenceTables) -> Vec<PanelOption> {
    tables
        .panel_tiers
        .iter()
        .map(|tier| {
            let count = (system_size_kw * 1000.0 / tier.watts as f64).ceil() as u64;
            PanelOption {
                power: tier.watts,
                count,
                roof_area: (count as f64 * tables.area_per_panel_m2).round() as u64,
                total_cost: count * tier.unit_cost,
            }
        })
        .collect()
}

/// Smallest tier that covers the system; above the largest tier, several
/// units of the largest one.
pub fn select_inverter(system_size_kw: f64, tables: &ReferenceTables) -> InverterSelection {
    let tiers = &tables.inverter_tiers;
    let tier = tiers
        .iter()
        .find(|t| system_size_kw <= t.kw as f64)
        .unwrap_or(&tiers[tiers.len() - 1]);
    let count = (system_size_kw / tier.kw as f64).ceil() as u64;

    InverterSelection {
        size: tier.kw,
        count,
        total_cost: count * tier.unit_cost,
    }
}

/// Cable run estimate from the array footprint (m).
pub fn cable_length_m(roof_area_m2: u64) -> u64 {
    ((roof_area_m2 as f64).sqrt() * 4.0).ceil() as u64
}

/// Totals the default panel option only; the other options are informational.
pub fn compute_costs(
    options: &[PanelOption],
    inverter: &InverterSelection,
    tables: &ReferenceTables,
) -> CalcResult<CostBreakdown> {
    let default = options
        .get(tables.default_panel_tier)
        .ok_or_else(|| SizingError::internal("default panel option missing"))?;
    let bos = &tables.balance_of_system;

    let cable = cable_length_m(default.roof_area);
    let dc_cable = cable * bos.dc_cable_per_meter;
    let ac_cable = cable * bos.ac_cable_per_meter;
    let mounting = default.count * bos.mounting_per_panel;

    let total = default.total_cost
        + inverter.total_cost
        + dc_cable
        + ac_cable
        + mounting
        + bos.installation
        + bos.net_metering
        + bos.transport;

    Ok(CostBreakdown {
        panels: default.total_cost,
        inverter: inverter.total_cost,
        dc_cable,
        ac_cable,
        mounting,
        installation: bos.installation,
        net_metering: bos.net_metering,
        transport: bos.transport,
        total,
    })
}

pub fn battery_recommendation(monthly_usage: f64, tables: &ReferenceTables) -> BatteryRecommendation {
    let b = &tables.battery;
    BatteryRecommendation {
        recommended_capacity: monthly_usage * b.capacity_ratio,
        autonomy_days: b.autonomy_days,
        estimated_cost: monthly_usage * b.cost_per_usage_kwh,
        efficiency_rating: b.efficiency_rating,
        lifespan_years: b.lifespan_years,
    }
}

// ─── 4. Output assembly ──────────────────────────────────────

pub fn monthly_curve(system_size_kw: f64, per_kw: &PerKwProduction, tables: &ReferenceTables) -> [i64; 12] {
    tables
        .monthly_variation
        .map(|factor| (system_size_kw * per_kw.monthly * factor).round() as i64)
}

/// Off-peak is the remainder, never rounded on its own.
pub fn consumption_split(monthly_usage: f64, tables: &ReferenceTables) -> Consumption {
    let peak = (monthly_usage * (tables.peak_usage_percent as f64 / 100.0)).round();
    Consumption {
        monthly: monthly_usage,
        peak: PeakUsage {
            percentage: tables.peak_usage_percent,
            kwh: peak as i64,
            time: tables.peak_window.to_string(),
        },
        off_peak: monthly_usage - peak,
    }
}

fn validate_usage(monthly_usage: Option<f64>) -> CalcResult<f64> {
    match monthly_usage {
        Some(u) if u.is_finite() && u > 0.0 => Ok(u),
        Some(u) => Err(SizingError::InvalidUsage(u.to_string())),
        None => Err(SizingError::InvalidUsage("missing".to_string())),
    }
}

/// Full estimate stamped with the current time.
pub fn estimate(input: &SizingInput, tables: &ReferenceTables) -> CalcResult<SizingEstimate> {
    estimate_at(input, tables, Utc::now())
}

pub fn estimate_at(
    input: &SizingInput,
    tables: &ReferenceTables,
    calculated_at: DateTime<Utc>,
) -> CalcResult<SizingEstimate> {
    let monthly_usage = validate_usage(input.monthly_usage)?;
    tables.validate()?;

    // 1.
    let factors = resolve_factors(input, tables);

    // 2.
    let per_kw = PerKwProduction::new(&factors, tables);
    let force_size = input.force_size.filter(|kw| kw.is_finite());
    let sizing = derive_size(monthly_usage, force_size, &per_kw, tables);
    let size = sizing.system_size;
    if !size.is_finite() || size.abs() > MAX_SYSTEM_KW {
        return Err(SizingError::internal(format!("system size {size} kW out of range for usage {monthly_usage}")));
    }

    debug!(
        location = %factors.location,
        system_efficiency = factors.system_efficiency,
        monthly_per_kw = per_kw.monthly,
        base_size = sizing.base_size,
        system_size = size,
        forced = force_size.is_some(),
        "system size derived"
    );

    // 3.
    let options = panel_options(size, tables);
    let inverter = select_inverter(size, tables);
    let costs = compute_costs(&options, &inverter, tables)?;
    let required_area = options[tables.default_panel_tier].roof_area;

    // 4.
    let by_month = monthly_curve(size, &per_kw, tables);
    let annual_production = (size * per_kw.annual).round() as i64;

    #[cfg(feature = "verbose_log")]
    debug!(?by_month, total_cost = costs.total, "estimate assembled");

    Ok(SizingEstimate {
        system_size: size,
        recommended_range: sizing.range,
        efficiency_factors: EfficiencyFactorsView {
            system_efficiency: percent(factors.system_efficiency),
            irradiance: factors.irradiance,
            direction: percent(factors.direction),
            roof_type: percent(factors.roof),
            shading: percent(factors.shading_factor),
            temperature: percent(tables.losses.temperature),
            inverter: percent(tables.losses.inverter),
        },
        equipment: Equipment { panel_options: options, inverter },
        costs,
        roof: RoofSummary {
            required_area,
            layout_efficiency: factors.roof * 100.0,
            optimal_orientation: factors.roof_direction.key().to_string(),
            shading_impact: (1.0 - factors.shading_factor) * 100.0,
        },
        battery: battery_recommendation(monthly_usage, tables),
        production: Production {
            daily: (size * per_kw.daily).round() as i64,
            monthly: (size * per_kw.monthly).round() as i64,
            annual: annual_production,
            by_month,
            peak_sun_hours: factors.irradiance,
        },
        consumption: consumption_split(monthly_usage, tables),
        weather: WeatherSummary {
            sun_hours: factors.irradiance,
            efficiency: percent(factors.system_efficiency),
            temperature_impact: percent(1.0 - tables.losses.temperature),
            annual_production,
        },
        metadata: Metadata {
            calculation_version: tables.calculation_version.to_string(),
            calculation_date: calculated_at,
            location: factors.location.key().to_string(),
            roof_direction: factors.roof_direction.key().to_string(),
            roof_type: factors.roof_type.key().to_string(),
            shading: factors.shading.key().to_string(),
        },
    })
}
