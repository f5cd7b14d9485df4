//! Fixed reference data for the sizing engine.
//!
//! Every selector the caller may send is a closed enum. Factor tables are
//! arrays indexed by the enum ordinal, so a table and its key set can never
//! drift apart. `ReferenceTables::STANDARD` is the only instance the service
//! uses; tests build modified copies to exercise the internal-fault path.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::{CalcResult, SizingError};

/// Selector string did not match any key of its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKey(pub String);

impl fmt::Display for UnknownKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown key '{}'", self.0)
    }
}

/// Closed selector set with an exact-string key and a fallback default.
pub trait Selector: Copy + Default + FromStr<Err = UnknownKey> + 'static {
    const ALL: &'static [Self];

    fn key(self) -> &'static str;

    fn index(self) -> usize;

    /// Exact-match lookup; absent or unrecognized keys resolve to the default.
    fn resolve(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

macro_rules! selector_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $( $(#[$vmeta:meta])* $variant:ident => $key:literal ),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, ToSchema)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $key)] $variant ),+
        }

        impl Selector for $name {
            const ALL: &'static [Self] = &[ $( $name::$variant ),+ ];

            fn key(self) -> &'static str {
                match self { $( $name::$variant => $key ),+ }
            }

            fn index(self) -> usize {
                self as usize
            }
        }

        impl FromStr for $name {
            type Err = UnknownKey;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $key => Ok($name::$variant), )+
                    other => Err(UnknownKey(other.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.key())
            }
        }
    };
}

selector_enum! {
    /// Installation region or city, keyed by its display name.
    Location {
        NorthernPakistan => "Northern Pakistan",
        #[default]
        CentralPakistan => "Central Pakistan",
        SouthernPakistan => "Southern Pakistan",
        Islamabad => "Islamabad",
        Lahore => "Lahore",
        Karachi => "Karachi",
        Peshawar => "Peshawar",
        Quetta => "Quetta",
    }
}

selector_enum! {
    /// Compass orientation of the roof face carrying the array.
    RoofDirection {
        #[default]
        South => "south",
        Southeast => "southeast",
        Southwest => "southwest",
        East => "east",
        West => "west",
        North => "north",
        Northeast => "northeast",
        Northwest => "northwest",
    }
}

selector_enum! {
    /// Roof pitch category.
    RoofType {
        /// 0-10° pitch
        Flat => "flat",
        /// 10-30° pitch
        #[default]
        Standard => "standard",
        /// 30-45° pitch
        Steep => "steep",
        /// 25-30° pitch at local latitudes
        Optimal => "optimal",
    }
}

selector_enum! {
    /// Share of peak-hour sunlight lost to obstructions.
    ShadingLevel {
        Unshaded => "none",
        /// under 10 % during peak hours
        #[default]
        Minimal => "minimal",
        /// 10-25 %
        Moderate => "moderate",
        /// over 25 %
        Significant => "significant",
    }
}

// ─── Tables ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SystemLosses {
    pub inverter: f64,
    pub wiring: f64,
    pub soiling: f64,
    pub temperature: f64,
    pub mismatch: f64,
}

impl SystemLosses {
    pub fn combined(&self) -> f64 {
        self.inverter * self.wiring * self.soiling * self.temperature * self.mismatch
    }

    fn all(&self) -> [f64; 5] {
        [self.inverter, self.wiring, self.soiling, self.temperature, self.mismatch]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelTier {
    pub watts: u32,
    pub unit_cost: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverterTier {
    pub kw: u32,
    pub unit_cost: u64,
}

/// Flat and per-unit installation costs outside the panel/inverter tiers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceOfSystemCosts {
    pub dc_cable_per_meter: u64,
    pub ac_cable_per_meter: u64,
    pub mounting_per_panel: u64,
    pub net_metering: u64,
    pub installation: u64,
    pub transport: u64,
}

/// Placeholder ratios for the battery suggestion. Not a storage sizing model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryHeuristic {
    pub capacity_ratio: f64,
    pub cost_per_usage_kwh: f64,
    pub autonomy_days: u32,
    pub efficiency_rating: f64,
    pub lifespan_years: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTables {
    /// Peak sun hours per day, indexed by `Location`.
    pub irradiance: [f64; 8],
    /// Indexed by `RoofDirection`.
    pub direction_efficiency: [f64; 8],
    /// Indexed by `RoofType`.
    pub roof_type_efficiency: [f64; 4],
    /// Indexed by `ShadingLevel`.
    pub shading_factor: [f64; 4],
    /// January first.
    pub monthly_variation: [f64; 12],
    pub losses: SystemLosses,
    /// Ascending wattage. All tiers are offered, only `default_panel_tier` is costed.
    pub panel_tiers: [PanelTier; 3],
    pub default_panel_tier: usize,
    /// Ascending rating.
    pub inverter_tiers: [InverterTier; 3],
    pub balance_of_system: BalanceOfSystemCosts,
    pub battery: BatteryHeuristic,
    pub grid_reliability_margin: f64,
    pub area_per_panel_m2: f64,
    pub days_per_month: f64,
    pub days_per_year: f64,
    pub peak_usage_percent: u32,
    pub peak_window: &'static str,
    pub calculation_version: &'static str,
}

impl ReferenceTables {
    pub const STANDARD: ReferenceTables = ReferenceTables {
        irradiance: [4.8, 5.3, 5.7, 5.3, 5.2, 5.6, 5.4, 5.8],
        direction_efficiency: [1.00, 0.96, 0.96, 0.88, 0.88, 0.75, 0.78, 0.78],
        roof_type_efficiency: [0.90, 0.96, 0.93, 1.00],
        shading_factor: [1.00, 0.95, 0.85, 0.70],
        monthly_variation: [
            0.85, 0.90, // winter
            1.00, 1.10, // spring
            1.15, 1.15, // summer
            1.05, 0.95, // monsoon
            1.05, // post-monsoon
            1.00, 0.90, // autumn
            0.85, // winter
        ],
        losses: SystemLosses {
            inverter: 0.96,
            wiring: 0.98,
            soiling: 0.95,
            temperature: 0.91,
            mismatch: 0.97,
        },
        panel_tiers: [
            PanelTier { watts: 450, unit_cost: 45_000 },
            PanelTier { watts: 545, unit_cost: 58_000 },
            PanelTier { watts: 800, unit_cost: 85_000 },
        ],
        default_panel_tier: 0,
        inverter_tiers: [
            InverterTier { kw: 5, unit_cost: 120_000 },
            InverterTier { kw: 10, unit_cost: 180_000 },
            InverterTier { kw: 15, unit_cost: 250_000 },
        ],
        balance_of_system: BalanceOfSystemCosts {
            dc_cable_per_meter: 300,
            ac_cable_per_meter: 400,
            mounting_per_panel: 8_000,
            net_metering: 50_000,
            installation: 25_000,
            transport: 15_000,
        },
        battery: BatteryHeuristic {
            capacity_ratio: 0.3,
            cost_per_usage_kwh: 200.0,
            autonomy_days: 1,
            efficiency_rating: 0.95,
            lifespan_years: 10,
        },
        grid_reliability_margin: 1.05,
        area_per_panel_m2: 1.8,
        days_per_month: 30.5,
        days_per_year: 365.0,
        peak_usage_percent: 42,
        peak_window: "6:00 PM - 9:00 PM",
        calculation_version: "1.0",
    };

    pub fn irradiance(&self, location: Location) -> f64 {
        self.irradiance[location.index()]
    }

    pub fn direction_efficiency(&self, direction: RoofDirection) -> f64 {
        self.direction_efficiency[direction.index()]
    }

    pub fn roof_type_efficiency(&self, roof_type: RoofType) -> f64 {
        self.roof_type_efficiency[roof_type.index()]
    }

    pub fn shading_factor(&self, shading: ShadingLevel) -> f64 {
        self.shading_factor[shading.index()]
    }

    /// Rejects tables whose contents would make the estimate meaningless.
    pub fn validate(&self) -> CalcResult<()> {
        let losses = self.losses.all();
        let fractions = self
            .direction_efficiency
            .iter()
            .chain(&self.roof_type_efficiency)
            .chain(&self.shading_factor)
            .chain(&losses);
        for &f in fractions {
            if !f.is_finite() || f <= 0.0 || f > 1.0 {
                return Err(SizingError::internal(format!("efficiency fraction out of range: {f}")));
            }
        }
        if let Some(bad) = self
            .irradiance
            .iter()
            .chain(&self.monthly_variation)
            .find(|v| !v.is_finite() || **v <= 0.0)
        {
            return Err(SizingError::internal(format!("non-positive table value: {bad}")));
        }
        if self.panel_tiers.iter().any(|t| t.watts == 0) || self.inverter_tiers.iter().any(|t| t.kw == 0) {
            return Err(SizingError::internal("equipment tier with zero rating"));
        }
        if self.default_panel_tier >= self.panel_tiers.len() {
            return Err(SizingError::internal("default panel tier out of range"));
        }
        let positive = [
            self.grid_reliability_margin,
            self.area_per_panel_m2,
            self.days_per_month,
            self.days_per_year,
        ];
        if positive.iter().any(|v| !v.is_finite() || *v <= 0.0) || self.grid_reliability_margin <= 1.0 {
            return Err(SizingError::internal("invalid scalar constant"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tables_are_valid() {
        assert!(ReferenceTables::STANDARD.validate().is_ok());
    }

    #[test]
    fn lookups_follow_enum_order() {
        let t = &ReferenceTables::STANDARD;
        assert_eq!(t.irradiance(Location::Lahore), 5.2);
        assert_eq!(t.irradiance(Location::Quetta), 5.8);
        assert_eq!(t.irradiance(Location::NorthernPakistan), 4.8);
        assert_eq!(t.direction_efficiency(RoofDirection::North), 0.75);
        assert_eq!(t.direction_efficiency(RoofDirection::Northwest), 0.78);
        assert_eq!(t.roof_type_efficiency(RoofType::Steep), 0.93);
        assert_eq!(t.shading_factor(ShadingLevel::Significant), 0.70);
    }

    #[test]
    fn keys_parse_back_to_their_variant() {
        for &l in Location::ALL {
            assert_eq!(l.key().parse::<Location>(), Ok(l));
        }
        for &d in RoofDirection::ALL {
            assert_eq!(d.key().parse::<RoofDirection>(), Ok(d));
        }
        for &r in RoofType::ALL {
            assert_eq!(r.key().parse::<RoofType>(), Ok(r));
        }
        for &s in ShadingLevel::ALL {
            assert_eq!(s.key().parse::<ShadingLevel>(), Ok(s));
        }
    }

    #[test]
    fn lookup_is_exact_and_case_sensitive() {
        assert!("lahore".parse::<Location>().is_err());
        assert!("South".parse::<RoofDirection>().is_err());
        assert!(" standard".parse::<RoofType>().is_err());
        assert_eq!(Location::resolve(Some("LAHORE")), Location::CentralPakistan);
        assert_eq!(RoofDirection::resolve(Some("sw")), RoofDirection::South);
        assert_eq!(RoofType::resolve(None), RoofType::Standard);
        assert_eq!(ShadingLevel::resolve(Some("")), ShadingLevel::Minimal);
    }

    #[test]
    fn table_sizes_match_key_sets() {
        let t = &ReferenceTables::STANDARD;
        assert_eq!(t.irradiance.len(), Location::ALL.len());
        assert_eq!(t.direction_efficiency.len(), RoofDirection::ALL.len());
        assert_eq!(t.roof_type_efficiency.len(), RoofType::ALL.len());
        assert_eq!(t.shading_factor.len(), ShadingLevel::ALL.len());
    }

    #[test]
    fn corrupted_fraction_fails_validation() {
        let mut t = ReferenceTables::STANDARD;
        t.shading_factor[2] = f64::NAN;
        assert!(matches!(t.validate(), Err(SizingError::Internal { .. })));

        let mut t = ReferenceTables::STANDARD;
        t.losses.wiring = 1.2;
        assert!(t.validate().is_err());

        let mut t = ReferenceTables::STANDARD;
        t.default_panel_tier = 3;
        assert!(t.validate().is_err());
    }
}
