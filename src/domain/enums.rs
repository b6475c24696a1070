//! Enumerations that mirror the database CHECK constraints.
//!
//! Every enum serializes to the exact string stored in the database and
//! rejects anything outside the allowed set when parsed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::RatesError;

macro_rules! check_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $value:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }

            pub fn is_valid(value: &str) -> bool {
                value.parse::<$name>().is_ok()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = RatesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(RatesError::validation(format!(
                        "'{}' is not a valid {}; expected one of: {}",
                        other,
                        stringify!($name),
                        [$($value),+].join(", ")
                    ))),
                }
            }
        }
    };
}

check_enum! {
    /// Measurement unit classes (m, m2, m3, t, hr, nr, ls ...).
    UnitCategory {
        Length => "length",
        Area => "area",
        Volume => "volume",
        Weight => "weight",
        Time => "time",
        Count => "count",
        Provisional => "provisional",
    }
}

check_enum! {
    /// Australian states and territories used for regional pricing.
    RegionState {
        Nsw => "NSW",
        Vic => "VIC",
        Qld => "QLD",
        Wa => "WA",
        Sa => "SA",
        Tas => "TAS",
        Act => "ACT",
        Nt => "NT",
    }
}

check_enum! {
    BuildingCategory {
        Residential => "residential",
        Commercial => "commercial",
        Industrial => "industrial",
        Institutional => "institutional",
        Health => "health",
        Civic => "civic",
    }
}

check_enum! {
    /// Ordered low → very_high.
    Complexity {
        Low => "low",
        Standard => "standard",
        Medium => "medium",
        High => "high",
        VeryHigh => "very_high",
    }
}

check_enum! {
    SpecLevel {
        Basic => "basic",
        Standard => "standard",
        Premium => "premium",
        Luxury => "luxury",
    }
}

impl SpecLevel {
    pub fn rank(&self) -> u8 {
        match self {
            SpecLevel::Basic => 1,
            SpecLevel::Standard => 2,
            SpecLevel::Premium => 3,
            SpecLevel::Luxury => 4,
        }
    }

    /// Cost factor relative to the standard specification.
    pub fn cost_multiplier(&self) -> f64 {
        match self {
            SpecLevel::Basic => 0.85,
            SpecLevel::Standard => 1.00,
            SpecLevel::Premium => 1.35,
            SpecLevel::Luxury => 1.70,
        }
    }

    /// Seed files carry "Standard"; accept any casing.
    pub fn parse_loose(value: &str) -> Option<Self> {
        value.trim().to_lowercase().parse().ok()
    }
}

check_enum! {
    RateType {
        Labour => "labour",
        Material => "material",
        Plant => "plant",
        Composite => "composite",
    }
}

impl RateType {
    pub fn is_composite(&self) -> bool {
        matches!(self, RateType::Composite)
    }
}

check_enum! {
    ConfidenceLevel {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
}

impl ConfidenceLevel {
    pub fn rank(&self) -> u8 {
        match self {
            ConfidenceLevel::Low => 1,
            ConfidenceLevel::Medium => 2,
            ConfidenceLevel::High => 3,
        }
    }

    pub fn accuracy_range(&self) -> &'static str {
        match self {
            ConfidenceLevel::Low => "±15-20%",
            ConfidenceLevel::Medium => "±10%",
            ConfidenceLevel::High => "±5%",
        }
    }
}

check_enum! {
    /// Approval workflow: draft → reviewed → approved → archived.
    RateStatus {
        Draft => "draft",
        Reviewed => "reviewed",
        Approved => "approved",
        Archived => "archived",
    }
}

impl RateStatus {
    pub fn is_active(&self) -> bool {
        !matches!(self, RateStatus::Archived)
    }

    pub fn next(&self) -> Option<RateStatus> {
        match self {
            RateStatus::Draft => Some(RateStatus::Reviewed),
            RateStatus::Reviewed => Some(RateStatus::Approved),
            RateStatus::Approved => Some(RateStatus::Archived),
            RateStatus::Archived => None,
        }
    }
}

check_enum! {
    ConditionFactorCategory {
        Location => "location",
        Height => "height",
        Weather => "weather",
        Complexity => "complexity",
        Quantity => "quantity",
    }
}

check_enum! {
    /// Markets supported by the composite builder.
    Market {
        Au => "AU",
        Nz => "NZ",
        Uk => "UK",
        Ca => "CA",
        Us => "US",
    }
}

impl Market {
    pub fn currency(&self) -> &'static str {
        match self {
            Market::Au => "AUD",
            Market::Nz => "NZD",
            Market::Uk => "GBP",
            Market::Ca => "CAD",
            Market::Us => "USD",
        }
    }
}

impl Default for Market {
    fn default() -> Self {
        Market::Au
    }
}

check_enum! {
    SpecTier {
        Economy => "economy",
        Standard => "standard",
        Premium => "premium",
    }
}

check_enum! {
    /// How an NRM1/NRM2 crosswalk mapping was obtained.
    MappingConfidence {
        High => "High",
        Medium => "Medium",
        Low => "Low",
        Unmatched => "None",
        Manual => "Manual",
    }
}

check_enum! {
    /// Issue severity used by the QA reports, ordered LOW → CRITICAL.
    Severity {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rejects_values_outside_check_constraint() {
        assert_eq!("area".parse::<UnitCategory>().unwrap(), UnitCategory::Area);
        assert!("Area".parse::<UnitCategory>().is_err());
        assert!(!RegionState::is_valid("NZ"));
        assert!(RegionState::is_valid("TAS"));
    }

    #[test]
    fn test_serde_uses_database_strings() {
        let json = serde_json::to_string(&Complexity::VeryHigh).unwrap();
        assert_eq!(json, "\"very_high\"");
        let parsed: MappingConfidence = serde_json::from_str("\"None\"").unwrap();
        assert_eq!(parsed, MappingConfidence::Unmatched);
    }

    #[test]
    fn test_spec_level_multipliers_follow_rank() {
        let mut previous = 0.0;
        for level in SpecLevel::ALL {
            assert!(level.cost_multiplier() > previous);
            previous = level.cost_multiplier();
        }
        assert_eq!(SpecLevel::parse_loose("Standard"), Some(SpecLevel::Standard));
    }

    #[test]
    fn test_rate_status_workflow() {
        assert_eq!(RateStatus::Draft.next(), Some(RateStatus::Reviewed));
        assert_eq!(RateStatus::Archived.next(), None);
        assert!(!RateStatus::Archived.is_active());
    }

    #[test]
    fn test_ordering() {
        assert!(Complexity::Low < Complexity::VeryHigh);
        assert!(Severity::Critical > Severity::High);
    }
}
