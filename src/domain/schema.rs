//! Row types for the rates database tables.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enums::{
    BuildingCategory, Complexity, ConditionFactorCategory, RegionState, UnitCategory,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Unit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub category: UnitCategory,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Region with a price factor relative to the baseline (SYD_METRO = 1.00).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Region {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub code: String,
    pub name: String,
    pub state: RegionState,
    #[serde(default = "unit_factor")]
    pub factor: f64,
    #[serde(default)]
    pub is_baseline: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildingType {
    pub code: String,
    pub name: String,
    pub category: BuildingCategory,
    pub complexity: Complexity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpecLevelRow {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rank: u8,
    #[serde(default = "unit_factor")]
    pub cost_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateTypeRow {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_composite: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceLevelRow {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub rank: u8,
    #[serde(default)]
    pub percentage_range: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateStatusRow {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm1Group {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm1Element {
    pub code: String,
    pub group_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm1Subelement {
    pub code: String,
    pub element_code: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm2WorkSection {
    pub number: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm2Item {
    pub code: String,
    pub work_section: u32,
    pub description: String,
    pub unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nrm1Nrm2Mapping {
    pub nrm1_code: String,
    pub nrm2_code: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Trade labour rate, hourly, before and after oncosts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabourResource {
    pub code: String,
    pub trade: String,
    pub base_rate: f64,
    pub oncost_percent: f64,
    pub total_rate: f64,
    #[serde(default = "default_hour_unit")]
    pub unit: String,
}

impl LabourResource {
    pub fn computed_total_rate(&self) -> f64 {
        self.base_rate + self.base_rate * self.oncost_percent / 100.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gang {
    pub code: String,
    pub name: String,
    pub combined_rate: f64,
    #[serde(default = "default_hour_unit")]
    pub unit: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GangRole {
    Tradesperson,
    Labourer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GangComposition {
    pub gang_code: String,
    pub role: GangRole,
    /// Fractional staff allowed (0.5 labourer).
    pub count: f64,
}

impl Gang {
    /// Hourly gang rate from its members and the two role rates.
    pub fn combined_rate_from(
        compositions: &[GangComposition],
        gang_code: &str,
        trade_rate: f64,
        labourer_rate: f64,
    ) -> f64 {
        compositions
            .iter()
            .filter(|c| c.gang_code == gang_code)
            .map(|c| match c.role {
                GangRole::Tradesperson => c.count * trade_rate,
                GangRole::Labourer => c.count * labourer_rate,
            })
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Labour,
    Material,
    Plant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConditionFactor {
    /// CF_[CATEGORY]_[NAME]
    pub code: String,
    pub category: ConditionFactorCategory,
    pub name: String,
    pub factor: f64,
    /// "Labour, Plant" or "All"
    pub applies_to: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl ConditionFactor {
    pub fn applies_to_kind(&self, kind: ResourceKind) -> bool {
        self.applies_to.split(',').any(|part| {
            match part.trim().to_lowercase().as_str() {
                "all" => true,
                "labour" | "labor" => kind == ResourceKind::Labour,
                "material" | "materials" => kind == ResourceKind::Material,
                "plant" | "equipment" => kind == ResourceKind::Plant,
                _ => false,
            }
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Material {
    pub code: String,
    pub description: String,
    pub unit: String,
    #[serde(default)]
    pub unit_rate: Option<f64>,
    #[serde(default = "unit_factor")]
    pub waste_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantItem {
    pub code: String,
    pub description: String,
    pub unit: String,
    #[serde(default)]
    pub rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRateRow {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit: String,
    #[serde(default)]
    pub nrm1_code: Option<String>,
    #[serde(default)]
    pub nrm2_codes: Option<String>,
    #[serde(default)]
    pub spec_level: Option<String>,
    #[serde(default)]
    pub base_date: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    pub labour_total: f64,
    pub materials_total: f64,
    pub plant_total: f64,
    pub waste_percent: f64,
    pub ohp_percent: f64,
    pub total_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRateLabourRow {
    pub composite_code: String,
    #[serde(default)]
    pub nrm2_code: Option<String>,
    pub task_description: String,
    #[serde(default)]
    pub gang: Option<String>,
    #[serde(default)]
    pub output: Option<f64>,
    #[serde(default)]
    pub output_unit: Option<String>,
    #[serde(default)]
    pub hrs_per_unit: Option<f64>,
    #[serde(default)]
    pub rate_per_hour: Option<f64>,
    pub cost_per_unit: f64,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRateMaterialRow {
    pub composite_code: String,
    #[serde(default)]
    pub nrm2_code: Option<String>,
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_rate: Option<f64>,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRatePlantRow {
    pub composite_code: String,
    #[serde(default)]
    pub nrm2_code: Option<String>,
    pub description: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub rate: Option<f64>,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositeRateFactorRow {
    pub composite_code: String,
    pub factor_code: String,
    #[serde(default)]
    pub applied_value: Option<f64>,
}

/// A value that applies between two dates; `effective_to = None` means current.
pub trait EffectiveWindow {
    fn effective_from(&self) -> NaiveDate;
    fn effective_to(&self) -> Option<NaiveDate>;

    fn is_effective_on(&self, on: NaiveDate) -> bool {
        self.effective_from() <= on && self.effective_to().map_or(true, |to| on <= to)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionalFactor {
    pub region_code: String,
    pub factor: f64,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl EffectiveWindow for RegionalFactor {
    fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }

    fn effective_to(&self) -> Option<NaiveDate> {
        self.effective_to
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EscalationIndex {
    pub year: i32,
    pub quarter: u8,
    /// 105.2 = +5.2% relative to base year
    pub index_value: f64,
    pub base_year: i32,
    pub source: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GstRate {
    pub region_code: String,
    /// 0.10 = 10%
    pub rate: f64,
    pub effective_from: NaiveDate,
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl EffectiveWindow for GstRate {
    fn effective_from(&self) -> NaiveDate {
        self.effective_from
    }

    fn effective_to(&self) -> Option<NaiveDate> {
        self.effective_to
    }
}

fn unit_factor() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_hour_unit() -> String {
    "hr".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labour_total_rate_includes_oncosts() {
        let tiler = LabourResource {
            code: "LAB_AU_TILER".to_string(),
            trade: "Tiler".to_string(),
            base_rate: 50.0,
            oncost_percent: 30.0,
            total_rate: 65.0,
            unit: "hr".to_string(),
        };
        assert!((tiler.computed_total_rate() - 65.0).abs() < 1e-9);
    }

    #[test]
    fn test_gang_rate_from_compositions() {
        let members = vec![
            GangComposition {
                gang_code: "GANG_AU_GENERAL_1_0.5".to_string(),
                role: GangRole::Tradesperson,
                count: 1.0,
            },
            GangComposition {
                gang_code: "GANG_AU_GENERAL_1_0.5".to_string(),
                role: GangRole::Labourer,
                count: 0.5,
            },
            GangComposition {
                gang_code: "GANG_AU_OTHER".to_string(),
                role: GangRole::Labourer,
                count: 3.0,
            },
        ];
        let rate = Gang::combined_rate_from(&members, "GANG_AU_GENERAL_1_0.5", 65.0, 35.0);
        assert!((rate - 82.5).abs() < 1e-9);
    }

    #[test]
    fn test_condition_factor_applies_to() {
        let factor = ConditionFactor {
            code: "CF_HEIGHT_OVER_3M".to_string(),
            category: ConditionFactorCategory::Height,
            name: "Work above 3m".to_string(),
            factor: 1.15,
            applies_to: "Labour, Plant".to_string(),
            description: None,
        };
        assert!(factor.applies_to_kind(ResourceKind::Labour));
        assert!(factor.applies_to_kind(ResourceKind::Plant));
        assert!(!factor.applies_to_kind(ResourceKind::Material));
    }

    #[test]
    fn test_effective_window() {
        let gst = GstRate {
            region_code: "SYD_METRO".to_string(),
            rate: 0.1,
            effective_from: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            effective_to: Some(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()),
            notes: None,
        };
        assert!(gst.is_effective_on(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap()));
        assert!(!gst.is_effective_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()));
    }
}
