//! In-memory reference tables and the lookups the database exposes as
//! functions (`get_current_regional_factor`, `get_current_gst_rate`,
//! `get_escalation_index`).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::enums::Severity;
use crate::domain::model::Finding;
use crate::domain::schema::*;
use crate::utils::error::{RatesError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub units: Vec<Unit>,
    pub regions: Vec<Region>,
    pub building_types: Vec<BuildingType>,
    pub spec_levels: Vec<SpecLevelRow>,
    pub rate_types: Vec<RateTypeRow>,
    pub confidence_levels: Vec<ConfidenceLevelRow>,
    pub rate_statuses: Vec<RateStatusRow>,
    pub nrm1_groups: Vec<Nrm1Group>,
    pub nrm1_elements: Vec<Nrm1Element>,
    pub nrm1_subelements: Vec<Nrm1Subelement>,
    pub nrm2_work_sections: Vec<Nrm2WorkSection>,
    pub nrm2_items: Vec<Nrm2Item>,
    pub nrm1_nrm2_mapping: Vec<Nrm1Nrm2Mapping>,
    pub labour_resources: Vec<LabourResource>,
    pub gangs: Vec<Gang>,
    pub gang_compositions: Vec<GangComposition>,
    pub condition_factors: Vec<ConditionFactor>,
    pub materials: Vec<Material>,
    pub plant: Vec<PlantItem>,
    pub composite_rates: Vec<CompositeRateRow>,
    pub composite_rate_labour: Vec<CompositeRateLabourRow>,
    pub composite_rate_materials: Vec<CompositeRateMaterialRow>,
    pub composite_rate_plant: Vec<CompositeRatePlantRow>,
    pub composite_rate_factors: Vec<CompositeRateFactorRow>,
    pub regional_factors: Vec<RegionalFactor>,
    pub escalation_indices: Vec<EscalationIndex>,
    pub gst_rates: Vec<GstRate>,
}

/// Latest-starting row whose window contains `on`.
fn effective_on<'a, T: EffectiveWindow>(
    rows: impl Iterator<Item = &'a T>,
    on: NaiveDate,
) -> Option<&'a T>
where
    T: 'a,
{
    rows.filter(|row| row.is_effective_on(on))
        .max_by_key(|row| row.effective_from())
}

impl ReferenceData {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.code == code)
    }

    pub fn current_regional_factor(&self, region_code: &str, on: NaiveDate) -> Result<f64> {
        let windowed = effective_on(
            self.regional_factors
                .iter()
                .filter(|f| f.region_code == region_code),
            on,
        );

        match (windowed, self.region(region_code)) {
            (Some(row), _) => Ok(row.factor),
            (None, Some(region)) => {
                tracing::debug!(
                    "No dated regional factor for {} on {}, using region factor {}",
                    region_code,
                    on,
                    region.factor
                );
                Ok(region.factor)
            }
            (None, None) => Err(RatesError::not_found(format!(
                "regional factor for '{}' on {}",
                region_code, on
            ))),
        }
    }

    pub fn current_gst_rate(&self, region_code: &str, on: NaiveDate) -> Result<f64> {
        effective_on(
            self.gst_rates.iter().filter(|g| g.region_code == region_code),
            on,
        )
        .map(|row| row.rate)
        .ok_or_else(|| {
            RatesError::not_found(format!("GST rate for '{}' on {}", region_code, on))
        })
    }

    pub fn escalation_index(&self, year: i32, quarter: u8) -> Result<f64> {
        self.escalation_indices
            .iter()
            .find(|e| e.year == year && e.quarter == quarter)
            .map(|e| e.index_value)
            .ok_or_else(|| RatesError::not_found(format!("escalation index {}Q{}", year, quarter)))
    }

    pub fn condition_factor(&self, code: &str) -> Result<&ConditionFactor> {
        self.condition_factors
            .iter()
            .find(|f| f.code == code)
            .ok_or_else(|| RatesError::not_found(format!("condition factor '{}'", code)))
    }

    pub fn spec_level(&self, code: &str) -> Option<&SpecLevelRow> {
        self.spec_levels
            .iter()
            .find(|s| s.code.eq_ignore_ascii_case(code))
    }

    /// Foreign-key and CHECK-style integrity checks.
    pub fn validate(&self) -> Vec<Finding> {
        let mut findings = Vec::new();

        let region_codes: HashSet<&str> = self.regions.iter().map(|r| r.code.as_str()).collect();
        let baselines = self.regions.iter().filter(|r| r.is_baseline).count();
        if !self.regions.is_empty() && baselines != 1 {
            findings.push(Finding::new(
                Severity::High,
                "regions",
                format!("expected exactly one baseline region, found {}", baselines),
            ));
        }
        for region in &self.regions {
            if region.factor <= 0.0 {
                findings.push(Finding::new(
                    Severity::High,
                    &region.code,
                    format!("region factor must be positive, got {}", region.factor),
                ));
            }
        }

        for factor in &self.regional_factors {
            if !region_codes.contains(factor.region_code.as_str()) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &factor.region_code,
                    "regional_factors references an unknown region",
                ));
            }
            if factor.factor <= 0.0 {
                findings.push(Finding::new(
                    Severity::High,
                    &factor.region_code,
                    format!("regional factor must be positive, got {}", factor.factor),
                ));
            }
            if factor.effective_to.is_some_and(|to| to < factor.effective_from) {
                findings.push(Finding::new(
                    Severity::High,
                    &factor.region_code,
                    "regional factor ends before it starts",
                ));
            }
        }

        for gst in &self.gst_rates {
            if !region_codes.contains(gst.region_code.as_str()) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &gst.region_code,
                    "gst_rates references an unknown region",
                ));
            }
            if !(0.0..1.0).contains(&gst.rate) {
                findings.push(Finding::new(
                    Severity::High,
                    &gst.region_code,
                    format!("GST rate must be a decimal below 1, got {}", gst.rate),
                ));
            }
        }

        for index in &self.escalation_indices {
            if !(1..=4).contains(&index.quarter) {
                findings.push(Finding::new(
                    Severity::High,
                    format!("{}Q{}", index.year, index.quarter),
                    "quarter must be between 1 and 4",
                ));
            }
            if index.index_value <= 0.0 {
                findings.push(Finding::new(
                    Severity::High,
                    format!("{}Q{}", index.year, index.quarter),
                    format!("escalation index must be positive, got {}", index.index_value),
                ));
            }
        }

        let gang_codes: HashSet<&str> = self.gangs.iter().map(|g| g.code.as_str()).collect();
        for member in &self.gang_compositions {
            if !gang_codes.contains(member.gang_code.as_str()) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &member.gang_code,
                    "gang_compositions references an unknown gang",
                ));
            }
        }

        for labour in &self.labour_resources {
            let expected = labour.computed_total_rate();
            if (expected - labour.total_rate).abs() > 0.01 {
                findings.push(Finding::new(
                    Severity::Medium,
                    &labour.code,
                    format!(
                        "total_rate {} does not equal base + oncost ({:.2})",
                        labour.total_rate, expected
                    ),
                ));
            }
        }

        let group_codes: HashSet<&str> = self.nrm1_groups.iter().map(|g| g.code.as_str()).collect();
        for element in &self.nrm1_elements {
            if !group_codes.contains(element.group_code.as_str()) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &element.code,
                    format!("unknown NRM1 group '{}'", element.group_code),
                ));
            }
        }

        let element_codes: HashSet<&str> =
            self.nrm1_elements.iter().map(|e| e.code.as_str()).collect();
        for sub in &self.nrm1_subelements {
            if !element_codes.contains(sub.element_code.as_str()) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &sub.code,
                    format!("unknown NRM1 element '{}'", sub.element_code),
                ));
            }
        }

        let sections: HashSet<u32> = self.nrm2_work_sections.iter().map(|s| s.number).collect();
        for item in &self.nrm2_items {
            if !sections.contains(&item.work_section) {
                findings.push(Finding::new(
                    Severity::Critical,
                    &item.code,
                    format!("unknown NRM2 work section {}", item.work_section),
                ));
            }
        }

        let composite_codes: HashSet<&str> =
            self.composite_rates.iter().map(|c| c.code.as_str()).collect();
        let line_codes = self
            .composite_rate_labour
            .iter()
            .map(|l| l.composite_code.as_str())
            .chain(self.composite_rate_materials.iter().map(|m| m.composite_code.as_str()))
            .chain(self.composite_rate_plant.iter().map(|p| p.composite_code.as_str()))
            .chain(self.composite_rate_factors.iter().map(|f| f.composite_code.as_str()));
        let mut reported = HashSet::new();
        for code in line_codes {
            if !composite_codes.contains(code) && reported.insert(code) {
                findings.push(Finding::new(
                    Severity::Critical,
                    code,
                    "composite line item references an unknown composite rate",
                ));
            }
        }

        let factor_codes: HashSet<&str> =
            self.condition_factors.iter().map(|f| f.code.as_str()).collect();
        for applied in &self.composite_rate_factors {
            if !factor_codes.contains(applied.factor_code.as_str()) {
                findings.push(Finding::new(
                    Severity::High,
                    &applied.composite_code,
                    format!("unknown condition factor '{}'", applied.factor_code),
                ));
            }
        }
        for factor in &self.condition_factors {
            if !factor.code.starts_with("CF_") {
                findings.push(Finding::new(
                    Severity::Low,
                    &factor.code,
                    "condition factor code should follow CF_[CATEGORY]_[NAME]",
                ));
            }
            if factor.factor <= 0.0 {
                findings.push(Finding::new(
                    Severity::High,
                    &factor.code,
                    format!("factor must be positive, got {}", factor.factor),
                ));
            }
        }

        findings
    }
}
