//! Adjusts a composite rate for site conditions, specification, region,
//! escalation and GST.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::core::waste::effective_waste_factor;
use crate::domain::enums::SpecLevel;
use crate::domain::model::SeedRate;
use crate::domain::reference::ReferenceData;
use crate::domain::schema::ResourceKind;
use crate::utils::error::{RatesError, Result};
use crate::utils::numeric::{round2, round_to};

#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentInputs {
    /// `CF_*` codes to apply.
    pub condition_factors: Vec<String>,
    /// Overrides the rate's own spec level.
    pub spec_level: Option<String>,
    /// Region code or name; overrides the rate's region.
    pub region: Option<String>,
    /// Date the regional factor and GST are looked up on.
    pub on: NaiveDate,
    /// (year, quarter) to escalate to.
    pub escalate_to: Option<(i32, u8)>,
    pub include_gst: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConditionMultipliers {
    pub labour: f64,
    pub materials: f64,
    pub plant: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedRate {
    pub code: String,
    pub conditions: ConditionMultipliers,
    pub labour: f64,
    pub materials: f64,
    pub plant: f64,
    pub waste_factor: f64,
    pub nett_total: f64,
    pub ohp_percent: f64,
    pub with_ohp: f64,
    pub spec_multiplier: f64,
    pub region_code: Option<String>,
    pub regional_factor: f64,
    pub escalation_ratio: f64,
    pub ex_gst: f64,
    pub gst_rate: f64,
    pub total: f64,
}

/// "Jan-2025" → (2025, 1).
pub fn parse_base_date(value: &str) -> Result<(i32, u8)> {
    let normalized = value.trim().replace(' ', "-");
    let date = NaiveDate::parse_from_str(&format!("01-{}", normalized), "%d-%b-%Y").map_err(|e| {
        RatesError::validation(format!("base date '{}' is not Mon-YYYY: {}", value, e))
    })?;
    Ok((date.year(), quarter_of(date.month())))
}

pub fn quarter_of(month: u32) -> u8 {
    // month is 1..=12
    ((month - 1) / 3 + 1) as u8
}

fn condition_multipliers(codes: &[String], reference: &ReferenceData) -> Result<ConditionMultipliers> {
    let mut multipliers = ConditionMultipliers {
        labour: 1.0,
        materials: 1.0,
        plant: 1.0,
    };
    for code in codes {
        let factor = reference.condition_factor(code)?;
        if factor.applies_to_kind(ResourceKind::Labour) {
            multipliers.labour *= factor.factor;
        }
        if factor.applies_to_kind(ResourceKind::Material) {
            multipliers.materials *= factor.factor;
        }
        if factor.applies_to_kind(ResourceKind::Plant) {
            multipliers.plant *= factor.factor;
        }
    }
    Ok(multipliers)
}

fn spec_multiplier(level: Option<&str>, reference: &ReferenceData) -> Result<f64> {
    let Some(level) = level else {
        return Ok(1.0);
    };
    if let Some(row) = reference.spec_level(level) {
        return Ok(row.cost_multiplier);
    }
    SpecLevel::parse_loose(level)
        .map(|l| l.cost_multiplier())
        .ok_or_else(|| RatesError::not_found(format!("spec level '{}'", level)))
}

/// Region code for a code or a display name ("Sydney Metro").
fn resolve_region<'a>(region: &'a str, reference: &'a ReferenceData) -> &'a str {
    reference
        .regions
        .iter()
        .find(|r| r.code == region || r.name.eq_ignore_ascii_case(region))
        .map(|r| r.code.as_str())
        .unwrap_or(region)
}

pub fn adjust(rate: &SeedRate, inputs: &AdjustmentInputs, reference: &ReferenceData) -> Result<AdjustedRate> {
    let conditions = condition_multipliers(&inputs.condition_factors, reference)?;
    let waste_factor = effective_waste_factor(rate);

    let labour = rate.labour_total * conditions.labour;
    let materials = rate.materials_total * conditions.materials * waste_factor;
    let plant = rate.plant_total * conditions.plant;
    let nett = labour + materials + plant;
    let with_ohp = nett * (1.0 + rate.ohp_percent / 100.0);

    let spec_multiplier = spec_multiplier(
        inputs.spec_level.as_deref().or(rate.spec_level.as_deref()),
        reference,
    )?;

    let region_code = inputs
        .region
        .as_deref()
        .or(rate.region.as_deref())
        .map(|r| resolve_region(r, reference).to_string());
    let regional_factor = match &region_code {
        Some(code) => reference.current_regional_factor(code, inputs.on)?,
        None => 1.0,
    };

    let escalation_ratio = match inputs.escalate_to {
        Some((year, quarter)) => {
            let base_date = rate
                .base_date
                .as_deref()
                .ok_or_else(|| RatesError::validation(format!("rate {} has no base_date", rate.code)))?;
            let (base_year, base_quarter) = parse_base_date(base_date)?;
            let base = reference.escalation_index(base_year, base_quarter)?;
            if base <= 0.0 {
                return Err(RatesError::validation(format!(
                    "escalation index {}Q{} must be positive, got {}",
                    base_year, base_quarter, base
                )));
            }
            let target = reference.escalation_index(year, quarter)?;
            target / base
        }
        None => 1.0,
    };

    let ex_gst = with_ohp * spec_multiplier * regional_factor * escalation_ratio;

    let gst_rate = match (&region_code, inputs.include_gst) {
        (Some(code), true) => reference.current_gst_rate(code, inputs.on)?,
        (None, true) => {
            return Err(RatesError::validation(format!(
                "rate {} has no region to look up GST for",
                rate.code
            )))
        }
        (_, false) => 0.0,
    };
    let total = ex_gst * (1.0 + gst_rate);

    tracing::debug!(
        "Adjusted {}: nett {:.2} → total {:.2} (spec {}, region {}, escalation {:.4}, gst {})",
        rate.code,
        nett,
        total,
        spec_multiplier,
        regional_factor,
        escalation_ratio,
        gst_rate
    );

    Ok(AdjustedRate {
        code: rate.code.clone(),
        conditions: ConditionMultipliers {
            labour: round_to(conditions.labour, 4),
            materials: round_to(conditions.materials, 4),
            plant: round_to(conditions.plant, 4),
        },
        labour: round2(labour),
        materials: round2(materials),
        plant: round2(plant),
        waste_factor,
        nett_total: round2(nett),
        ohp_percent: rate.ohp_percent,
        with_ohp: round2(with_ohp),
        spec_multiplier,
        region_code,
        regional_factor,
        escalation_ratio: round_to(escalation_ratio, 4),
        ex_gst: round2(ex_gst),
        gst_rate,
        total: round2(total),
    })
}
