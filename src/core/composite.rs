//! Checks for "golden composite" JSON produced by the estimating assistant.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::heuristics::{
    nrm_section, parse_resource_id, productivity, waste_guideline, GENERIC_WASTE_RANGE,
};
use crate::domain::enums::{Market, Severity, SpecTier};
use crate::domain::model::{ComponentLine, Components, Finding};
use crate::domain::schema::ResourceKind;
use crate::utils::error::Result;

pub const ALLOWED_UNITS: &[&str] = &["m2", "m", "m3", "EA", "no", "ls", "hr"];

const TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Methodology {
    pub spacing: String,
    pub fixings: Vec<String>,
    pub installation_sequence: Vec<String>,
    pub quality_checks: Vec<String>,
    pub tools_required: Vec<String>,
    pub safety_considerations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeRates {
    pub material_coverage_factor: f64,
    #[serde(default)]
    pub labour_productivity_rate: String,
    #[serde(default)]
    pub plant_productivity_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeMetadata {
    #[serde(default)]
    pub reviewed_by: String,
    pub confidence: f64,
    pub needs_review: bool,
    #[serde(default)]
    pub source_reference: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoldenComposite {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub market: Market,
    pub classification: String,
    pub nrm_level2_code: String,
    pub unit: String,
    #[serde(default)]
    pub total_rate: f64,
    #[serde(default)]
    pub scope_includes: Vec<String>,
    #[serde(default)]
    pub scope_excludes: Vec<String>,
    #[serde(default)]
    pub methodology: Methodology,
    pub labour_hours_per_unit: f64,
    /// role → head count
    #[serde(default)]
    pub gang_composition: BTreeMap<String, f64>,
    pub material_waste_factor: f64,
    #[serde(default)]
    pub components: Components,
    pub rates: CompositeRates,
    pub spec_tier: SpecTier,
    pub metadata: CompositeMetadata,
}

impl GoldenComposite {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn crew_size(&self) -> f64 {
        self.gang_composition.values().sum()
    }
}

/// Names the guideline tables to compare against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckOptions {
    /// Key into the productivity table, e.g. `tiling_floor`.
    pub activity: Option<String>,
    /// Key into the waste table, e.g. `tiles`.
    pub material: Option<String>,
}

fn code_matches_market(code: &str, market: Market) -> bool {
    let Some(rest) = code.strip_prefix("GC-") else {
        return false;
    };
    match rest.split_once('-') {
        Some((m, number)) => {
            m == market.as_str() && number.len() == 4 && number.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

/// `S.N` with S an NRM1 group 0..=8.
fn valid_level2(code: &str) -> bool {
    match code.split_once('.') {
        Some((section, element)) => {
            section.parse::<u8>().ok().and_then(nrm_section).is_some()
                && !element.is_empty()
                && element.chars().all(|c| c.is_ascii_digit())
        }
        None => false,
    }
}

fn check_lines(
    findings: &mut Vec<Finding>,
    code: &str,
    lines: &[ComponentLine],
    kind: ResourceKind,
    market: Market,
) {
    for line in lines {
        let Some(id) = line.resource_id() else {
            findings.push(Finding::new(
                Severity::Medium,
                code,
                format!("{:?} line '{}' is not linked to a resource", kind, line.label()),
            ));
            continue;
        };
        match parse_resource_id(id) {
            Some((k, m, _)) if k == kind && m == market => {}
            Some((k, m, _)) => findings.push(Finding::new(
                Severity::High,
                code,
                format!(
                    "resource {} is {:?}/{} but listed under {:?}/{}",
                    id, k, m, kind, market
                ),
            )),
            None => findings.push(Finding::new(
                Severity::High,
                code,
                format!("'{}' is not a valid resource id", id),
            )),
        }
        if line.qty() < 0.0 {
            findings.push(Finding::new(
                Severity::High,
                code,
                format!("resource {} has negative quantity", id),
            ));
        }
    }
}

pub fn check_composite(composite: &GoldenComposite, options: &CheckOptions) -> Vec<Finding> {
    let c = composite;
    let code = c.code.as_str();
    let mut findings = Vec::new();
    let mut push = |severity, message: String| findings.push(Finding::new(severity, code, message));

    if !code_matches_market(code, c.market) {
        push(
            Severity::High,
            format!("code '{}' does not match GC-{}-NNNN", code, c.market),
        );
    }
    if c.classification != "NRM" {
        push(
            Severity::High,
            format!("classification '{}' is not NRM", c.classification),
        );
    }
    if !valid_level2(&c.nrm_level2_code) {
        push(
            Severity::High,
            format!("nrm_level2_code '{}' is not an NRM1 level 2 code", c.nrm_level2_code),
        );
    }
    if !ALLOWED_UNITS.contains(&c.unit.as_str()) {
        push(
            Severity::High,
            format!("unit '{}' not in {}", c.unit, ALLOWED_UNITS.join(", ")),
        );
    }

    if c.labour_hours_per_unit <= 0.0 {
        push(Severity::High, "labour_hours_per_unit must be > 0".to_string());
    } else if let Some(activity) = options.activity.as_deref() {
        match productivity(activity) {
            Some(p) if !p.contains(c.labour_hours_per_unit) => push(
                Severity::Medium,
                format!(
                    "labour {} hr outside {} range {}-{} {}",
                    c.labour_hours_per_unit, p.activity, p.range.0, p.range.1, p.unit
                ),
            ),
            Some(_) => {}
            None => push(Severity::Low, format!("no productivity guideline for '{}'", activity)),
        }
    }

    let waste = c.material_waste_factor;
    match options.material.as_deref().map(|m| (m, waste_guideline(m))) {
        Some((_, Some(g))) if !g.contains(waste) => push(
            Severity::Medium,
            format!(
                "waste factor {} outside {} guideline {}-{}",
                waste, g.material, g.factor.0, g.factor.1
            ),
        ),
        Some((_, Some(_))) => {}
        Some((material, None)) => {
            push(Severity::Low, format!("no waste guideline for '{}'", material))
        }
        None => {
            let (low, high) = GENERIC_WASTE_RANGE;
            if waste < low || waste > high {
                push(
                    Severity::Medium,
                    format!("waste factor {} outside {}-{}", waste, low, high),
                );
            }
        }
    }
    if (c.rates.material_coverage_factor - waste).abs() > 1e-9 {
        push(
            Severity::Medium,
            format!(
                "material_coverage_factor {} differs from material_waste_factor {}",
                c.rates.material_coverage_factor, waste
            ),
        );
    }

    let crew = c.crew_size();
    if crew <= 0.0 {
        push(Severity::High, "gang_composition is empty".to_string());
    } else if !c.components.labour.is_empty() {
        let component_hours: f64 = c.components.labour.iter().map(ComponentLine::qty).sum();
        let expected = c.labour_hours_per_unit * crew;
        if (component_hours - expected).abs() > TOLERANCE {
            push(
                Severity::Medium,
                format!(
                    "labour components total {:.3} hr, expected {:.3} ({} × crew {})",
                    component_hours, expected, c.labour_hours_per_unit, crew
                ),
            );
        }
    }

    let confidence = c.metadata.confidence;
    if !(0.0..=1.0).contains(&confidence) {
        push(Severity::High, format!("confidence {} not in [0, 1]", confidence));
    } else if confidence < 0.5 && !c.metadata.needs_review {
        push(
            Severity::Medium,
            format!("confidence {} requires needs_review", confidence),
        );
    }

    if c.scope_includes.iter().all(|s| s.trim().is_empty()) {
        push(Severity::Medium, "scope_includes is empty".to_string());
    }
    if c.methodology.installation_sequence.is_empty() {
        push(Severity::Medium, "methodology has no installation_sequence".to_string());
    }

    check_lines(&mut findings, code, &c.components.labour, ResourceKind::Labour, c.market);
    check_lines(&mut findings, code, &c.components.materials, ResourceKind::Material, c.market);
    check_lines(&mut findings, code, &c.components.plant, ResourceKind::Plant, c.market);

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prompt::COMPOSITE_EXAMPLE;

    fn example() -> GoldenComposite {
        GoldenComposite::from_json(COMPOSITE_EXAMPLE.as_bytes()).unwrap()
    }

    fn tiling() -> CheckOptions {
        CheckOptions {
            activity: Some("tiling_floor".to_string()),
            material: Some("tiles".to_string()),
        }
    }

    #[test]
    fn test_reference_example_is_clean() {
        let composite = example();
        assert_eq!(composite.crew_size(), 1.0);
        assert!(check_composite(&composite, &tiling()).is_empty());
        assert!(check_composite(&composite, &CheckOptions::default()).is_empty());
    }

    #[test]
    fn test_identity_fields() {
        let mut composite = example();
        composite.code = "GC-NZ-0051".to_string();
        composite.nrm_level2_code = "9.1".to_string();
        composite.unit = "sqm".to_string();
        let findings = check_composite(&composite, &CheckOptions::default());
        assert_eq!(findings.len(), 3);
        assert!(findings.iter().all(|f| f.severity == Severity::High));

        assert!(code_matches_market("GC-AU-0001", Market::Au));
        assert!(!code_matches_market("GC-AU-001", Market::Au));
        assert!(valid_level2("0.1"));
        assert!(!valid_level2("3"));
    }

    #[test]
    fn test_ranges_against_guidelines() {
        let mut composite = example();
        composite.labour_hours_per_unit = 0.6;
        composite.material_waste_factor = 1.2;
        composite.rates.material_coverage_factor = 1.2;
        composite.components.labour = vec![ComponentLine::Linked {
            resource_id: "LAB_AU_TILER".to_string(),
            qty: 0.6,
            unit: "hr".to_string(),
        }];

        let messages: Vec<String> = check_composite(&composite, &tiling())
            .into_iter()
            .map(|f| f.message)
            .collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("tiling_floor"));
        assert!(messages[1].contains("tiles guideline"));

        // no material named → generic 1.00..=1.15 bound
        let generic = check_composite(&composite, &CheckOptions::default());
        assert_eq!(generic.len(), 1);
    }

    #[test]
    fn test_crew_hours_and_review_flag() {
        let mut composite = example();
        composite.gang_composition.insert("labourer".to_string(), 1.0);
        composite.metadata.confidence = 0.4;
        composite.metadata.needs_review = false;
        let findings = check_composite(&composite, &tiling());
        assert_eq!(findings.len(), 2);
        assert!(findings[0].message.contains("expected 0.700"));
        assert!(findings[1].message.contains("needs_review"));
    }

    #[test]
    fn test_resource_ids_checked_per_kind() {
        let mut composite = example();
        composite.components.plant.push(ComponentLine::Linked {
            resource_id: "MAT_AU_GROUT".to_string(),
            qty: 1.0,
            unit: "hr".to_string(),
        });
        composite.components.materials.push(ComponentLine::Inline {
            description: "Sundries".to_string(),
            qty: 1.0,
            unit: "m2".to_string(),
            rate: 2.0,
        });
        let findings = check_composite(&composite, &CheckOptions::default());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().any(|f| f.message.contains("not linked")));
        assert!(findings.iter().any(|f| f.message.contains("listed under Plant/AU")));
    }
}
