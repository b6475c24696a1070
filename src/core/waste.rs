//! Material waste factors: classify each composite by its dominant material,
//! bring the factor up to the NRM standard and check the stored totals.

use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::core::buildup::totals_for;
use crate::domain::model::{NamedGroupFile, SeedRate};
use crate::utils::error::Result;
use crate::utils::numeric::{factor_from_percent, factor_key, waste_percent_from_factor};

pub const DEFAULT_WASTE_FACTOR: f64 = 1.05;
pub const MIN_COMPLIANT_FACTOR: f64 = 1.05;
/// Allowed drift between stored and recomputed nett totals.
pub const NETT_TOLERANCE: f64 = 0.02;

const FACTOR_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialType {
    Timber,
    Plasterboard,
    Tiles,
    Brickwork,
    Concrete,
    Steel,
    Default,
    /// Composite without material lines.
    None,
}

impl MaterialType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaterialType::Timber => "timber",
            MaterialType::Plasterboard => "plasterboard",
            MaterialType::Tiles => "tiles",
            MaterialType::Brickwork => "brickwork",
            MaterialType::Concrete => "concrete",
            MaterialType::Steel => "steel",
            MaterialType::Default => "default",
            MaterialType::None => "none",
        }
    }

    /// NRM standard factor; `None` keeps whatever the rate carries.
    pub fn standard_factor(&self) -> Option<f64> {
        match self {
            MaterialType::Timber | MaterialType::Plasterboard | MaterialType::Tiles => Some(1.10),
            MaterialType::Brickwork => Some(1.07),
            MaterialType::Concrete | MaterialType::Steel | MaterialType::Default => Some(1.05),
            MaterialType::None => None,
        }
    }
}

// Checked in order; the first family with a hit wins.
const MATERIAL_PATTERNS: &[(MaterialType, &[&str])] = &[
    (
        MaterialType::Timber,
        &[
            r"\btimber\b", r"\bwood\b", r"\blumber\b", r"\bframing\b", r"\bstud\b", r"\bjoist\b",
            r"\brafter\b", r"\bdecking\b", r"\bpine\b", r"\bhardwood\b", r"\bsoftwood\b",
            r"\bplywood\b",
        ],
    ),
    (
        MaterialType::Plasterboard,
        &[
            r"\bplasterboard\b", r"\bgypsum\b", r"\bdrywall\b", r"\bgyproc\b", r"\bplaster\b",
            r"\bsheet\s*lining\b",
        ],
    ),
    (
        MaterialType::Tiles,
        &[r"\btile[sd]?\b", r"\bceramic\b", r"\bporcelain\b", r"\bmosaic\b", r"\btiling\b"],
    ),
    (
        MaterialType::Brickwork,
        &[r"\bbrick\b", r"\bmasonry\b", r"\bblockwork\b", r"\bblock\b", r"\bcbu\b", r"\bcmu\b"],
    ),
    (
        MaterialType::Concrete,
        &[r"\bconcrete\b", r"\brc\b", r"\breinforced\b"],
    ),
    (
        MaterialType::Steel,
        &[r"\bsteel\b", r"\bmetal\b", r"\biron\b", r"\baluminium\b"],
    ),
];

/// Waste factor the rate is currently priced at.
pub fn effective_waste_factor(rate: &SeedRate) -> f64 {
    rate.material_waste_factor
        .unwrap_or_else(|| factor_from_percent(rate.waste_percent))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteChange {
    pub code: String,
    pub name: String,
    pub material_type: MaterialType,
    pub old_waste: f64,
    pub new_waste: f64,
    pub evidence: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WasteAssessment {
    pub material_type: MaterialType,
    pub factor: f64,
    pub change: Option<WasteChange>,
}

pub struct WasteClassifier {
    families: Vec<(MaterialType, Vec<Regex>)>,
}

impl WasteClassifier {
    pub fn new() -> Result<Self> {
        let families = MATERIAL_PATTERNS
            .iter()
            .map(|(material, patterns)| {
                let compiled = patterns
                    .iter()
                    .map(|p| Regex::new(&format!("(?i){}", p)))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok((*material, compiled))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { families })
    }

    pub fn identify(&self, text: &str) -> MaterialType {
        self.families
            .iter()
            .find(|(_, patterns)| patterns.iter().any(|re| re.is_match(text)))
            .map(|(material, _)| *material)
            .unwrap_or(MaterialType::Default)
    }

    /// Classifies `rate` and, when its factor is off standard, rewrites the
    /// factor, waste percent and both totals in place.
    pub fn apply_waste_standard(&self, rate: &mut SeedRate) -> WasteAssessment {
        let current = effective_waste_factor(rate);
        if !rate.has_materials() {
            return WasteAssessment {
                material_type: MaterialType::None,
                factor: current,
                change: None,
            };
        }

        let text = format!(
            "{} {} {}",
            rate.name,
            rate.description.as_deref().unwrap_or_default(),
            rate.material_labels().join(" ")
        );
        let material_type = self.identify(&text);
        let factor = material_type
            .standard_factor()
            .unwrap_or(DEFAULT_WASTE_FACTOR);

        if (factor - current).abs() <= FACTOR_EPSILON {
            return WasteAssessment {
                material_type,
                factor,
                change: None,
            };
        }

        rate.material_waste_factor = Some(factor);
        rate.waste_percent = waste_percent_from_factor(factor);
        let totals = totals_for(rate, factor);
        rate.nett_total = totals.nett_total;
        rate.total_rate = totals.total_rate;

        let evidence: String = rate.name.chars().take(50).collect();
        WasteAssessment {
            material_type,
            factor,
            change: Some(WasteChange {
                code: rate.code.clone(),
                name: rate.name.clone(),
                material_type,
                old_waste: current,
                new_waste: factor,
                evidence: format!("Identified from: {}...", evidence),
            }),
        }
    }

    pub fn update_file(&self, file: &mut NamedGroupFile) -> WasteFileStats {
        let mut stats = WasteFileStats {
            file: file.file_name.clone(),
            total: file.data.rates.len(),
            ..Default::default()
        };

        for rate in &mut file.data.rates {
            let before = effective_waste_factor(rate);
            let assessment = self.apply_waste_standard(rate);

            let entry = stats
                .by_material
                .entry(assessment.material_type.as_str().to_string())
                .or_insert(MaterialCount {
                    count: 0,
                    waste_factor: assessment.factor,
                });
            entry.count += 1;
            stats.factor_before_sum += before;
            stats.factor_after_sum += effective_waste_factor(rate);

            match assessment.change {
                Some(change) => {
                    stats.updated += 1;
                    stats.details.push(change);
                }
                None => stats.unchanged += 1,
            }
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialCount {
    pub count: usize,
    pub waste_factor: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WasteFileStats {
    pub file: String,
    pub total: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub by_material: BTreeMap<String, MaterialCount>,
    pub details: Vec<WasteChange>,
    #[serde(skip)]
    factor_before_sum: f64,
    #[serde(skip)]
    factor_after_sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WasteUpdateReport {
    pub total_composites: usize,
    pub total_updated: usize,
    pub by_material: BTreeMap<String, MaterialCount>,
    pub average_before: f64,
    pub average_after: f64,
    pub all_details: Vec<WasteChange>,
}

impl WasteUpdateReport {
    pub fn from_files(files: &[WasteFileStats]) -> Self {
        let mut report = Self::default();
        let (mut before, mut after) = (0.0, 0.0);
        for stats in files {
            report.total_composites += stats.total;
            report.total_updated += stats.updated;
            report.all_details.extend(stats.details.iter().cloned());
            before += stats.factor_before_sum;
            after += stats.factor_after_sum;
            for (material, count) in &stats.by_material {
                report
                    .by_material
                    .entry(material.clone())
                    .or_insert(MaterialCount {
                        count: 0,
                        waste_factor: count.waste_factor,
                    })
                    .count += count.count;
            }
        }
        if report.total_composites > 0 {
            let n = report.total_composites as f64;
            report.average_before = before / n;
            report.average_after = after / n;
        }
        report
    }

    pub fn update_rate(&self) -> f64 {
        if self.total_composites == 0 {
            0.0
        } else {
            self.total_updated as f64 / self.total_composites as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WasteIssue {
    pub file: String,
    pub code: String,
    pub issue: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileDistribution {
    pub file: String,
    pub composites: usize,
    pub distribution: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WasteValidationReport {
    pub total_composites: usize,
    pub total_compliant: usize,
    pub unique_factors: BTreeSet<String>,
    pub files: Vec<FileDistribution>,
    pub issues: Vec<WasteIssue>,
}

impl WasteValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn compliance_rate(&self) -> f64 {
        if self.total_composites == 0 {
            0.0
        } else {
            self.total_compliant as f64 / self.total_composites as f64 * 100.0
        }
    }
}

/// Recomputes every rate's waste percent and nett total from its factor.
pub fn validate_waste(files: &[NamedGroupFile]) -> WasteValidationReport {
    let mut report = WasteValidationReport::default();

    for file in files {
        let mut distribution = BTreeMap::new();
        for rate in &file.data.rates {
            let factor = effective_waste_factor(rate);

            let expected_percent = waste_percent_from_factor(factor);
            if (rate.waste_percent - expected_percent).abs() > FACTOR_EPSILON {
                report.issues.push(WasteIssue {
                    file: file.file_name.clone(),
                    code: rate.code.clone(),
                    issue: format!(
                        "Waste percent mismatch: {}% vs expected {}%",
                        rate.waste_percent, expected_percent
                    ),
                });
            }

            let expected_nett = totals_for(rate, factor).nett_total;
            if (expected_nett - rate.nett_total).abs() > NETT_TOLERANCE + FACTOR_EPSILON {
                report.issues.push(WasteIssue {
                    file: file.file_name.clone(),
                    code: rate.code.clone(),
                    issue: format!(
                        "Nett total mismatch: {} vs expected {}",
                        rate.nett_total, expected_nett
                    ),
                });
            }

            *distribution.entry(factor_key(factor)).or_insert(0) += 1;
            report.unique_factors.insert(factor_key(factor));
            report.total_composites += 1;
            if factor >= MIN_COMPLIANT_FACTOR - FACTOR_EPSILON {
                report.total_compliant += 1;
            }
        }

        report.files.push(FileDistribution {
            file: file.file_name.clone(),
            composites: file.data.rates.len(),
            distribution,
        });
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buildup::build_groups;
    use crate::domain::model::StagingRate;
    use crate::domain::ports::RateDefaults;

    fn generated(description: &str) -> NamedGroupFile {
        let staging = vec![StagingRate {
            code: "2.1.1".to_string(),
            description: description.to_string(),
            notes: None,
            unit: "m2".to_string(),
            nrm_group: 2,
            nrm1_code: Some("2.1".to_string()),
            nrm2_codes: vec![],
        }];
        let (mut files, _) = build_groups(&staging, &RateDefaults::default(), "2025-01-15");
        files.remove(0)
    }

    #[test]
    fn test_identify_material_order_and_boundaries() {
        let classifier = WasteClassifier::new().unwrap();
        assert_eq!(classifier.identify("Timber stud wall with plasterboard"), MaterialType::Timber);
        assert_eq!(classifier.identify("Wall tiled finish"), MaterialType::Tiles);
        assert_eq!(classifier.identify("CMU partition"), MaterialType::Brickwork);
        assert_eq!(classifier.identify("RC slab"), MaterialType::Concrete);
        // "bricklayer" is not a whole-word "brick"
        assert_eq!(classifier.identify("bricklayer labour"), MaterialType::Default);
    }

    #[test]
    fn test_apply_standard_updates_totals() {
        let classifier = WasteClassifier::new().unwrap();
        let mut file = generated("Timber floor boards");
        let rate = &mut file.data.rates[0];
        let labour = rate.labour_total;

        let assessment = classifier.apply_waste_standard(rate);
        let change = assessment.change.unwrap();
        assert_eq!(change.old_waste, 1.05);
        assert_eq!(change.new_waste, 1.10);
        assert_eq!(rate.waste_percent, 10.0);
        assert_eq!(rate.material_waste_factor, Some(1.10));
        assert_eq!(rate.labour_total, labour);
        let expected = totals_for(rate, 1.10);
        assert_eq!(rate.nett_total, expected.nett_total);
    }

    #[test]
    fn test_apply_standard_skips_rates_without_materials() {
        let classifier = WasteClassifier::new().unwrap();
        let mut file = generated("Timber floor boards");
        let rate = &mut file.data.rates[0];
        rate.materials.clear();
        let before = rate.clone();

        let assessment = classifier.apply_waste_standard(rate);
        assert_eq!(assessment.material_type, MaterialType::None);
        assert!(assessment.change.is_none());
        assert_eq!(*rate, before);
    }

    #[test]
    fn test_default_material_keeps_generated_factor() {
        let classifier = WasteClassifier::new().unwrap();
        let mut file = generated("Sundry allowance");
        let stats = classifier.update_file(&mut file);
        assert_eq!(stats.updated, 0);
        assert_eq!(stats.unchanged, 1);
        assert_eq!(stats.by_material["default"].count, 1);
    }

    #[test]
    fn test_validation_passes_after_update_and_flags_tampering() {
        let classifier = WasteClassifier::new().unwrap();
        let mut file = generated("Ceramic tiles to floor");
        classifier.update_file(&mut file);

        let report = validate_waste(std::slice::from_ref(&file));
        assert!(report.passed(), "{:?}", report.issues);
        assert_eq!(report.total_compliant, 1);
        assert!(report.unique_factors.contains("1.10"));

        file.data.rates[0].nett_total += 1.0;
        file.data.rates[0].waste_percent = 7.0;
        let report = validate_waste(&[file]);
        assert_eq!(report.issues.len(), 2);
        assert!(!report.passed());
    }

    #[test]
    fn test_update_report_averages() {
        let classifier = WasteClassifier::new().unwrap();
        let mut timber = generated("Timber decking");
        let mut other = generated("Sundry allowance");
        let stats = vec![
            classifier.update_file(&mut timber),
            classifier.update_file(&mut other),
        ];
        let report = WasteUpdateReport::from_files(&stats);
        assert_eq!(report.total_composites, 2);
        assert_eq!(report.total_updated, 1);
        assert!((report.average_before - 1.05).abs() < 1e-9);
        assert!((report.average_after - 1.075).abs() < 1e-9);
        assert_eq!(report.update_rate(), 50.0);
    }
}
