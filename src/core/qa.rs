//! QA over generated seed rates and over the labour productivity export.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::domain::enums::Severity;
use crate::domain::model::{Finding, NamedGroupFile, RateIndex};
use crate::domain::ports::QaThresholds;
use crate::utils::error::Result;

// ---------------------------------------------------------------------------
// Seed rates

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub name: String,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeedQaReport {
    pub total: usize,
    pub groups: BTreeMap<u8, GroupSummary>,
    pub lowest: f64,
    pub highest: f64,
    pub average: f64,
    pub issues: Vec<Finding>,
    /// (file name, record count)
    pub files: Vec<(String, usize)>,
    pub thresholds: QaThresholdsView,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaThresholdsView {
    pub expected_total: usize,
    pub min_rate: f64,
    pub max_rate: f64,
    pub issue_limit: usize,
}

impl From<&QaThresholds> for QaThresholdsView {
    fn from(t: &QaThresholds) -> Self {
        Self {
            expected_total: t.expected_total,
            min_rate: t.min_rate,
            max_rate: t.max_rate,
            issue_limit: t.issue_limit,
        }
    }
}

impl SeedQaReport {
    pub fn status(&self) -> &'static str {
        if self.issues.is_empty() {
            "PASSED"
        } else {
            "WARNINGS"
        }
    }

    fn rates_in_range(&self) -> bool {
        !self.issues.iter().any(|i| i.message.starts_with("Low rate") || i.message.starts_with("High rate"))
    }

    fn missing(&self, prefix: &str) -> bool {
        self.issues.iter().any(|i| i.message.starts_with(prefix))
    }
}

fn min_max_avg(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;
    (min, max, avg)
}

pub fn seed_qa(
    files: &[NamedGroupFile],
    index: Option<(&str, &RateIndex)>,
    thresholds: &QaThresholds,
) -> SeedQaReport {
    let mut groups = BTreeMap::new();
    let mut all_totals = Vec::new();
    let mut issues = Vec::new();
    let mut listed = Vec::new();

    for file in files {
        let totals: Vec<f64> = file.data.rates.iter().map(|r| r.total_rate).collect();
        let (min, max, avg) = min_max_avg(&totals);
        groups.insert(
            file.data.meta.nrm_group,
            GroupSummary {
                name: file.data.meta.group_name.clone(),
                count: totals.len(),
                min,
                max,
                avg,
            },
        );
        all_totals.extend_from_slice(&totals);
        listed.push((file.file_name.clone(), file.data.meta.count));

        for rate in &file.data.rates {
            if rate.total_rate < thresholds.min_rate {
                issues.push(Finding::new(
                    Severity::Medium,
                    &rate.code,
                    format!("Low rate: {} = ${:.2}", rate.code, rate.total_rate),
                ));
            } else if rate.total_rate > thresholds.max_rate {
                issues.push(Finding::new(
                    Severity::Medium,
                    &rate.code,
                    format!("High rate: {} = ${:.2}", rate.code, rate.total_rate),
                ));
            }
            if rate.nrm1_reference().is_none() {
                issues.push(Finding::new(
                    Severity::High,
                    &rate.code,
                    format!("Missing NRM1: {}", rate.code),
                ));
            }
            if !rate.has_nrm2() {
                issues.push(Finding::new(
                    Severity::Low,
                    &rate.code,
                    format!("Missing NRM2: {}", rate.code),
                ));
            }
        }
    }

    if let Some((name, index)) = index {
        listed.push((name.to_string(), index.groups.len()));
    }
    listed.sort();

    let (lowest, highest, average) = min_max_avg(&all_totals);
    SeedQaReport {
        total: all_totals.len(),
        groups,
        lowest,
        highest,
        average,
        issues,
        files: listed,
        thresholds: thresholds.into(),
    }
}

fn pass(ok: bool, fail: &'static str) -> &'static str {
    if ok {
        "PASS"
    } else {
        fail
    }
}

pub fn render_seed_qa(report: &SeedQaReport, validated_at: &str) -> String {
    let t = &report.thresholds;
    let mut out = String::new();

    let _ = writeln!(out, "# Seed Rates QA Validation Report\n");
    let _ = writeln!(out, "**Validation Date**: {}", validated_at);
    let _ = writeln!(out, "**Status**: {}", report.status());
    let _ = writeln!(out, "**Total Rates**: {}\n", report.total);

    let _ = writeln!(out, "## Summary by NRM Group\n");
    let _ = writeln!(out, "| Group | Name | Count | Min Rate | Max Rate | Avg Rate |");
    let _ = writeln!(out, "|-------|------|-------|----------|----------|----------|");
    for (group, s) in &report.groups {
        let _ = writeln!(
            out,
            "| {} | {} | {} | ${:.2} | ${:.2} | ${:.2} |",
            group, s.name, s.count, s.min, s.max, s.avg
        );
    }

    let _ = writeln!(out, "\n## Rate Distribution\n");
    let _ = writeln!(out, "- **Lowest rate**: ${:.2}", report.lowest);
    let _ = writeln!(out, "- **Highest rate**: ${:.2}", report.highest);
    let _ = writeln!(out, "- **Average rate**: ${:.2}", report.average);

    let _ = writeln!(out, "\n## Validation Checks\n");
    let _ = writeln!(out, "| Check | Status | Details |");
    let _ = writeln!(out, "|-------|--------|---------|");
    let _ = writeln!(
        out,
        "| Total count | {} | {} rates (expected {}) |",
        pass(report.total == t.expected_total, "FAIL"),
        report.total,
        t.expected_total
    );
    let _ = writeln!(
        out,
        "| Rate range | {} | All rates between ${}-${} |",
        pass(report.rates_in_range(), "WARN"),
        t.min_rate,
        t.max_rate
    );
    let _ = writeln!(
        out,
        "| NRM1 codes | {} | All rates have NRM1 |",
        pass(!report.missing("Missing NRM1"), "FAIL")
    );
    let _ = writeln!(
        out,
        "| NRM2 codes | {} | Some rates missing NRM2 |",
        pass(!report.missing("Missing NRM2"), "WARN")
    );

    if !report.issues.is_empty() {
        let _ = writeln!(out, "\n## Issues Found ({})\n", report.issues.len());
        for issue in report.issues.iter().take(t.issue_limit) {
            let _ = writeln!(out, "- {}", issue.message);
        }
        if report.issues.len() > t.issue_limit {
            let _ = writeln!(out, "\n... and {} more", report.issues.len() - t.issue_limit);
        }
    }

    let _ = writeln!(out, "\n## Generated Files\n");
    let _ = writeln!(out, "| File | Count | Status |");
    let _ = writeln!(out, "|------|-------|--------|");
    for (file, count) in &report.files {
        let _ = writeln!(out, "| {} | {} | OK |", file, count);
    }

    out
}

// ---------------------------------------------------------------------------
// Labour productivity export

const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("id", "Primary identifier (UUID)"),
    ("activity_type", "Work activity identifier"),
    ("trade_category", "Trade classification"),
    ("output_unit", "Unit of measurement"),
];

const RECOMMENDED_FIELDS: &[(&str, &str)] = &[
    ("description", "Activity description"),
    ("source_type", "Data source type"),
];

const OPTIONAL_NUMERIC: &[(&str, &str)] = &[
    ("minimum_hours", "Optional minimum hours"),
    ("setup_hours", "Optional setup hours"),
    ("effective_hours_per_day", "Optional effective hours per day"),
];

pub type LabourRow = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabourIssueKind {
    ColumnMissing,
    EmptyRequiredField,
    InvalidRange,
    InvalidValue,
    NonNumeric,
    EmptyRecommendedField,
    NegativeValue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabourIssue {
    pub row_num: usize,
    pub id: String,
    pub activity_type: String,
    pub severity: Severity,
    pub field: String,
    pub issue: LabourIssueKind,
    pub details: String,
}

/// Populated (non-blank) value of `field`.
fn populated<'r>(row: &'r LabourRow, field: &str) -> Option<&'r str> {
    row.get(field).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_number(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok()
}

/// Issues for one CSV row as (severity, field, kind, details).
pub fn validate_labour_row(row: &LabourRow) -> Vec<(Severity, &'static str, LabourIssueKind, String)> {
    let mut issues = Vec::new();

    for (field, description) in REQUIRED_FIELDS {
        if !row.contains_key(*field) {
            issues.push((
                Severity::Critical,
                *field,
                LabourIssueKind::ColumnMissing,
                format!("{} - column not found in CSV", description),
            ));
        } else if populated(row, field).is_none() {
            issues.push((
                Severity::High,
                *field,
                LabourIssueKind::EmptyRequiredField,
                format!("{} is empty", description),
            ));
        }
    }

    if let Some(raw) = populated(row, "hours_per_unit") {
        match parse_number(raw) {
            Some(hours) if hours <= 0.0 => issues.push((
                Severity::High,
                "hours_per_unit",
                LabourIssueKind::InvalidValue,
                format!("Hours per unit {} must be > 0", hours),
            )),
            Some(_) => {}
            None => issues.push((
                Severity::High,
                "hours_per_unit",
                LabourIssueKind::NonNumeric,
                format!("Expected numeric value, got: {}", raw),
            )),
        }
    }

    if let Some(raw) = populated(row, "confidence_score") {
        match parse_number(raw) {
            Some(score) if !(0.0..=1.0).contains(&score) => issues.push((
                Severity::Medium,
                "confidence_score",
                LabourIssueKind::InvalidRange,
                format!("Confidence score {} not in range [0, 1]", score),
            )),
            Some(_) => {}
            None => issues.push((
                Severity::High,
                "confidence_score",
                LabourIssueKind::NonNumeric,
                format!("Expected numeric value, got: {}", raw),
            )),
        }
    }

    for (field, description) in RECOMMENDED_FIELDS {
        if row.contains_key(*field) && populated(row, field).is_none() {
            issues.push((
                Severity::Low,
                *field,
                LabourIssueKind::EmptyRecommendedField,
                format!("{} is empty", description),
            ));
        }
    }

    for (field, description) in OPTIONAL_NUMERIC {
        if let Some(raw) = populated(row, field) {
            match parse_number(raw) {
                Some(value) if value < 0.0 => issues.push((
                    Severity::Medium,
                    *field,
                    LabourIssueKind::NegativeValue,
                    format!("{} has negative value: {}", description, value),
                )),
                Some(_) => {}
                None => issues.push((
                    Severity::Low,
                    *field,
                    LabourIssueKind::NonNumeric,
                    format!("Expected numeric value, got: {}", raw),
                )),
            }
        }
    }

    issues
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBands {
    /// >= 0.85
    pub high: usize,
    /// >= 0.60
    pub medium: usize,
    /// >= 0.30
    pub low: usize,
    pub very_low: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HoursStats {
    pub populated_count: usize,
    pub empty_count: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabourStats {
    pub total_records: usize,
    pub activity_types: BTreeMap<String, usize>,
    pub trade_categories: BTreeMap<String, usize>,
    pub markets: BTreeMap<String, usize>,
    pub confidence: ConfidenceBands,
    pub hours_per_unit: HoursStats,
}

pub fn analyze_labour(rows: &[LabourRow]) -> LabourStats {
    let mut stats = LabourStats {
        total_records: rows.len(),
        ..Default::default()
    };
    let mut hours = Vec::new();

    for row in rows {
        for (field, counts) in [
            ("activity_type", &mut stats.activity_types),
            ("trade_category", &mut stats.trade_categories),
            ("market", &mut stats.markets),
        ] {
            if let Some(value) = row.get(field).filter(|v| !v.is_empty()) {
                *counts.entry(value.clone()).or_default() += 1;
            }
        }

        if let Some(score) = row
            .get("confidence_score")
            .filter(|v| !v.is_empty())
            .and_then(|v| parse_number(v))
        {
            let band = &mut stats.confidence;
            match score {
                s if s >= 0.85 => band.high += 1,
                s if s >= 0.60 => band.medium += 1,
                s if s >= 0.30 => band.low += 1,
                _ => band.very_low += 1,
            }
        }

        if row.contains_key("hours_per_unit") {
            match populated(row, "hours_per_unit") {
                Some(raw) => {
                    if let Some(value) = parse_number(raw) {
                        stats.hours_per_unit.populated_count += 1;
                        hours.push(value);
                    }
                }
                None => stats.hours_per_unit.empty_count += 1,
            }
        }
    }

    if !hours.is_empty() {
        let (min, max, avg) = min_max_avg(&hours);
        stats.hours_per_unit.min = Some(min);
        stats.hours_per_unit.max = Some(max);
        stats.hours_per_unit.avg = avg;
    }
    stats
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LabourQaStatus {
    #[serde(rename = "PASSED")]
    Passed,
    #[serde(rename = "REVIEW RECOMMENDED")]
    ReviewRecommended,
    #[serde(rename = "FAILED")]
    Failed,
}

impl LabourQaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LabourQaStatus::Passed => "PASSED",
            LabourQaStatus::ReviewRecommended => "REVIEW RECOMMENDED",
            LabourQaStatus::Failed => "FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabourValidation {
    pub issues: Vec<LabourIssue>,
    pub stats: LabourStats,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssueTotals {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DataStatistics {
    pub activity_types_unique: usize,
    pub trade_categories_unique: usize,
    pub markets_found: Vec<String>,
    pub hours_per_unit: HoursStats,
    pub confidence_score_distribution: ConfidenceBands,
}

/// JSON summary written next to the issue CSV.
#[derive(Debug, Clone, Serialize)]
pub struct LabourQaSummary {
    pub validation_date: String,
    pub csv_file: String,
    pub status: LabourQaStatus,
    pub total_records: usize,
    pub validation_issues: IssueTotals,
    pub data_statistics: DataStatistics,
}

impl LabourValidation {
    /// Short rows read their missing trailing columns as empty; extra
    /// fields past the header are ignored.
    pub fn from_csv(data: &[u8]) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(data);
        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row: LabourRow = headers
                .iter()
                .enumerate()
                .map(|(i, header)| (header.to_string(), record.get(i).unwrap_or("").to_string()))
                .collect();
            rows.push(row);
        }
        Ok(Self::from_rows(&rows))
    }

    pub fn from_rows(rows: &[LabourRow]) -> Self {
        let mut issues = Vec::new();
        // header is row 1
        for (row_num, row) in (2..).zip(rows) {
            let id = row.get("id").cloned().unwrap_or_else(|| "N/A".to_string());
            let activity = row
                .get("activity_type")
                .cloned()
                .unwrap_or_else(|| "N/A".to_string());
            for (severity, field, issue, details) in validate_labour_row(row) {
                issues.push(LabourIssue {
                    row_num,
                    id: id.clone(),
                    activity_type: activity.clone(),
                    severity,
                    field: field.to_string(),
                    issue,
                    details,
                });
            }
        }
        Self {
            issues,
            stats: analyze_labour(rows),
        }
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn by_severity(&self) -> BTreeMap<Severity, usize> {
        let mut counts = BTreeMap::new();
        for issue in &self.issues {
            *counts.entry(issue.severity).or_default() += 1;
        }
        counts
    }

    pub fn status(&self) -> LabourQaStatus {
        if self.count(Severity::Critical) > 0 {
            LabourQaStatus::Failed
        } else if self.count(Severity::High) > 0 {
            LabourQaStatus::ReviewRecommended
        } else {
            LabourQaStatus::Passed
        }
    }

    pub fn issues_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if self.issues.is_empty() {
            writer.write_record(["row_num", "id", "activity_type", "severity", "field", "issue", "details"])?;
        }
        for issue in &self.issues {
            writer.serialize(issue)?;
        }
        writer
            .into_inner()
            .map_err(|e| crate::utils::error::RatesError::processing(e.to_string()))
    }

    pub fn summary(&self, validation_date: &str, csv_file: &str) -> LabourQaSummary {
        LabourQaSummary {
            validation_date: validation_date.to_string(),
            csv_file: csv_file.to_string(),
            status: self.status(),
            total_records: self.stats.total_records,
            validation_issues: IssueTotals {
                total: self.issues.len(),
                by_severity: self.by_severity(),
            },
            data_statistics: DataStatistics {
                activity_types_unique: self.stats.activity_types.len(),
                trade_categories_unique: self.stats.trade_categories.len(),
                markets_found: self.stats.markets.keys().cloned().collect(),
                hours_per_unit: self.stats.hours_per_unit.clone(),
                confidence_score_distribution: self.stats.confidence.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::buildup::build_groups;
    use crate::domain::model::StagingRate;
    use crate::domain::ports::RateDefaults;

    const LABOUR_CSV: &str = "\
id,activity_type,trade_category,output_unit,hours_per_unit,confidence_score,description,source_type,minimum_hours,market
a1,tiling_floor,tiler,m2,0.4,0.9,Floor tiles,survey,,AU
a2,painting_walls,painter,m2,0,0.7,,survey,,NZ
a3,,painter,m2,abc,1.4,Ceilings,survey,-1,AU
a4,brickwork,bricklayer,m2,,0.1,Bricks,survey,x,UK
";

    fn staging(code: &str, description: &str, group: u8, nrm1: Option<&str>) -> StagingRate {
        StagingRate {
            code: code.to_string(),
            description: description.to_string(),
            notes: None,
            unit: "m2".to_string(),
            nrm_group: group,
            nrm1_code: nrm1.map(str::to_string),
            nrm2_codes: vec!["WS28".to_string()],
        }
    }

    #[test]
    fn test_seed_qa_flags_missing_nrm_and_range() {
        let (files, index) = build_groups(
            &[
                staging("3.1", "Skim coat", 3, Some("3.1")),
                staging("3.2", "Paint ceilings", 3, None),
            ],
            &RateDefaults::default(),
            "2025-01-15",
        );
        let thresholds = QaThresholds {
            expected_total: 2,
            max_rate: 50.0,
            ..Default::default()
        };
        let report = seed_qa(&files, Some(("composite_rates_index.json", &index)), &thresholds);

        assert_eq!(report.total, 2);
        assert_eq!(report.groups[&3].count, 2);
        assert_eq!(report.status(), "WARNINGS");
        assert!(report.issues.iter().any(|i| i.message == "Missing NRM1: 3.2"));
        assert_eq!(report.files.len(), 2);

        let markdown = render_seed_qa(&report, "2025-01-15 10:00:00");
        assert!(markdown.contains("| Total count | PASS | 2 rates (expected 2) |"));
        assert!(markdown.contains("| NRM1 codes | FAIL |"));
        assert!(markdown.contains("| composite_rates_index.json | 1 | OK |"));
    }

    #[test]
    fn test_seed_qa_passes_clean_rates() {
        let (files, _) = build_groups(
            &[staging("3.1", "Skim coat", 3, Some("3.1"))],
            &RateDefaults::default(),
            "2025-01-15",
        );
        let report = seed_qa(&files, None, &QaThresholds::default());
        assert_eq!(report.status(), "PASSED");
        assert!(render_seed_qa(&report, "now").contains("| Total count | FAIL | 1 rates (expected 777) |"));
    }

    #[test]
    fn test_labour_row_rules() {
        let validation = LabourValidation::from_csv(LABOUR_CSV.as_bytes()).unwrap();

        let for_row = |n: usize| -> Vec<(Severity, &str, LabourIssueKind)> {
            validation
                .issues
                .iter()
                .filter(|i| i.row_num == n)
                .map(|i| (i.severity, i.field.as_str(), i.issue))
                .collect()
        };

        assert!(for_row(2).is_empty());
        assert_eq!(
            for_row(3),
            vec![
                (Severity::High, "hours_per_unit", LabourIssueKind::InvalidValue),
                (Severity::Low, "description", LabourIssueKind::EmptyRecommendedField),
            ]
        );
        assert_eq!(
            for_row(4),
            vec![
                (Severity::High, "activity_type", LabourIssueKind::EmptyRequiredField),
                (Severity::High, "hours_per_unit", LabourIssueKind::NonNumeric),
                (Severity::Medium, "confidence_score", LabourIssueKind::InvalidRange),
                (Severity::Medium, "minimum_hours", LabourIssueKind::NegativeValue),
            ]
        );
        assert_eq!(
            for_row(5),
            vec![(Severity::Low, "minimum_hours", LabourIssueKind::NonNumeric)]
        );
        assert_eq!(validation.status(), LabourQaStatus::ReviewRecommended);
    }

    #[test]
    fn test_missing_column_fails() {
        let csv = "id,activity_type,trade_category\nx,tiling,tiler\n";
        let validation = LabourValidation::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(validation.count(Severity::Critical), 1);
        assert_eq!(validation.status(), LabourQaStatus::Failed);
        assert_eq!(validation.status().as_str(), "FAILED");
    }

    #[test]
    fn test_short_row_reads_missing_fields_as_empty() {
        let csv = "id,activity_type,trade_category,output_unit\nL1,Tiling,tiler,m2\nL2,Blockwork\n";
        let validation = LabourValidation::from_csv(csv.as_bytes()).unwrap();
        assert_eq!(validation.stats.total_records, 2);
        assert_eq!(validation.count(Severity::Critical), 0);

        let empties: Vec<_> = validation
            .issues
            .iter()
            .filter(|i| i.issue == LabourIssueKind::EmptyRequiredField)
            .collect();
        assert_eq!(empties.len(), 2);
        assert!(empties.iter().all(|i| i.row_num == 3 && i.severity == Severity::High));
        assert_eq!(empties[0].id, "L2");
        assert_eq!(validation.status(), LabourQaStatus::ReviewRecommended);
    }

    #[test]
    fn test_labour_stats_and_outputs() {
        let validation = LabourValidation::from_csv(LABOUR_CSV.as_bytes()).unwrap();
        let stats = &validation.stats;
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.activity_types.len(), 3);
        assert_eq!(stats.markets["AU"], 2);
        assert_eq!(
            stats.confidence,
            // out-of-range 1.4 still counts as high
            ConfidenceBands { high: 2, medium: 1, low: 0, very_low: 1 }
        );
        assert_eq!(stats.hours_per_unit.populated_count, 2);
        assert_eq!(stats.hours_per_unit.empty_count, 1);
        assert_eq!(stats.hours_per_unit.max, Some(0.4));

        let csv = String::from_utf8(validation.issues_csv().unwrap()).unwrap();
        assert!(csv.starts_with("row_num,id,activity_type,severity,field,issue,details"));
        assert!(csv.contains("3,a2,painting_walls,HIGH,hours_per_unit,INVALID_VALUE"));

        let summary = serde_json::to_value(validation.summary("2026-01-03", "labour.csv")).unwrap();
        assert_eq!(summary["status"], "REVIEW RECOMMENDED");
        assert_eq!(summary["validation_issues"]["by_severity"]["HIGH"], 3);
    }
}
