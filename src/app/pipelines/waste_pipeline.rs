use serde::Serialize;

use crate::app::pipelines::{join_path, load_group_files, save_group_files, timestamp, write_json};
use crate::core::waste::{
    validate_waste, WasteClassifier, WasteUpdateReport, WasteValidationReport, MIN_COMPLIANT_FACTOR,
};
use crate::core::{ConfigProvider, NamedGroupFile, Pipeline, Storage};
use crate::utils::error::{RatesError, Result};

pub const UPDATE_REPORT_FILE: &str = "waste_factor_update_report.json";
pub const VALIDATION_REPORT_FILE: &str = "waste_factor_validation_report.json";

/// Applies the standard waste factor for each material type and
/// recomputes totals.
pub struct WasteUpdatePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> WasteUpdatePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[derive(Serialize)]
struct TimestampedReport<'a, T: Serialize> {
    timestamp: String,
    #[serde(flatten)]
    report: &'a T,
}

pub struct WasteUpdate {
    pub files: Vec<NamedGroupFile>,
    pub report: WasteUpdateReport,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for WasteUpdatePipeline<S, C> {
    type Extracted = Vec<NamedGroupFile>;
    type Transformed = WasteUpdate;

    fn name(&self) -> &str {
        "update-waste"
    }

    async fn extract(&self) -> Result<Vec<NamedGroupFile>> {
        load_group_files(&self.storage, self.config.rates_dir()).await
    }

    async fn transform(&self, mut files: Vec<NamedGroupFile>) -> Result<WasteUpdate> {
        let classifier = WasteClassifier::new()?;
        let stats: Vec<_> = files
            .iter_mut()
            .map(|file| {
                let stats = classifier.update_file(file);
                tracing::info!(
                    "{}: {} composites, {} updated",
                    stats.file,
                    stats.total,
                    stats.updated
                );
                stats
            })
            .collect();

        let report = WasteUpdateReport::from_files(&stats);
        tracing::info!(
            "Updated {}/{} composites ({:.1}%), average factor {:.3} → {:.3}",
            report.total_updated,
            report.total_composites,
            report.update_rate(),
            report.average_before,
            report.average_after
        );
        Ok(WasteUpdate { files, report })
    }

    async fn load(&self, result: WasteUpdate) -> Result<String> {
        save_group_files(&self.storage, self.config.rates_dir(), &result.files).await?;

        let path = join_path(self.config.reports_dir(), UPDATE_REPORT_FILE);
        let report = TimestampedReport {
            timestamp: timestamp(),
            report: &result.report,
        };
        write_json(&self.storage, &path, &report).await?;
        Ok(path)
    }
}

/// Checks every rate for a compliant waste factor and a consistent nett
/// total. Fails with a validation error when issues remain.
pub struct WasteValidationPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> WasteValidationPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for WasteValidationPipeline<S, C> {
    type Extracted = Vec<NamedGroupFile>;
    type Transformed = WasteValidationReport;

    fn name(&self) -> &str {
        "validate-waste"
    }

    async fn extract(&self) -> Result<Vec<NamedGroupFile>> {
        load_group_files(&self.storage, self.config.rates_dir()).await
    }

    async fn transform(&self, files: Vec<NamedGroupFile>) -> Result<WasteValidationReport> {
        let report = validate_waste(&files);
        for file in &report.files {
            tracing::info!("{}: {} composites {:?}", file.file, file.composites, file.distribution);
        }
        tracing::info!(
            "Compliance: {}/{} ({:.1}%) at >= {:.2}, unique factors {:?}",
            report.total_compliant,
            report.total_composites,
            report.compliance_rate(),
            MIN_COMPLIANT_FACTOR,
            report.unique_factors
        );
        Ok(report)
    }

    async fn load(&self, report: WasteValidationReport) -> Result<String> {
        let path = join_path(self.config.reports_dir(), VALIDATION_REPORT_FILE);
        let doc = TimestampedReport {
            timestamp: timestamp(),
            report: &report,
        };
        write_json(&self.storage, &path, &doc).await?;

        if !report.passed() {
            for issue in report.issues.iter().take(10) {
                tracing::warn!("⚠️ {} {}: {}", issue.file, issue.code, issue.issue);
            }
            return Err(RatesError::validation(format!(
                "{} waste factor issues, see {}",
                report.issues.len(),
                path
            )));
        }
        Ok(path)
    }
}
