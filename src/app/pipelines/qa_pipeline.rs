use crate::app::pipelines::{join_path, load_group_files, read_json, timestamp, write_json};
use crate::core::qa::{render_seed_qa, seed_qa, LabourQaStatus, LabourValidation, SeedQaReport};
use crate::core::{ConfigProvider, NamedGroupFile, Pipeline, RateIndex, Storage};
use crate::domain::enums::Severity;
use crate::utils::error::{RatesError, Result};

pub const SEED_QA_FILE: &str = "seed-rates-qa.md";

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Range, metadata and distribution checks over the generated group files.
pub struct SeedQaPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> SeedQaPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

pub struct SeedQaInputs {
    pub files: Vec<NamedGroupFile>,
    pub index: Option<RateIndex>,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SeedQaPipeline<S, C> {
    type Extracted = SeedQaInputs;
    type Transformed = SeedQaReport;

    fn name(&self) -> &str {
        "qa-seed"
    }

    async fn extract(&self) -> Result<SeedQaInputs> {
        let files = load_group_files(&self.storage, self.config.rates_dir()).await?;
        let index_file = self.config.index_file();
        let index = if self.storage.exists(index_file).await {
            Some(read_json(&self.storage, index_file).await?)
        } else {
            tracing::warn!("⚠️ Index {} not found", index_file);
            None
        };
        Ok(SeedQaInputs { files, index })
    }

    async fn transform(&self, inputs: SeedQaInputs) -> Result<SeedQaReport> {
        let index_name = file_name(self.config.index_file());
        let report = seed_qa(
            &inputs.files,
            inputs.index.as_ref().map(|index| (index_name, index)),
            &self.config.qa_thresholds(),
        );
        tracing::info!(
            "📊 {} rates, ${:.2} to ${:.2}, average ${:.2}",
            report.total,
            report.lowest,
            report.highest,
            report.average
        );
        for issue in &report.issues {
            tracing::warn!("⚠️ {}: {}", issue.subject, issue.message);
        }
        Ok(report)
    }

    async fn load(&self, report: SeedQaReport) -> Result<String> {
        let path = join_path(self.config.reports_dir(), SEED_QA_FILE);
        let markdown = render_seed_qa(&report, &timestamp());
        self.storage.write_file(&path, markdown.as_bytes()).await?;
        tracing::info!("Status: {}", report.status());
        Ok(path)
    }
}

/// Validates the labour productivity CSV export. Writes
/// `{stem}_report.csv` and `{stem}_summary.json` under the reports dir.
pub struct LabourQaPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    csv_path: String,
    output_stem: String,
}

impl<S: Storage, C: ConfigProvider> LabourQaPipeline<S, C> {
    pub fn new(storage: S, config: C, csv_path: impl Into<String>, output_stem: impl Into<String>) -> Self {
        Self {
            storage,
            config,
            csv_path: csv_path.into(),
            output_stem: output_stem.into(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for LabourQaPipeline<S, C> {
    type Extracted = Vec<u8>;
    type Transformed = LabourValidation;

    fn name(&self) -> &str {
        "qa-labour"
    }

    async fn extract(&self) -> Result<Vec<u8>> {
        self.storage.read_file(&self.csv_path).await
    }

    async fn transform(&self, data: Vec<u8>) -> Result<LabourValidation> {
        let validation = LabourValidation::from_csv(&data)?;
        tracing::info!(
            "📊 {} records, {} issues (critical {}, high {}, medium {}, low {})",
            validation.stats.total_records,
            validation.issues.len(),
            validation.count(Severity::Critical),
            validation.count(Severity::High),
            validation.count(Severity::Medium),
            validation.count(Severity::Low)
        );
        Ok(validation)
    }

    async fn load(&self, validation: LabourValidation) -> Result<String> {
        let reports_dir = self.config.reports_dir();
        let report_path = join_path(reports_dir, &format!("{}_report.csv", self.output_stem));
        let summary_path = join_path(reports_dir, &format!("{}_summary.json", self.output_stem));

        self.storage
            .write_file(&report_path, &validation.issues_csv()?)
            .await?;
        let summary = validation.summary(&timestamp(), &self.csv_path);
        write_json(&self.storage, &summary_path, &summary).await?;

        let status = validation.status();
        tracing::info!("Status: {}", status.as_str());
        if status == LabourQaStatus::Failed {
            return Err(RatesError::validation(format!(
                "{} critical labour issues, see {}",
                validation.count(Severity::Critical),
                report_path
            )));
        }
        Ok(summary_path)
    }
}
