use crate::app::pipelines::{join_path, load_group_files, save_group_files, timestamp, write_json};
use crate::core::crosswalk::Crosswalk;
use crate::core::nrm::{apply_manual_fixes, render_mapping_qa, ManualFix, NrmEnricher};
use crate::core::{ConfigProvider, NamedGroupFile, Pipeline, Storage};
use crate::utils::error::Result;

pub const MAPPING_QA_FILE: &str = "nrm-mapping-qa.md";
pub const MANUAL_FIXES_FILE: &str = "nrm-manual-fixes.json";

pub struct NrmInputs {
    pub crosswalk: Crosswalk,
    pub files: Vec<NamedGroupFile>,
}

async fn load_inputs<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<NrmInputs> {
    let bytes = storage.read_file(config.crosswalk_file()).await?;
    let crosswalk = Crosswalk::from_csv(&bytes)?;
    tracing::info!(
        "📥 Crosswalk: {} rows, {} L2 codes, {} L4 codes",
        crosswalk.len(),
        crosswalk.l2_count(),
        crosswalk.l4_count()
    );
    let files = load_group_files(storage, config.rates_dir()).await?;
    Ok(NrmInputs { crosswalk, files })
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Maps every rate onto the NRM1 level 4 → NRM2 crosswalk and writes the
/// mapping QA report.
pub struct NrmEnrichPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> NrmEnrichPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

pub struct EnrichedRates {
    pub files: Vec<NamedGroupFile>,
    pub report: String,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for NrmEnrichPipeline<S, C> {
    type Extracted = NrmInputs;
    type Transformed = EnrichedRates;

    fn name(&self) -> &str {
        "enrich-nrm"
    }

    async fn extract(&self) -> Result<NrmInputs> {
        load_inputs(&self.storage, &self.config).await
    }

    async fn transform(&self, inputs: NrmInputs) -> Result<EnrichedRates> {
        let NrmInputs {
            crosswalk,
            mut files,
        } = inputs;
        let enriched_date = self.config.run_date().format("%Y-%m-%d").to_string();
        let version = file_name(self.config.crosswalk_file());

        let mut enricher = NrmEnricher::new(&crosswalk);
        for file in &mut files {
            enricher.enrich_file(file, &enriched_date, version);
        }
        let stats = enricher.into_stats();
        tracing::info!(
            "Mapped {}/{} rates (high {}, medium {}, low {}, none {})",
            stats.matched(),
            stats.total_rates,
            stats.high_confidence,
            stats.medium_confidence,
            stats.low_confidence,
            stats.no_match
        );

        let report = render_mapping_qa(&stats, &files, &timestamp(), self.config.crosswalk_file());
        Ok(EnrichedRates { files, report })
    }

    async fn load(&self, result: EnrichedRates) -> Result<String> {
        save_group_files(&self.storage, self.config.rates_dir(), &result.files).await?;
        let path = join_path(self.config.reports_dir(), MAPPING_QA_FILE);
        self.storage.write_file(&path, result.report.as_bytes()).await?;
        Ok(path)
    }
}

/// Re-maps unmatched facilitating and services-range rates by hand-curated
/// rules.
pub struct NrmFixPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> NrmFixPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

pub struct FixedRates {
    pub files: Vec<NamedGroupFile>,
    pub fixes: Vec<ManualFix>,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for NrmFixPipeline<S, C> {
    type Extracted = NrmInputs;
    type Transformed = FixedRates;

    fn name(&self) -> &str {
        "fix-nrm"
    }

    async fn extract(&self) -> Result<NrmInputs> {
        load_inputs(&self.storage, &self.config).await
    }

    async fn transform(&self, inputs: NrmInputs) -> Result<FixedRates> {
        let NrmInputs {
            crosswalk,
            mut files,
        } = inputs;
        let fixes = apply_manual_fixes(&crosswalk, &mut files);
        for fix in &fixes {
            tracing::info!("{}: {} → {} ({})", fix.code, fix.from_l2, fix.l4_code, fix.reason);
        }
        tracing::info!("Fixed {} rates", fixes.len());
        Ok(FixedRates { files, fixes })
    }

    async fn load(&self, result: FixedRates) -> Result<String> {
        save_group_files(&self.storage, self.config.rates_dir(), &result.files).await?;
        let path = join_path(self.config.reports_dir(), MANUAL_FIXES_FILE);
        write_json(&self.storage, &path, &result.fixes).await?;
        Ok(path)
    }
}
