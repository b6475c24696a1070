use crate::app::pipelines::{join_path, read_json, write_json};
use crate::core::buildup::build_groups;
use crate::core::{ConfigProvider, NamedGroupFile, Pipeline, RateIndex, Storage};
use crate::domain::model::{StagingFile, StagingRate};
use crate::utils::error::Result;

/// Staging extract → `group_{n}_{name}.json` files plus the index.
pub struct GeneratePipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> GeneratePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

pub struct GeneratedRates {
    pub files: Vec<NamedGroupFile>,
    pub index: RateIndex,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for GeneratePipeline<S, C> {
    type Extracted = Vec<StagingRate>;
    type Transformed = GeneratedRates;

    fn name(&self) -> &str {
        "generate"
    }

    async fn extract(&self) -> Result<Vec<StagingRate>> {
        let staging: StagingFile = read_json(&self.storage, self.config.staging_file()).await?;
        tracing::info!("📥 Loaded {} staging rates", staging.rates.len());
        Ok(staging.rates)
    }

    async fn transform(&self, data: Vec<StagingRate>) -> Result<GeneratedRates> {
        let generated = self.config.run_date().format("%Y-%m-%d").to_string();
        let (files, index) = build_groups(&data, &self.config.rate_defaults(), &generated);
        for file in &files {
            tracing::info!(
                "Group {} ({}): {} rates",
                file.data.meta.nrm_group,
                file.data.meta.group_name,
                file.data.meta.count
            );
        }
        Ok(GeneratedRates { files, index })
    }

    async fn load(&self, result: GeneratedRates) -> Result<String> {
        let rates_dir = self.config.rates_dir();
        for file in &result.files {
            write_json(&self.storage, &join_path(rates_dir, &file.file_name), &file.data).await?;
            tracing::info!("Wrote {}: {} rates", file.file_name, file.data.rates.len());
        }
        write_json(&self.storage, self.config.index_file(), &result.index).await?;
        tracing::info!(
            "Wrote {}: {} total rates",
            self.config.index_file(),
            result.index.total
        );
        Ok(rates_dir.to_string())
    }
}
