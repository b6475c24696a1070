use crate::app::pipelines::{join_path, load_group_files, read_json, save_group_files, timestamp};
use crate::core::linking::{render_linking_qa, LabourRateFile, LinkStats, ResourceLibrary, ResourceLinker};
use crate::core::{ConfigProvider, NamedGroupFile, Pipeline, Storage};
use crate::utils::error::Result;

pub const LABOUR_RATES_FILE: &str = "labour-rates.json";
pub const LINKING_QA_FILE: &str = "resource-linking-qa.md";

/// Replaces free-text resources with labour, material and plant ids from the
/// resource library.
pub struct ResourceLinkPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
}

impl<S: Storage, C: ConfigProvider> ResourceLinkPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    async fn load_library(&self) -> Result<ResourceLibrary> {
        let market = self.config.market();
        let resources_dir = self.config.resources_dir();
        let mut library = ResourceLibrary::new(market);

        let labour_path = join_path(resources_dir, LABOUR_RATES_FILE);
        if self.storage.exists(&labour_path).await {
            let labour: LabourRateFile = read_json(&self.storage, &labour_path).await?;
            library = library.with_labour(labour);
        } else {
            tracing::warn!("⚠️ {} not found, trade ids will not be checked", labour_path);
        }

        if self.storage.exists(resources_dir).await {
            let names = self.storage.list_files(resources_dir).await?;
            library = library.with_material_files(market, names.iter().map(String::as_str));
        }

        tracing::info!(
            "📥 Resource library: {} labour, {} materials, {} plant",
            library.labour.len(),
            library.materials.len(),
            library.plant.len()
        );
        Ok(library)
    }
}

pub struct LinkedRates {
    pub files: Vec<NamedGroupFile>,
    pub report: String,
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ResourceLinkPipeline<S, C> {
    type Extracted = (ResourceLibrary, Vec<NamedGroupFile>);
    type Transformed = LinkedRates;

    fn name(&self) -> &str {
        "link-resources"
    }

    async fn extract(&self) -> Result<Self::Extracted> {
        let library = self.load_library().await?;
        let files = load_group_files(&self.storage, self.config.rates_dir()).await?;
        Ok((library, files))
    }

    async fn transform(&self, data: Self::Extracted) -> Result<LinkedRates> {
        let (library, mut files) = data;
        let linker = ResourceLinker::new(self.config.market(), library)?;
        let transformed = self.config.run_date().format("%Y-%m-%d").to_string();

        let mut stats = LinkStats::default();
        for file in &mut files {
            let group = linker.link_file(file, &transformed);
            tracing::info!(
                "{}: {} rates, labour {}, materials {}, plant {}",
                file.file_name,
                group.count,
                group.labour_linked,
                group.materials_linked,
                group.plant_linked
            );
            stats.add_group(&file.file_name, group);
        }

        let report = render_linking_qa(&stats, &linker, &timestamp());
        Ok(LinkedRates { files, report })
    }

    async fn load(&self, result: LinkedRates) -> Result<String> {
        save_group_files(&self.storage, self.config.rates_dir(), &result.files).await?;
        let path = join_path(self.config.reports_dir(), LINKING_QA_FILE);
        self.storage.write_file(&path, result.report.as_bytes()).await?;
        Ok(path)
    }
}
