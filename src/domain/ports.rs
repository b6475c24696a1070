use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::enums::Market;
use crate::utils::error::Result;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// File names (not paths) inside `dir`, sorted.
    fn list_files(
        &self,
        dir: &str,
    ) -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = bool> + Send;
}

/// Defaults stamped onto generated rates.
#[derive(Debug, Clone, PartialEq)]
pub struct RateDefaults {
    pub spec_level: String,
    pub base_date: String,
    pub region: String,
    pub waste_percent: f64,
    pub ohp_percent: f64,
    pub source: String,
}

impl Default for RateDefaults {
    fn default() -> Self {
        Self {
            spec_level: "Standard".to_string(),
            base_date: "Jan-2025".to_string(),
            region: "Sydney Metro".to_string(),
            waste_percent: 5.0,
            ohp_percent: 15.0,
            source: "Composite_Rate_Descriptions.xlsx".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QaThresholds {
    pub expected_total: usize,
    pub min_rate: f64,
    pub max_rate: f64,
    pub issue_limit: usize,
}

impl Default for QaThresholds {
    fn default() -> Self {
        Self {
            expected_total: 777,
            min_rate: 10.0,
            max_rate: 5000.0,
            issue_limit: 20,
        }
    }
}

/// Workspace layout, relative to the storage root.
pub trait ConfigProvider: Send + Sync {
    fn staging_file(&self) -> &str;
    fn rates_dir(&self) -> &str;
    fn index_file(&self) -> &str;
    fn crosswalk_file(&self) -> &str;
    fn resources_dir(&self) -> &str;
    fn reports_dir(&self) -> &str;
    fn reference_file(&self) -> &str;
    fn market(&self) -> Market;
    fn run_date(&self) -> NaiveDate;
    fn rate_defaults(&self) -> RateDefaults;
    fn qa_thresholds(&self) -> QaThresholds;
}

/// Extract → transform → load, each batch job implements this.
#[async_trait]
pub trait Pipeline: Send + Sync {
    type Extracted: Send;
    type Transformed: Send;

    fn name(&self) -> &str;
    async fn extract(&self) -> Result<Self::Extracted>;
    async fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    /// Returns the main output path.
    async fn load(&self, result: Self::Transformed) -> Result<String>;
}
