use crate::core::ConfigProvider;
use crate::domain::enums::Market;
use crate::domain::ports::{QaThresholds, RateDefaults};
use crate::utils::error::{RatesError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range, Validate,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

const DEFAULT_STAGING_FILE: &str = "workspace/au/ingest/staging/rate_descriptions.json";
const DEFAULT_RATES_DIR: &str = "au/seed-data/composite_rates";
const DEFAULT_INDEX_FILE: &str = "au/seed-data/composite_rates_index.json";
const DEFAULT_CROSSWALK_FILE: &str = "NRM/NRM1_L4_to_NRM2_Crosswalk.csv";
const DEFAULT_RESOURCES_DIR: &str = "international/au/resources";
const DEFAULT_REPORTS_DIR: &str = "workspace/au/metadata/validations";
const DEFAULT_REFERENCE_FILE: &str = "au/reference/reference_data.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatesConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    #[serde(default)]
    pub qa: QaConfig,
    #[serde(default)]
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: Option<String>,
    pub market: Option<String>,
    /// YYYY-MM-DD, stamped on generated files and reports
    pub run_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    pub base_dir: Option<String>,
    pub staging_file: Option<String>,
    pub rates_dir: Option<String>,
    pub index_file: Option<String>,
    pub crosswalk_file: Option<String>,
    pub resources_dir: Option<String>,
    pub reports_dir: Option<String>,
    pub reference_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    pub spec_level: Option<String>,
    pub base_date: Option<String>,
    pub region: Option<String>,
    pub waste_percent: Option<f64>,
    pub ohp_percent: Option<f64>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QaConfig {
    pub expected_total: Option<usize>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
    pub issue_limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl RatesConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 檔案不存在時使用預設值
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            tracing::debug!("Loading configuration from {}", path.display());
            Self::from_file(path)
        } else {
            tracing::warn!(
                "⚠️ Config file {} not found, using built-in defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| RatesError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${RATES_BASE_DIR})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(market) = &self.project.market {
            market
                .parse::<Market>()
                .map_err(|_| RatesError::InvalidConfigValueError {
                    field: "project.market".to_string(),
                    value: market.clone(),
                    reason: format!(
                        "Unsupported market. Valid markets: {}",
                        Market::ALL.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ")
                    ),
                })?;
        }

        if let Some(date) = &self.project.run_date {
            NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                RatesError::InvalidConfigValueError {
                    field: "project.run_date".to_string(),
                    value: date.clone(),
                    reason: format!("Expected YYYY-MM-DD: {}", e),
                }
            })?;
        }

        // 驗證路徑
        validate_path("paths.base_dir", self.base_dir())?;
        validate_path("paths.staging_file", self.staging_file())?;
        validate_path("paths.rates_dir", self.rates_dir())?;
        validate_path("paths.index_file", self.index_file())?;
        validate_path("paths.crosswalk_file", self.crosswalk_file())?;
        validate_path("paths.resources_dir", self.resources_dir())?;
        validate_path("paths.reports_dir", self.reports_dir())?;
        validate_path("paths.reference_file", self.reference_file())?;

        let defaults = self.rate_defaults();
        validate_non_empty_string("defaults.region", &defaults.region)?;
        validate_non_empty_string("defaults.spec_level", &defaults.spec_level)?;
        validate_range("defaults.waste_percent", defaults.waste_percent, 0.0, 100.0)?;
        validate_range("defaults.ohp_percent", defaults.ohp_percent, 0.0, 100.0)?;

        let qa = self.qa_thresholds();
        if qa.min_rate >= qa.max_rate {
            return Err(RatesError::InvalidConfigValueError {
                field: "qa.min_rate".to_string(),
                value: qa.min_rate.to_string(),
                reason: format!("Must be below qa.max_rate ({})", qa.max_rate),
            });
        }
        validate_positive_number("qa.issue_limit", qa.issue_limit, 1)?;

        Ok(())
    }

    /// 取得工作區根目錄
    pub fn base_dir(&self) -> &str {
        self.paths.base_dir.as_deref().unwrap_or(".")
    }

    pub fn project_name(&self) -> &str {
        self.project.name.as_deref().unwrap_or("contech-rates")
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for RatesConfig {
    fn staging_file(&self) -> &str {
        self.paths.staging_file.as_deref().unwrap_or(DEFAULT_STAGING_FILE)
    }

    fn rates_dir(&self) -> &str {
        self.paths.rates_dir.as_deref().unwrap_or(DEFAULT_RATES_DIR)
    }

    fn index_file(&self) -> &str {
        self.paths.index_file.as_deref().unwrap_or(DEFAULT_INDEX_FILE)
    }

    fn crosswalk_file(&self) -> &str {
        self.paths.crosswalk_file.as_deref().unwrap_or(DEFAULT_CROSSWALK_FILE)
    }

    fn resources_dir(&self) -> &str {
        self.paths.resources_dir.as_deref().unwrap_or(DEFAULT_RESOURCES_DIR)
    }

    fn reports_dir(&self) -> &str {
        self.paths.reports_dir.as_deref().unwrap_or(DEFAULT_REPORTS_DIR)
    }

    fn reference_file(&self) -> &str {
        self.paths.reference_file.as_deref().unwrap_or(DEFAULT_REFERENCE_FILE)
    }

    fn market(&self) -> Market {
        self.project
            .market
            .as_deref()
            .and_then(|m| m.parse().ok())
            .unwrap_or_default()
    }

    fn run_date(&self) -> NaiveDate {
        self.project
            .run_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    fn rate_defaults(&self) -> RateDefaults {
        let base = RateDefaults::default();
        let d = &self.defaults;
        RateDefaults {
            spec_level: d.spec_level.clone().unwrap_or(base.spec_level),
            base_date: d.base_date.clone().unwrap_or(base.base_date),
            region: d.region.clone().unwrap_or(base.region),
            waste_percent: d.waste_percent.unwrap_or(base.waste_percent),
            ohp_percent: d.ohp_percent.unwrap_or(base.ohp_percent),
            source: d.source.clone().unwrap_or(base.source),
        }
    }

    fn qa_thresholds(&self) -> QaThresholds {
        let base = QaThresholds::default();
        QaThresholds {
            expected_total: self.qa.expected_total.unwrap_or(base.expected_total),
            min_rate: self.qa.min_rate.unwrap_or(base.min_rate),
            max_rate: self.qa.max_rate.unwrap_or(base.max_rate),
            issue_limit: self.qa.issue_limit.unwrap_or(base.issue_limit),
        }
    }
}

impl Validate for RatesConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[project]
name = "nz-seed"
market = "NZ"
run_date = "2025-02-01"

[paths]
base_dir = "/data/rates"
rates_dir = "nz/seed-data/composite_rates"

[defaults]
region = "Auckland"
waste_percent = 7
ohp_percent = 12.5

[qa]
expected_total = 120
max_rate = 8000

[monitoring]
enabled = true
"#;

        let config = RatesConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.project_name(), "nz-seed");
        assert_eq!(config.market(), Market::Nz);
        assert_eq!(config.run_date(), NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(config.base_dir(), "/data/rates");
        assert_eq!(config.rates_dir(), "nz/seed-data/composite_rates");
        assert_eq!(config.crosswalk_file(), DEFAULT_CROSSWALK_FILE);
        assert_eq!(config.rate_defaults().waste_percent, 7.0);
        assert_eq!(config.rate_defaults().spec_level, "Standard");
        assert_eq!(config.qa_thresholds().expected_total, 120);
        assert_eq!(config.qa_thresholds().min_rate, 10.0);
        assert!(config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = RatesConfig::from_toml_str("").unwrap();
        assert_eq!(config.market(), Market::Au);
        assert_eq!(config.index_file(), DEFAULT_INDEX_FILE);
        assert_eq!(config.rate_defaults(), RateDefaults::default());
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("CONTECH_RATES_TEST_BASE", "/tmp/rates-ws");

        let config = RatesConfig::from_toml_str(
            r#"
[paths]
base_dir = "${CONTECH_RATES_TEST_BASE}"
reports_dir = "${CONTECH_RATES_UNSET_VAR}/reports"
"#,
        )
        .unwrap();
        assert_eq!(config.base_dir(), "/tmp/rates-ws");
        assert_eq!(config.reports_dir(), "${CONTECH_RATES_UNSET_VAR}/reports");

        std::env::remove_var("CONTECH_RATES_TEST_BASE");
    }

    #[test]
    fn test_config_validation() {
        let bad_market = RatesConfig::from_toml_str("[project]\nmarket = \"FR\"\n").unwrap();
        assert!(matches!(
            bad_market.validate(),
            Err(RatesError::InvalidConfigValueError { ref field, .. }) if field == "project.market"
        ));

        let bad_range = RatesConfig::from_toml_str("[qa]\nmin_rate = 100\nmax_rate = 50\n").unwrap();
        assert!(bad_range.validate().is_err());

        let bad_percent = RatesConfig::from_toml_str("[defaults]\nohp_percent = 140\n").unwrap();
        assert!(bad_percent.validate().is_err());

        let bad_date = RatesConfig::from_toml_str("[project]\nrun_date = \"01/02/2025\"\n").unwrap();
        assert!(bad_date.validate().is_err());

        let empty_path = RatesConfig::from_toml_str("[paths]\nrates_dir = \"\"\n").unwrap();
        assert!(empty_path.validate().is_err());
    }

    #[test]
    fn test_invalid_toml_reports_parsing_field() {
        let err = RatesConfig::from_toml_str("[project\nname = 1").unwrap_err();
        assert!(matches!(
            err,
            RatesError::ConfigValidationError { ref field, .. } if field == "toml_parsing"
        ));
    }

    #[test]
    fn test_config_from_file_and_missing_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[project]\nname = \"file-test\"\n")
            .unwrap();

        let config = RatesConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.project_name(), "file-test");

        let dir = tempfile::tempdir().unwrap();
        let fallback = RatesConfig::load_or_default(dir.path().join("missing.toml")).unwrap();
        assert_eq!(fallback.project_name(), "contech-rates");
    }
}
