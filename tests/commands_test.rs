use contech_rates::app::commands::{
    adjust_rate, check_composite_file, check_reference, fail_on_blocking, AdjustRequest,
};
use contech_rates::app::pipelines::GeneratePipeline;
use contech_rates::core::composite::CheckOptions;
use contech_rates::core::prompt::{render, PromptPart};
use contech_rates::{EtlEngine, LocalStorage, RatesConfig, RatesError};
use std::path::Path;
use tempfile::TempDir;

const CONFIG_TOML: &str = r#"
[project]
run_date = "2025-06-01"

[paths]
staging_file = "staging.json"
rates_dir = "rates"
index_file = "rates/index.json"
reference_file = "reference.json"
"#;

const STAGING_JSON: &str = r#"{
  "rates": [
    {"code": "3.1.2", "description": "Skim coat", "unit": "m2", "nrm_group": 3, "nrm1_code": "3.1"}
  ]
}"#;

const REFERENCE_JSON: &str = r#"{
    "regions": [
        {"code": "SYD_METRO", "name": "Sydney Metro", "state": "NSW", "factor": 1.0, "is_baseline": true}
    ],
    "spec_levels": [
        {"code": "premium", "name": "Premium", "rank": 3, "cost_multiplier": 1.3}
    ],
    "condition_factors": [
        {"code": "CF_LOCATION_CBD", "category": "location", "name": "CBD access", "factor": 1.05, "applies_to": "All"}
    ],
    "regional_factors": [
        {"region_code": "SYD_METRO", "factor": 1.02, "effective_from": "2025-01-01", "effective_to": "2025-12-31"}
    ],
    "escalation_indices": [
        {"year": 2025, "quarter": 1, "index_value": 100.0, "base_year": 2025, "source": "ABS"},
        {"year": 2025, "quarter": 3, "index_value": 103.0, "base_year": 2025, "source": "ABS"}
    ],
    "gst_rates": [
        {"region_code": "SYD_METRO", "rate": 0.1, "effective_from": "2000-07-01"}
    ]
}"#;

fn write(base: &Path, rel: &str, content: &str) {
    let path = base.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

async fn generated_workspace() -> (TempDir, LocalStorage, RatesConfig) {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "staging.json", STAGING_JSON);
    write(temp_dir.path(), "reference.json", REFERENCE_JSON);

    let storage = LocalStorage::new(temp_dir.path());
    let config = RatesConfig::from_toml_str(CONFIG_TOML).unwrap();
    EtlEngine::new(GeneratePipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    (temp_dir, storage, config)
}

#[tokio::test]
async fn test_adjust_rate_from_generated_files() {
    let (_temp_dir, storage, config) = generated_workspace().await;

    let request = AdjustRequest {
        code: "3.1.2".to_string(),
        spec_level: Some("premium".to_string()),
        escalate_to: Some((2025, 3)),
        include_gst: true,
        ..Default::default()
    };
    let adjusted = adjust_rate(&storage, &config, &request).await.unwrap();
    assert_eq!(adjusted.code, "3.1.2");
    assert_eq!(adjusted.region_code.as_deref(), Some("SYD_METRO"));
    assert_eq!(adjusted.spec_multiplier, 1.3);
    assert_eq!(adjusted.escalation_ratio, 1.03);
    assert!(adjusted.total > adjusted.ex_gst);
    assert!(adjusted.ex_gst > adjusted.with_ohp);
}

#[tokio::test]
async fn test_adjust_rate_reports_unknown_inputs() {
    let (_temp_dir, storage, config) = generated_workspace().await;

    let missing = AdjustRequest {
        code: "9.9.9".to_string(),
        ..Default::default()
    };
    let err = adjust_rate(&storage, &config, &missing).await.unwrap_err();
    assert!(matches!(err, RatesError::NotFound { .. }));

    let bad_date = AdjustRequest {
        code: "3.1.2".to_string(),
        on: Some("01/06/2025".to_string()),
        ..Default::default()
    };
    let err = adjust_rate(&storage, &config, &bad_date).await.unwrap_err();
    assert!(matches!(err, RatesError::InvalidConfigValueError { .. }));
}

#[test]
fn test_check_reference_loads_file() {
    tokio_test::block_on(async {
        let (_temp_dir, storage, config) = generated_workspace().await;
        assert!(check_reference(&storage, &config).await.is_ok());
    });
}

#[tokio::test]
async fn test_check_composite_file_with_example() {
    let temp_dir = TempDir::new().unwrap();
    let example = render(PromptPart::Example).unwrap();
    write(temp_dir.path(), "golden/GC-AU-0051.json", &example);
    let storage = LocalStorage::new(temp_dir.path());

    let options = CheckOptions::default();
    let findings = check_composite_file(&storage, "golden/GC-AU-0051.json", &options)
        .await
        .unwrap();
    assert!(fail_on_blocking(&findings, "GC-AU-0051").is_ok());

    write(temp_dir.path(), "golden/broken.json", "{\"code\": 1}");
    let err = check_composite_file(&storage, "golden/broken.json", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, RatesError::SerializationError(_)));
}
