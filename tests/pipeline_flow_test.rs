use contech_rates::app::pipelines::{
    GeneratePipeline, LabourQaPipeline, NrmEnrichPipeline, NrmFixPipeline, ResourceLinkPipeline,
    SeedQaPipeline, WasteUpdatePipeline, WasteValidationPipeline,
};
use contech_rates::core::{RateGroupFile, RateIndex};
use contech_rates::domain::enums::MappingConfidence;
use contech_rates::utils::error::{ErrorSeverity, RatesError};
use contech_rates::{EtlEngine, LocalStorage, RatesConfig};
use std::path::Path;
use tempfile::TempDir;

const CONFIG_TOML: &str = r#"
[project]
name = "flow-test"
market = "AU"
run_date = "2025-03-01"

[paths]
staging_file = "staging/rate_descriptions.json"
rates_dir = "rates"
index_file = "rates_index.json"
crosswalk_file = "nrm/crosswalk.csv"
resources_dir = "resources"
reports_dir = "reports"
reference_file = "reference/reference_data.json"

[qa]
expected_total = 4
"#;

const STAGING_JSON: &str = r#"{
  "rates": [
    {"code": "2.1.1", "description": "Timber stud wall framing", "unit": "m2", "nrm_group": 2, "nrm1_code": "2.1"},
    {"code": "3.1.1", "description": "Ceramic wall tiling to wet areas", "unit": "m2", "nrm_group": 3, "nrm1_code": "3.1"},
    {"code": "3.2.1", "description": "Carpet to floors", "unit": "m2", "nrm_group": 3, "nrm1_code": "3.2"},
    {"code": "5.4.1", "description": "Hot water heater", "unit": "nr", "nrm_group": 5, "nrm1_code": "5.4"}
  ]
}"#;

const CROSSWALK_CSV: &str = "\
nrm1_l4_code,nrm1_l3_code,nrm1_l2_code,nrm1_description,nrm1_unit,nrm2_primary_ws,nrm2_primary_ws_name,nrm2_primary_items,nrm2_secondary_ws,confidence,matched_keywords,notes
3.1.1.1,3.1.1,3.1,Finishes to walls: plaster,m2,28,Floor wall ceiling and roof finishings,28.7,29,High,\"plaster,walls\",
3.1.1.2,3.1.1,3.1,Finishes to walls: ceramic tiling,m2,28,Floor wall ceiling and roof finishings,28.9,,Medium,\"tiles,tiling,ceramic\",
3.2.1.1,3.2.1,3.2,Finishes to floors: carpet,m2,28,Floor wall ceiling and roof finishings,28.12,,High,carpet,
5.4.1.2,5.4.1,5.4,Hot water installations,nr,38,Mechanical services,38.2,,High,\"hot water,heater\",
";

const CLEAN_LABOUR_CSV: &str = "\
id,activity_type,trade_category,output_unit,hours_per_unit,confidence_score,description,source_type,minimum_hours,market
a1,tiling_floor,tiler,m2,0.4,0.9,Floor tiles,survey,,AU
a2,painting_walls,painter,m2,0.15,0.7,Walls,survey,,AU
";

fn write(base: &Path, rel: &str, content: &str) {
    let path = base.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn setup() -> (TempDir, LocalStorage, RatesConfig) {
    let temp_dir = TempDir::new().unwrap();
    write(temp_dir.path(), "staging/rate_descriptions.json", STAGING_JSON);
    write(temp_dir.path(), "nrm/crosswalk.csv", CROSSWALK_CSV);

    let storage = LocalStorage::new(temp_dir.path());
    let config = RatesConfig::from_toml_str(CONFIG_TOML).unwrap();
    (temp_dir, storage, config)
}

fn read_groups(base: &Path) -> Vec<RateGroupFile> {
    let mut names: Vec<_> = std::fs::read_dir(base.join("rates"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with("group_"))
        .collect();
    names.sort();
    names
        .iter()
        .map(|n| serde_json::from_slice(&std::fs::read(base.join("rates").join(n)).unwrap()).unwrap())
        .collect()
}

#[tokio::test]
async fn test_generate_writes_groups_and_index() {
    let (temp_dir, storage, config) = setup();

    let engine = EtlEngine::new(GeneratePipeline::new(storage, config));
    let output = engine.run().await.unwrap();
    assert_eq!(output, "rates");

    let groups = read_groups(temp_dir.path());
    assert_eq!(groups.len(), 3);
    assert_eq!(groups.iter().map(|g| g.rates.len()).sum::<usize>(), 4);
    for group in &groups {
        assert_eq!(group.meta.count, group.rates.len());
        for rate in &group.rates {
            assert!(rate.total_rate > rate.nett_total);
        }
    }

    let index: RateIndex =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join("rates_index.json")).unwrap()).unwrap();
    assert_eq!(index.total, 4);
    assert_eq!(index.groups.len(), 3);
}

#[tokio::test]
async fn test_full_curation_flow() {
    let (temp_dir, storage, config) = setup();
    let base = temp_dir.path();

    EtlEngine::new(GeneratePipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();

    // Waste update then validation over the updated files
    let report = EtlEngine::new(WasteUpdatePipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    assert_eq!(report, "reports/waste_factor_update_report.json");
    let update: serde_json::Value =
        serde_json::from_slice(&std::fs::read(base.join(&report)).unwrap()).unwrap();
    assert_eq!(update["total_composites"], 4);
    assert!(update["timestamp"].is_string());

    EtlEngine::new(WasteValidationPipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    assert!(base.join("reports/waste_factor_validation_report.json").exists());

    // NRM enrichment
    let qa_path = EtlEngine::new(NrmEnrichPipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    let qa = std::fs::read_to_string(base.join(&qa_path)).unwrap();
    assert!(qa.starts_with("# NRM Mapping QA Report"));

    let groups = read_groups(base);
    let tiling = groups
        .iter()
        .flat_map(|g| g.rates.iter())
        .find(|r| r.code == "3.1.1")
        .unwrap();
    assert!(tiling.nrm1_l4_code.as_deref().unwrap().starts_with("3.1.1."));
    assert!(tiling.nrm1_code.is_none());
    for group in &groups {
        assert_eq!(group.meta.crosswalk_version.as_deref(), Some("crosswalk.csv"));
        assert!(group.rates.iter().all(|r| r.mapping_confidence.is_some()));
    }
    let unmatched = groups
        .iter()
        .flat_map(|g| g.rates.iter())
        .find(|r| r.code == "2.1.1")
        .unwrap();
    assert_eq!(unmatched.mapping_confidence, Some(MappingConfidence::Unmatched));

    EtlEngine::new(NrmFixPipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    let fixes: serde_json::Value =
        serde_json::from_slice(&std::fs::read(base.join("reports/nrm-manual-fixes.json")).unwrap()).unwrap();
    assert!(fixes.is_array());

    // Resource linking without a labour-rates.json still links plant and gangs
    let link_report = EtlEngine::new(ResourceLinkPipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    let link_qa = std::fs::read_to_string(base.join(&link_report)).unwrap();
    assert!(link_qa.starts_with("# Resource Linking QA Report"));
    for group in read_groups(base) {
        assert_eq!(group.meta.resource_linked, Some(true));
        assert_eq!(group.meta.transformed.as_deref(), Some("2025-03-01"));
        for rate in &group.rates {
            let components = rate.components.as_ref().unwrap();
            assert!(!components.labour.is_empty());
            assert!(rate.labour.is_empty());
        }
    }

    // Seed QA reads the index alongside the linked files
    let seed_report = EtlEngine::new(SeedQaPipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();
    let seed_qa = std::fs::read_to_string(base.join(&seed_report)).unwrap();
    assert!(seed_qa.starts_with("# Seed Rates QA Validation Report"));
    assert!(seed_qa.contains("rates_index.json"));
}

#[tokio::test]
async fn test_validate_waste_fails_on_tampered_totals() {
    let (temp_dir, storage, config) = setup();
    EtlEngine::new(GeneratePipeline::new(storage.clone(), config.clone()))
        .run()
        .await
        .unwrap();

    let rates_dir = temp_dir.path().join("rates");
    let name = std::fs::read_dir(&rates_dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| p.file_name().unwrap().to_string_lossy().starts_with("group_"))
        .unwrap();
    let mut group: RateGroupFile = serde_json::from_slice(&std::fs::read(&name).unwrap()).unwrap();
    group.rates[0].nett_total += 50.0;
    std::fs::write(&name, serde_json::to_vec_pretty(&group).unwrap()).unwrap();

    let err = EtlEngine::new(WasteValidationPipeline::new(storage, config))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RatesError::ValidationError { .. }));
    assert_eq!(err.severity(), ErrorSeverity::Medium);
    // the report is still written
    assert!(temp_dir
        .path()
        .join("reports/waste_factor_validation_report.json")
        .exists());
}

#[tokio::test]
async fn test_pipelines_report_missing_group_files() {
    let (temp_dir, storage, config) = setup();
    std::fs::create_dir_all(temp_dir.path().join("rates")).unwrap();

    let err = EtlEngine::new(SeedQaPipeline::new(storage, config))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RatesError::NotFound { .. }));
}

#[tokio::test]
async fn test_labour_qa_outputs_and_failure() {
    let (temp_dir, storage, config) = setup();
    write(temp_dir.path(), "labour/clean.csv", CLEAN_LABOUR_CSV);
    write(
        temp_dir.path(),
        "labour/broken.csv",
        "id,activity_type,trade_category\nx,tiling,tiler\n",
    );

    let summary_path = EtlEngine::new(LabourQaPipeline::new(
        storage.clone(),
        config.clone(),
        "labour/clean.csv",
        "clean",
    ))
    .run()
    .await
    .unwrap();
    assert_eq!(summary_path, "reports/clean_summary.json");
    let summary: serde_json::Value =
        serde_json::from_slice(&std::fs::read(temp_dir.path().join(&summary_path)).unwrap()).unwrap();
    assert_eq!(summary["total_records"], 2);
    assert_eq!(summary["csv_file"], "labour/clean.csv");
    assert!(temp_dir.path().join("reports/clean_report.csv").exists());

    let err = EtlEngine::new(LabourQaPipeline::new(storage, config, "labour/broken.csv", "broken"))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RatesError::ValidationError { .. }));
    assert!(temp_dir.path().join("reports/broken_summary.json").exists());
}
