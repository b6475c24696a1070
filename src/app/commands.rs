//! One-shot commands that read inputs and return a result without the
//! extract → transform → load cycle.

use chrono::NaiveDate;

use crate::app::pipelines::load_group_files;
use crate::core::adjust::{adjust, AdjustedRate, AdjustmentInputs};
use crate::core::composite::{check_composite, CheckOptions, GoldenComposite};
use crate::core::{ConfigProvider, Storage};
use crate::domain::enums::Severity;
use crate::domain::model::Finding;
use crate::domain::reference::ReferenceData;
use crate::utils::error::{RatesError, Result};

/// Options of the `adjust` command before date parsing.
#[derive(Debug, Clone, Default)]
pub struct AdjustRequest {
    pub code: String,
    pub condition_factors: Vec<String>,
    pub spec_level: Option<String>,
    pub region: Option<String>,
    /// YYYY-MM-DD
    pub on: Option<String>,
    pub escalate_to: Option<(i32, u8)>,
    pub include_gst: bool,
}

pub async fn load_reference<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<ReferenceData> {
    let bytes = storage.read_file(config.reference_file()).await?;
    ReferenceData::from_json(&bytes)
}

fn parse_on(value: Option<&str>, default: NaiveDate) -> Result<NaiveDate> {
    match value {
        None => Ok(default),
        Some(v) => NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").map_err(|_| {
            RatesError::InvalidConfigValueError {
                field: "on".to_string(),
                value: v.to_string(),
                reason: "Expected YYYY-MM-DD".to_string(),
            }
        }),
    }
}

/// Finds `request.code` across the group files and prices it against the
/// reference data.
pub async fn adjust_rate<S: Storage, C: ConfigProvider>(
    storage: &S,
    config: &C,
    request: &AdjustRequest,
) -> Result<AdjustedRate> {
    let files = load_group_files(storage, config.rates_dir()).await?;
    let rate = files
        .iter()
        .flat_map(|f| f.data.rates.iter())
        .find(|r| r.code == request.code)
        .ok_or_else(|| RatesError::not_found(format!("rate {}", request.code)))?;

    let reference = load_reference(storage, config).await?;
    let inputs = AdjustmentInputs {
        condition_factors: request.condition_factors.clone(),
        spec_level: request.spec_level.clone(),
        region: request.region.clone(),
        on: parse_on(request.on.as_deref(), config.run_date())?,
        escalate_to: request.escalate_to,
        include_gst: request.include_gst,
    };
    let adjusted = adjust(rate, &inputs, &reference)?;
    tracing::info!(
        "{}: nett {:.2} → total {:.2}",
        adjusted.code,
        adjusted.nett_total,
        adjusted.total
    );
    Ok(adjusted)
}

pub async fn check_reference<S: Storage, C: ConfigProvider>(storage: &S, config: &C) -> Result<Vec<Finding>> {
    let reference = load_reference(storage, config).await?;
    Ok(reference.validate())
}

pub async fn check_composite_file<S: Storage>(
    storage: &S,
    path: &str,
    options: &CheckOptions,
) -> Result<Vec<Finding>> {
    let bytes = storage.read_file(path).await?;
    let composite = GoldenComposite::from_json(&bytes)?;
    Ok(check_composite(&composite, options))
}

/// Validation error when any finding is HIGH or worse.
pub fn fail_on_blocking(findings: &[Finding], what: &str) -> Result<()> {
    let blocking = findings
        .iter()
        .filter(|f| f.severity >= Severity::High)
        .count();
    if blocking > 0 {
        return Err(RatesError::validation(format!(
            "{} has {} high or critical findings",
            what, blocking
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_on_defaults_to_run_date() {
        let run = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(parse_on(None, run).unwrap(), run);
        assert_eq!(
            parse_on(Some("2025-08-15"), run).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
        );
        assert!(parse_on(Some("15/08/2025"), run).is_err());
    }

    #[test]
    fn test_fail_on_blocking() {
        let minor = vec![Finding::new(Severity::Medium, "GC-AU-0001", "scope missing")];
        assert!(fail_on_blocking(&minor, "composite").is_ok());

        let blocking = vec![
            Finding::new(Severity::Low, "GC-AU-0001", "note"),
            Finding::new(Severity::High, "GC-AU-0001", "bad unit"),
        ];
        let err = fail_on_blocking(&blocking, "composite").unwrap_err();
        assert!(err.to_string().contains("1 high or critical"));
    }
}
