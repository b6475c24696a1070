pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::prompt::PromptPart;
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "contech-rates")]
#[command(about = "Composite rate seed data: generate, curate and check")]
pub struct Cli {
    #[arg(long, global = true, default_value = "rates.toml")]
    pub config: String,

    /// Overrides paths.base_dir
    #[arg(long, global = true)]
    pub base_dir: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log CPU and memory per pipeline phase")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Build group files and the index from the staging extract
    Generate,
    /// Apply standard waste factors and recompute totals
    UpdateWaste,
    /// Check waste factor compliance and nett total consistency
    ValidateWaste,
    /// Map rates to the NRM1 → NRM2 crosswalk
    EnrichNrm,
    /// Re-map unmatched facilitating and services rates
    FixNrm,
    /// Link rate components to the resource library
    LinkResources,
    /// Seed rate QA report
    QaSeed,
    /// Validate a labour productivity CSV export
    QaLabour {
        /// CSV path relative to the base directory
        csv: String,
        /// Output file stem inside the reports directory
        #[arg(long, default_value = "labour_validation")]
        output: String,
    },
    /// Check a golden composite JSON file against the heuristics
    CheckComposite {
        file: String,
        /// Productivity activity, e.g. tiling_floor
        #[arg(long)]
        activity: Option<String>,
        /// Waste guideline material, e.g. tiles
        #[arg(long)]
        material: Option<String>,
    },
    /// Adjust one rate for conditions, spec level, region, escalation and GST
    Adjust {
        /// Rate code
        code: String,
        /// Condition factor codes
        #[arg(long = "factor", value_delimiter = ',')]
        factors: Vec<String>,
        #[arg(long)]
        spec_level: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Lookup date (YYYY-MM-DD), defaults to the run date
        #[arg(long)]
        on: Option<String>,
        /// Target period, e.g. 2025Q3
        #[arg(long)]
        escalate_to: Option<String>,
        #[arg(long)]
        gst: bool,
    },
    /// Print the composite builder prompt bundle
    Prompt {
        #[arg(value_enum, default_value = "bundle")]
        part: PromptPart,
    },
    /// Integrity checks over the reference data file
    CheckReference,
}

/// "2025Q3" → (2025, 3)
pub fn parse_period(value: &str) -> crate::utils::error::Result<(i32, u8)> {
    let invalid = || crate::utils::error::RatesError::InvalidConfigValueError {
        field: "escalate_to".to_string(),
        value: value.to_string(),
        reason: "Expected YYYYQn, e.g. 2025Q3".to_string(),
    };
    let (year, quarter) = value
        .trim()
        .to_uppercase()
        .split_once('Q')
        .map(|(y, q)| (y.to_string(), q.to_string()))
        .ok_or_else(invalid)?;
    let year = year.parse::<i32>().map_err(|_| invalid())?;
    let quarter = quarter.parse::<u8>().map_err(|_| invalid())?;
    if !(1..=4).contains(&quarter) {
        return Err(invalid());
    }
    Ok((year, quarter))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_period() {
        assert_eq!(parse_period("2025Q3").unwrap(), (2025, 3));
        assert_eq!(parse_period("2024q1").unwrap(), (2024, 1));
        assert!(parse_period("2025Q5").is_err());
        assert!(parse_period("2025-03").is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "contech-rates",
            "--verbose",
            "adjust",
            "3.1.1",
            "--factor",
            "CF_HEIGHT_3_STOREY,CF_LOCATION_CBD",
            "--escalate-to",
            "2025Q3",
            "--gst",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, "rates.toml");
        match cli.command {
            Command::Adjust { code, factors, gst, .. } => {
                assert_eq!(code, "3.1.1");
                assert_eq!(factors.len(), 2);
                assert!(gst);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let prompt = Cli::try_parse_from(["contech-rates", "prompt", "schema"]).unwrap();
        assert!(matches!(prompt.command, Command::Prompt { part: PromptPart::Schema }));
    }
}
