use clap::Parser;
use contech_rates::app::commands::{self, AdjustRequest};
use contech_rates::app::pipelines::{
    GeneratePipeline, LabourQaPipeline, NrmEnrichPipeline, NrmFixPipeline, ResourceLinkPipeline,
    SeedQaPipeline, WasteUpdatePipeline, WasteValidationPipeline,
};
use contech_rates::config::{parse_period, Command};
use contech_rates::core::composite::CheckOptions;
use contech_rates::core::prompt;
use contech_rates::core::{ConfigProvider, Pipeline};
use contech_rates::domain::model::Finding;
use contech_rates::utils::error::ErrorSeverity;
use contech_rates::utils::{logger, validation::Validate};
use contech_rates::{Cli, EtlEngine, LocalStorage, RatesConfig, RatesError, Result};

async fn run_pipeline<P: Pipeline>(pipeline: P, monitor_enabled: bool) -> Result<String> {
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);
    engine.run().await
}

fn print_findings(findings: &[Finding]) {
    if findings.is_empty() {
        println!("✅ No findings");
        return;
    }
    for f in findings {
        println!("[{}] {}: {}", f.severity, f.subject, f.message);
    }
}

fn exit_with(e: &RatesError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}

async fn dispatch(cli: Cli, config: RatesConfig, monitor_enabled: bool) -> Result<Option<String>> {
    let storage = LocalStorage::new(config.base_dir());

    let output = match cli.command {
        Command::Generate => {
            run_pipeline(GeneratePipeline::new(storage, config), monitor_enabled).await?
        }
        Command::UpdateWaste => {
            run_pipeline(WasteUpdatePipeline::new(storage, config), monitor_enabled).await?
        }
        Command::ValidateWaste => {
            run_pipeline(WasteValidationPipeline::new(storage, config), monitor_enabled).await?
        }
        Command::EnrichNrm => {
            run_pipeline(NrmEnrichPipeline::new(storage, config), monitor_enabled).await?
        }
        Command::FixNrm => run_pipeline(NrmFixPipeline::new(storage, config), monitor_enabled).await?,
        Command::LinkResources => {
            run_pipeline(ResourceLinkPipeline::new(storage, config), monitor_enabled).await?
        }
        Command::QaSeed => run_pipeline(SeedQaPipeline::new(storage, config), monitor_enabled).await?,
        Command::QaLabour { csv, output } => {
            let pipeline = LabourQaPipeline::new(storage, config, csv, output);
            run_pipeline(pipeline, monitor_enabled).await?
        }
        Command::CheckComposite {
            file,
            activity,
            material,
        } => {
            let options = CheckOptions { activity, material };
            let findings = commands::check_composite_file(&storage, &file, &options).await?;
            print_findings(&findings);
            commands::fail_on_blocking(&findings, &file)?;
            return Ok(None);
        }
        Command::Adjust {
            code,
            factors,
            spec_level,
            region,
            on,
            escalate_to,
            gst,
        } => {
            let request = AdjustRequest {
                code,
                condition_factors: factors,
                spec_level,
                region,
                on,
                escalate_to: escalate_to.as_deref().map(parse_period).transpose()?,
                include_gst: gst,
            };
            let adjusted = commands::adjust_rate(&storage, &config, &request).await?;
            println!("{}", serde_json::to_string_pretty(&adjusted)?);
            return Ok(None);
        }
        Command::Prompt { part } => {
            println!("{}", prompt::render(part)?);
            return Ok(None);
        }
        Command::CheckReference => {
            let findings = commands::check_reference(&storage, &config).await?;
            print_findings(&findings);
            commands::fail_on_blocking(&findings, config.reference_file())?;
            return Ok(None);
        }
    };
    Ok(Some(output))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    // 載入配置
    let mut config = match RatesConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => exit_with(&e),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.paths.base_dir = Some(base_dir.clone());
    }

    tracing::info!("Starting {}", config.project_name());
    if cli.verbose {
        tracing::debug!("CLI: {:?}", cli);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = cli.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    match dispatch(cli, config, monitor_enabled).await {
        Ok(Some(output_path)) => {
            tracing::info!("✅ Completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            println!("✅ Completed successfully!");
            println!("📁 Output saved to: {}", output_path);
        }
        Ok(None) => {}
        Err(e) => exit_with(&e),
    }

    Ok(())
}
