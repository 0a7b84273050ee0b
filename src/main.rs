use clap::Parser;
use report_etl::config::cli::Command;
use report_etl::core::Pipeline;
use report_etl::domain::model::LoadSummary;
use report_etl::utils::{logger, validation::Validate};
use report_etl::{
    AppConfig, ChartCapability, ChartRenderer, CliArgs, EtlEngine, EtlError, HBaseDemoPipeline,
    IntegrationPipeline, LocalStorage, MongoQueryPipeline, SessionLoadPipeline, ShellExecutor,
};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config = match args.resolve_config().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Configuration validation failed: {}", e);
            tracing::error!("Suggestion: {}", e.recovery_suggestion());
            eprintln!("{}", e.user_friendly_message());
            std::process::exit(1);
        }
    };
    tracing::debug!("Resolved configuration: {:?}", config);

    if let Err(e) = run(&args.command, config).await {
        tracing::error!(
            "Run failed: {} (category: {:?}, severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        eprintln!("Suggestion: {}", e.recovery_suggestion());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }
}

async fn run(command: &Command, config: AppConfig) -> Result<(), EtlError> {
    let storage = LocalStorage::new(config.output.root.clone());
    let executor = ShellExecutor::from_config(&config);
    let chart_renderer = || {
        let capability =
            ChartCapability::detect(config.output.charts, config.output.chart_font.as_deref());
        ChartRenderer::new(config.output.root.clone(), capability)
    };

    match command {
        Command::Mongo => {
            let charts = chart_renderer();
            run_pipeline(MongoQueryPipeline::new(storage, executor, config, charts)).await
        }
        Command::Hbase => run_pipeline(HBaseDemoPipeline::new(storage, executor, config)).await,
        Command::LoadSessions { .. } => {
            let sessions = LocalStorage::new(config.sessions.input_dir.clone());
            run_pipeline(SessionLoadPipeline::new(sessions, executor, config)).await
        }
        Command::Integrate => {
            let charts = chart_renderer();
            run_pipeline(IntegrationPipeline::new(storage, config, charts)).await
        }
        Command::All => {
            let charts = chart_renderer();
            run_pipeline(MongoQueryPipeline::new(
                storage.clone(),
                executor,
                config.clone(),
                charts.clone(),
            ))
            .await?;
            run_pipeline(IntegrationPipeline::new(storage, config, charts)).await
        }
    }
}

async fn run_pipeline<P: Pipeline>(pipeline: P) -> Result<(), EtlError> {
    let summary = EtlEngine::new(pipeline).run().await?;
    report(&summary);
    Ok(())
}

fn report(summary: &LoadSummary) {
    println!("Data source: {}", summary.origin);
    for path in &summary.written {
        println!("  written  {}", path);
    }
    for path in &summary.skipped {
        println!("  skipped  {}", path);
    }
    for (path, reason) in &summary.failed {
        println!("  failed   {} ({})", path, reason);
    }
    if summary.is_complete() {
        tracing::info!("Completed successfully");
    } else {
        tracing::warn!("Completed with {} failed outputs", summary.failed.len());
    }
}
