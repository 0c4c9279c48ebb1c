mod args;

use anyhow::{Context, Result};
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use convertfun_core::{
    converter::Converter, format::detect, load_config, load_config_from_env, metrics,
    orchestrator::wait_all, planner::is_eligible, validate_config, ArtifactStore, Config,
    ConversionOrchestrator, ConversionStatus, DirectoryRetriever, DownloadTrigger, FileIdentity,
    InputFile, MemoryArtifactStore, Operation, StrategyConverter,
};

use args::CliArgs;

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_tracing(args.json);

    match run(args).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("convertfun failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,convertfun=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Per-file line of the final report.
#[derive(Debug, Serialize)]
struct FileReport {
    identity: FileIdentity,
    name: String,
    format: Option<String>,
    status: ConversionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    allowed: Vec<Operation>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    files: Vec<FileReport>,
    batch_operations: Vec<Operation>,
    total_converted: u64,
    written: Vec<PathBuf>,
}

/// Runs one session. Returns `Ok(false)` when any file ended in error.
async fn run(args: CliArgs) -> Result<bool> {
    let config = load(&args)?;
    info!(
        "Loaded configuration (identity: {:?}, batch: {:?}, output: {})",
        config.orchestrator.identity_scheme,
        config.orchestrator.batch_policy,
        config.output.directory.display()
    );

    let converter = StrategyConverter::from_config(&config.converter);
    converter
        .validate()
        .await
        .context("Converter is not usable")?;

    let store = Arc::new(MemoryArtifactStore::new());
    let orchestrator = ConversionOrchestrator::new(
        config.orchestrator.clone(),
        Arc::new(converter),
        store.clone(),
    );

    let trigger = DownloadTrigger::new(
        store.clone() as Arc<dyn ArtifactStore>,
        Arc::new(DirectoryRetriever::new(config.output.clone())),
    )
    .spawn(orchestrator.subscribe_offers().await);

    for path in &args.files {
        let file = InputFile::from_path(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        orchestrator
            .add_file(file)
            .await
            .with_context(|| format!("Failed to add {}", path.display()))?;
    }

    if let Some(operation) = args.operation {
        for (identity, file) in orchestrator.pending_files().await {
            if !is_eligible(&file, operation) {
                warn!("Skipping {} ({}): {} is not available", file.name(), identity, operation);
            }
        }

        let attempts = orchestrator.convert_all(operation).await;
        info!("Converting {} file(s) to {}", attempts.len(), operation);
        for result in wait_all(attempts).await {
            if let Err(e) = result {
                warn!("Conversion attempt did not finish: {}", e);
            }
        }
    }

    let report = build_report(&orchestrator, args.operation.is_none()).await;
    let all_ok = report
        .files
        .iter()
        .all(|f| f.status != ConversionStatus::Error);

    drop(orchestrator);
    let summary = trigger.await.context("Download trigger stopped unexpectedly")?;
    if summary.failed > 0 {
        warn!("{} artifact(s) could not be written", summary.failed);
    }

    let report = RunReport {
        written: summary.retrieved,
        ..report
    };
    print_report(&report, args.json)?;

    if args.metrics {
        print_metrics()?;
    }

    Ok(all_ok && summary.failed == 0)
}

fn load(args: &CliArgs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_config_from_env().context("Failed to load config from environment")?,
    };

    if let Some(dir) = &args.output {
        config.output.directory = dir.clone();
    }
    if args.overwrite {
        config.output.overwrite = true;
    }

    validate_config(&config).context("Invalid configuration")?;
    Ok(config)
}

async fn build_report(orchestrator: &ConversionOrchestrator, list_allowed: bool) -> RunReport {
    let mut files = Vec::new();
    for (identity, file) in orchestrator.files().await {
        let format = detect(&file);
        let record = orchestrator.record(&identity).await.unwrap_or_default();
        let allowed = if list_allowed {
            format
                .map(|f| f.descriptor().allowed_operations.to_vec())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        files.push(FileReport {
            identity,
            name: file.name().to_string(),
            format: format.map(|f| f.descriptor().label.to_string()),
            status: record.status,
            failure: record.failure.map(|k| k.to_string()),
            allowed,
        });
    }

    RunReport {
        files,
        batch_operations: orchestrator.batch_operations().await,
        total_converted: orchestrator.total_converted().await,
        written: Vec::new(),
    }
}

fn print_report(report: &RunReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(report)?);
        return Ok(());
    }

    for file in &report.files {
        let format = file.format.as_deref().unwrap_or("unknown");
        let detail = match &file.failure {
            Some(failure) => format!("{} ({})", file.status, failure),
            None if !file.allowed.is_empty() => join_operations(&file.allowed),
            None => file.status.to_string(),
        };
        println!(
            "{:<6} {:<32} {:<6} {}",
            file.identity.as_str(),
            file.name,
            format,
            detail
        );
    }

    if !report.batch_operations.is_empty() {
        println!("Convert all to: {}", join_operations(&report.batch_operations));
    }
    for path in &report.written {
        println!("Wrote {}", path.display());
    }
    println!("Total converted: {}", report.total_converted);
    Ok(())
}

fn join_operations(operations: &[Operation]) -> String {
    let labels: Vec<String> = operations.iter().map(|op| op.to_string()).collect();
    labels.join(" ")
}

fn print_metrics() -> Result<()> {
    let registry = Registry::new();
    for metric in metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }

    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&registry.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    eprint!("{}", String::from_utf8_lossy(&buffer));
    Ok(())
}
