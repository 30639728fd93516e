//! Command-line shell for the dxflow pipeline.
//!
//! Runs one PDF through every stage, prints progress to stderr and writes
//! the resulting notes as JSON.

use anyhow::{bail, Context, Result};
use clap::Parser;
use dxflow::prelude::*;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Drive a medical document through OCR, redaction and HCC coding.
#[derive(Parser, Debug)]
#[command(
    name = "dxflow",
    version,
    about = "Drive a medical document through OCR, redaction and HCC coding",
    arg_required_else_help = true
)]
struct Cli {
    /// PDF document to process.
    file: PathBuf,

    /// OCR backend: azure or custom-vlm.
    #[arg(long, env = "DXFLOW_OCR_MODEL", default_value_t = OcrModel::Azure)]
    ocr_model: OcrModel,

    /// Base URL of the processing services (falls back to DXFLOW_API_URL).
    #[arg(long)]
    api_url: Option<String>,

    /// Per-request timeout in seconds (falls back to DXFLOW_TIMEOUT_SECONDS).
    #[arg(long)]
    timeout: Option<f64>,

    /// Write the result JSON to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Save the document fetched back from the upload service here.
    #[arg(long)]
    document_out: Option<PathBuf>,

    /// Emit logs as JSON lines.
    #[arg(long, env = "DXFLOW_JSON_LOGS")]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn client_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = ClientConfig::from_env().context("Invalid environment configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.with_base_url(url.clone());
    }
    if let Some(seconds) = cli.timeout {
        config = config.with_timeout(seconds);
    }
    config.validate().context("Invalid API configuration")?;
    Ok(config)
}

/// Progress line text for the stage named `name` in an event.
fn stage_label(name: &str) -> String {
    match descriptor_for(name) {
        Some(d) => format!("{} ({} -> {})", d.stage.label(), d.input, d.output),
        None => PipelineStage::ALL
            .iter()
            .find(|stage| stage.as_str() == name)
            .map_or_else(|| name.to_string(), |stage| stage.label().to_string()),
    }
}

/// Prints one line per completed stage until the channel closes.
async fn print_progress(mut events: tokio::sync::broadcast::Receiver<PipelineEvent>) {
    loop {
        match events.recv().await {
            Ok(event) if event.event_type == "stage.completed" => {
                let Some(progress) = event.progress() else {
                    continue;
                };
                let label = event.stage().map_or_else(|| "?".to_string(), stage_label);
                eprintln!("[{progress}/{}] {label}", PipelineStage::MAX_PROGRESS);
            }
            Ok(event) if event.event_type == "pipeline.failed" => {
                let message = event
                    .data
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown error");
                eprintln!("Failed: {message}");
            }
            Ok(_) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => break,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let file = DocumentFile::from_path(&cli.file)
        .await
        .with_context(|| format!("Failed to read {}", cli.file.display()))?;
    if !file.is_pdf() {
        bail!("Please upload a PDF file");
    }

    let config = client_config(&cli)?;
    info!(base_url = %config.base_url, ocr_model = %cli.ocr_model, "Starting pipeline");
    let client = HttpStageClient::new(config).context("Failed to build HTTP client")?;

    let broadcast = Arc::new(BroadcastEventSink::new(64));
    let sink = FanoutEventSink::new()
        .with_sink(broadcast.clone())
        .with_sink(Arc::new(LoggingEventSink::debug()));
    let printer = tokio::spawn(print_progress(broadcast.subscribe()));
    drop(broadcast);

    let orchestrator = PipelineOrchestrator::new(Arc::new(client)).with_event_sink(Arc::new(sink));
    let result = orchestrator
        .execute(Some(file), Some(ApiConfiguration::new(cli.ocr_model)))
        .await;
    let progress = orchestrator.progress();

    // Dropping the orchestrator closes the event channel and stops the printer.
    drop(orchestrator);
    printer.await.context("Progress printer panicked")?;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(kind = err.kind(), progress, error = %err, "Pipeline failed");
            return Err(err).with_context(|| {
                format!(
                    "Pipeline stopped at step {progress} of {}",
                    PipelineStage::MAX_PROGRESS
                )
            });
        }
    };

    if let Some(path) = &cli.document_out {
        outcome
            .document
            .save(path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    let json = serde_json::to_string_pretty(&outcome).context("Failed to serialize result")?;
    match &cli.output {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write result")?;
        }
    }

    info!(run_id = %outcome.run_id, "Pipeline completed");
    Ok(())
}
