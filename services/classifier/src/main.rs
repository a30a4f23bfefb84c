use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use waste_classifier::{
    report, ClassificationSession, Config, InferenceClient, ReportFormat, S3ObjectStore,
    SourceFile, StorageUploader,
};

/// Classify a photo of a waste item and write a recyclability report
#[derive(Debug, Parser)]
#[command(name = "waste-classifier", version)]
struct Args {
    /// Image to classify
    image: PathBuf,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "CLASSIFIER_CONFIG")]
    config: Option<PathBuf>,

    /// Where to write the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = FormatArg::Text)]
    format: FormatArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

impl From<FormatArg> for ReportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => ReportFormat::Text,
            FormatArg::Json => ReportFormat::Json,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    init_tracing(&config.service.log_level);

    info!(service = %config.service.name, image = %args.image.display(), "Starting classification");

    let store = S3ObjectStore::new(&config.storage)
        .await
        .context("Failed to initialize object store")?;
    let classifier =
        InferenceClient::new(&config.inference).context("Failed to initialize inference client")?;

    let session = ClassificationSession::new(StorageUploader::new(Arc::new(store)), Arc::new(classifier))
        .with_limits(config.upload.clone());

    let file = SourceFile::from_path(&args.image).await?;

    let result = tokio::select! {
        outcome = run(&session, file) => outcome,
        _ = shutdown_signal() => {
            warn!(state = %session.state(), "Interrupted, resetting session");
            session.reset();
            anyhow::bail!("Classification interrupted");
        }
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Classification failed");
            return Err(e);
        }
    };

    let format = ReportFormat::from(args.format);
    let document = report::generate(&result, &config.report, chrono::Utc::now())
        .render(format)
        .context("Failed to render report")?;

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!("waste-classification-report.{}", format.extension()))
    });

    tokio::fs::write(&output, document)
        .await
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    info!(
        category = %result.category,
        confidence_percent = result.confidence_percent(),
        report = %output.display(),
        "Report written"
    );

    Ok(())
}

/// Upload then classify one file
async fn run(
    session: &ClassificationSession,
    file: SourceFile,
) -> Result<waste_classifier::ClassificationResult> {
    let stored = session
        .select_file(file)
        .await
        .context("Failed to upload image")?;

    info!(storage_key = %stored.key, "Image staged for classification");

    session.classify().await.context("Failed to classify image")
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();
}

/// Wait for shutdown signal (SIGINT or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
