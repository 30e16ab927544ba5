//! # Teams Probe CLI
//!
//! Command-line interface for the Teams Probe library (`teams_probe_core`).
//! This binary parses arguments, sets up configuration, normalizes the
//! credential, and runs either a single lookup or the batch enumeration
//! pipeline, handling output.

use teams_probe_core::{
    enumerate_identities, initialize_client, normalize_bearer_token, probe_single_identity, Config,
    ConfigBuilder, EnumerationSummary, LookupService, ResultSink, Verdict,
};

// Dependencies specific to the CLI binary
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Validates email addresses against the Microsoft Teams search API.",
    long_about = "Users can be enumerated through the Teams search feature. Teams Probe validates an email address or a list of email addresses; for each address that exists, the account's presence and connecting device type are retrieved as well."
)]
struct AppArgs {
    /// Single email address to probe (enables single identity mode).
    #[arg(short, long, env = "TEAMS_PROBE_EMAIL", conflicts_with = "file")]
    email: Option<String>,

    /// File of candidate addresses, one per line. Standard input is read
    /// when neither --email nor --file is given.
    #[arg(short, long, env = "TEAMS_PROBE_FILE")]
    file: Option<PathBuf>,

    /// Bearer token for the Teams API, as copied from the browser.
    #[arg(short, long, env = "TEAMS_PROBE_TOKEN")]
    token: String,

    /// Number of concurrent lookup workers.
    #[arg(short = 'T', long, env = "TEAMS_PROBE_WORKERS")]
    workers: Option<usize>,

    /// File confirmed addresses are written to (standard output when omitted).
    #[arg(short, long, env = "TEAMS_PROBE_OUTPUT")]
    output: Option<PathBuf>,

    /// Bound of the in-flight job queue.
    #[arg(long, env = "TEAMS_PROBE_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "TEAMS_PROBE_REQUEST_TIMEOUT")]
    request_timeout: Option<u64>,

    /// Path to a configuration file (TOML format) to load settings from. CLI args override file settings.
    #[arg(long, env = "TEAMS_PROBE_CONFIG")]
    config_file: Option<String>,

    /// Dump decoded responses (sets the default log filter to debug).
    #[arg(short, long, default_value = "false")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = AppArgs::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_target(true)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Setting up tracing subscriber failed")?;

    tracing::info!("Teams Probe CLI v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config_builder = ConfigBuilder::new();
    if let Some(ref path) = args.config_file {
        config_builder = config_builder.config_file(path);
    }
    if let Some(workers) = args.workers {
        config_builder = config_builder.workers(workers);
    }
    if let Some(capacity) = args.queue_capacity {
        config_builder = config_builder.queue_capacity(capacity);
    }
    if let Some(timeout) = args.request_timeout {
        config_builder = config_builder.request_timeout(Duration::from_secs(timeout));
    }
    config_builder = config_builder.verbose(args.verbose);

    let config = match config_builder.build() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            tracing::error!("Configuration error: {}", e);
            return Err(anyhow::anyhow!("Failed to build configuration: {}", e));
        }
    };
    tracing::debug!("Effective configuration loaded: {:?}", *config);

    // The raw token never reaches the logs; only the failure reason does.
    let bearer = normalize_bearer_token(&args.token).map_err(|e| {
        tracing::error!("Credential error: {}", e);
        anyhow::anyhow!("Failed to normalize the bearer token: {}", e)
    })?;

    let client: Arc<dyn LookupService> = Arc::new(
        initialize_client(&config, bearer)
            .map_err(|e| anyhow::anyhow!("Failed to initialize the Teams client: {}", e))?,
    );

    let sink = Arc::new(
        ResultSink::create(args.output.as_deref(), true)
            .map_err(|e| anyhow::anyhow!("Failed to open the output destination: {}", e))?,
    );

    let start_time = Instant::now();

    let execution_result = if let Some(ref email) = args.email {
        process_single_mode(&config, Arc::clone(&client), &sink, email).await
    } else {
        process_batch_mode(config.clone(), client, Arc::clone(&sink), &args, start_time).await
    };

    if let Err(ref e) = execution_result {
        tracing::error!("Execution failed: {}", e);
    }
    sink.finish()
        .map_err(|e| anyhow::anyhow!("Failed to flush the output destination: {}", e))?;

    execution_result
}

async fn process_single_mode(
    config: &Config,
    client: Arc<dyn LookupService>,
    sink: &ResultSink,
    email: &str,
) -> Result<()> {
    tracing::info!("Running in single identity mode for '{}'.", email);

    let verdict = probe_single_identity(config, client, sink, email)
        .await
        .map_err(|e| anyhow::anyhow!("Lookup failed: {}", e))?;

    if matches!(verdict, Verdict::AuthError) {
        anyhow::bail!("The credential was rejected by the service (HTTP 401)");
    }
    Ok(())
}

async fn process_batch_mode(
    config: Arc<Config>,
    client: Arc<dyn LookupService>,
    sink: Arc<ResultSink>,
    args: &AppArgs,
    start_time: Instant,
) -> Result<()> {
    tracing::info!(
        "Running in batch mode. Input: '{}', Output: '{}' (Workers: {})",
        args.file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_string()),
        args.output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdout>".to_string()),
        config.workers
    );

    let source = teams_probe_core::IdentitySource::open(args.file.as_deref())
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open the input source: {}", e))?;

    let summary = enumerate_identities(config, client, source, sink).await;

    log_summary(&summary, start_time.elapsed());

    if summary.cancelled {
        tracing::warn!(
            "The run was cancelled after a credential rejection; {} queued identities were never probed.",
            summary.abandoned
        );
    }
    Ok(())
}

/// Logs a summary of the enumeration to the console using `tracing::info`.
fn log_summary(summary: &EnumerationSummary, duration: Duration) {
    tracing::info!("------------------- Enumeration Summary -------------------");
    tracing::info!("Identities Processed : {}", summary.processed);
    tracing::info!("  - Confirmed        : {}", summary.confirmed);
    tracing::info!("  - Not Found        : {}", summary.not_found);
    tracing::info!("  - Auth Errors      : {}", summary.auth_errors);
    tracing::info!("  - Transient Errors : {}", summary.transient);
    if summary.abandoned > 0 {
        tracing::info!("Abandoned In Queue   : {}", summary.abandoned);
    }
    tracing::info!("Total Time Taken     : {:.2?}", duration);
    if duration.as_secs_f64() > 0.01 && summary.processed > 0 {
        let rate = (summary.processed as f64) / duration.as_secs_f64();
        tracing::info!("Processing Rate      : {:.2} identities/sec", rate);
    }
    tracing::info!("----------------------------------------------------------");
}
