//! Republisher - publish CSV rows to the republish API in batches

use anyhow::{Context, Result};
use clap::Parser;
use republisher::{
    CsvErrorSink, CsvSource, DispatchMode, Dispatcher, HttpTransport, MalformedRowPolicy,
    Reconciler, RepublishConfig, RunReport,
};
use republisher_common::logging::{init_logging, LogConfig, LogLevel};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "republisher")]
#[command(author, version, about = "Republish CSV records to the republish API")]
struct Cli {
    /// CSV file with the records to republish
    #[arg(short, long, default_value = "files/example.csv")]
    input: PathBuf,

    /// CSV file receiving every failed row (truncated on start)
    #[arg(short, long, default_value = "files/errors.csv")]
    errors: PathBuf,

    /// TOML configuration file
    #[arg(short, long, env = "REPUBLISH_CONFIG")]
    config: Option<PathBuf>,

    /// Treat the first line of the input as data
    #[arg(long)]
    no_header: bool,

    /// Rows per request
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Dispatch mode: multi or single
    #[arg(short, long)]
    mode: Option<DispatchMode>,

    /// Malformed row policy: abort-batch or skip-row
    #[arg(long)]
    malformed_rows: Option<MalformedRowPolicy>,

    /// Base URL of the republish API
    #[arg(long)]
    api_url: Option<String>,

    /// Skip this many data rows
    #[arg(long, default_value_t = 0)]
    offset: usize,

    /// Publish at most this many data rows
    #[arg(long)]
    limit: Option<usize>,

    /// Write the run report as JSON to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `.env` can feed clap's env fallbacks
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    // Environment variables take precedence over the flag
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("republisher")
        .build()
        .merge_env()?;

    let _guard = init_logging(&log_config)?;

    let config = load_config(&cli)?;

    let source = CsvSource::open(&cli.input, !cli.no_header)
        .with_context(|| format!("Failed to open input {}", cli.input.display()))?;
    let rows = source
        .read_page(cli.offset, cli.limit.unwrap_or(usize::MAX))
        .with_context(|| format!("Failed to read input {}", cli.input.display()))?;

    let mut sink = CsvErrorSink::create(&cli.errors)
        .with_context(|| format!("Failed to create error sink {}", cli.errors.display()))?;

    let transport = HttpTransport::new(&config.client).context("Failed to build HTTP client")?;
    let reconciler = Reconciler::new(transport).with_policy(config.malformed_rows);

    info!(
        input = %cli.input.display(),
        errors = %cli.errors.display(),
        rows = rows.len(),
        api = %config.client.api_base_url,
        "Republishing records"
    );

    let outcome = Dispatcher::new(&reconciler, &config)
        .run(&rows, config.items_per_batch, &mut sink)
        .await;

    match outcome {
        Ok(report) => {
            if let Some(path) = &cli.report {
                save_report(&report, path)?;
            }
            info!(errors = report.error_count, "Republish complete");
            Ok(())
        },
        Err(err) => {
            if let (Some(report), Some(path)) = (err.partial_report(), &cli.report) {
                save_report(report, path)?;
            }
            error!(error = %err, "Republish aborted");
            Err(err).context("Republish run failed")
        },
    }
}

/// Defaults or the config file, then environment, then flags
fn load_config(cli: &Cli) -> Result<RepublishConfig> {
    let config = match &cli.config {
        Some(path) => RepublishConfig::from_file(path)?,
        None => RepublishConfig::default(),
    };
    let mut config = config.merge_env()?;

    if let Some(size) = cli.batch_size {
        config.items_per_batch = size;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(policy) = cli.malformed_rows {
        config.malformed_rows = policy;
    }
    if let Some(url) = &cli.api_url {
        config.client.api_base_url = url.clone();
    }

    config.validate()?;
    Ok(config)
}

fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    report
        .write_json(path)
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    info!(path = %path.display(), "Run report written");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use republisher::RepublishError;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["republisher"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("files/example.csv"));
        assert_eq!(cli.errors, PathBuf::from("files/errors.csv"));
        assert_eq!(cli.offset, 0);
        assert!(!cli.no_header);
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::try_parse_from([
            "republisher",
            "--batch-size",
            "3",
            "--mode",
            "single",
            "--malformed-rows",
            "skip-row",
            "--api-url",
            "https://api.example.com",
        ])
        .unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.items_per_batch, 3);
        assert_eq!(config.mode, DispatchMode::Single);
        assert_eq!(config.malformed_rows, MalformedRowPolicy::SkipRow);
        assert_eq!(config.client.api_base_url, "https://api.example.com");
    }

    #[test]
    fn test_zero_batch_size_is_rejected() {
        let cli = Cli::try_parse_from(["republisher", "--batch-size", "0"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RepublishError>(),
            Some(RepublishError::Configuration(_))
        ));
    }
}
