use anyhow::{Context, Result, bail};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use favicon_recon::{
    config::Config,
    output::{OutputFormat, render},
    pipeline::{FaviconAnalyzer, SummaryOptions},
    sources::{load_wordlist, parse_domain_argument},
};

#[derive(Parser)]
#[command(name = "favicon-recon")]
#[command(version)]
#[command(about = "Group domains by the favicon they serve")]
#[command(long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["url", "wordlist"])))]
struct Cli {
    /// Domains to analyze in one go, separated by '/' or ','
    #[arg(short = 'u', long, value_name = "DOMAINS")]
    url: Option<String>,

    /// File with one domain per line
    #[arg(short = 'w', long, value_name = "FILE")]
    wordlist: Option<PathBuf>,

    /// Domains per batch request
    #[arg(short = 'b', long, value_name = "N")]
    batch: Option<usize>,

    /// Concurrent batch workers
    #[arg(short = 't', long, value_name = "N")]
    threads: Option<usize>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Table)]
    output_format: OutputFormat,

    /// Include blank icons in the output (shown as NULL); also accepted as -dw
    #[arg(long)]
    show_white_hashes: bool,

    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Cancel the run after this long (e.g. "90s", "5m")
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,
}

/// Accept the two-letter `-dw` short form
fn normalize_args(args: impl IntoIterator<Item = String>) -> Vec<String> {
    args.into_iter()
        .map(|arg| {
            if arg == "-dw" {
                "--show-white-hashes".to_string()
            } else {
                arg
            }
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_from(normalize_args(std::env::args()));

    // Logs go to stderr; stdout carries only the report
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("favicon_recon={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting favicon-recon v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(batch) = cli.batch {
        config.batching.max_batch_size = batch;
    }
    if let Some(threads) = cli.threads {
        config.fetch.threads = threads;
    }
    if let Some(timeout) = cli.timeout {
        config.run.timeout = Some(timeout);
    }
    config.validate()?;

    let list = match (&cli.url, &cli.wordlist) {
        (Some(url), _) => parse_domain_argument(url),
        (None, Some(path)) => load_wordlist(path)
            .await
            .with_context(|| format!("Failed to read wordlist {}", path.display()))?,
        (None, None) => bail!("Either --url or --wordlist is required"),
    };
    if !list.rejected.is_empty() {
        warn!("{} input entries rejected", list.rejected.len());
    }
    if list.domains.is_empty() {
        bail!("No valid domains to analyze");
    }

    let analyzer = FaviconAnalyzer::from_config(&config)?;

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with completed batches");
            ctrl_c.cancel();
        }
    });

    let report = analyzer.analyze(list.domains, cancel).await;
    if !report.is_complete() {
        warn!(
            "{} domains were not analyzed before cancellation",
            report.cancelled.len()
        );
    }

    let options = SummaryOptions {
        show_blank: cli.show_white_hashes,
        display_length: config.fingerprint.display_length,
    };
    let rendered = render(&report, cli.output_format, options)?;
    println!("{rendered}");

    Ok(())
}
