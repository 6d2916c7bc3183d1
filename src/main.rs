use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use site_scout::amap::client::AmapClient;
use site_scout::config::{AppConfig, Secrets};
use site_scout::logger;
use site_scout::runner::{RunEvent, Runner};
use site_scout::sqlgen;

#[derive(Parser)]
#[command(
    name = "site-scout",
    about = "Store-site suitability analysis against the AMap POI ecosystem",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate candidate addresses and append results to the summary CSV.
    Analyze {
        /// File with one address per line.
        #[arg(long)]
        addresses: PathBuf,
        /// Search radius in meters (1..=50000); defaults to the config value.
        #[arg(long)]
        radius: Option<u32>,
    },
    /// Emit INSERT statements for the store/task tracking tables.
    EmitSql {
        /// Store details export (CSV with the tracking sheet's headers).
        #[arg(long)]
        stores: PathBuf,
        /// Task tracking export (headerless CSV: title, assignee, start, end).
        #[arg(long)]
        tasks: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, secrets) = AppConfig::load()?;

    logger::init_logging(&config.monitoring)?;

    match cli.command {
        Command::Analyze { addresses, radius } => {
            run_analyze(config, secrets, &addresses, radius).await
        }
        Command::EmitSql { stores, tasks } => sqlgen::emit_all(&stores, tasks.as_deref()),
    }
}

async fn run_analyze(
    config: AppConfig,
    secrets: Secrets,
    addresses_path: &Path,
    radius: Option<u32>,
) -> Result<()> {
    let radius = radius.unwrap_or(config.search.default_radius_m);
    anyhow::ensure!(
        (1..=50_000).contains(&radius),
        "radius must be between 1 and 50000 meters"
    );

    let addresses = read_addresses(addresses_path)?;
    anyhow::ensure!(
        !addresses.is_empty(),
        "address file {} contains no addresses",
        addresses_path.display()
    );

    let Some(key) = secrets.amap_api_key else {
        anyhow::bail!("AMAP_API_KEY not set — the analyzer cannot query the AMap API");
    };

    tracing::info!(
        addresses = addresses.len(),
        radius_m = radius,
        "Starting analysis run"
    );

    let client = Arc::new(AmapClient::new(config.api.clone(), &config.rate_limit, key)?);
    let runner = Runner::new(client, config);
    let (mut events, handle) = runner.spawn(addresses, radius);

    while let Some(event) = events.recv().await {
        render_event(&event);
    }
    handle.await??;

    Ok(())
}

fn render_event(event: &RunEvent) {
    match event {
        RunEvent::AddressStarted {
            index,
            total,
            address,
        } => {
            tracing::info!(index, total, address = %address, "Evaluating address");
        }
        RunEvent::GeocodeFailed { address } => {
            tracing::warn!(address = %address, "Address skipped");
        }
        RunEvent::Evaluated(result) => {
            tracing::info!(
                address = %result.address,
                total_score = result.total_score,
                grade = %result.grade,
                "Address evaluated"
            );
            println!(
                "{}  [{}]  total {:.2}  — {}",
                result.address,
                result.grade.code(),
                result.total_score,
                result.recommendation
            );
        }
        RunEvent::Finished { evaluated, skipped } => {
            tracing::info!(evaluated, skipped, "Run finished");
        }
    }
}

fn read_addresses(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read address file {}", path.display()))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect())
}
