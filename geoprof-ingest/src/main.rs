//! geoprof-ingest - Statistical profile builder
//!
//! Reads the place/geography lookup table, fetches every place's measures
//! from the three statistical source families, pools multi-geography
//! places into single rows, and writes the combined profile table.

use anyhow::{Context, Result};
use clap::Parser;
use geoprof_common::config::TomlConfig;
use geoprof_ingest::catalog::MeasureCatalog;
use geoprof_ingest::config::{CliOverrides, IngestConfig};
use geoprof_ingest::lookup::LookupTable;
use geoprof_ingest::output::write_table_path;
use geoprof_ingest::services::{CensusFetcher, HealthFetcher};
use geoprof_ingest::types::{SourceFamily, SourceFetcher};
use geoprof_ingest::ProfileBuilder;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for geoprof-ingest
#[derive(Parser, Debug)]
#[command(name = "geoprof-ingest")]
#[command(about = "Builds per-place statistical profiles from remote sources")]
#[command(version)]
struct Args {
    /// Path to the place/geography lookup table (CSV)
    #[arg(short, long, env = "GEOPROF_LOOKUP")]
    lookup: PathBuf,

    /// Path the profile table is written to (CSV)
    #[arg(short, long, env = "GEOPROF_OUTPUT")]
    output: PathBuf,

    /// Optional TOML config file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// State FIPS qualifier for state-scoped source queries
    #[arg(long, env = "GEOPROF_STATE_FIPS")]
    state_fips: Option<String>,

    /// Census API key
    #[arg(long, env = "GEOPROF_CENSUS_API_KEY")]
    census_api_key: Option<String>,

    /// Health data portal app token
    #[arg(long, env = "GEOPROF_HEALTH_APP_TOKEN")]
    health_app_token: Option<String>,

    /// Worker pool size for per-place fan-out
    #[arg(short, long)]
    workers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoprof_ingest=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting geoprof-ingest");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let toml_config = TomlConfig::load(args.config.as_deref())
        .context("Failed to load TOML configuration")?;
    let cli = CliOverrides {
        state_fips: args.state_fips,
        census_api_key: args.census_api_key,
        health_app_token: args.health_app_token,
        workers: args.workers,
    };
    let config = IngestConfig::resolve(&cli, &toml_config)
        .context("Failed to resolve configuration")?;

    let table = LookupTable::from_csv_path(&args.lookup)
        .with_context(|| format!("Failed to load lookup table {}", args.lookup.display()))?;
    info!(
        links = table.links().len(),
        places = table.place_ids().len(),
        "Lookup table loaded"
    );

    let catalog = MeasureCatalog::builtin();
    let fetchers: Vec<Arc<dyn SourceFetcher>> = vec![
        Arc::new(CensusFetcher::new(
            SourceFamily::Decennial,
            catalog.decennial.clone(),
            config.census_api_key.clone(),
            config.state_fips.clone(),
        )?),
        Arc::new(CensusFetcher::new(
            SourceFamily::Survey,
            catalog.survey.clone(),
            config.census_api_key.clone(),
            config.state_fips.clone(),
        )?),
        Arc::new(HealthFetcher::new(
            catalog.health.clone(),
            config.health_app_token.clone(),
        )?),
    ];

    let builder = ProfileBuilder::new(catalog.clone(), fetchers, config.workers);
    let run = builder.build_profiles(&table).await;

    write_table_path(&run.records, &catalog, &args.output)
        .with_context(|| format!("Failed to write profile table {}", args.output.display()))?;

    info!(
        output = %args.output.display(),
        places_written = run.records.len(),
        places_failed = run.failures.len(),
        "Profile table written"
    );
    if !run.failures.is_empty() {
        for (place_id, error) in &run.failures {
            tracing::warn!(place_id = %place_id, kind = error.kind(), "Place omitted: {}", error);
        }
    }

    Ok(())
}
