//! Subnational boundary update job.
//!
//! Downloads COD boundaries for every country, adjusts them to the UN
//! international boundaries and republishes the global layers.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cod_boundaries::catalog::CatalogClient;
use cod_boundaries::config::{Credentials, ProjectConfig, DEFAULT_PROJECT_CONFIG};
use cod_boundaries::{run_update, AdminLevel, RunPlan};

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(name = "update-boundaries")]
#[command(about = "Adjust COD subnational boundaries to the UN boundaries and republish them")]
struct Args {
    /// Countries to update (ISO3, comma separated); all countries when omitted
    #[arg(short = 'c', long, value_delimiter = ',')]
    countries: Option<Vec<String>>,

    /// Admin levels to update (e.g. adm1,adm2); configured levels when omitted
    #[arg(short, long, value_delimiter = ',')]
    levels: Option<Vec<AdminLevel>>,

    /// Project configuration file
    #[arg(long, default_value = DEFAULT_PROJECT_CONFIG)]
    config: PathBuf,

    /// Credentials file (defaults to ~/.hdx_configuration.toml)
    #[arg(long)]
    credentials: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("##### cod-boundaries update ####");

    let config = ProjectConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let credentials = Credentials::load(args.credentials.as_deref())?;
    info!("Catalog: {:?}", credentials.site);

    let client = CatalogClient::new(&credentials, &config.catalog)?;

    let temp_dir = tempfile::Builder::new()
        .prefix("TempDataExplorerInputs")
        .tempdir()
        .context("Failed to create temp folder")?;

    let plan = RunPlan {
        countries: args.countries,
        levels: args.levels.unwrap_or_else(|| config.levels.clone()),
    };

    run_update(&client, &config, &plan, temp_dir.path()).await?;

    Ok(())
}
