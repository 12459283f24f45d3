//! `countries`: refresh and inspect the country exchange store.
//!
//! Commands:
//! - `refresh`: fetch both upstream datasets and upsert the merged rows
//! - `list`: list stored countries with optional filters and sort
//! - `get` / `delete`: case-insensitive lookup and removal by name
//! - `status`: row count and last refresh time

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use country_exchange_sdk::config;
use country_exchange_sdk::queries::{CountrySort, ListCountriesParams};
use country_exchange_sdk::CountrySdk;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "countries",
    about = "Country data merged with live exchange rates, stored in DuckDB"
)]
struct Cli {
    /// DuckDB database file. Defaults to the platform data directory.
    #[arg(long, global = true, env = "COUNTRIES_DB")]
    database: Option<PathBuf>,

    /// Country dataset URL.
    #[arg(long, global = true, env = "COUNTRIES_URL", default_value = config::COUNTRIES_URL)]
    countries_url: String,

    /// Exchange-rate URL.
    #[arg(long, global = true, env = "RATES_URL", default_value = config::EXCHANGE_RATES_URL)]
    rates_url: String,

    /// HTTP timeout in seconds for each upstream request.
    #[arg(long, global = true, default_value_t = config::DEFAULT_TIMEOUT.as_secs())]
    timeout_secs: u64,

    /// Log level used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch both upstream datasets and upsert the merged rows.
    Refresh,
    /// List stored countries.
    List {
        /// Only countries in this region (exact match).
        #[arg(long)]
        region: Option<String>,

        /// Only countries using this currency code (exact match).
        #[arg(long)]
        currency: Option<String>,

        /// Sort order: gdp_desc, gdp_asc or name.
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        offset: Option<usize>,
    },
    /// Show one country (name is case-insensitive).
    Get { name: String },
    /// Delete one country (name is case-insensitive).
    Delete { name: String },
    /// Row count and last refresh time.
    Status,
}

fn init_logging(level: &str) {
    // Base level from the flag, still overridable via RUST_LOG.
    let default = format!("{level},country_exchange_sdk={level},reqwest=warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let mut builder = CountrySdk::builder()
        .countries_url(cli.countries_url)
        .rates_url(cli.rates_url)
        .timeout(Duration::from_secs(cli.timeout_secs));
    if let Some(path) = cli.database {
        builder = builder.database(path);
    }
    let sdk = builder.build()?;

    match cli.command {
        Commands::Refresh => {
            let outcome = sdk.refresh();
            print_json(&outcome)?;
            if !outcome.is_ok() {
                std::process::exit(1);
            }
        }
        Commands::List {
            region,
            currency,
            sort,
            limit,
            offset,
        } => {
            let sort = sort.as_deref().map(str::parse::<CountrySort>).transpose()?;
            let countries = sdk.countries().list(&ListCountriesParams {
                region,
                currency,
                sort,
                limit,
                offset,
            })?;
            print_json(&countries)?;
        }
        Commands::Get { name } => match sdk.countries().get(&name)? {
            Some(country) => print_json(&country)?,
            None => bail!("country '{}' not found", name),
        },
        Commands::Delete { name } => {
            if !sdk.countries().delete(&name)? {
                bail!("country '{}' not found", name);
            }
            print_json(&serde_json::json!({ "success": true }))?;
        }
        Commands::Status => print_json(&sdk.status()?)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
