//! Country exchange SDK for Rust.
//!
//! Merges per-country reference data (name, capital, region, population,
//! flag) with live exchange rates, derives an estimated GDP per country and
//! stores the result in DuckDB, keyed by country name.
//!
//! # Quick start
//!
//! ```no_run
//! use country_exchange_sdk::CountrySdk;
//! use country_exchange_sdk::queries::{CountrySort, ListCountriesParams};
//!
//! let sdk = CountrySdk::builder().in_memory().build().unwrap();
//!
//! let outcome = sdk.refresh();
//! println!("{}", serde_json::to_string(&outcome).unwrap());
//!
//! let richest = sdk
//!     .countries()
//!     .list(&ListCountriesParams {
//!         sort: Some(CountrySort::GdpDesc),
//!         limit: Some(10),
//!         ..Default::default()
//!     })
//!     .unwrap();
//! ```

#[cfg(feature = "async")]
pub mod async_client;
pub mod config;
pub mod error;
pub mod merge;
pub mod models;
pub mod pipeline;
pub mod queries;
pub mod sources;
pub mod sql_builder;
pub mod store;

#[cfg(feature = "async")]
pub use async_client::AsyncCountrySdk;
pub use error::{CountryError, Result, Source};
pub use merge::{FixedMultiplier, MultiplierSource, RandomMultiplier};
pub use models::{Country, RateTable, RawCountry, StoreStatus};
pub use pipeline::{Pipeline, RefreshOutcome};
pub use sources::{HttpUpstream, Upstream};
pub use sql_builder::SqlBuilder;
pub use store::{CountryWriter, Store};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CountrySdkBuilder
// ---------------------------------------------------------------------------

enum StoreLocation {
    Default,
    File(PathBuf),
    Memory,
}

/// Builder for configuring and constructing a [`CountrySdk`] instance.
///
/// Use [`CountrySdk::builder()`] to obtain a builder, chain configuration
/// methods, and call [`build()`](CountrySdkBuilder::build) to create the SDK.
pub struct CountrySdkBuilder {
    location: StoreLocation,
    pool_size: u32,
    countries_url: String,
    rates_url: String,
    timeout: Duration,
    upstream: Option<Box<dyn Upstream>>,
    multiplier: Option<Box<dyn MultiplierSource>>,
    serialize_refreshes: bool,
}

impl Default for CountrySdkBuilder {
    fn default() -> Self {
        Self {
            location: StoreLocation::Default,
            pool_size: config::DEFAULT_POOL_SIZE,
            countries_url: config::COUNTRIES_URL.to_string(),
            rates_url: config::EXCHANGE_RATES_URL.to_string(),
            timeout: config::DEFAULT_TIMEOUT,
            upstream: None,
            multiplier: None,
            serialize_refreshes: false,
        }
    }
}

impl CountrySdkBuilder {
    /// Store the database in the given file.
    ///
    /// If not set, `countries.duckdb` under the platform data directory is
    /// used (e.g. `~/.local/share/country-exchange-sdk` on Linux).
    pub fn database<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.location = StoreLocation::File(path.as_ref().to_path_buf());
        self
    }

    /// Keep the database in memory. Nothing survives the SDK.
    pub fn in_memory(mut self) -> Self {
        self.location = StoreLocation::Memory;
        self
    }

    /// Maximum number of pooled DuckDB connections. Defaults to 4.
    pub fn pool_size(mut self, size: u32) -> Self {
        self.pool_size = size;
        self
    }

    /// Override the country dataset URL.
    pub fn countries_url(mut self, url: impl Into<String>) -> Self {
        self.countries_url = url.into();
        self
    }

    /// Override the exchange-rate URL.
    pub fn rates_url(mut self, url: impl Into<String>) -> Self {
        self.rates_url = url.into();
        self
    }

    /// Set the HTTP request timeout for both upstream fetches.
    ///
    /// Defaults to 30 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the HTTP sources entirely. URL and timeout settings are
    /// ignored when an upstream is supplied.
    pub fn upstream(mut self, upstream: impl Upstream + 'static) -> Self {
        self.upstream = Some(Box::new(upstream));
        self
    }

    /// Replace the random GDP multiplier, e.g. with a [`FixedMultiplier`].
    pub fn multiplier(mut self, multiplier: impl MultiplierSource + 'static) -> Self {
        self.multiplier = Some(Box::new(multiplier));
        self
    }

    /// Serialize overlapping refreshes on this SDK instead of letting them
    /// race at the storage layer. Defaults to `false`.
    pub fn serialize_refreshes(mut self, enabled: bool) -> Self {
        self.serialize_refreshes = enabled;
        self
    }

    /// Build the SDK, opening the store and creating its schema.
    ///
    /// No network traffic happens until the first [`CountrySdk::refresh`].
    pub fn build(self) -> Result<CountrySdk> {
        let store = match self.location {
            StoreLocation::Default => Store::open(config::default_database_path(), self.pool_size)?,
            StoreLocation::File(path) => Store::open(path, self.pool_size)?,
            StoreLocation::Memory => Store::in_memory(self.pool_size)?,
        };

        let upstream: Box<dyn Upstream> = match self.upstream {
            Some(upstream) => upstream,
            None => Box::new(HttpUpstream::new(
                &self.countries_url,
                &self.rates_url,
                self.timeout,
            )?),
        };
        let multiplier: Box<dyn MultiplierSource> = match self.multiplier {
            Some(multiplier) => multiplier,
            None => Box::new(RandomMultiplier),
        };

        let writer: Arc<dyn CountryWriter> = Arc::new(store.clone());
        let pipeline = Pipeline::new(upstream, writer, multiplier)
            .serialize_refreshes(self.serialize_refreshes);

        Ok(CountrySdk { store, pipeline })
    }
}

// ---------------------------------------------------------------------------
// CountrySdk
// ---------------------------------------------------------------------------

/// The main entry point for the SDK.
///
/// Owns the [`Store`] and the refresh [`Pipeline`]. Created via
/// [`CountrySdk::builder()`].
pub struct CountrySdk {
    store: Store,
    pipeline: Pipeline,
}

impl CountrySdk {
    /// Create a new builder for configuring the SDK.
    pub fn builder() -> CountrySdkBuilder {
        CountrySdkBuilder::default()
    }

    /// Access the country query interface.
    pub fn countries(&self) -> queries::CountryQuery<'_> {
        queries::CountryQuery::new(&self.store)
    }

    /// Re-fetch both upstream datasets and upsert the merged rows.
    ///
    /// Never fails: upstream and storage problems are reported in the
    /// returned [`RefreshOutcome`].
    pub fn refresh(&self) -> RefreshOutcome {
        self.pipeline.refresh()
    }

    /// Row count and last refresh time of the store.
    pub fn status(&self) -> Result<StoreStatus> {
        self.countries().status()
    }

    /// Return a reference to the underlying [`Store`] for advanced usage.
    pub fn store(&self) -> &Store {
        &self.store
    }
}

impl fmt::Display for CountrySdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status() {
            Ok(status) => write!(
                f,
                "CountrySdk(countries={}, last_refreshed_at={})",
                status.total_countries,
                status
                    .last_refreshed_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| "never".to_string())
            ),
            Err(_) => write!(f, "CountrySdk(status unavailable)"),
        }
    }
}
