//! Upstream country and exchange-rate sources.
//!
//! [`fetch_all`] runs both fetches at once and only returns when both have
//! succeeded. A failure of either source fails the whole call and names the
//! source; the underlying transport error is logged, not returned.

use crate::config;
use crate::error::{CountryError, Result, Source};
use crate::models::{RateTable, RawCountry};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use std::thread::{self, ScopedJoinHandle};
use std::time::Duration;
use tracing::{debug, error, warn};

/// The two datasets a refresh is built from.
pub trait Upstream: Send + Sync {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>>;
    fn fetch_rates(&self) -> Result<RateTable>;
}

/// Fetch the country dataset and the rate table concurrently.
///
/// If both sources fail, the dataset source is the one reported.
pub fn fetch_all(upstream: &dyn Upstream) -> Result<(Vec<RawCountry>, RateTable)> {
    let (countries, rates) = thread::scope(|s| {
        let countries = s.spawn(|| upstream.fetch_countries());
        let rates = s.spawn(|| upstream.fetch_rates());
        (
            join_fetch(countries, Source::Dataset),
            join_fetch(rates, Source::Rates),
        )
    });
    Ok((countries?, rates?))
}

/// A fetch that panicked counts as its source being unavailable.
fn join_fetch<T>(handle: ScopedJoinHandle<'_, Result<T>>, source: Source) -> Result<T> {
    handle.join().unwrap_or_else(|_| {
        error!(%source, "upstream fetch panicked");
        Err(CountryError::UpstreamUnavailable(source))
    })
}

// ---------------------------------------------------------------------------
// HttpUpstream
// ---------------------------------------------------------------------------

/// [`Upstream`] backed by a blocking `reqwest` client.
pub struct HttpUpstream {
    client: Client,
    countries_url: String,
    rates_url: String,
}

impl HttpUpstream {
    pub fn new(countries_url: &str, rates_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        Ok(Self {
            client,
            countries_url: countries_url.to_string(),
            rates_url: rates_url.to_string(),
        })
    }

    /// Client for the public restcountries.com and open.er-api.com endpoints.
    pub fn with_defaults(timeout: Duration) -> Result<Self> {
        Self::new(config::COUNTRIES_URL, config::EXCHANGE_RATES_URL, timeout)
    }

    /// GET `url` and decode the JSON body. Transport errors, non-2xx
    /// statuses and undecodable bodies all become `UpstreamUnavailable`.
    fn get_json<T: DeserializeOwned>(&self, url: &str, source: Source) -> Result<T> {
        debug!(url, %source, "fetching");
        let unavailable = |e: reqwest::Error| {
            warn!(url, %source, error = %e, "upstream request failed");
            CountryError::UpstreamUnavailable(source)
        };
        self.client
            .get(url)
            .send()
            .and_then(|resp| resp.error_for_status())
            .map_err(unavailable)?
            .json::<T>()
            .map_err(unavailable)
    }
}

impl Upstream for HttpUpstream {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        let items: Vec<serde_json::Value> = self.get_json(&self.countries_url, Source::Dataset)?;
        Ok(items.iter().map(RawCountry::from_value).collect())
    }

    fn fetch_rates(&self) -> Result<RateTable> {
        self.get_json(&self.rates_url, Source::Rates)
    }
}
