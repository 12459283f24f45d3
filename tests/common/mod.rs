//! Shared test fixtures for the country exchange SDK integration tests.
//!
//! Provides canned upstreams, a counting writer, sample rows and a tiny
//! local axum server for exercising the real `HttpUpstream`.

#![allow(dead_code)]

use axum::http::{header, StatusCode};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, TimeZone, Utc};
use country_exchange_sdk::{
    Country, CountryError, CountryWriter, RateTable, RawCountry, Result, Source, Store, Upstream,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Mutex};
use std::thread;

/// Fixed refresh timestamp (µs precision, like the store).
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
}

pub fn raw(name: &str, population: i64, currency: Option<&str>) -> RawCountry {
    RawCountry {
        name: Some(name.to_string()),
        capital: Some(format!("{} City", name)),
        region: Some("Testland".to_string()),
        population: Some(population),
        flag_url: Some(format!("https://flags.example/{}.svg", name.to_lowercase())),
        currency_code: currency.map(|c| c.to_string()),
    }
}

pub fn country(name: &str, region: Option<&str>, gdp: Option<f64>) -> Country {
    Country {
        name: name.to_string(),
        capital: None,
        region: region.map(|r| r.to_string()),
        population: 1_000,
        currency_code: Some("USD".to_string()),
        exchange_rate: Some(1.0),
        estimated_gdp: gdp,
        flag_url: None,
        last_refreshed_at: fixed_now(),
    }
}

pub fn memory_store() -> Store {
    Store::in_memory(2).unwrap()
}

// ---------------------------------------------------------------------------
// StubUpstream
// ---------------------------------------------------------------------------

/// Upstream returning canned data, or failing for the chosen sources.
pub struct StubUpstream {
    pub countries: Vec<RawCountry>,
    pub rates: RateTable,
    pub fail_dataset: bool,
    pub fail_rates: bool,
}

impl StubUpstream {
    pub fn new(countries: Vec<RawCountry>, rates: RateTable) -> Self {
        Self {
            countries,
            rates,
            fail_dataset: false,
            fail_rates: false,
        }
    }

    pub fn failing(fail_dataset: bool, fail_rates: bool) -> Self {
        Self {
            countries: Vec::new(),
            rates: RateTable::default(),
            fail_dataset,
            fail_rates,
        }
    }
}

impl Upstream for StubUpstream {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        if self.fail_dataset {
            return Err(CountryError::UpstreamUnavailable(Source::Dataset));
        }
        Ok(self.countries.clone())
    }

    fn fetch_rates(&self) -> Result<RateTable> {
        if self.fail_rates {
            return Err(CountryError::UpstreamUnavailable(Source::Rates));
        }
        Ok(self.rates.clone())
    }
}

// ---------------------------------------------------------------------------
// CountingWriter
// ---------------------------------------------------------------------------

/// Writer that records every batch it receives instead of storing it.
#[derive(Default)]
pub struct CountingWriter {
    pub calls: AtomicUsize,
    pub batches: Mutex<Vec<Vec<Country>>>,
    pub fail: bool,
}

impl CountingWriter {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CountryWriter for CountingWriter {
    fn upsert_all(&self, countries: &[Country]) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CountryError::Persistence);
        }
        self.batches.lock().unwrap().push(countries.to_vec());
        Ok(countries.len())
    }
}

// ---------------------------------------------------------------------------
// Fixture HTTP server
// ---------------------------------------------------------------------------

/// Serve canned `(path, status, body)` JSON responses on a random local port.
///
/// Returns the base URL (`http://127.0.0.1:PORT`). Unknown paths get axum's
/// default 404. The server runs on its own runtime thread, since the blocking
/// reqwest client must not be driven from inside a tokio runtime, and lives
/// until the test process exits.
pub fn serve(routes: Vec<(&'static str, u16, String)>) -> String {
    let mut app = Router::new();
    for (path, status, body) in routes {
        let status = StatusCode::from_u16(status).unwrap();
        app = app.route(
            path,
            get(move || {
                let body = body.clone();
                async move { (status, [(header::CONTENT_TYPE, "application/json")], body) }
            }),
        );
    }

    let (addr_tx, addr_rx) = mpsc::channel();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            addr_tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });

    format!("http://{}", addr_rx.recv().unwrap())
}
