//! Upstream adapter tests: tolerant parsing, the HTTP client against a local
//! fixture server, and the concurrent `fetch_all`.

mod common;

use common::{serve, StubUpstream};
use country_exchange_sdk::sources::fetch_all;
use country_exchange_sdk::{
    CountryError, HttpUpstream, RateTable, RawCountry, Result, Source, Upstream,
};
use serde_json::json;
use std::sync::Barrier;
use std::time::Duration;

const COUNTRIES_BODY: &str = r#"[
  {"name": "Alpha", "capital": "Alphaville", "region": "North", "population": 1000,
   "flag": "https://flags.example/alpha.svg", "currencies": [{"code": "ALP", "name": "Alp"}, {"code": "USD"}]},
  {"name": "Beta", "region": "South", "population": 500, "flag": "https://flags.example/beta.svg", "currencies": []},
  {"capital": "Nowhere", "population": 12},
  {"name": "Gamma", "population": "lots"}
]"#;

const RATES_BODY: &str = r#"{"result": "success", "base_code": "USD", "rates": {"USD": 1, "ALP": 2.0}}"#;

// ---------------------------------------------------------------------------
// RawCountry::from_value
// ---------------------------------------------------------------------------

#[test]
fn from_value_reads_flat_shape() {
    let value = json!({
        "name": "Nigeria",
        "capital": "Abuja",
        "region": "Africa",
        "population": 206139587,
        "flag": "https://flagcdn.com/ng.svg",
        "currencies": [{"code": "NGN", "name": "Nigerian naira", "symbol": "₦"}]
    });
    let c = RawCountry::from_value(&value);

    assert_eq!(c.name.as_deref(), Some("Nigeria"));
    assert_eq!(c.capital.as_deref(), Some("Abuja"));
    assert_eq!(c.region.as_deref(), Some("Africa"));
    assert_eq!(c.population, Some(206139587));
    assert_eq!(c.flag_url.as_deref(), Some("https://flagcdn.com/ng.svg"));
    assert_eq!(c.currency_code.as_deref(), Some("NGN"));
}

#[test]
fn from_value_reads_nested_shape() {
    let value = json!({
        "name": {"common": "Chad", "official": "Republic of Chad"},
        "capital": ["N'Djamena"],
        "population": 16425859
    });
    let c = RawCountry::from_value(&value);

    assert_eq!(c.name.as_deref(), Some("Chad"));
    assert_eq!(c.capital.as_deref(), Some("N'Djamena"));
}

#[test]
fn from_value_takes_first_currency_only() {
    let value = json!({"name": "Panama", "population": 1, "currencies": [{"code": "PAB"}, {"code": "USD"}]});
    assert_eq!(RawCountry::from_value(&value).currency_code.as_deref(), Some("PAB"));
}

#[test]
fn from_value_treats_empty_strings_as_absent() {
    let value = json!({"name": "", "capital": "", "population": 3, "currencies": [{"code": ""}]});
    let c = RawCountry::from_value(&value);

    assert!(c.name.is_none());
    assert!(c.capital.is_none());
    assert!(c.currency_code.is_none());
}

#[test]
fn from_value_rejects_non_numeric_population() {
    for population in [json!("1000"), json!(12.5), json!(null), json!(true)] {
        let c = RawCountry::from_value(&json!({"name": "X", "population": population}));
        assert!(c.population.is_none(), "accepted {:?}", population);
    }
    let c = RawCountry::from_value(&json!({"name": "X", "population": 12.0}));
    assert_eq!(c.population, Some(12));
}

#[test]
fn rate_table_without_rates_is_empty() {
    let table: RateTable = serde_json::from_str(r#"{"result": "error"}"#).unwrap();
    assert!(table.is_empty());
}

// ---------------------------------------------------------------------------
// HttpUpstream
// ---------------------------------------------------------------------------

fn http_upstream(base: &str) -> HttpUpstream {
    HttpUpstream::new(
        &format!("{}/countries", base),
        &format!("{}/rates", base),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[test]
fn http_upstream_parses_both_sources() {
    let base = serve(vec![
        ("/countries", 200, COUNTRIES_BODY.to_string()),
        ("/rates", 200, RATES_BODY.to_string()),
    ]);
    let upstream = http_upstream(&base);

    let (countries, rates) = fetch_all(&upstream).unwrap();

    assert_eq!(countries.len(), 4);
    assert_eq!(countries[0].currency_code.as_deref(), Some("ALP"));
    assert_eq!(countries[1].currency_code, None);
    assert!(countries[2].name.is_none());
    assert!(countries[3].population.is_none());

    assert_eq!(rates.rate("ALP"), Some(2.0));
    assert_eq!(rates.rate("USD"), Some(1.0));
}

#[test]
fn http_upstream_server_error_names_dataset_source() {
    let base = serve(vec![
        ("/countries", 500, r#"{"message": "boom"}"#.to_string()),
        ("/rates", 200, RATES_BODY.to_string()),
    ]);
    let err = fetch_all(&http_upstream(&base)).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Dataset)));
    assert_eq!(err.to_string(), "dataset source unreachable");
}

#[test]
fn http_upstream_missing_rates_names_rate_source() {
    let base = serve(vec![("/countries", 200, COUNTRIES_BODY.to_string())]);
    let err = fetch_all(&http_upstream(&base)).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Rates)));
    assert_eq!(err.to_string(), "rate source unreachable");
}

#[test]
fn http_upstream_undecodable_body_is_unavailable() {
    let base = serve(vec![
        ("/countries", 200, "<html>maintenance</html>".to_string()),
        ("/rates", 200, RATES_BODY.to_string()),
    ]);
    let err = http_upstream(&base).fetch_countries().unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Dataset)));
}

#[test]
fn http_upstream_connection_refused_is_unavailable() {
    // Bind then drop to get a port nobody listens on.
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let upstream = http_upstream(&format!("http://127.0.0.1:{}", port));
    let err = upstream.fetch_rates().unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Rates)));
}

// ---------------------------------------------------------------------------
// fetch_all
// ---------------------------------------------------------------------------

#[test]
fn fetch_all_reports_dataset_when_both_fail() {
    let err = fetch_all(&StubUpstream::failing(true, true)).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Dataset)));
}

#[test]
fn fetch_all_fails_without_partial_result_when_rates_fail() {
    let upstream = StubUpstream {
        countries: vec![common::raw("Alpha", 1, None)],
        ..StubUpstream::failing(false, true)
    };
    let err = fetch_all(&upstream).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Rates)));
}

/// Both fetches wait on the same two-party barrier, so this only returns
/// if they run at the same time.
struct RendezvousUpstream {
    barrier: Barrier,
}

impl Upstream for RendezvousUpstream {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        self.barrier.wait();
        Ok(vec![common::raw("Alpha", 1, None)])
    }

    fn fetch_rates(&self) -> Result<RateTable> {
        self.barrier.wait();
        Ok(RateTable::from_iter([("ALP", 2.0)]))
    }
}

#[test]
fn fetch_all_runs_both_fetches_concurrently() {
    let upstream = RendezvousUpstream {
        barrier: Barrier::new(2),
    };
    let (countries, rates) = fetch_all(&upstream).unwrap();
    assert_eq!(countries.len(), 1);
    assert_eq!(rates.len(), 1);
}

/// Panics in whichever fetch is selected.
struct PanickingUpstream {
    dataset: bool,
}

impl Upstream for PanickingUpstream {
    fn fetch_countries(&self) -> Result<Vec<RawCountry>> {
        if self.dataset {
            panic!("dataset fetch blew up");
        }
        Ok(vec![common::raw("Alpha", 1, None)])
    }

    fn fetch_rates(&self) -> Result<RateTable> {
        if !self.dataset {
            panic!("rate fetch blew up");
        }
        Ok(RateTable::default())
    }
}

#[test]
fn fetch_all_maps_dataset_panic_to_unavailable() {
    let err = fetch_all(&PanickingUpstream { dataset: true }).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Dataset)));
}

#[test]
fn fetch_all_maps_rates_panic_to_unavailable() {
    let err = fetch_all(&PanickingUpstream { dataset: false }).unwrap_err();
    assert!(matches!(err, CountryError::UpstreamUnavailable(Source::Rates)));
}
