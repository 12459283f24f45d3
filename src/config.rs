use std::path::PathBuf;
use std::time::Duration;

pub const COUNTRIES_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";
pub const EXCHANGE_RATES_URL: &str = "https://open.er-api.com/v6/latest/USD";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Inclusive bounds of the per-country GDP multiplier.
pub const MULTIPLIER_MIN: u32 = 1000;
pub const MULTIPLIER_MAX: u32 = 2000;

pub const COUNTRIES_TABLE: &str = "countries";

/// Stored column order. `name` is the conflict key and always comes first.
pub const COUNTRY_COLUMNS: [&str; 9] = [
    "name",
    "capital",
    "region",
    "population",
    "currency_code",
    "exchange_rate",
    "estimated_gdp",
    "flag_url",
    "last_refreshed_at",
];

pub fn default_database_path() -> PathBuf {
    if let Some(data) = dirs::data_dir() {
        data.join("country-exchange-sdk").join("countries.duckdb")
    } else {
        PathBuf::from(".country-exchange-sdk").join("countries.duckdb")
    }
}
