//! Join of the country dataset with the rate table.
//!
//! Each surviving raw record becomes one [`Country`] carrying the refresh
//! timestamp and, when its currency resolves, an estimated GDP of
//! `population * multiplier / exchange_rate`.

use crate::config::{MULTIPLIER_MAX, MULTIPLIER_MIN};
use crate::models::{Country, RateTable, RawCountry};
use chrono::{DateTime, Utc};
use rand::prelude::*;

// ---------------------------------------------------------------------------
// MultiplierSource
// ---------------------------------------------------------------------------

/// Supplies the integer multiplier used for each GDP estimate.
pub trait MultiplierSource: Send + Sync {
    fn draw(&self) -> u32;
}

/// Uniform draw from `MULTIPLIER_MIN..=MULTIPLIER_MAX` using the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomMultiplier;

impl MultiplierSource for RandomMultiplier {
    fn draw(&self) -> u32 {
        thread_rng().gen_range(MULTIPLIER_MIN..=MULTIPLIER_MAX)
    }
}

/// Always returns the same multiplier.
#[derive(Debug, Clone, Copy)]
pub struct FixedMultiplier(pub u32);

impl MultiplierSource for FixedMultiplier {
    fn draw(&self) -> u32 {
        self.0
    }
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Merge raw countries with exchange rates into storable rows.
///
/// Records without a name or with a missing/negative population are dropped
/// silently. Input order is preserved and nothing is deduplicated; every row
/// gets the same `now`.
pub fn merge(
    raw: &[RawCountry],
    rates: &RateTable,
    now: DateTime<Utc>,
    multiplier: &dyn MultiplierSource,
) -> Vec<Country> {
    raw.iter()
        .filter_map(|record| merge_one(record, rates, now, multiplier))
        .collect()
}

fn merge_one(
    record: &RawCountry,
    rates: &RateTable,
    now: DateTime<Utc>,
    multiplier: &dyn MultiplierSource,
) -> Option<Country> {
    let name = record.name.as_deref().filter(|n| !n.is_empty())?;
    let population = record.population.filter(|p| *p >= 0)?;

    let currency_code = record.currency_code.clone();
    let (exchange_rate, estimated_gdp) = match currency_code.as_deref() {
        None => (None, Some(0.0)),
        Some(code) => match rates.rate(code) {
            None => (None, None),
            Some(rate) => {
                let m = f64::from(multiplier.draw());
                (Some(rate), Some(population as f64 * m / rate))
            }
        },
    };

    Some(Country {
        name: name.to_string(),
        capital: record.capital.clone(),
        region: record.region.clone(),
        population,
        currency_code,
        exchange_rate,
        estimated_gdp,
        flag_url: record.flag_url.clone(),
        last_refreshed_at: now,
    })
}
