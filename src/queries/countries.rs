//! Read and delete operations on the stored countries.

use std::fmt;
use std::str::FromStr;

use crate::config::COUNTRIES_TABLE;
use crate::error::{CountryError, Result};
use crate::models::{Country, StoreStatus};
use crate::sql_builder::SqlBuilder;
use crate::store::Store;

// ---------------------------------------------------------------------------
// CountrySort
// ---------------------------------------------------------------------------

/// Sort orders accepted by [`CountryQuery::list`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountrySort {
    /// Highest estimated GDP first; countries without an estimate last.
    GdpDesc,
    /// Lowest estimated GDP first; countries without an estimate last.
    GdpAsc,
    Name,
}

impl CountrySort {
    fn order_clause(self) -> &'static str {
        match self {
            CountrySort::GdpDesc => "estimated_gdp DESC NULLS LAST",
            CountrySort::GdpAsc => "estimated_gdp ASC NULLS LAST",
            CountrySort::Name => "name ASC",
        }
    }
}

impl FromStr for CountrySort {
    type Err = CountryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gdp_desc" => Ok(CountrySort::GdpDesc),
            "gdp_asc" => Ok(CountrySort::GdpAsc),
            "name" => Ok(CountrySort::Name),
            other => Err(CountryError::InvalidArgument(format!(
                "unknown sort '{}' (expected gdp_desc, gdp_asc or name)",
                other
            ))),
        }
    }
}

impl fmt::Display for CountrySort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CountrySort::GdpDesc => "gdp_desc",
            CountrySort::GdpAsc => "gdp_asc",
            CountrySort::Name => "name",
        })
    }
}

// ---------------------------------------------------------------------------
// ListCountriesParams
// ---------------------------------------------------------------------------

/// Filters for [`CountryQuery::list`]. All fields are optional.
#[derive(Debug, Clone, Default)]
pub struct ListCountriesParams {
    /// Exact match on `region`.
    pub region: Option<String>,
    /// Exact match on `currency_code`.
    pub currency: Option<String>,
    pub sort: Option<CountrySort>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// ---------------------------------------------------------------------------
// CountryQuery
// ---------------------------------------------------------------------------

/// Query interface over the `countries` table.
pub struct CountryQuery<'a> {
    store: &'a Store,
}

impl<'a> CountryQuery<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Get a country by name, ignoring case.
    ///
    /// Names differing only in case resolve to the first in byte order.
    pub fn get(&self, name: &str) -> Result<Option<Country>> {
        let (sql, params) = SqlBuilder::new(COUNTRIES_TABLE)
            .where_eq_ignore_case("name", name)
            .order_by(&["name ASC"])
            .limit(1)
            .build();

        let rows: Vec<Country> = self.store.execute_into(&sql, &params)?;
        Ok(rows.into_iter().next())
    }

    /// List countries, optionally filtered by region and currency.
    ///
    /// Without an explicit sort the rows come back ordered by name.
    pub fn list(&self, params: &ListCountriesParams) -> Result<Vec<Country>> {
        let mut qb = SqlBuilder::new(COUNTRIES_TABLE);

        if let Some(ref region) = params.region {
            qb.where_eq("region", region);
        }
        if let Some(ref currency) = params.currency {
            qb.where_eq("currency_code", currency);
        }

        match params.sort {
            Some(CountrySort::Name) | None => qb.order_by(&[CountrySort::Name.order_clause()]),
            Some(sort) => qb.order_by(&[sort.order_clause(), "name ASC"]),
        };

        if let Some(l) = params.limit {
            qb.limit(l);
        }
        if let Some(o) = params.offset {
            qb.offset(o);
        }

        let (sql, sql_params) = qb.build();
        self.store.execute_into(&sql, &sql_params)
    }

    /// Delete a country by name, ignoring case.
    ///
    /// Returns `false` when nothing matched.
    pub fn delete(&self, name: &str) -> Result<bool> {
        let sql = format!("DELETE FROM {} WHERE LOWER(name) = LOWER(?)", COUNTRIES_TABLE);
        let removed = self.store.execute_update(&sql, &[name.to_string()])?;
        Ok(removed > 0)
    }

    /// Number of stored countries.
    pub fn count(&self) -> Result<i64> {
        let (sql, params) = SqlBuilder::new(COUNTRIES_TABLE)
            .select(&["COUNT(*) AS cnt"])
            .build();

        Ok(self
            .store
            .execute_scalar(&sql, &params)?
            .and_then(|v| v.as_i64())
            .unwrap_or(0))
    }

    /// Row count plus the most recent refresh timestamp.
    pub fn status(&self) -> Result<StoreStatus> {
        let (sql, params) = SqlBuilder::new(COUNTRIES_TABLE)
            .select(&[
                "COUNT(*) AS total_countries",
                "MAX(last_refreshed_at) AS last_refreshed_at",
            ])
            .build();

        let rows: Vec<StoreStatus> = self.store.execute_into(&sql, &params)?;
        rows.into_iter()
            .next()
            .ok_or_else(|| CountryError::NotFound("status aggregate returned no row".into()))
    }
}
