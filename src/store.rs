//! DuckDB-backed country store.
//!
//! Wraps an `r2d2` pool of connections to one DuckDB database. Every query
//! and every upsert checks a connection out of the pool and returns it when
//! the guard drops, whichever way the call exits.

use crate::config::{COUNTRIES_TABLE, COUNTRY_COLUMNS};
use crate::error::{CountryError, Result};
use crate::models::Country;
use chrono::{DateTime, SecondsFormat, Utc};
use duckdb::types::{TimeUnit, Value, ValueRef};
use duckdb::DuckdbConnectionManager;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, error, info};

type Pool = r2d2::Pool<DuckdbConnectionManager>;

/// Receives the merged rows of a refresh.
pub trait CountryWriter: Send + Sync {
    /// Insert or fully overwrite every row, keyed by name, in one
    /// transaction. Returns the number of rows written.
    fn upsert_all(&self, countries: &[Country]) -> Result<usize>;
}

/// Handle to the country database. Cloning shares the pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
}

impl Store {
    /// Open (creating if needed) a database file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, pool_size: u32) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let manager = DuckdbConnectionManager::file(path)?;
        let store = Self::from_manager(manager, pool_size)?;
        info!(path = %path.display(), "opened country store");
        Ok(store)
    }

    /// Open a private in-memory database shared by all pooled connections.
    pub fn in_memory(pool_size: u32) -> Result<Self> {
        let manager = DuckdbConnectionManager::memory()?;
        Self::from_manager(manager, pool_size)
    }

    fn from_manager(manager: DuckdbConnectionManager, pool_size: u32) -> Result<Self> {
        let pool = r2d2::Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)?;
        let store = Self { pool };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        // No secondary indexes: DuckDB rejects ON CONFLICT DO UPDATE on
        // indexed columns.
        let conn = self.pool.get()?;
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {COUNTRIES_TABLE} (\
               name VARCHAR PRIMARY KEY, \
               capital VARCHAR, \
               region VARCHAR, \
               population BIGINT NOT NULL, \
               currency_code VARCHAR, \
               exchange_rate DOUBLE, \
               estimated_gdp DOUBLE, \
               flag_url VARCHAR, \
               last_refreshed_at TIMESTAMP\
             )"
        ))?;
        Ok(())
    }

    /// Execute SQL and return results as a `Vec` of `HashMap`s.
    ///
    /// DuckDB values are converted to `serde_json::Value`; timestamps become
    /// RFC 3339 strings.
    pub fn execute(
        &self,
        sql: &str,
        params: &[String],
    ) -> Result<Vec<HashMap<String, serde_json::Value>>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;

        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows_result = stmt.query(param_values.as_slice())?;

        // Column metadata is only available once the statement has run.
        let executed = rows_result
            .as_ref()
            .ok_or_else(|| CountryError::InvalidArgument("statement did not execute".into()))?;
        let column_names: Vec<String> = executed
            .column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();

        let mut out: Vec<HashMap<String, serde_json::Value>> = Vec::new();

        while let Some(row) = rows_result.next()? {
            let mut map = HashMap::with_capacity(column_names.len());
            for (i, col_name) in column_names.iter().enumerate() {
                map.insert(col_name.clone(), convert_value_ref(row.get_ref(i)?));
            }
            out.push(map);
        }

        Ok(out)
    }

    /// Execute SQL and deserialize each row into type `T`.
    pub fn execute_into<T: DeserializeOwned>(&self, sql: &str, params: &[String]) -> Result<Vec<T>> {
        let rows = self.execute(sql, params)?;
        let mut results = Vec::with_capacity(rows.len());
        for row in rows {
            let value = serde_json::Value::Object(row.into_iter().collect());
            results.push(serde_json::from_value(value)?);
        }
        Ok(results)
    }

    /// Execute SQL and return the first column of the first row.
    pub fn execute_scalar(&self, sql: &str, params: &[String]) -> Result<Option<serde_json::Value>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();

        let mut rows = stmt.query(param_values.as_slice())?;

        if let Some(row) = rows.next()? {
            Ok(Some(convert_value_ref(row.get_ref(0)?)))
        } else {
            Ok(None)
        }
    }

    /// Execute a data-modifying statement and return the affected row count.
    pub fn execute_update(&self, sql: &str, params: &[String]) -> Result<usize> {
        let conn = self.pool.get()?;
        let param_values: Vec<&dyn duckdb::ToSql> = params
            .iter()
            .map(|p| p as &dyn duckdb::ToSql)
            .collect();
        Ok(conn.execute(sql, param_values.as_slice())?)
    }

    /// Run one or more statements without parameters or results.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.pool.get()?.execute_batch(sql)?;
        Ok(())
    }

    fn write_batch(&self, countries: &[Country]) -> Result<usize> {
        // One row per key per batch, otherwise the batch is not all-or-nothing.
        let mut seen = HashSet::with_capacity(countries.len());
        if let Some(dup) = countries.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(CountryError::InvalidArgument(format!(
                "country '{}' appears more than once in the batch",
                dup.name
            )));
        }

        let (sql, values) = upsert_statement(countries);
        let mut conn = self.pool.get()?;
        let tx = conn.transaction()?;
        tx.execute(&sql, duckdb::params_from_iter(values))?;
        tx.commit()?;
        Ok(countries.len())
    }
}

impl CountryWriter for Store {
    fn upsert_all(&self, countries: &[Country]) -> Result<usize> {
        if countries.is_empty() {
            return Ok(0);
        }
        match self.write_batch(countries) {
            Ok(count) => {
                debug!(count, "upserted countries");
                Ok(count)
            }
            Err(e) => {
                error!(error = %e, rows = countries.len(), "country upsert rolled back");
                Err(CountryError::Persistence)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Upsert statement
// ---------------------------------------------------------------------------

/// Build one multi-row `INSERT ... ON CONFLICT (name) DO UPDATE` and its
/// flattened parameter list (9 values per row, in `COUNTRY_COLUMNS` order).
fn upsert_statement(countries: &[Country]) -> (String, Vec<Value>) {
    let row_placeholders = format!("({})", vec!["?"; COUNTRY_COLUMNS.len()].join(", "));
    let placeholders = vec![row_placeholders.as_str(); countries.len()].join(", ");

    let assignments = COUNTRY_COLUMNS[1..]
        .iter()
        .map(|col| format!("{col} = EXCLUDED.{col}"))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "INSERT INTO {COUNTRIES_TABLE} ({}) VALUES {placeholders} \
         ON CONFLICT (name) DO UPDATE SET {assignments}",
        COUNTRY_COLUMNS.join(", ")
    );

    let mut values = Vec::with_capacity(countries.len() * COUNTRY_COLUMNS.len());
    for c in countries {
        values.push(Value::Text(c.name.clone()));
        values.push(opt_text(&c.capital));
        values.push(opt_text(&c.region));
        values.push(Value::BigInt(c.population));
        values.push(opt_text(&c.currency_code));
        values.push(opt_double(c.exchange_rate));
        values.push(opt_double(c.estimated_gdp));
        values.push(opt_text(&c.flag_url));
        values.push(Value::Timestamp(
            TimeUnit::Microsecond,
            c.last_refreshed_at.timestamp_micros(),
        ));
    }

    (sql, values)
}

fn opt_text(value: &Option<String>) -> Value {
    value.clone().map(Value::Text).unwrap_or(Value::Null)
}

fn opt_double(value: Option<f64>) -> Value {
    value.map(Value::Double).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Value conversion
// ---------------------------------------------------------------------------

/// Convert a DuckDB `ValueRef` to a `serde_json::Value`.
fn convert_value_ref(val: ValueRef<'_>) -> serde_json::Value {
    match val {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::SmallInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Int(n) => serde_json::Value::Number(n.into()),
        ValueRef::BigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::HugeInt(n) => match i64::try_from(n) {
            Ok(i) => serde_json::Value::Number(i.into()),
            Err(_) => serde_json::Value::String(n.to_string()),
        },
        ValueRef::UBigInt(n) => serde_json::Value::Number(n.into()),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => serde_json::Value::String(String::from_utf8_lossy(bytes).to_string()),
        ValueRef::Timestamp(unit, raw) => timestamp_to_utc(unit, raw)
            .map(|ts| serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)))
            .unwrap_or(serde_json::Value::Null),
        _ => serde_json::Value::Null,
    }
}

fn timestamp_to_utc(unit: TimeUnit, raw: i64) -> Option<DateTime<Utc>> {
    match unit {
        TimeUnit::Second => DateTime::<Utc>::from_timestamp(raw, 0),
        TimeUnit::Millisecond => DateTime::<Utc>::from_timestamp_millis(raw),
        TimeUnit::Microsecond => DateTime::<Utc>::from_timestamp_micros(raw),
        TimeUnit::Nanosecond => Some(DateTime::<Utc>::from_timestamp_nanos(raw)),
    }
}
