use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// RawCountry: one element of the country dataset, before merging
// ---------------------------------------------------------------------------

/// A country as delivered by the dataset source.
///
/// Parsing is tolerant: a record whose `name` or `population` is missing or
/// malformed still parses, with the field left as `None`, so the merge stage
/// can drop it without failing the whole dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCountry {
    pub name: Option<String>,
    pub capital: Option<String>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub flag_url: Option<String>,
    /// Code of the first listed currency.
    pub currency_code: Option<String>,
}

impl RawCountry {
    /// Extract a raw country from one JSON object of the dataset response.
    ///
    /// Accepts both the flat shape (`"name": "Chad"`, `"capital": "N'Djamena"`)
    /// and the nested shape newer API versions use (`"name": {"common": ...}`,
    /// `"capital": [...]`). Empty strings are treated as absent.
    pub fn from_value(value: &Value) -> Self {
        let name = match value.get("name") {
            Some(Value::Object(names)) => names.get("common").and_then(non_empty_str),
            Some(other) => non_empty_str(other),
            None => None,
        };

        let capital = match value.get("capital") {
            Some(Value::Array(items)) => items.first().and_then(non_empty_str),
            Some(other) => non_empty_str(other),
            None => None,
        };

        let currency_code = value
            .get("currencies")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.get("code"))
            .and_then(non_empty_str);

        Self {
            name,
            capital,
            region: value.get("region").and_then(non_empty_str),
            population: value.get("population").and_then(population_from_value),
            flag_url: value.get("flag").and_then(non_empty_str),
            currency_code,
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Integral JSON numbers only; `"1000"` or `12.5` are not populations.
fn population_from_value(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// RateTable: exchange rates keyed by currency code
// ---------------------------------------------------------------------------

/// Exchange rates relative to the rate source's base currency.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

impl RateTable {
    /// Look up a usable rate. Zero, negative and non-finite rates count as
    /// unresolved.
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self {
            rates: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
