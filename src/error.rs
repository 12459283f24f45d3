use std::fmt;

/// One of the two upstream datasets a refresh depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Country reference data (names, capitals, populations, currencies).
    Dataset,
    /// Currency exchange rates.
    Rates,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Dataset => f.write_str("dataset source"),
            Source::Rates => f.write_str("rate source"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CountryError {
    #[error("{0} unreachable")]
    UpstreamUnavailable(Source),

    #[error("persistence failure")]
    Persistence,

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, CountryError>;
