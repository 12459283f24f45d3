//! Query modules for the country store.
//!
//! Each module provides a query struct that borrows a [`Store`](crate::store::Store)
//! and exposes methods returning `Result<T>` with typed payloads.

pub mod countries;

pub use countries::{CountryQuery, CountrySort, ListCountriesParams};
