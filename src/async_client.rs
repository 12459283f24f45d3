//! Async wrapper around [`CountrySdk`] for use in async runtimes (Tokio, etc.).
//!
//! Runs all SDK operations on a blocking thread pool via
//! [`tokio::task::spawn_blocking`], keeping the async event loop free. The
//! upstream fetches and DuckDB calls are blocking, so they must not run on
//! the event loop directly.
//!
//! # Example
//!
//! ```no_run
//! use country_exchange_sdk::AsyncCountrySdk;
//!
//! #[tokio::main]
//! async fn main() {
//!     let sdk = AsyncCountrySdk::builder().build().await.unwrap();
//!
//!     let outcome = sdk.refresh().await.unwrap();
//!     let chad = sdk.run(|s| s.countries().get("chad")).await.unwrap();
//! }
//! ```

use std::sync::Arc;

use crate::error::{CountryError, Result};
use crate::models::StoreStatus;
use crate::pipeline::RefreshOutcome;
use crate::{CountrySdk, CountrySdkBuilder};

// ---------------------------------------------------------------------------
// AsyncCountrySdkBuilder
// ---------------------------------------------------------------------------

/// Builder for an [`AsyncCountrySdk`]. Wraps the blocking
/// [`CountrySdkBuilder`] so every option it has is available here.
pub struct AsyncCountrySdkBuilder {
    inner: CountrySdkBuilder,
}

impl AsyncCountrySdkBuilder {
    /// Adjust the underlying [`CountrySdkBuilder`].
    pub fn configure<F>(mut self, f: F) -> Self
    where
        F: FnOnce(CountrySdkBuilder) -> CountrySdkBuilder,
    {
        self.inner = f(self.inner);
        self
    }

    /// Build the async SDK.
    ///
    /// Opening the store runs on the blocking thread pool so it won't block
    /// the async event loop.
    pub async fn build(self) -> Result<AsyncCountrySdk> {
        let builder = self.inner;
        let sdk = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(|e| CountryError::Runtime(format!("Task join error: {e}")))??;
        Ok(AsyncCountrySdk {
            inner: Arc::new(sdk),
        })
    }
}

// ---------------------------------------------------------------------------
// AsyncCountrySdk
// ---------------------------------------------------------------------------

/// Async wrapper around [`CountrySdk`].
///
/// The SDK is shared behind an [`Arc`]; it is `Sync`, so concurrent calls
/// run in parallel on the blocking pool.
#[derive(Clone)]
pub struct AsyncCountrySdk {
    inner: Arc<CountrySdk>,
}

impl AsyncCountrySdk {
    pub fn builder() -> AsyncCountrySdkBuilder {
        AsyncCountrySdkBuilder {
            inner: CountrySdk::builder(),
        }
    }

    /// Run a sync SDK operation on the blocking thread pool.
    ///
    /// ```no_run
    /// # use country_exchange_sdk::AsyncCountrySdk;
    /// # async fn example() -> country_exchange_sdk::Result<()> {
    /// # let sdk = AsyncCountrySdk::builder().build().await?;
    /// let total = sdk.run(|s| s.countries().count()).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&CountrySdk) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sdk = self.inner.clone();
        tokio::task::spawn_blocking(move || f(&sdk))
            .await
            .map_err(|e| CountryError::Runtime(format!("Task join error: {e}")))?
    }

    /// Refresh the store from both upstream sources.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.run(|s| Ok(s.refresh())).await
    }

    /// Row count and last refresh time of the store.
    pub async fn status(&self) -> Result<StoreStatus> {
        self.run(|s| s.status()).await
    }
}
