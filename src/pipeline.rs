//! Refresh orchestration: fetch both sources, merge, upsert.
//!
//! [`Pipeline::refresh`] never returns an error. Every failure is folded into
//! a [`RefreshOutcome`] whose `reason` names the failing stage.

use crate::error::CountryError;
use crate::merge::{self, MultiplierSource};
use crate::sources::{self, Upstream};
use crate::store::CountryWriter;
use chrono::{SubsecRound, Utc};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// RefreshOutcome
// ---------------------------------------------------------------------------

/// Result of one refresh, serialized as `{"ok": true, "count": n}` or
/// `{"ok": false, "reason": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    Refreshed { count: usize },
    Failed { reason: String },
}

impl RefreshOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, RefreshOutcome::Refreshed { .. })
    }

    /// Rows written, or `None` for a failed refresh.
    pub fn count(&self) -> Option<usize> {
        match self {
            RefreshOutcome::Refreshed { count } => Some(*count),
            RefreshOutcome::Failed { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            RefreshOutcome::Refreshed { .. } => None,
            RefreshOutcome::Failed { reason } => Some(reason),
        }
    }

    fn failed(err: &CountryError) -> Self {
        RefreshOutcome::Failed {
            reason: err.to_string(),
        }
    }
}

impl Serialize for RefreshOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("RefreshOutcome", 2)?;
        match self {
            RefreshOutcome::Refreshed { count } => {
                s.serialize_field("ok", &true)?;
                s.serialize_field("count", count)?;
            }
            RefreshOutcome::Failed { reason } => {
                s.serialize_field("ok", &false)?;
                s.serialize_field("reason", reason)?;
            }
        }
        s.end()
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct Pipeline {
    upstream: Box<dyn Upstream>,
    writer: Arc<dyn CountryWriter>,
    multiplier: Box<dyn MultiplierSource>,
    /// Held for the whole refresh when refreshes are serialized.
    refresh_lock: Option<Mutex<()>>,
}

impl Pipeline {
    pub fn new(
        upstream: Box<dyn Upstream>,
        writer: Arc<dyn CountryWriter>,
        multiplier: Box<dyn MultiplierSource>,
    ) -> Self {
        Self {
            upstream,
            writer,
            multiplier,
            refresh_lock: None,
        }
    }

    /// Make overlapping [`refresh`](Self::refresh) calls on this pipeline
    /// run one after another.
    pub fn serialize_refreshes(mut self, enabled: bool) -> Self {
        self.refresh_lock = enabled.then(|| Mutex::new(()));
        self
    }

    /// Fetch both sources, merge them and upsert the result.
    ///
    /// The store is only touched when both fetches succeeded and at least
    /// one record survived the merge.
    pub fn refresh(&self) -> RefreshOutcome {
        let _guard = self
            .refresh_lock
            .as_ref()
            .map(|lock| lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner()));

        let (raw, rates) = match sources::fetch_all(self.upstream.as_ref()) {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(error = %e, "refresh aborted before merge");
                return RefreshOutcome::failed(&e);
            }
        };

        let now = Utc::now().trunc_subsecs(6);
        let countries = merge::merge(&raw, &rates, now, self.multiplier.as_ref());
        info!(
            fetched = raw.len(),
            rates = rates.len(),
            merged = countries.len(),
            skipped = raw.len() - countries.len(),
            "merged country dataset"
        );

        if countries.is_empty() {
            return RefreshOutcome::Refreshed { count: 0 };
        }

        match self.writer.upsert_all(&countries) {
            Ok(count) => {
                info!(count, "refresh complete");
                RefreshOutcome::Refreshed { count }
            }
            Err(e) => {
                warn!(error = %e, "refresh failed to persist");
                RefreshOutcome::failed(&CountryError::Persistence)
            }
        }
    }
}
