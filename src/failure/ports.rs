// Copyright © 2026 The RBD Engine Contributors

//! The two external collaborators a [`super::HistoryEstimator`] is kept
//! fed from: a bulk failure-history cache, and a client that fetches
//! fresh records for a set of component ids. Neither is implemented
//! here — only the trait shape and the two named use-cases
//! (`reload_failures`, `ensure_min_records`) that operate on them.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};

use super::history::{FailureHistory, FailureRecord};
use super::HistoryEstimator;

/// One cached component's rows plus the last refresh time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheEntry {
    pub rows: Vec<(NaiveDate, String)>,
    pub last_update: Option<DateTime<Utc>>,
}

/// The full bulk state a [`FailureCache`] persists.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheState {
    pub items: HashMap<String, CacheEntry>,
}

/// Persists the bulk failure-history cache.
pub trait FailureCache {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<CacheState, Self::Error>;
    fn save(&self, state: &CacheState) -> Result<(), Self::Error>;
}

/// One freshly fetched failure record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedRecord {
    pub component_id: String,
    pub failure_date: NaiveDate,
    pub type_failure: String,
}

/// Fetches fresh failure rows for a set of component ids from whatever
/// system of record backs the failure history (out of scope here).
pub trait FailuresClient {
    type Error: std::error::Error + Send + Sync + 'static;

    fn fetch_for(&self, ids: &[String]) -> Result<Vec<FetchedRecord>, Self::Error>;
}

/// Refresh histories for `ids` unconditionally.
pub fn reload_failures<C: FailuresClient>(
    client: &C,
    estimator: &mut HistoryEstimator,
    ids: &[String],
) -> Result<(), C::Error> {
    log::info!("reloading failure history for {} component(s)", ids.len());
    let rows = client.fetch_for(ids)?;

    let mut grouped: HashMap<String, Vec<FailureRecord>> = HashMap::new();
    for row in rows {
        grouped.entry(row.component_id).or_default().push(FailureRecord {
            date: row.failure_date,
            kind: row.type_failure,
        });
    }
    for (id, records) in grouped {
        log::trace!("refreshed {} record(s) for '{id}'", records.len());
        estimator.set_history(id, FailureHistory::new(records));
    }
    Ok(())
}

/// Refresh only the ids whose cached history has fewer than
/// `min_records` entries.
pub fn ensure_min_records<C: FailuresClient>(
    client: &C,
    estimator: &mut HistoryEstimator,
    ids: &[String],
    min_records: usize,
) -> Result<(), C::Error> {
    let below: Vec<String> = ids
        .iter()
        .filter(|id| {
            estimator
                .histories()
                .get(id.as_str())
                .map(|h| h.records().len())
                .unwrap_or(0)
                < min_records
        })
        .cloned()
        .collect();

    if below.is_empty() {
        return Ok(());
    }
    reload_failures(client, estimator, &below)
}
