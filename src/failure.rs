// Copyright © 2026 The RBD Engine Contributors

//! Failure-time parameter estimation (C3): turns a component's
//! maintenance history into a reliability value at a given evaluation
//! time, by maximum-likelihood fitting of an exponential or Weibull
//! distribution.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

pub mod history;
pub mod ports;
pub mod weibull;

pub use history::{FailureHistory, FailureRecord};
pub use ports::{CacheEntry, CacheState, FailureCache, FailuresClient, FetchedRecord};

use crate::evaluator::FALLBACK_R;
use crate::graph::DistKind;

const MIN_INTERVALS_FOR_OPT: usize = 2;

/// The moment reliability is evaluated at: either a bare age in days,
/// or a concrete instant resolved against a component's last recorded
/// failure.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EvalTime {
    Age(f64),
    At(DateTime<Utc>),
}

/// The result of estimating a component's reliability.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReliabilityOutcome {
    pub value: f64,
    /// False when the estimate fell back to [`FALLBACK_R`] for lack of
    /// history; the caller sets the component's `conflict` flag from
    /// this.
    pub enough_records: bool,
}

/// Errors that can arise while estimating reliability. Distinct from
/// "not enough records", which is not an error but a degraded
/// [`ReliabilityOutcome`].
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("unknown component '{0}'")]
    UnknownComponent(String),
}

/// Produces a [`ReliabilityOutcome`] for a component at a given time.
pub trait FailureEstimator {
    fn reliability(
        &self,
        component_id: &str,
        dist_kind: DistKind,
        t: EvalTime,
    ) -> Result<ReliabilityOutcome, EstimateError>;
}

/// A [`FailureEstimator`] backed by an in-memory map of
/// [`FailureHistory`] per component id, kept fed by
/// [`ports::reload_failures`] / [`ports::ensure_min_records`].
#[derive(Clone, Debug, Default)]
pub struct HistoryEstimator {
    histories: HashMap<String, FailureHistory>,
}

impl HistoryEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn histories(&self) -> &HashMap<String, FailureHistory> {
        &self.histories
    }

    pub fn set_history(&mut self, component_id: impl Into<String>, history: FailureHistory) {
        self.histories.insert(component_id.into(), history);
    }
}

impl FailureEstimator for HistoryEstimator {
    fn reliability(
        &self,
        component_id: &str,
        dist_kind: DistKind,
        t: EvalTime,
    ) -> Result<ReliabilityOutcome, EstimateError> {
        let history = match self.histories.get(component_id) {
            Some(h) => h,
            None => {
                return Ok(ReliabilityOutcome {
                    value: FALLBACK_R,
                    enough_records: false,
                })
            }
        };

        let age_days = match t {
            EvalTime::Age(days) => days,
            EvalTime::At(instant) => match history.last() {
                None => {
                    return Ok(ReliabilityOutcome {
                        value: FALLBACK_R,
                        enough_records: false,
                    })
                }
                Some(last) => {
                    let raw_days = (instant.date_naive() - last.date).num_days();
                    if raw_days < 0 {
                        return Ok(ReliabilityOutcome {
                            value: 1.0,
                            enough_records: true,
                        });
                    }
                    raw_days as f64
                }
            },
        };

        let intervals = history.intervals();
        if intervals.len() < MIN_INTERVALS_FOR_OPT {
            return Ok(ReliabilityOutcome {
                value: FALLBACK_R,
                enough_records: false,
            });
        }

        let ages: Vec<f64> = intervals.iter().map(|(a, _)| *a).collect();
        let deltas: Vec<f64> = intervals.iter().map(|(_, d)| *d).collect();

        let value = match dist_kind {
            DistKind::Exponential => match weibull::exponential_lambda(&ages) {
                Some(lambda) => weibull::exponential_reliability(lambda, age_days),
                None => FALLBACK_R,
            },
            DistKind::Weibull => match weibull::fit(&ages, &deltas) {
                Some(params) => params.reliability(age_days),
                None => FALLBACK_R,
            },
        };

        Ok(ReliabilityOutcome {
            value,
            enough_records: true,
        })
    }
}
