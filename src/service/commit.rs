// Copyright © 2026 The RBD Engine Contributors

//! The two external stores a diagram is persisted behind, and the
//! atomic two-store commit protocol that keeps them consistent.
//!
//! `SnapshotStore` and `EventStore` are independent, eventually
//! consistent backing stores. There is no real cross-store transaction;
//! the coordination-id stamp plus bounded-retry validation is the
//! substitute, and `set_ignore_range` rollback is what restores the
//! *logical* invariant when the physical stores can't be rolled back.

use std::thread;
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};

use crate::error::Error;
use crate::event::{Event, Kind};
use crate::graph::GraphData;

/// A single JSON-blob snapshot store: `load()`/`save()`.
pub trait SnapshotStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load(&self) -> Result<Option<GraphData>, Self::Error>;
    fn save(&self, data: &GraphData) -> Result<(), Self::Error>;
}

/// An append-only, versioned event store.
pub trait EventStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// `0` when empty.
    fn head_version(&self) -> Result<i64, Self::Error>;
    /// Appends `events`, returning the count actually written. Must be
    /// atomic within the store.
    fn append(&self, events: &[Event]) -> Result<usize, Self::Error>;
    /// Events in ascending version order, from `from_version` onward
    /// (inclusive) when given.
    fn load(&self, from_version: Option<i64>) -> Result<Vec<Event>, Self::Error>;
}

/// Bounded-retry parameters for the commit protocol's two retry sites:
/// post-write consistency validation, and snapshot-only repair.
///
/// Defaults are grounded in production values: 4 attempts at 2.2s base
/// delay for validation, 3 attempts at 1.2s base delay for repair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn validation() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(2_200),
            backoff_multiplier: 2.0,
        }
    }

    pub fn repair() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1_200),
            backoff_multiplier: 2.0,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * factor)
    }
}

/// The record stamped into every payload of one commit so that
/// consistency can be verified after the writes propagate.
#[derive(Clone, Debug, PartialEq)]
pub struct Coordination {
    pub id: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub expected_events: usize,
    pub head_before: i64,
    pub operation: String,
}

impl Coordination {
    pub fn new(operation: impl Into<String>, head_before: i64, expected_events: usize) -> Self {
        let timestamp = Utc::now();
        let operation = operation.into();
        let id = format!("{operation}-{}-{head_before}", timestamp.to_rfc3339());
        Self {
            id,
            timestamp,
            expected_events,
            head_before,
            operation,
        }
    }

    fn as_json(&self) -> Value {
        json!({
            "id": self.id,
            "timestamp": self.timestamp.to_rfc3339(),
            "expected_events": self.expected_events,
            "head_before": self.head_before,
            "operation": self.operation,
        })
    }
}

/// Sleeps with exponential backoff, calling `attempt` up to
/// `policy.max_attempts` times until it returns `Ok(Some(_))`.
fn retry<T, E>(policy: &RetryPolicy, operation: &str, mut attempt: impl FnMut(u32) -> Result<Option<T>, E>) -> Result<Option<T>, E> {
    for n in 0..policy.max_attempts {
        match attempt(n)? {
            Some(value) => return Ok(Some(value)),
            None => {
                if n + 1 < policy.max_attempts {
                    log::warn!("{operation}: attempt {} of {} did not succeed, retrying", n + 1, policy.max_attempts);
                    thread::sleep(policy.delay_for(n));
                }
            }
        }
    }
    Ok(None)
}

/// Runs the atomic two-store commit protocol:
///
/// 1. Read `head_before` from the event store.
/// 2. Stamp a coordination record into every event and the snapshot.
/// 3. Append events; abort with [`Error::PartialAppend`] on a short write.
/// 4. Save the snapshot.
/// 5. Validate (with bounded retry) that both stores reflect the write.
/// 6. On validation failure, attempt snapshot-only repair; on repair
///    failure, roll back via `set_ignore_range`.
pub fn commit<S, E>(
    snapshot_store: &S,
    event_store: &E,
    operation: &str,
    mut events: Vec<Event>,
    graph_data: GraphData,
    validation_policy: &RetryPolicy,
    repair_policy: &RetryPolicy,
) -> Result<(), Error>
where
    S: SnapshotStore,
    E: EventStore,
{
    let head_before = event_store
        .head_version()
        .map_err(|e| Error::port(operation, e))?;
    let coordination = Coordination::new(operation, head_before, events.len());

    for ev in &mut events {
        ev.coordination = Some(coordination.as_json());
    }
    let mut snapshot = graph_data;
    let mut coordination_json = coordination.as_json();
    coordination_json["events_appended"] = json!(events.len());
    snapshot.set_coordination(coordination_json);
    snapshot.set_saved_at(Utc::now().to_rfc3339());

    log::info!("committing '{operation}': {} event(s), head_before={head_before}", events.len());

    let appended = event_store.append(&events).map_err(|e| Error::port(operation, e))?;
    if appended != events.len() {
        return Err(Error::PartialAppend {
            operation: operation.to_string(),
            expected: events.len(),
            actual: appended,
        });
    }

    if let Err(save_err) = snapshot_store.save(&snapshot) {
        return rollback(event_store, operation, head_before, events.len(), Error::port(operation, save_err));
    }

    match validate(snapshot_store, event_store, operation, &coordination, validation_policy) {
        Ok(()) => {
            log::info!("commit '{operation}' validated");
            Ok(())
        }
        Err(validation_err) => {
            log::warn!("commit '{operation}' failed validation, attempting snapshot-only repair: {validation_err}");
            match repair(snapshot_store, &snapshot, repair_policy) {
                Ok(()) => Ok(()),
                Err(repair_err) => rollback(
                    event_store,
                    operation,
                    head_before,
                    events.len(),
                    Error::CoordinationMismatch {
                        operation: operation.to_string(),
                        message: validation_err.to_string(),
                        cause: Some(Box::new(repair_err)),
                    },
                ),
            }
        }
    }
}

fn validate<S, E>(
    snapshot_store: &S,
    event_store: &E,
    operation: &str,
    coordination: &Coordination,
    policy: &RetryPolicy,
) -> Result<(), Error>
where
    S: SnapshotStore,
    E: EventStore,
{
    let result = retry(policy, operation, |_attempt| -> Result<Option<()>, Error> {
        let snapshot_ok = matches!(
            snapshot_store.load().map_err(|e| Error::port(operation, e))?,
            Some(data) if coordination_matches(data.coordination(), &coordination.id, coordination.expected_events)
        );
        if !snapshot_ok {
            return Ok(None);
        }

        if coordination.expected_events > 0 {
            let events = event_store.load(None).map_err(|e| Error::port(operation, e))?;
            let tail = events.iter().rev().take(coordination.expected_events);
            let events_ok = tail
                .map(|ev| ev.coordination.as_ref())
                .all(|c| c.and_then(|c| c.get("id")).and_then(Value::as_str) == Some(coordination.id.as_str()));
            if !events_ok {
                return Ok(None);
            }
        }
        Ok(Some(()))
    })?;

    result.ok_or_else(|| Error::CoordinationMismatch {
        operation: operation.to_string(),
        message: "snapshot/event consistency did not converge within retry budget".to_string(),
        cause: None,
    })
}

fn coordination_matches(coordination: Option<&Value>, expected_id: &str, expected_events: usize) -> bool {
    let Some(c) = coordination else { return false };
    let id_ok = c.get("id").and_then(Value::as_str) == Some(expected_id);
    let count_ok = c.get("events_appended").and_then(Value::as_u64) == Some(expected_events as u64);
    id_ok && count_ok
}

fn repair<S: SnapshotStore>(snapshot_store: &S, snapshot: &GraphData, policy: &RetryPolicy) -> Result<(), S::Error> {
    let mut last_err = None;
    for attempt in 0..policy.max_attempts {
        match snapshot_store.save(snapshot) {
            Ok(()) => return Ok(()),
            Err(err) => {
                log::warn!("snapshot repair attempt {} of {} failed", attempt + 1, policy.max_attempts);
                last_err = Some(err);
                if attempt + 1 < policy.max_attempts {
                    thread::sleep(policy.delay_for(attempt));
                }
            }
        }
    }
    Err(last_err.expect("loop runs at least once"))
}

fn rollback<E: EventStore>(
    event_store: &E,
    operation: &str,
    head_before: i64,
    expected_events: usize,
    original: Error,
) -> Result<(), Error> {
    let end_v = head_before + expected_events as i64;
    let rollback_event = Event::new(
        "anonymous",
        Utc::now(),
        Kind::SetIgnoreRange {
            start_v: head_before + 1,
            end_v,
        },
    );
    let mut ev = rollback_event;
    ev.version = Some(end_v + 1);

    match event_store.append(std::slice::from_ref(&ev)) {
        Ok(1) => {
            log::warn!("commit '{operation}' failed, rolled back range [{}, {end_v}]", head_before + 1);
            Err(original)
        }
        Ok(_) | Err(_) => Err(Error::Rollback {
            operation: operation.to_string(),
            original_message: original.to_string(),
            rollback_message: "rollback append did not write exactly one event".to_string(),
            retryable: true,
        }),
    }
}
