// Copyright © 2026 The RBD Engine Contributors

//! GraphService (C5): applies mutations to a [`Graph`] by emitting
//! [`Event`]s into an [`EventLog`], rebuilds the graph from events
//! under the ignore-range/head policy, and coordinates the atomic
//! cloud commit.

pub mod commit;
pub mod draft;
pub mod rebuild;

pub use commit::{Coordination, EventStore, RetryPolicy, SnapshotStore};
pub use draft::{Draft, DraftMeta};

use chrono::Utc;

use crate::error::Error;
use crate::event::{Event, GateEditParams, Kind};
use crate::event_log::EventLog;
use crate::failure::{EvalTime, FailureEstimator};
use crate::graph::{Component, DistKind, Error as GraphError, Graph, GraphData, Node, Relation};

/// One diagram's service-level state: the in-memory graph, an optional
/// local event log (absent for a read-only / replay-only view), the
/// last known committed remote snapshot, and the actor attributed to
/// locally emitted events.
pub struct GraphService {
    graph: Graph,
    event_log: Option<EventLog>,
    cloud_baseline: Option<GraphData>,
    actor: String,
}

impl GraphService {
    pub fn new(auto_normalize: bool) -> Self {
        Self {
            graph: Graph::new(auto_normalize),
            event_log: None,
            cloud_baseline: None,
            actor: "anonymous".to_string(),
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Enable local event logging, based on the given remote version.
    pub fn with_event_log(mut self, base_version: Option<i64>) -> Self {
        self.event_log = Some(EventLog::new(base_version));
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn event_log(&self) -> Option<&EventLog> {
        self.event_log.as_ref()
    }

    pub fn cloud_baseline(&self) -> Option<&GraphData> {
        self.cloud_baseline.as_ref()
    }

    fn record(&mut self, kind: Kind) {
        if let Some(log) = &mut self.event_log {
            log.append(Event::new(self.actor.clone(), Utc::now(), kind));
        }
    }

    pub fn add_root_component(
        &mut self,
        new_comp_id: impl Into<String>,
        dist_kind: DistKind,
        unit_type: Option<String>,
    ) -> Result<(), GraphError> {
        let id = new_comp_id.into();
        self.graph
            .add_node(id.clone(), Node::Component(Component::new(dist_kind, unit_type.clone())))?;
        self.record(Kind::AddRootComponent {
            new_comp_id: id,
            dist_kind,
            unit_type,
        });
        Ok(())
    }

    pub fn add_series(
        &mut self,
        target_id: &str,
        new_comp_id: impl Into<String>,
        dist_kind: DistKind,
        unit_type: Option<String>,
    ) -> Result<(), GraphError> {
        self.add_relative(target_id, new_comp_id, Relation::Series, dist_kind, None, unit_type)
    }

    pub fn add_parallel(
        &mut self,
        target_id: &str,
        new_comp_id: impl Into<String>,
        dist_kind: DistKind,
        unit_type: Option<String>,
    ) -> Result<(), GraphError> {
        self.add_relative(target_id, new_comp_id, Relation::Parallel, dist_kind, None, unit_type)
    }

    pub fn add_koon(
        &mut self,
        target_id: &str,
        new_comp_id: impl Into<String>,
        dist_kind: DistKind,
        k: u32,
        unit_type: Option<String>,
    ) -> Result<(), GraphError> {
        self.add_relative(target_id, new_comp_id, Relation::Koon, dist_kind, Some(k), unit_type)
    }

    fn add_relative(
        &mut self,
        target_id: &str,
        new_comp_id: impl Into<String>,
        relation: Relation,
        dist_kind: DistKind,
        k: Option<u32>,
        unit_type: Option<String>,
    ) -> Result<(), GraphError> {
        let new_id = new_comp_id.into();
        self.graph
            .add_component_relative(target_id, &new_id, relation, dist_kind, k, unit_type.clone())?;
        self.record(Kind::AddComponentRelative {
            target_id: target_id.to_string(),
            new_comp_id: new_id,
            relation,
            dist_kind,
            k,
            unit_type,
        });
        Ok(())
    }

    pub fn remove_node(&mut self, node_id: &str) -> Result<(), GraphError> {
        self.graph.remove_node(node_id)?;
        self.record(Kind::RemoveNode {
            node_id: node_id.to_string(),
        });
        Ok(())
    }

    pub fn edit_component(&mut self, old_id: &str, new_id: &str, dist_kind: DistKind) -> Result<(), GraphError> {
        self.graph.edit_component(old_id, new_id, dist_kind)?;
        self.record(Kind::EditComponent {
            old_id: old_id.to_string(),
            new_id: new_id.to_string(),
            dist_kind,
        });
        Ok(())
    }

    pub fn edit_gate(&mut self, node_id: &str, k: Option<i64>, name: Option<String>, label: Option<String>) -> Result<(), GraphError> {
        self.graph.edit_gate(node_id, k, name.clone(), label.clone())?;
        self.record(Kind::EditGate {
            node_id: node_id.to_string(),
            params: GateEditParams { k, name, label },
        });
        Ok(())
    }

    /// Append a `snapshot` event capturing the current graph, without
    /// otherwise mutating it.
    pub fn snapshot(&mut self) {
        let data = self.graph.to_data();
        self.record(Kind::Snapshot { data });
    }

    /// Undo the last local mutation, replaying the graph from the
    /// cloud baseline plus the (now shorter) active event prefix.
    /// Returns whether the head moved.
    #[must_use]
    pub fn undo(&mut self) -> bool {
        let moved = self.event_log.as_mut().map(EventLog::undo).unwrap_or(false);
        if moved {
            self.sync_from_baseline();
        }
        moved
    }

    /// Redo the next undone mutation. Returns whether the head moved.
    #[must_use]
    pub fn redo(&mut self) -> bool {
        let moved = self.event_log.as_mut().map(EventLog::redo).unwrap_or(false);
        if moved {
            self.sync_from_baseline();
        }
        moved
    }

    /// `graph := rebuild([synthetic_snapshot(cloud_baseline)] ++ active_events)`.
    fn sync_from_baseline(&mut self) {
        let mut events = Vec::new();
        if let Some(baseline) = &self.cloud_baseline {
            events.push(Event::new(self.actor.clone(), Utc::now(), Kind::Snapshot { data: baseline.clone() }));
        }
        if let Some(log) = &self.event_log {
            events.extend(log.active().iter().cloned());
        }
        self.graph = rebuild::rebuild(&events);
    }

    /// Evaluate, resequence local events against the remote head, and
    /// atomically commit the snapshot and event list. On success,
    /// `cloud_baseline` is updated and the local log is cleared.
    pub fn commit<S, E>(
        &mut self,
        snapshot_store: &S,
        event_store: &E,
        estimator: &dyn FailureEstimator,
        t: EvalTime,
        validation_policy: &RetryPolicy,
        repair_policy: &RetryPolicy,
    ) -> Result<(), Error>
    where
        S: SnapshotStore,
        E: EventStore,
    {
        crate::evaluator::evaluate(&mut self.graph, estimator, t);

        let head = event_store.head_version().map_err(|e| Error::port("commit", e))?;
        let log = self.event_log.get_or_insert_with(|| EventLog::new(Some(head)));
        log.resequence_versions(head);
        let events = log.active().to_vec();

        commit::commit(
            snapshot_store,
            event_store,
            "commit",
            events,
            self.graph.to_data(),
            validation_policy,
            repair_policy,
        )?;

        self.cloud_baseline = Some(self.graph.to_data());
        if let Some(log) = &mut self.event_log {
            log.clear();
        }
        Ok(())
    }

    /// Rewind official history to version `v`: replay the remote log up
    /// to `v`, then publish that state as a fresh head (see
    /// [`rebuild::rebuild_to_version`]). Clears the local draft and
    /// reloads remote state on success.
    pub fn rebuild_to_version<S, E>(&mut self, snapshot_store: &S, event_store: &E, v: i64) -> Result<(), Error>
    where
        S: SnapshotStore,
        E: EventStore,
    {
        let head_prev = event_store.head_version().map_err(|e| Error::port("rebuild_to_version", e))?;
        let events = event_store.load(None).map_err(|e| Error::port("rebuild_to_version", e))?;
        let (rebuilt, new_events) = rebuild::rebuild_to_version(&events, v, head_prev, &self.actor, Utc::now());

        log::info!("rebuilding to version {v} (head_prev={head_prev})");
        let appended = event_store.append(&new_events).map_err(|e| Error::port("rebuild_to_version", e))?;
        if appended != new_events.len() {
            return Err(Error::PartialAppend {
                operation: "rebuild_to_version".to_string(),
                expected: new_events.len(),
                actual: appended,
            });
        }
        snapshot_store
            .save(&rebuilt.to_data())
            .map_err(|e| Error::port("rebuild_to_version", e))?;

        self.cloud_baseline = Some(rebuilt.to_data());
        if let Some(log) = &mut self.event_log {
            log.clear();
        }
        self.graph = rebuilt;
        Ok(())
    }

    /// Capture the current state as a [`Draft`], resequencing local
    /// events against `event_store`'s current head.
    pub fn capture_draft<E: EventStore>(&mut self, event_store: &E, name: Option<String>) -> Result<Draft, Error> {
        let head = event_store.head_version().map_err(|e| Error::port("capture_draft", e))?;
        let log = self.event_log.get_or_insert_with(|| EventLog::new(Some(head)));
        Ok(draft::capture_state(&self.graph, log, head, name, Some(Utc::now().to_rfc3339())))
    }

    /// Apply a previously captured draft, discarding it instead if it
    /// is stale against `current_cloud_head`.
    pub fn apply_draft(&mut self, draft: &Draft, current_cloud_head: i64) -> bool {
        if draft::is_stale(draft, current_cloud_head) {
            log::warn!("discarding stale draft (base_version={:?}, current_head={current_cloud_head})", draft.meta.base_version);
            return false;
        }
        let log = self.event_log.get_or_insert_with(|| EventLog::new(None));
        let base = draft::apply_draft(draft, &mut self.graph, log);
        self.cloud_baseline = Some(draft.snapshot.clone());
        log::info!("applied draft with base_version={base:?}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_redo_replay_matches_direct_mutation() {
        let mut svc = GraphService::new(true).with_event_log(None);
        svc.add_root_component("A", DistKind::Exponential, None).unwrap();
        svc.add_series("A", "B", DistKind::Exponential, None).unwrap();
        assert_eq!(svc.graph().to_expression(), "(A & B)");

        assert!(svc.undo());
        assert_eq!(svc.graph().root(), Some("A"));
        assert_eq!(svc.graph().to_expression(), "A");

        assert!(svc.redo());
        assert_eq!(svc.graph().to_expression(), "(A & B)");

        assert!(!svc.redo());
    }

    #[test]
    fn append_after_undo_prunes_redo_tail_from_replay() {
        let mut svc = GraphService::new(true).with_event_log(None);
        svc.add_root_component("A", DistKind::Exponential, None).unwrap();
        svc.add_series("A", "B", DistKind::Exponential, None).unwrap();
        svc.undo();
        svc.add_series("A", "C", DistKind::Exponential, None).unwrap();

        assert!(!svc.redo());
        assert_eq!(svc.graph().to_expression(), "(A & C)");
    }
}
