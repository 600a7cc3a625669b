// Copyright © 2026 The RBD Engine Contributors

//! The local "draft" tier: a client-saveable snapshot of the current
//! local state (baseline + active events) that can later be reloaded
//! to resume work, subject to a staleness check against the remote
//! head.

use crate::event::Event;
use crate::event_log::EventLog;
use crate::graph::{Graph, GraphData};

/// Metadata accompanying a saved draft.
#[derive(Clone, Debug, PartialEq)]
pub struct DraftMeta {
    pub base_version: Option<i64>,
    pub name: Option<String>,
    pub saved_at: Option<String>,
}

/// A persisted `(snapshot, active_events, meta)` triple.
#[derive(Clone, Debug, PartialEq)]
pub struct Draft {
    pub snapshot: GraphData,
    pub active_events: Vec<Event>,
    pub meta: DraftMeta,
}

/// Capture the current graph and event log into a [`Draft`], resequencing
/// the log's active events against `cloud_head` first.
pub fn capture_state(graph: &Graph, log: &mut EventLog, cloud_head: i64, name: Option<String>, saved_at: Option<String>) -> Draft {
    log.resequence_versions(cloud_head);
    Draft {
        snapshot: graph.to_data(),
        active_events: log.active().to_vec(),
        meta: DraftMeta {
            base_version: Some(cloud_head),
            name,
            saved_at,
        },
    }
}

/// Restore `graph` and `log` from a draft. Installs the draft's events
/// into the log, resequencing their versions starting at
/// `draft.meta.base_version`, and returns the baseline version the
/// caller should rebase `cloud_baseline` to.
pub fn apply_draft(draft: &Draft, graph: &mut Graph, log: &mut EventLog) -> Option<i64> {
    *graph = Graph::from_data(&draft.snapshot);
    log.replace(draft.active_events.clone());
    if let Some(base) = draft.meta.base_version {
        log.resequence_versions(base);
    }
    draft.meta.base_version
}

/// A draft is stale once the remote head has moved past the version it
/// was captured against; loading a stale draft should be discarded by
/// the caller rather than applied.
pub fn is_stale(draft: &Draft, current_cloud_head: i64) -> bool {
    draft.meta.base_version != Some(current_cloud_head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Kind;
    use crate::graph::{Component, DistKind, Node};
    use chrono::Utc;

    #[test]
    fn round_trips_graph_and_events_through_a_draft() {
        let mut graph = Graph::new(false);
        graph.add_node("A", Node::Component(Component::new(DistKind::Exponential, None))).unwrap();

        let mut log = EventLog::new(None);
        log.append(Event::new(
            "anonymous",
            Utc::now(),
            Kind::AddRootComponent {
                new_comp_id: "A".to_string(),
                dist_kind: DistKind::Exponential,
                unit_type: None,
            },
        ));

        let draft = capture_state(&graph, &mut log, 5, None, None);
        assert_eq!(draft.meta.base_version, Some(5));
        assert_eq!(draft.active_events[0].version, Some(6));

        let mut graph2 = Graph::new(false);
        let mut log2 = EventLog::new(None);
        let base = apply_draft(&draft, &mut graph2, &mut log2);
        assert_eq!(base, Some(5));
        assert_eq!(graph2.root(), Some("A"));
        assert_eq!(log2.active().len(), 1);
    }

    #[test]
    fn stale_when_base_version_mismatches_cloud_head() {
        let draft = Draft {
            snapshot: Graph::new(false).to_data(),
            active_events: Vec::new(),
            meta: DraftMeta {
                base_version: Some(3),
                name: None,
                saved_at: None,
            },
        };
        assert!(is_stale(&draft, 4));
        assert!(!is_stale(&draft, 3));
    }
}
