// Copyright © 2026 The RBD Engine Contributors

//! The append-only event model (C4's payload half): one tagged variant
//! per mutation kind, plus the common header every event carries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{DistKind, GraphData, Relation};

/// Parameters accepted by [`Kind::EditGate`]; only the fields present
/// are changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GateEditParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The payload of a single event, tagged by mutation kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Kind {
    Snapshot {
        data: GraphData,
    },
    AddRootComponent {
        new_comp_id: String,
        dist_kind: DistKind,
        unit_type: Option<String>,
    },
    AddComponentRelative {
        target_id: String,
        new_comp_id: String,
        relation: Relation,
        dist_kind: DistKind,
        k: Option<u32>,
        unit_type: Option<String>,
    },
    RemoveNode {
        node_id: String,
    },
    EditComponent {
        old_id: String,
        new_id: String,
        dist_kind: DistKind,
    },
    EditGate {
        node_id: String,
        params: GateEditParams,
    },
    /// Legacy local undo marker.
    SetHead {
        upto: i64,
    },
    /// Invalidates the inclusive version range `[start_v, end_v]`.
    SetIgnoreRange {
        start_v: i64,
        end_v: i64,
    },
}

/// A single entry in an [`crate::event_log::EventLog`]: the common
/// header plus a tagged [`Kind`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub ts: DateTime<Utc>,
    pub actor: String,
    /// Assigned monotonically at `base_version + 1, +2, …` by
    /// [`crate::event_log::EventLog::resequence_versions`]; absent on
    /// freshly created events until resequencing seals it.
    pub version: Option<i64>,
    #[serde(flatten)]
    pub kind: Kind,
    /// Stamped by the atomic commit writer; readers ignore it for
    /// replay purposes (see [`crate::service::rebuild`]).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordination: Option<serde_json::Value>,
}

impl Event {
    pub fn new(actor: impl Into<String>, ts: DateTime<Utc>, kind: Kind) -> Self {
        Self {
            ts,
            actor: actor.into(),
            version: None,
            kind,
            coordination: None,
        }
    }
}
