// Copyright © 2026 The RBD Engine Contributors

use serde::{Deserialize, Serialize};

/// The failure-time distribution family assigned to a [`Component`].
///
/// Parameters are never stored on the node itself: they are re-estimated
/// at evaluation time from the component's failure history (see
/// [`crate::failure`]). Only the *kind* of distribution is persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistKind {
    Exponential,
    Weibull,
}

/// The subtype of a gate, i.e. how it combines its children's
/// reliabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateSubtype {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
    #[serde(rename = "KOON")]
    Koon,
}

/// The relation used by [`crate::graph::Graph::add_component_relative`] to
/// attach a new component next to an existing node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    Series,
    Parallel,
    Koon,
}

impl Relation {
    /// The gate subtype that realizes this relation.
    pub fn gate_type(self) -> GateSubtype {
        match self {
            Relation::Series => GateSubtype::And,
            Relation::Parallel => GateSubtype::Or,
            Relation::Koon => GateSubtype::Koon,
        }
    }
}

/// A leaf of the graph: a physical asset with a failure-time distribution.
#[derive(Clone, Debug, PartialEq)]
pub struct Component {
    pub dist_kind: DistKind,
    pub unit_type: Option<String>,
    pub reliability: Option<f64>,
    /// True when the failure history was too thin to estimate parameters,
    /// i.e. the component is evaluated against [`crate::evaluator::FALLBACK_R`].
    pub conflict: bool,
}

impl Component {
    pub fn new(dist_kind: DistKind, unit_type: Option<String>) -> Self {
        Self {
            dist_kind,
            unit_type,
            reliability: None,
            conflict: false,
        }
    }
}

/// An internal node that combines its children's reliabilities.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    pub subtype: GateSubtype,
    /// Required iff `subtype == Koon`, `1 <= k <= child_count` once
    /// children exist.
    pub k: Option<u32>,
    pub name: Option<String>,
    pub label: Option<String>,
    /// A stable token identifying this gate across edits, independent of
    /// its `id` (which may be renamed). Random, not content-addressed,
    /// since there is no backing git store to derive it from.
    pub guid: String,
    pub reliability: Option<f64>,
}

impl Gate {
    pub fn new(id: &str, subtype: GateSubtype, k: Option<u32>) -> Self {
        Self {
            subtype,
            k,
            name: Some(id.to_string()),
            label: Some(id.to_string()),
            guid: new_gate_guid(),
            reliability: None,
        }
    }
}

/// Generate a random, stable-for-the-gate's-lifetime guid.
///
/// Under the `stable-guids` feature (tests only) this is deterministic so
/// that fixtures can assert on exact serialized output.
pub fn new_gate_guid() -> String {
    #[cfg(feature = "stable-guids")]
    {
        "00000000000000000000000000000000".to_string()
    }
    #[cfg(not(feature = "stable-guids"))]
    {
        format!("{:016x}{:016x}", fastrand::u64(..), fastrand::u64(..))
    }
}

/// Tagged union of the two node variants. Both share an `id` (managed by
/// the owning [`crate::graph::Graph`], not stored here) and dispatch on
/// `subtype`/kind rather than through virtual methods.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Component(Component),
    Gate(Gate),
}

impl Node {
    pub fn is_component(&self) -> bool {
        matches!(self, Node::Component(_))
    }

    pub fn is_gate(&self) -> bool {
        matches!(self, Node::Gate(_))
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            Node::Component(c) => Some(c),
            Node::Gate(_) => None,
        }
    }

    pub fn as_component_mut(&mut self) -> Option<&mut Component> {
        match self {
            Node::Component(c) => Some(c),
            Node::Gate(_) => None,
        }
    }

    pub fn as_gate(&self) -> Option<&Gate> {
        match self {
            Node::Gate(g) => Some(g),
            Node::Component(_) => None,
        }
    }

    pub fn as_gate_mut(&mut self) -> Option<&mut Gate> {
        match self {
            Node::Gate(g) => Some(g),
            Node::Component(_) => None,
        }
    }

    pub fn is_gate_of(&self, subtype: GateSubtype) -> bool {
        matches!(self, Node::Gate(g) if g.subtype == subtype)
    }

    /// Clear any cached evaluation result, including the component
    /// `conflict` flag.
    pub fn reset_evaluation(&mut self) {
        match self {
            Node::Component(c) => {
                c.reliability = None;
                c.conflict = false;
            }
            Node::Gate(g) => g.reliability = None,
        }
    }

    pub fn reliability(&self) -> Option<f64> {
        match self {
            Node::Component(c) => c.reliability,
            Node::Gate(g) => g.reliability,
        }
    }

    pub fn set_reliability(&mut self, value: f64) {
        match self {
            Node::Component(c) => c.reliability = Some(value),
            Node::Gate(g) => g.reliability = Some(value),
        }
    }
}
