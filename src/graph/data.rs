// Copyright © 2026 The RBD Engine Contributors

//! Lossless serialization of a [`Graph`] to/from its wire format: a flat
//! node list plus an edge list, so that child order and every per-node
//! field round-trip exactly.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::node::{Component, DistKind, Gate, GateSubtype, Node};
use super::Graph;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct DistData {
    kind: DistKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct NodeData {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    dist: Option<DistData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    unit_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reliability: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    subtype: Option<GateSubtype>,
    #[serde(skip_serializing_if = "Option::is_none")]
    k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    guid: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct EdgeData {
    from: String,
    to: String,
}

/// The serialized form of a [`Graph`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    nodes: Vec<NodeData>,
    edges: Vec<EdgeData>,
    root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reliability_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saved_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    coordination: Option<Value>,
}

impl GraphData {
    pub fn saved_at(&self) -> Option<&str> {
        self.saved_at.as_deref()
    }

    pub fn set_saved_at(&mut self, ts: impl Into<String>) {
        self.saved_at = Some(ts.into());
    }

    pub fn coordination(&self) -> Option<&Value> {
        self.coordination.as_ref()
    }

    pub fn set_coordination(&mut self, coordination: Value) {
        self.coordination = Some(coordination);
    }
}

impl Graph {
    /// Serialize this graph to its wire format. Lossless: `from_data(to_data(g))`
    /// reproduces `g` exactly, including per-node `reliability`/`conflict`.
    pub fn to_data(&self) -> GraphData {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut edges = Vec::new();

        for (id, node) in &self.nodes {
            nodes.push(node_to_data(id, node));
        }
        for (parent, children) in &self.children {
            for child in children {
                edges.push(EdgeData {
                    from: parent.clone(),
                    to: child.clone(),
                });
            }
        }

        GraphData {
            nodes,
            edges,
            root: self.root.clone(),
            reliability_total: self.reliability_total,
            saved_at: None,
            coordination: None,
        }
    }

    /// Deserialize a graph from its wire format.
    ///
    /// Structural fields (`nodes`, `edges`, `root`, `reliability_total`)
    /// drive reconstruction; `saved_at`/`coordination` are opaque metadata
    /// ignored here but round-tripped via [`GraphData`] so a caller
    /// re-saving the snapshot keeps them.
    pub fn from_data(data: &GraphData) -> Self {
        let mut graph = Graph::new(false);

        for nd in &data.nodes {
            let node = data_to_node(nd);
            graph.nodes.insert(nd.id.clone(), node);
            graph.children.insert(nd.id.clone(), Vec::new());
            graph.parent.insert(nd.id.clone(), None);
        }

        let mut child_order: HashMap<String, Vec<String>> = HashMap::new();
        for edge in &data.edges {
            child_order
                .entry(edge.from.clone())
                .or_default()
                .push(edge.to.clone());
            graph.parent.insert(edge.to.clone(), Some(edge.from.clone()));
        }
        for (parent, children) in child_order {
            graph.children.insert(parent, children);
        }

        graph.root = data.root.clone();
        graph.reliability_total = data.reliability_total;
        graph
    }
}

fn node_to_data(id: &str, node: &Node) -> NodeData {
    match node {
        Node::Component(c) => NodeData {
            id: id.to_string(),
            kind: "component".to_string(),
            dist: Some(DistData { kind: c.dist_kind }),
            unit_type: c.unit_type.clone(),
            reliability: c.reliability,
            conflict: c.conflict,
            subtype: None,
            k: None,
            name: None,
            label: None,
            guid: None,
        },
        Node::Gate(g) => NodeData {
            id: id.to_string(),
            kind: "gate".to_string(),
            dist: None,
            unit_type: None,
            reliability: g.reliability,
            conflict: false,
            subtype: Some(g.subtype),
            k: g.k,
            name: g.name.clone(),
            label: g.label.clone(),
            guid: Some(g.guid.clone()),
        },
    }
}

fn data_to_node(nd: &NodeData) -> Node {
    if nd.kind == "gate" {
        let subtype = nd.subtype.unwrap_or(GateSubtype::And);
        Node::Gate(Gate {
            subtype,
            k: nd.k,
            name: nd.name.clone(),
            label: nd.label.clone(),
            guid: nd.guid.clone().unwrap_or_else(super::node::new_gate_guid),
            reliability: nd.reliability,
        })
    } else {
        Node::Component(Component {
            dist_kind: nd.dist.as_ref().map(|d| d.kind).unwrap_or(DistKind::Exponential),
            unit_type: nd.unit_type.clone(),
            reliability: nd.reliability,
            conflict: nd.conflict,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::graph::Relation;

    /// A full `GraphData` is large enough that a plain `assert_eq!` diff
    /// is unreadable once one field in a many-node graph drifts; this
    /// exercises the `to_data`/JSON/`from_data`/`to_data` round trip with
    /// `pretty_assertions` so a mismatch shows just the changed fields.
    #[test]
    fn graph_data_survives_a_json_round_trip() {
        let mut g = Graph::new(true);
        g.add_node("A", Node::Component(Component::new(DistKind::Weibull, None)))
            .unwrap();
        g.add_component_relative("A", "B", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();
        let mut before = g.to_data();
        before.set_coordination(serde_json::json!({"v": 1}));

        let json = serde_json::to_string(&before).unwrap();
        let restored: GraphData = serde_json::from_str(&json).unwrap();
        let after = Graph::from_data(&restored).to_data();

        assert_eq!(before.nodes, after.nodes);
        assert_eq!(before.edges, after.edges);
        assert_eq!(before.root, after.root);
    }
}
