// Copyright © 2026 The RBD Engine Contributors

//! The reliability-graph domain model.
//!
//! A [`Graph`] is a rooted, ordered tree. Leaves are [`Component`]s with a
//! failure-time distribution; internal nodes are [`Gate`]s combining their
//! children by series (AND), parallel (OR), or k-out-of-n (KOON). Child
//! order is semantic: it is both the evaluation order and the gate-layout
//! order.
//!
//! Rather than the inheritance-based node hierarchy of the original
//! (`ComponentNode`/`AndGateNode`/`OrGateNode`/`KoonGateNode`), this is a
//! tagged union ([`Node`]) plus two id→id(s) maps (`children`, `parent`).
//! This keeps construction, mutation and serialization simple and makes
//! the following invariants cheap to check:
//!
//! - G1: `parent` is the exact inverse of `children`.
//! - G2: every id reachable from `root` is in `nodes`, and vice versa.
//! - G3: the graph is an ordered tree (no cycles, one parent each).
//! - G4: a gate's `k` is within `[1, child_count]` whenever `child_count >= 1`.
//! - G5: only gates may have children.

use std::collections::HashMap;

pub mod data;
pub mod error;
pub mod node;

pub use data::GraphData;
pub use error::Error;
pub use node::{Component, DistKind, Gate, GateSubtype, Node, Relation};

type Result<T> = std::result::Result<T, Error>;

/// The Reliability Block Diagram graph structure.
#[derive(Clone, Debug, PartialEq)]
pub struct Graph {
    nodes: HashMap<String, Node>,
    children: HashMap<String, Vec<String>>,
    parent: HashMap<String, Option<String>>,
    root: Option<String>,
    reliability_total: Option<f64>,
    /// When set, every structural mutation normalizes the graph
    /// afterwards (see [`Graph::normalize`]).
    auto_normalize: bool,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Graph {
    pub fn new(auto_normalize: bool) -> Self {
        Self {
            nodes: HashMap::new(),
            children: HashMap::new(),
            parent: HashMap::new(),
            root: None,
            reliability_total: None,
            auto_normalize,
        }
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn children_of(&self, id: &str) -> &[String] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parent.get(id).and_then(|p| p.as_deref())
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(id, n)| (id.as_str(), n))
    }

    pub fn reliability_total(&self) -> Option<f64> {
        self.reliability_total
    }

    pub fn set_reliability_total(&mut self, value: Option<f64>) {
        self.reliability_total = value;
    }

    /// Clear all nodes, edges, and reset the graph.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.children.clear();
        self.parent.clear();
        self.root = None;
        self.reliability_total = None;
    }

    /// Add a node to the graph.
    ///
    /// Fails with [`Error::DuplicateId`] if `id` already exists. The
    /// first node added installs `root`.
    pub fn add_node(&mut self, id: impl Into<String>, node: Node) -> Result<()> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        self.children.insert(id.clone(), Vec::new());
        self.parent.insert(id.clone(), None);
        if self.root.is_none() {
            self.root = Some(id.clone());
        }
        self.nodes.insert(id, node);
        Ok(())
    }

    /// Add an edge from `parent` to `child`.
    pub fn add_edge(&mut self, parent: &str, child: &str) -> Result<()> {
        if !self.nodes.contains_key(parent) {
            return Err(Error::UnknownNode(parent.to_string()));
        }
        if !self.nodes.contains_key(child) {
            return Err(Error::UnknownNode(child.to_string()));
        }
        if self.parent.get(child).and_then(|p| p.as_ref()).is_some() {
            return Err(Error::AlreadyHasParent(child.to_string()));
        }
        self.children.get_mut(parent).unwrap().push(child.to_string());
        self.parent.insert(child.to_string(), Some(parent.to_string()));
        Ok(())
    }

    /// Remove a node from the graph.
    ///
    /// Components detach from their parent (or clear `root`). Gates with
    /// zero or one child are deleted and, if any, their child adopted by
    /// the gate's former parent; gates with more than one child cannot be
    /// removed ([`Error::AmbiguousRemoval`]).
    pub fn remove_node(&mut self, id: &str) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(Error::UnknownNode(id.to_string()));
        }
        let is_gate = self.nodes[id].is_gate();
        if is_gate {
            self.remove_gate(id)?;
        } else {
            self.remove_component(id);
        }
        if self.auto_normalize {
            self.normalize();
        }
        Ok(())
    }

    fn remove_gate(&mut self, id: &str) -> Result<()> {
        let children = self.children.get(id).cloned().unwrap_or_default();
        if children.len() > 1 {
            return Err(Error::AmbiguousRemoval(id.to_string()));
        }
        let adopt_child = children.first().cloned();
        let parent = self.parent.get(id).cloned().flatten();

        match parent {
            None => {
                if let Some(ref child) = adopt_child {
                    self.parent.insert(child.clone(), None);
                    self.root = Some(child.clone());
                } else {
                    self.root = None;
                }
            }
            Some(ref p) => self.replace_child(p, id, adopt_child.as_deref()),
        }

        self.children.insert(id.to_string(), Vec::new());
        self.delete_node(id);
        Ok(())
    }

    fn remove_component(&mut self, id: &str) {
        let parent = self.parent.get(id).cloned().flatten();
        match parent {
            None => {
                self.delete_node(id);
                self.root = None;
            }
            Some(p) => {
                if let Some(list) = self.children.get_mut(&p) {
                    list.retain(|c| c != id);
                }
                self.parent.insert(id.to_string(), None);
                self.delete_node(id);
            }
        }
    }

    fn delete_node(&mut self, id: &str) {
        if let Some(children) = self.children.get(id).cloned() {
            for child in children {
                if self.parent.get(&child).cloned().flatten().as_deref() == Some(id) {
                    self.parent.insert(child, None);
                }
            }
        }
        self.children.remove(id);
        self.parent.remove(id);
        self.nodes.remove(id);
    }

    fn replace_child(&mut self, parent_id: &str, old_child: &str, new_child: Option<&str>) {
        if let Some(list) = self.children.get_mut(parent_id) {
            if let Some(pos) = list.iter().position(|c| c == old_child) {
                match new_child {
                    Some(nc) => {
                        list[pos] = nc.to_string();
                    }
                    None => {
                        list.remove(pos);
                    }
                }
            }
        }
        if let Some(nc) = new_child {
            self.parent.insert(nc.to_string(), Some(parent_id.to_string()));
        }
        self.parent.insert(old_child.to_string(), None);
    }

    fn insert_child_after(&mut self, parent_id: &str, after_child: &str, new_child: &str) {
        let list = self.children.entry(parent_id.to_string()).or_default();
        match list.iter().position(|c| c == after_child) {
            Some(pos) => list.insert(pos + 1, new_child.to_string()),
            None => list.push(new_child.to_string()),
        }
        self.parent.insert(new_child.to_string(), Some(parent_id.to_string()));
    }

    /// Edit gate parameters. Only KOON gates accept `k`; `name`/`label`
    /// apply to any gate.
    pub fn edit_gate(&mut self, id: &str, k: Option<i64>, name: Option<String>, label: Option<String>) -> Result<()> {
        if !self.nodes.contains_key(id) {
            return Err(Error::UnknownNode(id.to_string()));
        }
        let child_count = self.children_of(id).len();
        let gate = self
            .nodes
            .get_mut(id)
            .unwrap()
            .as_gate_mut()
            .ok_or_else(|| Error::WrongNodeKind(id.to_string()))?;

        if let Some(k) = k {
            if gate.subtype == GateSubtype::Koon {
                let clamped = if child_count == 0 {
                    k.max(1) as u32
                } else if k < 1 || k as usize > child_count {
                    return Err(Error::InvalidK {
                        gate: id.to_string(),
                        k,
                        max: child_count as u32,
                    });
                } else {
                    k as u32
                };
                gate.k = Some(clamped);
            }
        }
        if let Some(name) = name {
            gate.name = Some(name);
        }
        if let Some(label) = label {
            gate.label = Some(label);
        }

        if self.auto_normalize {
            self.normalize();
        }
        Ok(())
    }

    /// Rename a component and/or change its distribution.
    pub fn edit_component(&mut self, old_id: &str, new_id: &str, dist_kind: DistKind) -> Result<()> {
        if !self.nodes.contains_key(old_id) {
            return Err(Error::UnknownNode(old_id.to_string()));
        }
        if !self.nodes[old_id].is_component() {
            return Err(Error::WrongNodeKind(old_id.to_string()));
        }
        if new_id != old_id && self.nodes.contains_key(new_id) {
            return Err(Error::DuplicateId(new_id.to_string()));
        }

        self.nodes.get_mut(old_id).unwrap().as_component_mut().unwrap().dist_kind = dist_kind;

        if new_id != old_id {
            self.rename_node(old_id, new_id);
        }

        if self.auto_normalize {
            self.normalize();
        }
        Ok(())
    }

    fn rename_node(&mut self, old_id: &str, new_id: &str) {
        let node = self.nodes.remove(old_id).unwrap();
        let children = self.children.remove(old_id).unwrap_or_default();
        let parent_id = self.parent.remove(old_id).unwrap_or(None);

        self.nodes.insert(new_id.to_string(), node);
        for child in &children {
            self.parent.insert(child.clone(), Some(new_id.to_string()));
        }
        self.children.insert(new_id.to_string(), children);
        self.parent.insert(new_id.to_string(), parent_id.clone());

        if let Some(ref p) = parent_id {
            if let Some(list) = self.children.get_mut(p) {
                for c in list.iter_mut() {
                    if c == old_id {
                        *c = new_id.to_string();
                        break;
                    }
                }
            }
        }

        if self.root.as_deref() == Some(old_id) {
            self.root = Some(new_id.to_string());
        }
    }

    /// Add a component relative to an existing node with the given
    /// relation. This is the central structural primitive: series and
    /// parallel insertions extend an existing gate of the matching
    /// subtype in place, or interpose a fresh one; KOON insertions get
    /// special-cased further since they carry a `k` parameter.
    #[allow(clippy::too_many_arguments)]
    pub fn add_component_relative(
        &mut self,
        target_id: &str,
        new_comp_id: &str,
        relation: Relation,
        dist_kind: DistKind,
        k: Option<u32>,
        unit_type: Option<String>,
    ) -> Result<()> {
        if self.nodes.contains_key(new_comp_id) {
            return Err(Error::DuplicateId(new_comp_id.to_string()));
        }
        if !self.nodes.contains_key(target_id) {
            return Err(Error::UnknownNode(target_id.to_string()));
        }

        self.add_node(new_comp_id, Node::Component(Component::new(dist_kind, unit_type)))?;
        // add_node may have made new_comp_id the root if the graph was
        // empty; that can't happen here since target_id already exists.

        let want_gate = relation.gate_type();
        let target_parent = self.parent_of(target_id).map(str::to_string);

        if relation == Relation::Koon
            && self.handle_koon_insertion(target_id, new_comp_id, target_parent.as_deref(), k)?
        {
            if self.auto_normalize {
                self.normalize();
            }
            return Ok(());
        }

        if let Some(ref tp) = target_parent {
            if self.is_gate(tp, want_gate) {
                self.insert_child_after(tp, target_id, new_comp_id);
                if self.auto_normalize {
                    self.normalize();
                }
                return Ok(());
            }
        } else if self.is_gate(target_id, want_gate) {
            self.add_edge(target_id, new_comp_id)?;
            if self.auto_normalize {
                self.normalize();
            }
            return Ok(());
        }

        let gate_id = self.interpose_gate(target_id, target_parent.as_deref(), want_gate, k)?;
        self.add_edge(&gate_id, new_comp_id)?;
        self.clamp_koon_k(&gate_id);

        if self.auto_normalize {
            self.normalize();
        }
        Ok(())
    }

    fn is_gate(&self, id: &str, subtype: GateSubtype) -> bool {
        self.nodes.get(id).is_some_and(|n| n.is_gate_of(subtype))
    }

    /// Clamp a freshly interposed KOON gate's `k` to its actual child
    /// count once both children are wired in: the caller-supplied `k`
    /// is only validated against a final count that doesn't exist yet
    /// at gate-creation time.
    fn clamp_koon_k(&mut self, gate_id: &str) {
        let child_count = self.children_of(gate_id).len() as u32;
        if let Some(gate) = self.nodes.get_mut(gate_id).and_then(Node::as_gate_mut) {
            if gate.subtype == GateSubtype::Koon {
                if let Some(k) = gate.k {
                    gate.k = Some(if child_count == 0 { k.max(1) } else { k.clamp(1, child_count) });
                }
            }
        }
    }

    fn handle_koon_insertion(
        &mut self,
        target_id: &str,
        new_comp_id: &str,
        target_parent: Option<&str>,
        k: Option<u32>,
    ) -> Result<bool> {
        if self.is_gate(target_id, GateSubtype::Koon) {
            self.add_edge(target_id, new_comp_id)?;
            return Ok(true);
        }
        if let Some(tp) = target_parent {
            if self.is_gate(tp, GateSubtype::Koon) && self.nodes[target_id].is_component() {
                let gate_id = self.interpose_gate(target_id, Some(tp), GateSubtype::Koon, k)?;
                self.add_edge(&gate_id, new_comp_id)?;
                self.clamp_koon_k(&gate_id);
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn interpose_gate(
        &mut self,
        target_id: &str,
        target_parent: Option<&str>,
        gate_type: GateSubtype,
        k: Option<u32>,
    ) -> Result<String> {
        let prefix = match gate_type {
            GateSubtype::And => "G_and",
            GateSubtype::Or => "G_or",
            GateSubtype::Koon => "G_koon",
        };
        let gate_id = self.alloc_gate_id(prefix);

        let k_value = match gate_type {
            GateSubtype::Koon => Some(k.ok_or(Error::InvalidRelation)?),
            _ => None,
        };
        let gate = Gate::new(&gate_id, gate_type, k_value);
        self.add_node(&gate_id, Node::Gate(gate))?;
        // The fresh gate may have become root via add_node's "first node
        // installs root" rule only if the graph was otherwise empty,
        // which cannot happen here (target_id exists); wire it in place.
        match target_parent {
            None => self.root = Some(gate_id.clone()),
            Some(tp) => self.replace_child(tp, target_id, Some(&gate_id)),
        }
        self.add_edge(&gate_id, target_id)?;
        Ok(gate_id)
    }

    /// Allocate a unique gate id with the given prefix: `<prefix>_<n>`
    /// for the smallest positive `n` not already in use.
    fn alloc_gate_id(&self, prefix: &str) -> String {
        let prefix = prefix.trim_end_matches('_');
        let mut n = 1u64;
        loop {
            let candidate = format!("{prefix}_{n}");
            if !self.nodes.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Simplify the graph by collapsing 0- or 1-child gates, in postorder
    /// from the root.
    pub fn normalize(&mut self) {
        let Some(root) = self.root.clone() else {
            return;
        };

        let mut visited = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            stack.extend(self.children_of(&id).iter().cloned());
            visited.push(id);
        }

        for id in visited.into_iter().rev() {
            if self.nodes.get(&id).is_some_and(Node::is_gate) {
                self.try_collapse_gate(Some(id));
            }
        }
    }

    fn try_collapse_gate(&mut self, mut gate_id: Option<String>) {
        while let Some(gid) = gate_id {
            if !self.nodes.get(&gid).is_some_and(Node::is_gate) {
                break;
            }
            let children = self.children.get(&gid).cloned().unwrap_or_default();
            let parent = self.parent_of(&gid).map(str::to_string);

            match children.len() {
                1 => {
                    let only = children[0].clone();
                    match parent {
                        None => {
                            self.root = Some(only.clone());
                            self.parent.insert(only, None);
                        }
                        Some(ref p) => self.replace_child(p, &gid, Some(&only)),
                    }
                    self.delete_node(&gid);
                    gate_id = parent;
                }
                0 => {
                    match parent {
                        None => self.root = None,
                        Some(ref p) => {
                            if let Some(list) = self.children.get_mut(p) {
                                list.retain(|c| c != &gid);
                            }
                        }
                    }
                    self.delete_node(&gid);
                    gate_id = parent;
                }
                _ => break,
            }
        }
    }

    /// Generate an algebraic expression for the graph, e.g. `"(A & B) || C"`.
    pub fn to_expression(&self) -> String {
        match &self.root {
            None => "(empty)".to_string(),
            Some(root) => self.expr(root),
        }
    }

    fn expr(&self, id: &str) -> String {
        let node = &self.nodes[id];
        match node {
            Node::Component(_) => id.to_string(),
            Node::Gate(g) => {
                let kids = self.children_of(id);
                match g.subtype {
                    GateSubtype::And => format!(
                        "({})",
                        kids.iter().map(|k| self.expr(k)).collect::<Vec<_>>().join(" & ")
                    ),
                    GateSubtype::Or => format!(
                        "({})",
                        kids.iter().map(|k| self.expr(k)).collect::<Vec<_>>().join(" || ")
                    ),
                    GateSubtype::Koon => {
                        let k = g.k.unwrap_or(1);
                        let n = kids.len();
                        let parts = kids.iter().map(|k| self.expr(k)).collect::<Vec<_>>().join(", ");
                        format!("KOON[{k}/{n}]({parts})")
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comp(kind: DistKind) -> Node {
        Node::Component(Component::new(kind, None))
    }

    #[test]
    fn series_insertion_adopts_existing_and_parent() {
        // Build AND(A,X) from single root A via add_series, then add_series(A,B)
        // should extend the existing AND gate rather than nesting another one.
        let mut g = Graph::new(true);
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_component_relative("A", "X", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();
        g.add_component_relative("A", "B", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();

        let root = g.root().unwrap().to_string();
        assert!(g.node(&root).unwrap().is_gate_of(GateSubtype::And));
        assert_eq!(g.children_of(&root), ["A", "B", "X"]);
    }

    #[test]
    fn parallel_from_component_promotes_or_gate() {
        let mut g = Graph::new(true);
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_component_relative("A", "B", Relation::Parallel, DistKind::Exponential, None, None)
            .unwrap();

        let root = g.root().unwrap().to_string();
        assert!(g.node(&root).unwrap().is_gate_of(GateSubtype::Or));
        assert_eq!(g.children_of(&root), ["A", "B"]);
        assert_eq!(g.to_expression(), "(A || B)");
    }

    #[test]
    fn koon_interposition_on_component_under_koon() {
        let mut g = Graph::new(true);
        g.add_node("K1", Node::Gate(Gate::new("K1", GateSubtype::Koon, Some(1))))
            .unwrap();
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_edge("K1", "A").unwrap();

        g.add_component_relative("A", "B", Relation::Koon, DistKind::Exponential, Some(2), None)
            .unwrap();

        assert_eq!(g.children_of("K1").len(), 1);
        let nested = g.children_of("K1")[0].clone();
        assert_ne!(nested, "A");
        assert!(g.node(&nested).unwrap().is_gate_of(GateSubtype::Koon));
        assert_eq!(g.children_of(&nested), ["A", "B"]);
        assert_eq!(g.parent_of("A"), Some(nested.as_str()));
    }

    #[test]
    fn koon_from_root_component_clamps_k_to_child_count() {
        let mut g = Graph::new(true);
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_component_relative("A", "B", Relation::Koon, DistKind::Exponential, Some(3), None)
            .unwrap();

        let root = g.root().unwrap().to_string();
        assert!(g.node(&root).unwrap().is_gate_of(GateSubtype::Koon));
        assert_eq!(g.children_of(&root).len(), 2);
        assert_eq!(g.node(&root).unwrap().as_gate().unwrap().k, Some(2));
    }

    #[test]
    fn koon_interposition_under_koon_clamps_k_to_child_count() {
        let mut g = Graph::new(true);
        g.add_node("K1", Node::Gate(Gate::new("K1", GateSubtype::Koon, Some(1))))
            .unwrap();
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_edge("K1", "A").unwrap();

        g.add_component_relative("A", "B", Relation::Koon, DistKind::Exponential, Some(5), None)
            .unwrap();

        let nested = g.children_of("K1")[0].clone();
        assert_eq!(g.children_of(&nested).len(), 2);
        assert_eq!(g.node(&nested).unwrap().as_gate().unwrap().k, Some(2));
    }

    #[test]
    fn remove_ambiguous_gate_rejected() {
        let mut g = Graph::new(false);
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_component_relative("A", "B", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();
        let root = g.root().unwrap().to_string();
        assert_eq!(g.remove_node(&root), Err(Error::AmbiguousRemoval(root)));
    }

    #[test]
    fn normalize_collapses_single_child_gate() {
        let mut g = Graph::new(false);
        g.add_node("A", comp(DistKind::Exponential)).unwrap();
        g.add_component_relative("A", "B", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();
        let gate_id = g.root().unwrap().to_string();
        g.remove_node("B").unwrap();
        assert!(g.node(&gate_id).unwrap().is_gate());
        g.normalize();
        assert_eq!(g.root(), Some("A"));
        assert!(!g.contains(&gate_id));
    }

    #[test]
    fn roundtrip_serialization() {
        let mut g = Graph::new(true);
        g.add_node("A", comp(DistKind::Weibull)).unwrap();
        g.add_component_relative("A", "B", Relation::Koon, DistKind::Exponential, Some(1), None)
            .unwrap();
        g.node_mut("A").unwrap().set_reliability(0.5);
        g.set_reliability_total(Some(0.5));

        let data = g.to_data();
        let restored = Graph::from_data(&data);
        assert_eq!(restored.root(), g.root());
        assert_eq!(restored.reliability_total(), g.reliability_total());
        assert_eq!(restored.children_of(g.root().unwrap()), g.children_of(g.root().unwrap()));
        assert_eq!(restored.node("A").unwrap().reliability(), Some(0.5));
    }
}
