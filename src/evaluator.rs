// Copyright © 2026 The RBD Engine Contributors

//! Recursive reliability computation over a [`Graph`], with memoization
//! by node id and support for a [`FailureEstimator`]-backed fallback.

use std::collections::HashMap;

use crate::failure::{EvalTime, FailureEstimator};
use crate::graph::{Gate, GateSubtype, Graph, Node};

/// Reliability substituted for a component whose history can't support
/// an estimate (too few records, or the estimator itself errored).
pub const FALLBACK_R: f64 = 0.99;

/// Evaluate a graph's reliability at time `t`, writing the result back
/// onto every node's `reliability` (and `reliability_total` on the
/// graph) and clearing any stale `conflict` flags before recomputing.
///
/// Returns `1.0` for an empty graph without touching the estimator.
pub fn evaluate(graph: &mut Graph, estimator: &dyn FailureEstimator, t: EvalTime) -> f64 {
    let Some(root) = graph.root().map(str::to_string) else {
        return 1.0;
    };

    let mut memo: HashMap<String, f64> = HashMap::new();
    let value = eval_node(graph, estimator, t, &root, &mut memo);
    graph.set_reliability_total(Some(value));
    value
}

fn eval_node(
    graph: &mut Graph,
    estimator: &dyn FailureEstimator,
    t: EvalTime,
    id: &str,
    memo: &mut HashMap<String, f64>,
) -> f64 {
    if let Some(&v) = memo.get(id) {
        return v;
    }

    let children = graph.children_of(id).to_vec();
    let is_component = graph.node(id).is_some_and(Node::is_component);

    let value = if is_component {
        eval_component(graph, estimator, t, id)
    } else {
        let child_values: Vec<f64> = children
            .iter()
            .map(|c| eval_node(graph, estimator, t, c, memo))
            .collect();
        let gate = graph.node(id).and_then(Node::as_gate).cloned();
        match gate {
            Some(g) => eval_gate(&g, &child_values),
            None => FALLBACK_R,
        }
    };

    if let Some(node) = graph.node_mut(id) {
        node.set_reliability(value);
    }
    memo.insert(id.to_string(), value);
    value
}

fn eval_component(graph: &mut Graph, estimator: &dyn FailureEstimator, t: EvalTime, id: &str) -> f64 {
    let dist_kind = match graph.node(id).and_then(Node::as_component) {
        Some(c) => c.dist_kind,
        None => return FALLBACK_R,
    };

    let (value, conflict) = match estimator.reliability(id, dist_kind, t) {
        Ok(outcome) => (outcome.value, !outcome.enough_records),
        Err(err) => {
            log::warn!("failure estimation for '{id}' errored, falling back: {err}");
            (FALLBACK_R, true)
        }
    };

    if let Some(comp) = graph.node_mut(id).and_then(Node::as_component_mut) {
        comp.conflict = conflict;
    }

    value
}

fn eval_gate(gate: &Gate, child_values: &[f64]) -> f64 {
    match gate.subtype {
        GateSubtype::And => child_values.iter().product(),
        GateSubtype::Or => 1.0 - child_values.iter().map(|p| 1.0 - p).product::<f64>(),
        GateSubtype::Koon => koon_reliability(gate.k, child_values),
    }
}

/// `P(at least k of n independent Bernoullis with success probs `ps`
/// succeed)`, via the standard O(n·k) dynamic program.
pub fn koon_reliability(k: Option<u32>, ps: &[f64]) -> f64 {
    let n = ps.len();
    if n == 0 {
        return 1.0;
    }
    let k = (k.unwrap_or(1) as usize).clamp(1, n);

    let mut dp = vec![0.0f64; n + 1];
    dp[0] = 1.0;
    for &p in ps {
        for j in (1..=n).rev() {
            dp[j] = dp[j] * (1.0 - p) + dp[j - 1] * p;
        }
        dp[0] *= 1.0 - p;
    }

    dp[k..=n].iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::failure::{EstimateError, ReliabilityOutcome};
    use crate::graph::{Component, DistKind, Relation};

    struct FixedEstimator(f64);

    impl FailureEstimator for FixedEstimator {
        fn reliability(
            &self,
            _component_id: &str,
            _dist_kind: DistKind,
            _t: EvalTime,
        ) -> Result<ReliabilityOutcome, EstimateError> {
            Ok(ReliabilityOutcome {
                value: self.0,
                enough_records: true,
            })
        }
    }

    fn comp() -> Node {
        Node::Component(Component::new(DistKind::Exponential, None))
    }

    #[test]
    fn empty_graph_is_fully_reliable() {
        let mut g = Graph::new(false);
        let est = FixedEstimator(0.5);
        assert_eq!(evaluate(&mut g, &est, EvalTime::Age(0.0)), 1.0);
    }

    #[test]
    fn koon_k_equals_n_is_and() {
        let ps = [0.9, 0.8, 0.7];
        let and: f64 = ps.iter().product();
        assert!((koon_reliability(Some(3), &ps) - and).abs() < 1e-9);
    }

    #[test]
    fn koon_k_equals_one_is_or() {
        let ps = [0.9, 0.8, 0.7];
        let or = 1.0 - ps.iter().map(|p| 1.0 - p).product::<f64>();
        assert!((koon_reliability(Some(1), &ps) - or).abs() < 1e-9);
    }

    #[test]
    fn koon_k2_of_3_scenario() {
        let ps = [0.9, 0.8, 0.7];
        let r = koon_reliability(Some(2), &ps);
        assert!((r - 0.902).abs() < 1e-6);
    }

    #[test]
    fn and_of_equal_reliabilities_is_power() {
        let mut g = Graph::new(true);
        g.add_node("A", comp()).unwrap();
        g.add_component_relative("A", "B", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();
        g.add_component_relative("A", "C", Relation::Series, DistKind::Exponential, None, None)
            .unwrap();

        let est = FixedEstimator(0.9);
        let r = evaluate(&mut g, &est, EvalTime::Age(0.0));
        assert!((r - 0.9f64.powi(3)).abs() < 1e-9);
    }
}
