// Copyright © 2026 The RBD Engine Contributors

//! Deterministic reconstruction of a [`Graph`] from an event sequence,
//! under the `set_head`/`set_ignore_range` policy, and the
//! rebuild-to-version publish operation built on top of it.

use chrono::{DateTime, Utc};

use crate::event::{Event, Kind};
use crate::graph::{Component, Graph, Node};

/// Replay `events` against a fresh [`Graph`].
///
/// A two-pass algorithm: first compute which events survive under the
/// `set_head`/`set_ignore_range` policy (see [`effective_events`]),
/// then replay the survivors in original order. Replay is tolerant:
/// an event that fails to apply (e.g. `remove_node` of a missing id)
/// is dropped from effect rather than aborting the rebuild.
pub fn rebuild(events: &[Event]) -> Graph {
    let effective = effective_events(events);
    let mut graph = Graph::new(false);
    for ev in effective {
        if let Err(err) = apply_event(&mut graph, ev) {
            log::debug!("dropping event during rebuild ({:?}): {err}", ev.kind_name());
        }
    }
    graph
}

/// The subset of `events`, in original order, that survive the
/// `set_head`/`set_ignore_range` policy.
///
/// Events are assigned an *effective version* (`version` if present,
/// else `index+1`) and walked in descending version order, accumulating
/// ignored-version ranges as `set_ignore_range`/`set_head` events are
/// encountered — so a higher-version directive is applied before, and
/// can itself suppress, a lower-version one ("last writer wins").
pub fn effective_events(events: &[Event]) -> Vec<&Event> {
    let versions: Vec<i64> = events
        .iter()
        .enumerate()
        .map(|(i, ev)| ev.version.unwrap_or(i as i64 + 1))
        .collect();
    let v_max = versions.iter().copied().max().unwrap_or(0);

    let mut order: Vec<usize> = (0..events.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(versions[i]));

    let mut ignored_ranges: Vec<(i64, i64)> = Vec::new();
    for &idx in &order {
        let v = versions[idx];
        if is_ignored(v, &ignored_ranges) {
            continue;
        }
        match &events[idx].kind {
            Kind::SetIgnoreRange { start_v, end_v } => ignored_ranges.push((*start_v, *end_v)),
            Kind::SetHead { upto } => {
                if let Some(&target_idx) = (*upto >= 0).then_some(*upto as usize).filter(|i| *i < events.len()) {
                    let upto_ver = versions[target_idx];
                    if upto_ver < v_max {
                        ignored_ranges.push((upto_ver + 1, v_max));
                    }
                }
            }
            _ => {}
        }
    }

    (0..events.len())
        .filter(|&i| !is_ignored(versions[i], &ignored_ranges))
        .map(|i| &events[i])
        .collect()
}

fn is_ignored(v: i64, ranges: &[(i64, i64)]) -> bool {
    ranges.iter().any(|&(a, b)| v >= a && v <= b)
}

fn apply_event(graph: &mut Graph, ev: &Event) -> Result<(), crate::graph::Error> {
    match &ev.kind {
        Kind::Snapshot { data } => {
            *graph = Graph::from_data(data);
            Ok(())
        }
        Kind::AddRootComponent {
            new_comp_id,
            dist_kind,
            unit_type,
        } => graph.add_node(
            new_comp_id.clone(),
            Node::Component(Component::new(*dist_kind, unit_type.clone())),
        ),
        Kind::AddComponentRelative {
            target_id,
            new_comp_id,
            relation,
            dist_kind,
            k,
            unit_type,
        } => graph.add_component_relative(target_id, new_comp_id, *relation, *dist_kind, *k, unit_type.clone()),
        Kind::RemoveNode { node_id } => graph.remove_node(node_id),
        Kind::EditComponent { old_id, new_id, dist_kind } => graph.edit_component(old_id, new_id, *dist_kind),
        Kind::EditGate { node_id, params } => {
            graph.edit_gate(node_id, params.k, params.name.clone(), params.label.clone())
        }
        Kind::SetHead { .. } | Kind::SetIgnoreRange { .. } => Ok(()),
    }
}

/// Rewind official history to version `v`: replay the remote events up
/// to `v`, then build the two events that publish that state as the
/// new head — a fresh `snapshot` at `head_prev+1`, plus (when `v` is
/// strictly behind `head_prev`) a `set_ignore_range(v+1, head_prev)` at
/// `head_prev+2` that elides the discarded range on future rebuilds.
pub fn rebuild_to_version(events: &[Event], v: i64, head_prev: i64, actor: &str, now: DateTime<Utc>) -> (Graph, Vec<Event>) {
    let filtered: Vec<Event> = events
        .iter()
        .enumerate()
        .filter(|(i, ev)| ev.version.unwrap_or(*i as i64 + 1) <= v)
        .map(|(_, ev)| ev.clone())
        .collect();

    let rebuilt = rebuild(&filtered);

    let mut snapshot_ev = Event::new(actor, now, Kind::Snapshot { data: rebuilt.to_data() });
    snapshot_ev.version = Some(head_prev + 1);
    let mut new_events = vec![snapshot_ev];

    if v < head_prev {
        let mut ignore_ev = Event::new(
            actor,
            now,
            Kind::SetIgnoreRange {
                start_v: v + 1,
                end_v: head_prev,
            },
        );
        ignore_ev.version = Some(head_prev + 2);
        new_events.push(ignore_ev);
    }

    (rebuilt, new_events)
}

impl Event {
    fn kind_name(&self) -> &'static str {
        match &self.kind {
            Kind::Snapshot { .. } => "snapshot",
            Kind::AddRootComponent { .. } => "add_root_component",
            Kind::AddComponentRelative { .. } => "add_component_relative",
            Kind::RemoveNode { .. } => "remove_node",
            Kind::EditComponent { .. } => "edit_component",
            Kind::EditGate { .. } => "edit_gate",
            Kind::SetHead { .. } => "set_head",
            Kind::SetIgnoreRange { .. } => "set_ignore_range",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DistKind;

    fn add_root(id: &str, version: i64) -> Event {
        let mut ev = Event::new(
            "anonymous",
            Utc::now(),
            Kind::AddRootComponent {
                new_comp_id: id.to_string(),
                dist_kind: DistKind::Exponential,
                unit_type: None,
            },
        );
        ev.version = Some(version);
        ev
    }

    fn add_series(target: &str, new_id: &str, version: i64) -> Event {
        let mut ev = Event::new(
            "anonymous",
            Utc::now(),
            Kind::AddComponentRelative {
                target_id: target.to_string(),
                new_comp_id: new_id.to_string(),
                relation: crate::graph::Relation::Series,
                dist_kind: DistKind::Exponential,
                k: None,
                unit_type: None,
            },
        );
        ev.version = Some(version);
        ev
    }

    #[test]
    fn replay_is_tolerant_of_missing_targets() {
        let mut remove_missing = Event::new(
            "anonymous",
            Utc::now(),
            Kind::RemoveNode {
                node_id: "ghost".to_string(),
            },
        );
        remove_missing.version = Some(1);
        let events = vec![add_root("A", 2), remove_missing];
        let graph = rebuild(&events);
        assert_eq!(graph.root(), Some("A"));
    }

    #[test]
    fn rebuild_to_past_version_matches_scenario_four() {
        let events = vec![add_root("A", 1), add_series("A", "B", 2), add_series("B", "C", 3)];

        let partial: Vec<Event> = events.iter().filter(|e| e.version.unwrap() <= 2).cloned().collect();
        let g2 = rebuild(&partial);
        assert_eq!(g2.to_expression(), "(A & B)");

        let (rebuilt, new_events) = rebuild_to_version(&events, 2, 3, "anonymous", Utc::now());
        assert_eq!(rebuilt.to_expression(), "(A & B)");
        assert_eq!(new_events.len(), 2);
        assert_eq!(new_events[0].version, Some(4));
        assert_eq!(new_events[1].version, Some(5));
        assert!(matches!(new_events[1].kind, Kind::SetIgnoreRange { start_v: 3, end_v: 3 }));

        let mut full = events;
        full.extend(new_events);
        let g_final = rebuild(&full);
        assert_eq!(g_final.to_expression(), "(A & B)");
    }
}
