//! `Arbitrary` generators for fuzzing random sequences of the eight
//! mutation kinds plus undo/redo (spec.md §8's property-based tests).

use qcheck::Arbitrary;

use crate::graph::{DistKind, Relation};

/// A small, fixed alphabet of component/target ids. Keeping the pool
/// small means generated sequences frequently collide (duplicate ids,
/// operate on just-removed nodes, etc.), which is what exercises the
/// error paths and tree invariants rather than only ever growing a
/// fresh tree.
const ID_POOL: [&str; 6] = ["A", "B", "C", "D", "E", "F"];

fn pick_id(g: &mut qcheck::Gen) -> String {
    let idx = usize::arbitrary(g) % ID_POOL.len();
    ID_POOL[idx].to_string()
}

fn arbitrary_dist(g: &mut qcheck::Gen) -> DistKind {
    if bool::arbitrary(g) {
        DistKind::Exponential
    } else {
        DistKind::Weibull
    }
}

fn arbitrary_relation(g: &mut qcheck::Gen) -> Relation {
    match u8::arbitrary(g) % 3 {
        0 => Relation::Series,
        1 => Relation::Parallel,
        _ => Relation::Koon,
    }
}

/// One fuzzed mutation against a [`crate::service::GraphService`],
/// mirroring the event [`crate::event::Kind`] variants plus the two
/// local-only log operations.
#[derive(Clone, Debug)]
pub enum Op {
    AddRoot { id: String, dist: DistKind },
    AddRelative { target: String, id: String, relation: Relation, dist: DistKind, k: u32 },
    Remove { id: String },
    EditComponent { old: String, new: String, dist: DistKind },
    EditGate { id: String, k: i64 },
    Undo,
    Redo,
}

impl Arbitrary for Op {
    fn arbitrary(g: &mut qcheck::Gen) -> Self {
        match u8::arbitrary(g) % 7 {
            0 => Op::AddRoot {
                id: pick_id(g),
                dist: arbitrary_dist(g),
            },
            1 => Op::AddRelative {
                target: pick_id(g),
                id: pick_id(g),
                relation: arbitrary_relation(g),
                dist: arbitrary_dist(g),
                k: 1 + (u32::arbitrary(g) % 3),
            },
            2 => Op::Remove { id: pick_id(g) },
            3 => Op::EditComponent {
                old: pick_id(g),
                new: pick_id(g),
                dist: arbitrary_dist(g),
            },
            4 => Op::EditGate {
                id: pick_id(g),
                k: (i64::arbitrary(g) % 5) - 1,
            },
            5 => Op::Undo,
            _ => Op::Redo,
        }
    }
}
