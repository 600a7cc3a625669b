// Copyright © 2026 The RBD Engine Contributors

use thiserror::Error;

/// Errors raised by [`crate::graph::Graph`]'s public operations.
///
/// Every variant here maps to a `Validation` or `Structural` case in
/// [`crate::error`]: both classes reject the mutation outright and leave
/// the graph untouched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("node '{0}' already exists")]
    DuplicateId(String),

    #[error("unknown node '{0}'")]
    UnknownNode(String),

    #[error("node '{0}' already has a parent")]
    AlreadyHasParent(String),

    #[error("cannot remove gate '{0}' with more than one child")]
    AmbiguousRemoval(String),

    #[error("k must be between 1 and {max} for gate '{gate}' (got {k})")]
    InvalidK { gate: String, k: i64, max: u32 },

    #[error("node '{0}' is not a gate")]
    WrongNodeKind(String),

    #[error("invalid relation for KOON insertion: k is required")]
    InvalidRelation,
}
