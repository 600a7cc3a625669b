// Copyright © 2026 The RBD Engine Contributors

#![warn(clippy::unwrap_used)]
//! # RBD Engine
//!
//! A collaborative editor and evaluator for Reliability Block Diagrams
//! (RBD): a rooted tree whose leaves are [`graph::Component`]s (physical
//! assets with a failure-time distribution) and whose internal nodes are
//! [`graph::Gate`]s combining their children by series (AND), parallel
//! (OR), or k-out-of-n (KOON).
//!
//! ## Layers
//!
//! The crate is five cooperating components, dependencies flowing
//! downward:
//!   * [`graph`] -- the tree model, structural mutations, normalization
//!   and serialization. Pure; no I/O.
//!   * [`evaluator`] -- recursive reliability computation with
//!   memoization, backed by a [`failure::FailureEstimator`].
//!   * [`failure`] -- maximum-likelihood parameter estimation
//!   (exponential/Weibull) from a component's maintenance history.
//!   * [`event`] / [`event_log`] -- the append-only event model and the
//!   local, versioned log (undo/redo head) built on top of it.
//!   * [`service`] -- [`service::GraphService`] composes the graph and
//!   the log, applies mutations by emitting events, rebuilds a graph
//!   deterministically from an event sequence, and coordinates the
//!   atomic two-store commit that publishes local edits remotely.
//!
//! ## Ports
//!
//! Everything this crate cannot itself be responsible for -- durable
//! storage of snapshots and events, and the system of record for
//! component failure histories -- is named only as a trait at the layer
//! that needs it: [`service::SnapshotStore`], [`service::EventStore`],
//! [`failure::FailureCache`], [`failure::FailuresClient`]. Callers supply
//! the concrete backend; [`test::store`] has in-memory implementations
//! used by this crate's own tests.
//!
//! ## Error taxonomy
//!
//! Local graph/log operations fail fast with their own small `Error`
//! enums ([`graph::Error`]). Once a [`service::GraphService`] starts
//! talking to the remote ports, failures are normalized into
//! [`error::Error`], which distinguishes retryable transport errors from
//! non-retryable conflicts and coordination mismatches.

pub mod error;
pub mod evaluator;
pub mod event;
pub mod event_log;
pub mod failure;
pub mod graph;
pub mod service;

pub use error::Error;
pub use event::{Event, Kind};
pub use event_log::EventLog;
pub use graph::Graph;
pub use service::GraphService;

#[cfg(test)]
extern crate qcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate qcheck_macros;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod test;
