// Copyright © 2026 The RBD Engine Contributors

//! Top-level error taxonomy shared by [`crate::service`].
//!
//! Local graph/log operations surface their own small `Error` enums
//! ([`crate::graph::Error`]); this module covers the classes that only
//! arise once a [`crate::service::GraphService`] starts talking to the
//! remote ports, following the same boxed-dynamic-cause shape the
//! teacher uses for its own port errors.

use thiserror::Error;

/// A structured, retry-aware error for cloud-facing operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid arguments rejected at the API boundary; the graph was not
    /// mutated. Wraps [`crate::graph::Error`].
    #[error(transparent)]
    Validation(#[from] crate::graph::Error),

    /// A graph-structure invariant would be violated by the requested
    /// mutation. Distinct from `Validation` only at the taxonomy level;
    /// both map onto [`crate::graph::Error`] variants.
    #[error("structural violation: {0}")]
    Structural(crate::graph::Error),

    /// Not enough failure records, or a numeric failure estimating
    /// parameters. Not a hard failure: callers should treat this as the
    /// component falling back to [`crate::evaluator::FALLBACK_R`].
    #[error("failure estimation degraded for '{component}': {reason}")]
    Estimation { component: String, reason: String },

    /// Timeouts, 5xx, 408, 429, or connection errors from a remote port.
    /// Retryable with exponential backoff.
    #[error("transient error during '{operation}': {message}")]
    RemoteTransient {
        operation: String,
        retryable: bool,
        message: String,
        details: Option<String>,
        http_status: Option<u16>,
    },

    /// A version conflict (e.g. HTTP 409). Not retryable by the writer;
    /// the caller must rebase against the new remote head.
    #[error("conflict during '{operation}': {message}")]
    RemoteConflict {
        operation: String,
        message: String,
        details: Option<String>,
        http_status: Option<u16>,
    },

    /// Post-write consistency validation (see
    /// [`crate::service::commit`]) failed. Snapshot-only repair is
    /// attempted before this is raised.
    #[error("coordination mismatch during '{operation}': {message}")]
    CoordinationMismatch {
        operation: String,
        message: String,
        #[source]
        cause: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
    },

    /// Rollback (a `set_ignore_range` append) failed after a commit had
    /// already appended events. Composite: carries both failures.
    #[error("rollback failed after '{operation}' errored: {rollback_message} (original: {original_message})")]
    Rollback {
        operation: String,
        original_message: String,
        rollback_message: String,
        retryable: bool,
    },

    /// A remote port's `append` wrote fewer events than requested.
    #[error("expected to append {expected} events during '{operation}', wrote {actual}")]
    PartialAppend {
        operation: String,
        expected: usize,
        actual: usize,
    },

    /// A remote port returned an error this crate doesn't otherwise
    /// classify.
    #[error("port error during '{operation}'")]
    Port {
        operation: String,
        #[source]
        err: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

impl Error {
    pub(crate) fn port(operation: impl Into<String>, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Port {
            operation: operation.into(),
            err: Box::new(err),
        }
    }

    /// Whether retrying the operation that produced this error might
    /// succeed.
    pub fn retryable(&self) -> bool {
        match self {
            Error::RemoteTransient { retryable, .. } => *retryable,
            Error::Rollback { retryable, .. } => *retryable,
            Error::CoordinationMismatch { .. } => false,
            Error::RemoteConflict { .. } => false,
            Error::Validation(_) | Error::Structural(_) | Error::Estimation { .. } => false,
            Error::PartialAppend { .. } | Error::Port { .. } => false,
        }
    }
}
