//! Error types of sectest.
//!
//! Assertion failures are not errors, they are recorded in the
//! [`ResultTree`](crate::result::ResultTree) and counted.
//! The types here cover what cannot be folded into pass/fail counters.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::path::{MAX_DEPTH, MAX_INDEX};

/// A section tree that the traversal cannot address or replay.
///
/// These are raised from inside a running test body via
/// [`panic_any`](std::panic::panic_any), so they unwind like any other
/// unhandled failure and can be recovered with `downcast_ref::<TraversalError>()`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum TraversalError {
    #[error("sections are nested deeper than {MAX_DEPTH} levels")]
    DepthLimitExceeded,

    #[error("more than {} sections were encountered at depth {depth}", MAX_INDEX + 1)]
    IndexLimitExceeded { depth: usize },

    #[error("suite `{suite}` never reached pinned section path {path}, section order is not deterministic")]
    PinnedPathUnreached { suite: String, path: String },

    #[error(
        "suite `{suite}` reached section `{found}` at path {path}, but discovery recorded `{expected}`"
    )]
    SectionMismatch {
        suite: String,
        path: String,
        expected: String,
        found: String,
    },
}

impl TraversalError {
    /// Whether the fixed capacity of a [`PathStack`](crate::path::PathStack) ran out.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            TraversalError::DepthLimitExceeded | TraversalError::IndexLimitExceeded { .. }
        )
    }

    /// Whether a replayed run diverged from the run that discovered its path.
    pub fn is_consistency(&self) -> bool {
        matches!(
            self,
            TraversalError::PinnedPathUnreached { .. } | TraversalError::SectionMismatch { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not read source file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}, expected {expected}")]
    InvalidValue {
        var: String,
        value: String,
        expected: &'static str,
    },

    #[error("could not create output file {}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
