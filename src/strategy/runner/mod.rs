//! Suite scheduling for sectest.
//!
//! A runner decides when and on which thread every suite executes.
//! It may run suites one after another on the calling thread or spread them
//! over worker threads. Thunks inside one suite always run in sequence on a
//! single thread, since each thunk's traversal depends on its own previous
//! runs.
//!
//! The harness passes the runner an iterator of suite execution functions.
//! These already include panic handling and produce a complete
//! [`SuiteOutcome`], so the runner only schedules.
//!
//! Implement [`SuiteRunner`] to define how sectest schedules suites.

use std::{num::NonZeroUsize, thread::Scope};

use crate::{outcome::SuiteOutcome, suite::Suite};

mod default;
pub use default::*;

mod simple;
pub use simple::*;

mod smart;
pub use smart::*;

/// A strategy for running suites and collecting their [`SuiteOutcome`]s.
///
/// The produced iterator does not have to keep the order of the incoming
/// suites, the harness restores registration order before reporting.
pub trait SuiteRunner {
    /// Run the given suites and return their outcomes.
    ///
    /// The input iterator yields `(f, suite)` pairs where `f` executes every
    /// thunk of `suite`.
    ///
    /// The runner receives a [`Scope`] so it can spawn threads while still
    /// borrowing the registry with lifetime `'r`.
    ///
    /// A panic escaping `f` must reach the caller of the returned iterator.
    fn run<'r, 's, I, F>(
        &self,
        suites: I,
        scope: &'s Scope<'s, 'r>,
    ) -> impl Iterator<Item = (&'r Suite, SuiteOutcome)>
    where
        I: ExactSizeIterator<Item = (F, &'r Suite)>,
        F: (Fn() -> SuiteOutcome) + Send + 's;

    /// Return the number of workers this runner would use for `suite_count`
    /// suites.
    fn worker_count(&self, suite_count: usize) -> NonZeroUsize;
}
