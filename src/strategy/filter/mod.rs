//! Suite filtering for sectest.
//!
//! A filter decides which registered suites take part in a run.
//! Suites that do not pass the filter are never executed and never reach the
//! formatter, they only show up in the `filtered_out` count.
//!
//! This is different to a suite being skipped: a skipped suite did run, but
//! none of its thunks produced a result.
//!
//! Implement [`SuiteFilter`] to define a filter strategy for sectest.

use crate::suite::Suite;

mod no;
pub use no::*;

mod default;
pub use default::*;

/// The result of applying a [`SuiteFilter`].
///
/// The iterator is required to be an [`ExactSizeIterator`], so the runner can
/// size its worker pool and the formatter can announce how many suites run.
#[derive(Debug)]
pub struct FilteredSuites<'r, I>
where
    I: ExactSizeIterator<Item = &'r Suite>,
{
    /// The suites that are included in the run, in registration order.
    pub suites: I,

    /// The number of suites that were filtered out.
    pub filtered_out: usize,
}

/// A strategy for selecting which suites are included in a run.
pub trait SuiteFilter {
    /// Filter the given slice of suites.
    ///
    /// The iterator must yield references into `suites` and keep their order.
    fn filter<'r>(
        &self,
        suites: &'r [Suite],
    ) -> FilteredSuites<'r, impl ExactSizeIterator<Item = &'r Suite>>;
}
