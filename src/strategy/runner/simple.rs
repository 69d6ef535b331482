use std::{num::NonZeroUsize, thread::Scope};

use crate::{outcome::SuiteOutcome, runner::SuiteRunner, suite::Suite};

/// Runs every suite on the calling thread, in the order they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleRunner;

impl SimpleRunner {
    pub fn new() -> Self {
        Self
    }
}

impl SuiteRunner for SimpleRunner {
    fn run<'r, 's, I, F>(
        &self,
        suites: I,
        _: &'s Scope<'s, 'r>,
    ) -> impl Iterator<Item = (&'r Suite, SuiteOutcome)>
    where
        I: ExactSizeIterator<Item = (F, &'r Suite)>,
        F: (Fn() -> SuiteOutcome) + Send + 's,
    {
        suites.map(|(run, suite)| (suite, run()))
    }

    fn worker_count(&self, _: usize) -> NonZeroUsize {
        NonZeroUsize::MIN
    }
}
