use std::{num::NonZeroUsize, thread::Scope};

use crate::{
    outcome::SuiteOutcome,
    runner::{DefaultRunner, SimpleRunner, SuiteRunner},
    suite::Suite,
};

/// Picks between [`SimpleRunner`] and [`DefaultRunner`].
///
/// Small runs, and every run in single threaded mode, stay on the calling
/// thread. Everything else goes to the worker pool.
#[derive(Debug)]
pub struct SmartRunner {
    threshold: usize,
    single_threaded: bool,
    simple: SimpleRunner,
    default: DefaultRunner,
}

impl Default for SmartRunner {
    fn default() -> Self {
        Self {
            threshold: 1,
            single_threaded: false,
            simple: SimpleRunner,
            default: DefaultRunner::default(),
        }
    }
}

impl SmartRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the calling thread for up to `threshold` suites.
    pub fn with_threshold(self, threshold: usize) -> Self {
        Self { threshold, ..self }
    }

    pub fn with_single_threaded(self, single_threaded: bool) -> Self {
        Self {
            single_threaded,
            ..self
        }
    }

    pub fn with_threads(mut self, threads: NonZeroUsize) -> Self {
        self.default = self.default.with_thread_count(threads);
        self
    }

    fn use_simple(&self, suite_count: usize) -> bool {
        self.single_threaded || suite_count <= self.threshold
    }
}

enum SmartRunnerIterator<IS, ID> {
    Simple(IS),
    Default(ID),
}

impl<'r, IS, ID> Iterator for SmartRunnerIterator<IS, ID>
where
    IS: Iterator<Item = (&'r Suite, SuiteOutcome)>,
    ID: Iterator<Item = (&'r Suite, SuiteOutcome)>,
{
    type Item = (&'r Suite, SuiteOutcome);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SmartRunnerIterator::Simple(i) => i.next(),
            SmartRunnerIterator::Default(i) => i.next(),
        }
    }
}

impl SuiteRunner for SmartRunner {
    fn run<'r, 's, I, F>(
        &self,
        suites: I,
        scope: &'s Scope<'s, 'r>,
    ) -> impl Iterator<Item = (&'r Suite, SuiteOutcome)>
    where
        I: ExactSizeIterator<Item = (F, &'r Suite)>,
        F: (Fn() -> SuiteOutcome) + Send + 's,
    {
        match self.use_simple(suites.len()) {
            true => SmartRunnerIterator::Simple(self.simple.run(suites, scope)),
            false => SmartRunnerIterator::Default(self.default.run(suites, scope)),
        }
    }

    fn worker_count(&self, suite_count: usize) -> NonZeroUsize {
        match self.use_simple(suite_count) {
            true => self.simple.worker_count(suite_count),
            false => self.default.worker_count(suite_count),
        }
    }
}
