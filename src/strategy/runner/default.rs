use std::{
    cmp,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    thread::{self, Scope, ScopedJoinHandle},
};

use crate::{outcome::SuiteOutcome, runner::SuiteRunner, suite::Suite};

/// Runs suites concurrently on a pool of scoped worker threads.
///
/// Outcomes arrive in completion order.
#[derive(Debug)]
pub struct DefaultRunner {
    threads: NonZeroUsize,
}

impl Default for DefaultRunner {
    fn default() -> Self {
        Self {
            threads: thread::available_parallelism().unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl DefaultRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_thread_count(self, count: NonZeroUsize) -> Self {
        Self { threads: count }
    }
}

type Finished<'r> = (&'r Suite, thread::Result<SuiteOutcome>);

struct DefaultRunnerIterator<'r, 's, I, F>
where
    I: Iterator<Item = (F, &'r Suite)>,
    F: (Fn() -> SuiteOutcome) + Send,
{
    source: I,
    push_job: crossbeam_channel::Sender<Option<(F, &'r Suite)>>,
    wait_job: crossbeam_channel::Receiver<Finished<'r>>,
    _scope: &'s Scope<'s, 'r>,
    _workers: Vec<ScopedJoinHandle<'s, ()>>,
}

impl<'r, 's, I, F> DefaultRunnerIterator<'r, 's, I, F>
where
    I: Iterator<Item = (F, &'r Suite)>,
    F: (Fn() -> SuiteOutcome) + Send + 's,
{
    fn new(worker_count: NonZeroUsize, mut iter: I, scope: &'s Scope<'s, 'r>) -> Self {
        let (itx, irx) = crossbeam_channel::bounded(worker_count.into());
        let (otx, orx) = crossbeam_channel::bounded(1);
        let workers = (0..worker_count.get())
            .map(|_| {
                let irx = irx.clone();
                let otx = otx.clone();
                let _ = itx.try_send(iter.next());
                scope.spawn(move || {
                    while let Ok(Some((f, suite))) = irx.recv() {
                        // Panics travel to the consuming thread instead of
                        // taking the worker down.
                        let outcome = panic::catch_unwind(AssertUnwindSafe(&f));
                        if otx.send((suite, outcome)).is_err() {
                            // The receiver is gone, nobody wants the rest.
                            return;
                        }
                    }
                })
            })
            .collect();

        Self {
            source: iter,
            push_job: itx,
            wait_job: orx,
            _scope: scope,
            _workers: workers,
        }
    }
}

impl<'r, 's, I, F> Iterator for DefaultRunnerIterator<'r, 's, I, F>
where
    I: Iterator<Item = (F, &'r Suite)>,
    F: (Fn() -> SuiteOutcome) + Send + 's,
{
    type Item = (&'r Suite, SuiteOutcome);

    fn next(&mut self) -> Option<Self::Item> {
        let (suite, outcome) = self.wait_job.recv().ok()?;
        let next_job = self.source.next();
        if let Err(crossbeam_channel::SendError(Some((_, suite)))) = self.push_job.send(next_job) {
            // Sending `None` to exited workers is fine, losing a real job is not.
            panic!("no worker available for suite {}", suite.name);
        }

        match outcome {
            Ok(outcome) => Some((suite, outcome)),
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}

impl SuiteRunner for DefaultRunner {
    fn run<'r, 's, I, F>(
        &self,
        suites: I,
        scope: &'s Scope<'s, 'r>,
    ) -> impl Iterator<Item = (&'r Suite, SuiteOutcome)>
    where
        I: ExactSizeIterator<Item = (F, &'r Suite)>,
        F: (Fn() -> SuiteOutcome) + Send + 's,
    {
        let worker_count = self.worker_count(suites.len());
        DefaultRunnerIterator::new(worker_count, suites, scope)
    }

    fn worker_count(&self, suite_count: usize) -> NonZeroUsize {
        NonZeroUsize::new(cmp::min(self.threads.get(), suite_count)).unwrap_or(NonZeroUsize::MIN)
    }
}
