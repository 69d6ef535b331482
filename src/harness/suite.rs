use std::{sync::Arc, thread, time::Instant};

use tracing::{debug, info, trace};

use crate::{
    SuiteReport,
    context::SuiteEnv,
    filter::{FilteredSuites, SuiteFilter},
    formatter::*,
    outcome::{BucketOutcome, SuiteOutcome, Totals},
    panic::SuitePanicHandler,
    result::{Record, ResultTree},
    runner::SuiteRunner,
    suite::{Suite, SuiteMeta, SuiteRegistry},
};

/// A configured run over a [`SuiteRegistry`].
///
/// Every strategy is a type parameter, swap them with the `with_*` methods
/// and start the run with [`run`](Self::run).
pub struct SuiteHarness<'r, Filter, PanicHandler, Runner, Formatter> {
    pub(crate) registry: &'r SuiteRegistry,
    pub(crate) filter: Filter,
    pub(crate) panic_handler: PanicHandler,
    pub(crate) runner: Runner,
    pub(crate) formatter: Formatter,
    pub(crate) env: SuiteEnv,
}

impl<
    'r,
    Filter: SuiteFilter,
    PanicHandler: SuitePanicHandler + Send + Sync + 'r,
    Runner: SuiteRunner,
    Formatter: SuiteFormatter,
> SuiteHarness<'r, Filter, PanicHandler, Runner, Formatter>
{
    /// Run every suite that passes the filter and report the results.
    ///
    /// [`SuiteFormatter::fmt_begin`] is called before the first suite starts.
    /// All other formatter events are replayed in registration order after
    /// the last suite finished.
    pub fn run(self) -> SuiteReport<'r, Formatter::Error> {
        let now = Instant::now();

        let mut formatter = self.formatter;
        let mut fmt_errors = Vec::new();

        let FilteredSuites {
            suites,
            filtered_out,
        } = self.filter.filter(self.registry.suites());
        info!(suites = suites.len(), filtered_out, "starting run");
        fmt_errors.push_on_error(
            FormatError::Begin,
            formatter.fmt_begin(FmtBegin {
                suites: suites.len(),
                filtered_out,
            }),
        );

        let panic_handler = Arc::new(self.panic_handler);
        let env = Arc::new(self.env);
        let runner = self.runner;

        let mut outcomes: Vec<(&'r Suite, SuiteOutcome)> = thread::scope(|scope| {
            let suite_runs = suites.map(|suite| {
                let panic_handler = Arc::clone(&panic_handler);
                let env = Arc::clone(&env);
                (
                    move || {
                        let env: &SuiteEnv = &env;
                        panic_handler.handle(move || run_suite(suite, env), &suite.meta)
                    },
                    suite,
                )
            });

            runner
                .run(suite_runs, scope)
                .inspect(|(suite, outcome)| {
                    debug!(
                        suite = %suite.name,
                        pass = outcome.tally.pass,
                        fail = outcome.tally.fail,
                        fatal = outcome.tally.fatal,
                        skipped = outcome.skipped(),
                        "suite finished"
                    );
                })
                .collect()
        });
        outcomes.sort_by_key(|(suite, _)| suite.index);

        let wall_duration = now.elapsed();
        let cpu_duration = outcomes.iter().map(|(_, outcome)| outcome.duration).sum();

        let mut totals = Totals::default();
        for (suite, outcome) in outcomes.iter() {
            totals.add(outcome);
            if outcome.skipped() {
                trace!(suite = %suite.name, "skipped, nothing to report");
                continue;
            }
            replay_suite(&mut formatter, &mut fmt_errors, &suite.meta, outcome);
        }

        fmt_errors.push_on_error(
            FormatError::Totals,
            formatter.fmt_totals(FmtTotals {
                totals,
                wall_duration,
                cpu_duration,
                filtered_out,
            }),
        );
        fmt_errors.push_on_error(FormatError::End, formatter.fmt_end());

        info!(
            pass = totals.tally.pass,
            fail = totals.tally.fail,
            fatal = totals.tally.fatal,
            ?wall_duration,
            "run finished"
        );

        SuiteReport {
            outcomes: outcomes
                .into_iter()
                .map(|(suite, outcome)| (suite.name.as_ref(), outcome))
                .collect(),
            totals,
            wall_duration,
            cpu_duration,
            filtered_out,
            fmt_errors,
        }
    }
}

/// Call every thunk of `suite`, one after another.
fn run_suite(suite: &Suite, env: &SuiteEnv) -> SuiteOutcome {
    SuiteOutcome::from_buckets(suite.buckets.iter().map(|bucket| BucketOutcome {
        type_names: bucket.type_names.clone(),
        trees: bucket.thunks().iter().map(|thunk| thunk.call(env)).collect(),
    }))
}

fn replay_suite<F: SuiteFormatter>(
    formatter: &mut F,
    fmt_errors: &mut Vec<(FormatError, F::Error)>,
    meta: &SuiteMeta,
    outcome: &SuiteOutcome,
) {
    let fmt_suite = FmtSuite {
        meta,
        tally: outcome.tally,
        duration: outcome.duration,
        panic: outcome.panicked_with(),
    };
    fmt_errors.push_on_error(FormatError::SuiteBegin, formatter.fmt_suite_begin(fmt_suite));

    for bucket in outcome.buckets.iter().filter(|bucket| !bucket.trees.is_empty()) {
        if !bucket.type_names.is_empty() {
            fmt_errors.push_on_error(
                FormatError::SuiteTemplates,
                formatter.fmt_suite_templates(FmtTemplates {
                    meta,
                    type_names: &bucket.type_names,
                }),
            );
        }
        for tree in bucket.trees.iter() {
            replay_tree(formatter, fmt_errors, meta, tree);
        }
    }

    fmt_errors.push_on_error(FormatError::SuiteEnd, formatter.fmt_suite_end(fmt_suite));
}

/// Replay the records below the root of `tree`, depth first.
fn replay_tree<F: SuiteFormatter>(
    formatter: &mut F,
    fmt_errors: &mut Vec<(FormatError, F::Error)>,
    meta: &SuiteMeta,
    tree: &ResultTree,
) {
    let params: &[String] = tree.root().map(|root| root.params.as_slice()).unwrap_or_default();
    if !params.is_empty() {
        fmt_errors.push_on_error(
            FormatError::SuiteParameters,
            formatter.fmt_suite_parameters(FmtParameters { meta, params }),
        );
    }

    for (_, record) in tree.body() {
        match record {
            Record::Scope(scope) => fmt_errors.push_on_error(
                FormatError::ScopeBegin,
                formatter.fmt_scope_begin(FmtScope {
                    meta,
                    params,
                    scope,
                }),
            ),
            Record::Assertion(assertion) => {
                if let Some(scope) = tree.scope(assertion.parent) {
                    fmt_errors.push_on_error(
                        FormatError::Expect,
                        formatter.fmt_expect(FmtExpect {
                            meta,
                            params,
                            scope,
                            assertion,
                        }),
                    );
                }
            }
            Record::ScopeClose(close) => {
                if let Some(scope) = tree.scope(close.scope) {
                    fmt_errors.push_on_error(
                        FormatError::ScopeEnd,
                        formatter.fmt_scope_end(FmtScope {
                            meta,
                            params,
                            scope,
                        }),
                    );
                }
            }
        }
    }
}

impl<'r, Filter, PanicHandler, Runner, Formatter>
    SuiteHarness<'r, Filter, PanicHandler, Runner, Formatter>
{
    pub fn with_filter<WithFilter: SuiteFilter>(
        self,
        filter: WithFilter,
    ) -> SuiteHarness<'r, WithFilter, PanicHandler, Runner, Formatter> {
        SuiteHarness {
            registry: self.registry,
            filter,
            panic_handler: self.panic_handler,
            runner: self.runner,
            formatter: self.formatter,
            env: self.env,
        }
    }

    pub fn with_panic_handler<WithPanicHandler: SuitePanicHandler>(
        self,
        panic_handler: WithPanicHandler,
    ) -> SuiteHarness<'r, Filter, WithPanicHandler, Runner, Formatter> {
        SuiteHarness {
            registry: self.registry,
            filter: self.filter,
            panic_handler,
            runner: self.runner,
            formatter: self.formatter,
            env: self.env,
        }
    }

    pub fn with_runner<WithRunner: SuiteRunner>(
        self,
        runner: WithRunner,
    ) -> SuiteHarness<'r, Filter, PanicHandler, WithRunner, Formatter> {
        SuiteHarness {
            registry: self.registry,
            filter: self.filter,
            panic_handler: self.panic_handler,
            runner,
            formatter: self.formatter,
            env: self.env,
        }
    }

    pub fn with_formatter<WithFormatter: SuiteFormatter>(
        self,
        formatter: WithFormatter,
    ) -> SuiteHarness<'r, Filter, PanicHandler, Runner, WithFormatter> {
        SuiteHarness {
            registry: self.registry,
            filter: self.filter,
            panic_handler: self.panic_handler,
            runner: self.runner,
            formatter,
            env: self.env,
        }
    }

    /// Settings every suite invocation of this run sees.
    pub fn with_env(self, env: SuiteEnv) -> Self {
        Self { env, ..self }
    }
}
