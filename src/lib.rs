//! A section-tree test engine.
//!
//! A suite body is an ordinary closure that opens nested, named sections.
//! Instead of running every section in one go, sectest runs the body once per
//! leaf of its section tree: each run follows the path the previous run
//! discovered, enters exactly one new leaf and discovers the next. Setup code
//! written before a section is therefore shared by every leaf below it
//! without fixtures.
//!
//! ```ignore
//! let mut registry = sectest::SuiteRegistry::new();
//! registry.suite("vec").run(|ctx| {
//!     let mut v = vec![1, 2, 3];
//!     ctx.section("push", |ctx| {
//!         v.push(4);
//!         ctx.expect(v.len()).is_eq(4);
//!     });
//!     ctx.section("clear", |ctx| {
//!         v.clear();
//!         ctx.require(v.is_empty()).is_eq(true);
//!     });
//! });
//! sectest::run(&registry)
//! ```
//!
//! Runs are driven by a [`SuiteHarness`] whose filter, panic handler, runner
//! and formatter are exchangeable strategies.

use std::{fmt::Display, io, process::ExitCode};

use tracing::warn;

pub mod config;
pub mod context;
pub mod error;
pub mod expect;
pub mod formatter;
pub mod outcome;
pub mod path;
pub mod result;
pub mod source;
pub mod suite;
pub mod traverse;

mod strategy;
pub use strategy::*;

mod harness;
pub use harness::*;

mod report;
pub use report::*;

#[cfg(test)]
mod test_support;

pub use context::Context;
pub use suite::SuiteRegistry;

use crate::{
    config::{Config, FormatKind},
    formatter::common::color::SupportsColor,
    formatter::{json::JsonFormatter, no::NoFormatter, pretty::PrettyFormatter, terse::TerseFormatter},
};

/// Run every suite of `registry` with settings from the environment.
///
/// Returns a failing exit code if any assertion failed or the configuration
/// could not be read.
pub fn run(registry: &SuiteRegistry) -> ExitCode {
    match Config::from_env() {
        Ok(config) => run_with_config(registry, &config),
        Err(err) => {
            eprintln!("sectest: {err}");
            ExitCode::FAILURE
        }
    }
}

/// Run every suite of `registry` with explicit settings.
///
/// Output goes to [`Config::output`] if set, otherwise to stdout.
pub fn run_with_config(registry: &SuiteRegistry, config: &Config) -> ExitCode {
    match config.open_output() {
        Ok(Some(file)) => run_to(registry, config, file),
        Ok(None) => run_to(registry, config, io::stdout()),
        Err(err) => {
            eprintln!("sectest: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_to<W>(registry: &SuiteRegistry, config: &Config, target: W) -> ExitCode
where
    W: io::Write + SupportsColor,
{
    let harness = harness(registry)
        .with_filter(config.filter())
        .with_runner(config.runner())
        .with_env(config.suite_env());

    match config.format {
        FormatKind::Pretty => finish(
            harness
                .with_formatter(
                    PrettyFormatter::default()
                        .with_target(target)
                        .with_color_setting(config.color),
                )
                .run(),
        ),
        FormatKind::Terse => finish(
            harness
                .with_formatter(
                    TerseFormatter::default()
                        .with_target(target)
                        .with_color_setting(config.color),
                )
                .run(),
        ),
        FormatKind::Json => finish(
            harness
                .with_formatter(JsonFormatter::default().with_target(target))
                .run(),
        ),
        FormatKind::None => finish(harness.with_formatter(NoFormatter).run()),
    }
}

fn finish<E: Display>(report: SuiteReport<'_, E>) -> ExitCode {
    for (kind, err) in report.fmt_errors.iter() {
        warn!(%kind, %err, "formatter error");
    }
    report.exit_code()
}
