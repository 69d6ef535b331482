mod suite;
use std::io;

pub use suite::SuiteHarness;

use crate::{
    context::SuiteEnv, filter::DefaultFilter, formatter::pretty::PrettyFormatter,
    panic::DefaultPanicHandler, runner::SmartRunner, suite::SuiteRegistry,
};

/// A harness over `registry` with the default strategies.
///
/// Suites are filtered by nothing, panics propagate, small runs stay on the
/// calling thread and output goes to stdout in detail.
pub fn harness(
    registry: &SuiteRegistry,
) -> SuiteHarness<'_, DefaultFilter, DefaultPanicHandler, SmartRunner, PrettyFormatter<io::Stdout>> {
    SuiteHarness {
        registry,
        filter: DefaultFilter::default(),
        panic_handler: DefaultPanicHandler,
        runner: SmartRunner::default(),
        formatter: PrettyFormatter::default(),
        env: SuiteEnv::default(),
    }
}
