use std::convert::Infallible;

use crate::formatter::SuiteFormatter;

/// A formatter that produces no output.
///
/// Useful when a run only matters for its [`SuiteReport`](crate::SuiteReport),
/// for example when sectest is embedded into another tool with its own
/// reporting.
#[derive(Debug, Default, Clone)]
pub struct NoFormatter;

impl SuiteFormatter for NoFormatter {
    type Error = Infallible;
}
