use std::{process::ExitCode, time::Duration};

use crate::{
    formatter::FormatError,
    outcome::{SuiteOutcome, Totals},
};

pub type SuiteOutcomes<'r> = Vec<(&'r str, SuiteOutcome)>;

#[derive(Debug)]
#[non_exhaustive]
pub struct SuiteReport<'r, FmtError: 'r> {
    /// Outcomes of every suite that ran, in registration order.
    pub outcomes: SuiteOutcomes<'r>,
    pub totals: Totals,
    /// Time the whole run took.
    pub wall_duration: Duration,
    /// Sum of the durations of every suite.
    pub cpu_duration: Duration,
    pub filtered_out: usize,
    pub fmt_errors: Vec<(FormatError, FmtError)>,
}

impl<'r, FmtError> SuiteReport<'r, FmtError> {
    /// Whether no assertion of any suite failed.
    pub fn success(&self) -> bool {
        self.totals.success()
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.success() {
            true => ExitCode::SUCCESS,
            false => ExitCode::FAILURE,
        }
    }

    pub fn outcome(&self, name: &str) -> Option<&SuiteOutcome> {
        self.outcomes
            .iter()
            .find(|(suite, _)| *suite == name)
            .map(|(_, outcome)| outcome)
    }
}
