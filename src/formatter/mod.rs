//! Output formatting for sectest.
//!
//! A formatter consumes the events of a run and renders them. The harness
//! calls [`SuiteFormatter::fmt_begin`] before any suite starts. Every other
//! event is produced after all suites finished, replayed in registration order
//! so output never depends on how the runner scheduled suites:
//!
//! 1. [`fmt_begin`](SuiteFormatter::fmt_begin), once.
//! 2. For every suite that was not skipped:
//!    [`fmt_suite_begin`](SuiteFormatter::fmt_suite_begin), then per
//!    instantiation bucket with type names
//!    [`fmt_suite_templates`](SuiteFormatter::fmt_suite_templates), then per
//!    result tree [`fmt_suite_parameters`](SuiteFormatter::fmt_suite_parameters)
//!    if it had parameters, followed by a depth first replay of its scopes and
//!    assertions, and finally [`fmt_suite_end`](SuiteFormatter::fmt_suite_end).
//! 3. [`fmt_totals`](SuiteFormatter::fmt_totals), then
//!    [`fmt_end`](SuiteFormatter::fmt_end).
//!
//! Formatter errors never stop a run, the harness collects them into the
//! [`SuiteReport`](crate::SuiteReport).

use std::time::Duration;

use thiserror::Error;

use crate::{
    outcome::Totals,
    result::{AssertionRecord, ScopeRecord, Tally},
    suite::SuiteMeta,
};

pub mod common;
pub mod json;
pub mod no;
pub mod pretty;
pub mod terse;

/// Sent before the first suite starts.
///
/// `suites` only counts what passed the filter, every registered suite is
/// either in `suites` or in `filtered_out`.
#[derive(Debug, Clone, Copy)]
pub struct FmtBegin {
    /// Suites about to run.
    pub suites: usize,
    pub filtered_out: usize,
}

impl FmtBegin {
    /// Every suite of the registry, run or filtered.
    pub fn registered(&self) -> usize {
        self.suites + self.filtered_out
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FmtSuite<'o> {
    pub meta: &'o SuiteMeta,
    pub tally: Tally,
    pub duration: Duration,
    pub panic: Option<&'o str>,
}

#[derive(Debug, Clone, Copy)]
pub struct FmtTemplates<'o> {
    pub meta: &'o SuiteMeta,
    pub type_names: &'o [String],
}

#[derive(Debug, Clone, Copy)]
pub struct FmtParameters<'o> {
    pub meta: &'o SuiteMeta,
    pub params: &'o [String],
}

#[derive(Debug, Clone, Copy)]
pub struct FmtScope<'o> {
    pub meta: &'o SuiteMeta,
    /// Parameters of the result tree the scope belongs to, empty if none.
    pub params: &'o [String],
    pub scope: &'o ScopeRecord,
}

#[derive(Debug, Clone, Copy)]
pub struct FmtExpect<'o> {
    pub meta: &'o SuiteMeta,
    /// Parameters of the result tree the assertion belongs to, empty if none.
    pub params: &'o [String],
    /// The scope the assertion was logged in.
    pub scope: &'o ScopeRecord,
    pub assertion: &'o AssertionRecord,
}

#[derive(Debug, Clone, Copy)]
pub struct FmtTotals {
    pub totals: Totals,
    pub wall_duration: Duration,
    pub cpu_duration: Duration,
    pub filtered_out: usize,
}

/// A consumer of run events.
///
/// Every method defaults to doing nothing, so formatters only implement the
/// events they care about.
pub trait SuiteFormatter {
    type Error;

    fn fmt_begin(&mut self, data: FmtBegin) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_suite_templates(&mut self, data: FmtTemplates<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_suite_parameters(&mut self, data: FmtParameters<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_scope_begin(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_expect(&mut self, data: FmtExpect<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_scope_end(&mut self, data: FmtScope<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_suite_end(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        let _ = data;
        Ok(())
    }

    fn fmt_end(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

macro_rules! forward_formatter {
    ($($method:ident($($data:ty)?)),* $(,)?) => {$(
        fn $method(&mut self $(, data: $data)?) -> Result<(), Self::Error> {
            (**self).$method($(forward_formatter!(@arg data $data))?)
        }
    )*};
    (@arg $data:ident $ty:ty) => { $data };
}

impl<F: SuiteFormatter + ?Sized> SuiteFormatter for &mut F {
    type Error = F::Error;

    forward_formatter![
        fmt_begin(FmtBegin),
        fmt_suite_begin(FmtSuite<'_>),
        fmt_suite_templates(FmtTemplates<'_>),
        fmt_suite_parameters(FmtParameters<'_>),
        fmt_scope_begin(FmtScope<'_>),
        fmt_expect(FmtExpect<'_>),
        fmt_scope_end(FmtScope<'_>),
        fmt_suite_end(FmtSuite<'_>),
        fmt_totals(FmtTotals),
        fmt_end(),
    ];
}

impl<F: SuiteFormatter + ?Sized> SuiteFormatter for Box<F> {
    type Error = F::Error;

    forward_formatter![
        fmt_begin(FmtBegin),
        fmt_suite_begin(FmtSuite<'_>),
        fmt_suite_templates(FmtTemplates<'_>),
        fmt_suite_parameters(FmtParameters<'_>),
        fmt_scope_begin(FmtScope<'_>),
        fmt_expect(FmtExpect<'_>),
        fmt_scope_end(FmtScope<'_>),
        fmt_suite_end(FmtSuite<'_>),
        fmt_totals(FmtTotals),
        fmt_end(),
    ];
}

/// The formatter call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FormatError {
    #[error("failed to format run start")]
    Begin,
    #[error("failed to format suite start")]
    SuiteBegin,
    #[error("failed to format suite instantiation")]
    SuiteTemplates,
    #[error("failed to format suite parameters")]
    SuiteParameters,
    #[error("failed to format scope start")]
    ScopeBegin,
    #[error("failed to format assertion")]
    Expect,
    #[error("failed to format scope end")]
    ScopeEnd,
    #[error("failed to format suite end")]
    SuiteEnd,
    #[error("failed to format totals")]
    Totals,
    #[error("failed to format run end")]
    End,
}

pub(crate) trait FmtErrors<E> {
    fn push_on_error(&mut self, kind: FormatError, result: Result<(), E>);
}

impl<E> FmtErrors<E> for Vec<(FormatError, E)> {
    fn push_on_error(&mut self, kind: FormatError, result: Result<(), E>) {
        if let Err(err) = result {
            self.push((kind, err));
        }
    }
}
