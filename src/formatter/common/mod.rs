//! Common helpers for formatter implementations.
//!
//! Small pieces shared by the built in formatters. They are formatter focused
//! and not meant as general purpose building blocks.

use std::{
    fmt::{self, Display},
    time::Duration,
};

use crate::result::{AssertionRecord, ScopeRecord};

pub mod color;

/// A scope name followed by its parameters, `name (1, "a")`.
#[derive(Debug, Clone, Copy)]
pub struct ScopeLabel<'o>(pub &'o ScopeRecord);

impl Display for ScopeLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)?;
        if !self.0.params.is_empty() {
            write!(f, " ({})", self.0.params.join(", "))?;
        }
        Ok(())
    }
}

/// The comparison of an assertion, preferring source text over rendered values.
#[derive(Debug, Clone, Copy)]
pub struct AssertionExpr<'o>(pub &'o AssertionRecord);

impl Display for AssertionExpr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assertion = self.0;
        let lhs = assertion.lhs_source.as_deref().unwrap_or(&assertion.lhs);
        let rhs = assertion.rhs_source.as_deref().unwrap_or(&assertion.rhs);
        write!(f, "{lhs} {} {rhs}", assertion.comparison)
    }
}

/// Whether the rendered values add anything over [`AssertionExpr`].
pub fn shows_values(assertion: &AssertionRecord) -> bool {
    assertion.lhs_source.is_some() || assertion.rhs_source.is_some()
}

pub struct Seconds(pub Duration);

impl Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}s", self.0.as_secs_f64())
    }
}

pub fn plural(count: usize, singular: &str) -> String {
    match count {
        1 => format!("1 {singular}"),
        count => format!("{count} {singular}s"),
    }
}
