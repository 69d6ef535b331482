//! Assertions inside a running suite.
//!
//! ```ignore
//! ctx.expect(stack.len()).is_eq(2);
//! ctx.require(stack.pop()).is_ne(None);
//! ```
//!
//! `expect` records a failure and keeps going, `require` records a fatal
//! failure which ends the whole suite invocation after the current run.
//! Both render their operands with [`Debug`].

use std::{fmt::Debug, panic::Location};

use crate::{context::Context, result::Comparison};

/// A pending comparison against a captured value.
///
/// Created by [`Context::expect`] and [`Context::require`]. The comparison
/// methods consume it and return whether the comparison held.
#[must_use = "an expectation does nothing until a comparison is made"]
pub struct Expectation<'c, T> {
    ctx: &'c mut Context,
    value: T,
    required: bool,
    location: &'static Location<'static>,
}

impl Context {
    /// Start a non fatal assertion on `value`.
    #[track_caller]
    pub fn expect<T>(&mut self, value: T) -> Expectation<'_, T> {
        Expectation {
            ctx: self,
            value,
            required: false,
            location: Location::caller(),
        }
    }

    /// Start a fatal assertion on `value`.
    ///
    /// If it fails, no further section of this suite invocation is entered
    /// and every later assertion is ignored.
    #[track_caller]
    pub fn require<T>(&mut self, value: T) -> Expectation<'_, T> {
        Expectation {
            ctx: self,
            value,
            required: true,
            location: Location::caller(),
        }
    }
}

impl<T: Debug> Expectation<'_, T> {
    pub fn is_eq<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialEq<U>,
    {
        let passed = self.value == rhs;
        self.conclude(rhs, Comparison::Equal, passed)
    }

    pub fn is_ne<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialEq<U>,
    {
        let passed = self.value != rhs;
        self.conclude(rhs, Comparison::NotEqual, passed)
    }

    pub fn is_lt<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialOrd<U>,
    {
        let passed = self.value < rhs;
        self.conclude(rhs, Comparison::LessThan, passed)
    }

    pub fn is_le<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialOrd<U>,
    {
        let passed = self.value <= rhs;
        self.conclude(rhs, Comparison::LessEqual, passed)
    }

    pub fn is_gt<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialOrd<U>,
    {
        let passed = self.value > rhs;
        self.conclude(rhs, Comparison::GreaterThan, passed)
    }

    pub fn is_ge<U: Debug>(self, rhs: U) -> bool
    where
        T: PartialOrd<U>,
    {
        let passed = self.value >= rhs;
        self.conclude(rhs, Comparison::GreaterEqual, passed)
    }

    fn conclude<U: Debug>(self, rhs: U, comparison: Comparison, passed: bool) -> bool {
        self.ctx.log_assertion(
            format!("{:?}", self.value),
            format!("{rhs:?}"),
            comparison,
            passed,
            self.required,
            self.location,
        )
    }
}
