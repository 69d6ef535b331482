use std::panic::UnwindSafe;

use crate::{outcome::SuiteOutcome, panic::SuitePanicHandler, suite::SuiteMeta};

/// The default [`SuitePanicHandler`]: panics are not caught.
///
/// A panicking suite aborts the whole run. The panic has already been logged
/// by the traversal and keeps unwinding through the runner into the caller of
/// the harness.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DefaultPanicHandler;

impl SuitePanicHandler for DefaultPanicHandler {
    fn handle<F: FnOnce() -> SuiteOutcome + UnwindSafe>(&self, f: F, _: &SuiteMeta) -> SuiteOutcome {
        f()
    }
}
