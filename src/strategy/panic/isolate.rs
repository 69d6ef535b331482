use std::{
    panic::{UnwindSafe, catch_unwind},
    time::Instant,
};

use tracing::warn;

use crate::{
    outcome::SuiteOutcome,
    panic::{SuitePanicHandler, payload_as_string},
    suite::SuiteMeta,
};

/// A [`SuitePanicHandler`] that contains a panic to its own suite.
///
/// The panicking suite loses its results and is reported with a single fatal
/// and the panic message. Every other suite runs and reports as usual.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IsolatePanicHandler;

impl SuitePanicHandler for IsolatePanicHandler {
    fn handle<F: FnOnce() -> SuiteOutcome + UnwindSafe>(&self, f: F, meta: &SuiteMeta) -> SuiteOutcome {
        let now = Instant::now();
        match catch_unwind(f) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let message = payload_as_string(payload.as_ref());
                warn!(suite = %meta.name, %message, "isolated panicking suite");
                SuiteOutcome::panicked(message, now.elapsed())
            }
        }
    }
}
