//! Panic handling for sectest.
//!
//! Assertion failures never unwind, they are recorded in the result tree.
//! A panic out of a suite body is something else: user code crashed, or the
//! traversal hit a [`TraversalError`]. The traversal logs it with the name of
//! the innermost open scope and resumes unwinding, and then the panic handler
//! decides what happens to the rest of the run.
//!
//! Implement [`SuitePanicHandler`] to define how sectest deals with panicking
//! suites.

use std::{any::Any, panic::UnwindSafe};

use crate::{error::TraversalError, outcome::SuiteOutcome, suite::SuiteMeta};

mod default;
pub use default::*;

mod isolate;
pub use isolate::*;

/// A strategy for executing one suite and dealing with its panics.
///
/// Panic handlers are called from worker threads, so they are passed by
/// shared reference.
pub trait SuitePanicHandler {
    /// Execute `f`, which runs every thunk of the suite described by `meta`.
    fn handle<F: FnOnce() -> SuiteOutcome + UnwindSafe>(&self, f: F, meta: &SuiteMeta) -> SuiteOutcome;
}

/// Render a panic payload as text.
///
/// Understands the payloads of `panic!` (`&'static str` and `String`) and
/// [`TraversalError`]. Other payloads are shown as a placeholder.
pub fn payload_as_string(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        return message.to_string();
    }
    if let Some(message) = payload.downcast_ref::<String>() {
        return message.clone();
    }
    if let Some(err) = payload.downcast_ref::<TraversalError>() {
        return err.to_string();
    }
    String::from("Box<dyn Any>")
}

#[cfg(test)]
mod tests {
    use std::panic::{catch_unwind, panic_any};

    use super::*;

    #[test]
    fn payloads_render_as_text() {
        let payload = catch_unwind(|| panic!("static")).unwrap_err();
        assert_eq!(payload_as_string(payload.as_ref()), "static");

        let value = 3;
        let payload = catch_unwind(|| panic!("formatted {value}")).unwrap_err();
        assert_eq!(payload_as_string(payload.as_ref()), "formatted 3");

        let payload = catch_unwind(|| panic_any(TraversalError::DepthLimitExceeded)).unwrap_err();
        assert_eq!(
            payload_as_string(payload.as_ref()),
            "sections are nested deeper than 32 levels"
        );

        let payload = catch_unwind(|| panic_any(17u8)).unwrap_err();
        assert_eq!(payload_as_string(payload.as_ref()), "Box<dyn Any>");
    }
}
