//! The execution context of one suite invocation.
//!
//! A [`Context`] carries all state the backtracking traversal needs: the
//! current depth and sibling counter, the path this run has to follow, the
//! path discovered for the next run and the fatal flag.
//! It is created by the traversal driver, handed to the suite body by mutable
//! reference and threaded through every section, so concurrent suites never
//! share any of it.

use std::{
    fmt::Display,
    mem,
    panic::{self, AssertUnwindSafe, Location, panic_any},
};

use serde::Serialize;
use tracing::{debug, error, trace};

use crate::{
    error::TraversalError,
    panic::payload_as_string,
    path::{MAX_DEPTH, PathStack, SectionId},
    result::{Assertion, Comparison, Outcome, ResultTree},
    source::SourceLookup,
};

/// How strictly a replayed run is checked against the run that discovered it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsistencyCheck {
    /// Trust that section order is deterministic.
    Off,

    /// Fail with [`TraversalError::PinnedPathUnreached`] when a run never
    /// reaches the section its path points at.
    #[default]
    Reachable,

    /// Like [`Reachable`](Self::Reachable), and also fail with
    /// [`TraversalError::SectionMismatch`] when the section reached carries a
    /// different name than the one seen during discovery.
    Strict,
}

/// Settings shared by every invocation of every suite in a run.
///
/// Cheap to clone, each [`Context`] owns a copy.
#[derive(Debug, Clone, Default)]
pub struct SuiteEnv {
    source: Option<SourceLookup>,
    consistency: ConsistencyCheck,
}

impl SuiteEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(self, source: SourceLookup) -> Self {
        Self {
            source: Some(source),
            ..self
        }
    }

    pub fn without_source(self) -> Self {
        Self {
            source: None,
            ..self
        }
    }

    pub fn with_consistency(self, consistency: ConsistencyCheck) -> Self {
        Self {
            consistency,
            ..self
        }
    }

    pub fn source(&self) -> Option<&SourceLookup> {
        self.source.as_ref()
    }

    pub fn consistency(&self) -> ConsistencyCheck {
        self.consistency
    }
}

/// Explicit traversal state for one suite invocation.
#[derive(Debug)]
pub struct Context {
    suite: String,
    env: SuiteEnv,
    pub(crate) tree: ResultTree,

    depth: usize,
    /// Next sibling index at `depth`, wider than a path entry to detect overflow.
    index: usize,
    /// What this run has to follow. Cleared once its last entry is entered.
    pub(crate) pinned: PathStack,
    /// The pinned path as it was at the start of this run.
    target: PathStack,
    target_name: Option<String>,
    pin_reached: bool,
    /// The exact path to the section currently executing.
    working: PathStack,
    /// The next unexplored branch, collected while unwinding out of sections.
    discovered: PathStack,
    discovered_name: Option<String>,
    /// Set once a section completed in this run. From then on, sections are
    /// only recorded as discovery candidates, never entered.
    bail: bool,
    fatal: bool,

    annotation: Option<String>,
    pub(crate) panic_logged: bool,
}

impl Context {
    pub(crate) fn new(suite: impl Into<String>, env: SuiteEnv) -> Self {
        Self {
            suite: suite.into(),
            env,
            tree: ResultTree::new(),
            depth: 0,
            index: 0,
            pinned: PathStack::new(),
            target: PathStack::new(),
            target_name: None,
            pin_reached: false,
            working: PathStack::new(),
            discovered: PathStack::new(),
            discovered_name: None,
            bail: false,
            fatal: false,
            annotation: None,
            panic_logged: false,
        }
    }

    /// Name of the suite this context runs.
    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn env(&self) -> &SuiteEnv {
        &self.env
    }

    /// Whether a `require` failed, which stops the rest of this invocation.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// Nesting depth of the code currently running, `0` in the suite body.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The path to the section currently executing.
    pub fn path(&self) -> &PathStack {
        &self.working
    }

    /// Run `body` as a nested section named `name` if this run's path leads
    /// through it.
    ///
    /// Returns whether `body` ran.
    ///
    /// # Panics
    /// Panics with a [`TraversalError`] if sections nest deeper than
    /// [`MAX_DEPTH`] or a level holds more sections than a path can address.
    #[track_caller]
    pub fn section<F>(&mut self, name: &str, body: F) -> bool
    where
        F: FnOnce(&mut Self),
    {
        self.section_with(name, std::iter::empty::<&str>(), body)
    }

    /// Like [`section`](Self::section), additionally recording display
    /// strings of the values this section was parameterized with.
    #[track_caller]
    pub fn section_with<I, F>(&mut self, name: &str, params: I, body: F) -> bool
    where
        I: IntoIterator,
        I::Item: Display,
        F: FnOnce(&mut Self),
    {
        let location = Location::caller();
        let id = self.claim();
        if !self.should_enter(id, name) {
            return false;
        }

        let params = params.into_iter().map(|param| param.to_string()).collect();
        self.enter(id, name, location, params);
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(self))) {
            self.log_panic(name, payload.as_ref());
            panic::resume_unwind(payload);
        }
        self.exit(id);
        true
    }

    /// Attach `message` to the next assertion.
    pub fn info(&mut self, message: impl Into<String>) {
        if !self.fatal {
            self.annotation = Some(message.into());
        }
    }

    fn claim(&mut self) -> SectionId {
        if self.depth >= MAX_DEPTH {
            panic_any(TraversalError::DepthLimitExceeded);
        }
        let Ok(index) = u8::try_from(self.index) else {
            panic_any(TraversalError::IndexLimitExceeded { depth: self.depth });
        };
        self.index += 1;
        SectionId::new(self.depth, index)
    }

    fn should_enter(&mut self, id: SectionId, name: &str) -> bool {
        if self.fatal {
            return false;
        }

        if self.bail {
            if self.discovered.is_empty() {
                self.discovered.set(id);
                self.discovered_name = Some(name.to_owned());
            }
            return false;
        }

        match self.pinned.get(id.depth) {
            None => true,
            Some(index) => index == id.index,
        }
    }

    fn enter(
        &mut self,
        id: SectionId,
        name: &str,
        location: &'static Location<'static>,
        params: Vec<String>,
    ) {
        self.working.truncate(id.depth);
        self.working.set(id);

        if self.pinned.ends_at(id) {
            self.pinned.clear();
            self.pin_reached = true;
            if self.env.consistency == ConsistencyCheck::Strict
                && let Some(expected) = self.target_name.take()
                && expected != name
            {
                panic_any(TraversalError::SectionMismatch {
                    suite: self.suite.clone(),
                    path: self.working.to_string(),
                    expected,
                    found: name.to_owned(),
                });
            }
        }

        trace!(suite = %self.suite, section = name, path = %self.working, "entering section");
        self.depth += 1;
        self.index = 0;
        self.tree.scope_open(name, self.working, location, params);
    }

    fn exit(&mut self, id: SectionId) {
        self.tree.scope_close();
        self.working.truncate(id.depth);

        if !self.bail {
            self.discovered.clear();
            self.discovered_name = None;
            self.bail = true;
        } else if !self.discovered.is_empty() {
            self.discovered.set(id);
        }

        self.depth = id.depth;
        self.index = id.index as usize + 1;
    }

    pub(crate) fn log_panic(&mut self, scope: &str, payload: &(dyn std::any::Any + Send)) {
        if mem::replace(&mut self.panic_logged, true) {
            return;
        }
        error!(
            suite = %self.suite,
            scope,
            message = %payload_as_string(payload),
            "panic escaped test scope"
        );
    }

    /// Reset per-run state and pin whatever the previous run discovered.
    pub(crate) fn begin_run(&mut self) {
        self.pinned = mem::take(&mut self.discovered);
        self.target = self.pinned;
        self.target_name = self.discovered_name.take();
        self.pin_reached = false;
        self.working.clear();
        self.depth = 0;
        self.index = 0;
        self.bail = false;
        self.annotation = None;
    }

    /// # Panics
    /// Panics with [`TraversalError::PinnedPathUnreached`] if the run had a
    /// target, never reached it and consistency checks are enabled.
    pub(crate) fn check_consistency(&self) {
        let unreached = !self.fatal && !self.target.is_empty() && !self.pin_reached;
        if unreached && self.env.consistency != ConsistencyCheck::Off {
            panic_any(TraversalError::PinnedPathUnreached {
                suite: self.suite.clone(),
                path: self.target.to_string(),
            });
        }
    }

    /// Whether another run is needed to cover every leaf.
    pub(crate) fn has_next(&self) -> bool {
        !self.fatal && !self.discovered.is_empty()
    }

    /// Record the result of one comparison and return whether it held.
    ///
    /// Nothing is recorded once the invocation is fatal.
    pub(crate) fn log_assertion(
        &mut self,
        lhs: String,
        rhs: String,
        comparison: Comparison,
        passed: bool,
        required: bool,
        location: &'static Location<'static>,
    ) -> bool {
        if self.fatal {
            return false;
        }

        let outcome = match (passed, required) {
            (true, _) => Outcome::Pass,
            (false, false) => Outcome::Fail,
            (false, true) => Outcome::Fatal,
        };

        let keyword = match required {
            true => "require",
            false => "expect",
        };
        let (lhs_source, rhs_source) = self
            .env
            .source
            .as_ref()
            .and_then(|source| source.operands(location, keyword, method_name(comparison)))
            .unzip();

        self.tree.log_assertion(Assertion {
            lhs,
            rhs,
            lhs_source,
            rhs_source,
            comparison,
            outcome,
            annotation: self.annotation.take(),
            location,
        });

        if outcome == Outcome::Fatal {
            debug!(
                suite = %self.suite,
                path = %self.working,
                "required assertion failed, skipping remaining sections"
            );
            self.fatal = true;
            self.discovered.clear();
            self.discovered_name = None;
        }
        passed
    }

    pub(crate) fn into_tree(self) -> ResultTree {
        self.tree
    }
}

fn method_name(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Equal => "is_eq",
        Comparison::NotEqual => "is_ne",
        Comparison::LessThan => "is_lt",
        Comparison::LessEqual => "is_le",
        Comparison::GreaterThan => "is_gt",
        Comparison::GreaterEqual => "is_ge",
    }
}

#[cfg(test)]
mod tests {
    use std::panic::catch_unwind;

    use super::*;

    fn context() -> Context {
        let mut ctx = Context::new("suite", SuiteEnv::new());
        ctx.tree
            .scope_open("suite", PathStack::new(), Location::caller(), Vec::new());
        ctx
    }

    #[test]
    fn first_run_enters_leftmost_leaf_and_discovers_sibling() {
        let mut ctx = context();
        ctx.begin_run();

        let mut entered = Vec::new();
        ctx.section("a", |ctx| {
            entered.push("a");
            ctx.section("a1", |_| entered.push("a1"));
            ctx.section("a2", |_| entered.push("a2"));
        });
        ctx.section("b", |_| entered.push("b"));

        assert_eq!(entered, ["a", "a1"]);
        assert!(ctx.has_next());
        assert_eq!(ctx.discovered.as_slice(), &[0, 1]);
        assert_eq!(ctx.discovered_name.as_deref(), Some("a2"));
    }

    #[test]
    fn pinned_run_follows_path_then_explores_freely() {
        let mut ctx = context();
        ctx.discovered = [1u8].iter().collect();
        ctx.begin_run();

        let mut entered = Vec::new();
        ctx.section("a", |_| entered.push("a"));
        ctx.section("b", |ctx| {
            entered.push("b");
            ctx.section("b1", |_| entered.push("b1"));
        });
        ctx.section("c", |_| entered.push("c"));

        assert_eq!(entered, ["b", "b1"]);
        assert!(ctx.pin_reached);
        assert_eq!(ctx.discovered.as_slice(), &[2]);
    }

    #[test]
    fn section_reports_whether_it_ran() {
        let mut ctx = context();
        ctx.begin_run();
        assert!(ctx.section("first", |_| {}));
        assert!(!ctx.section("second", |_| {}));
    }

    #[test]
    fn fatal_assertion_suppresses_everything_after_it() {
        let mut ctx = context();
        ctx.begin_run();

        ctx.section("a", |ctx| {
            ctx.section("a1", |ctx| {
                ctx.log_assertion("1".into(), "2".into(), Comparison::Equal, false, true, Location::caller());
            });
            ctx.section("a2", |_| unreachable!());
        });
        let ran = ctx.section("b", |_| unreachable!());

        assert!(!ran);
        assert!(ctx.is_fatal());
        assert!(!ctx.has_next());

        ctx.info("ignored");
        assert!(!ctx.log_assertion("1".into(), "1".into(), Comparison::Equal, true, false, Location::caller()));
        assert_eq!(ctx.annotation, None);
    }

    #[test]
    fn annotation_applies_to_next_assertion_only() {
        let mut ctx = context();
        ctx.begin_run();
        ctx.info("context");
        ctx.log_assertion("1".into(), "1".into(), Comparison::Equal, true, false, Location::caller());
        ctx.log_assertion("2".into(), "2".into(), Comparison::Equal, true, false, Location::caller());

        let annotations: Vec<_> = ctx
            .tree
            .records()
            .iter()
            .filter_map(|record| record.as_assertion())
            .map(|assertion| assertion.annotation.clone())
            .collect();
        assert_eq!(annotations, [Some("context".to_string()), None]);
    }

    #[test]
    fn unreachable_pin_is_reported() {
        let mut ctx = context();
        ctx.discovered = [3u8].iter().collect();
        ctx.begin_run();
        ctx.section("only", |_| {});

        let err = catch_unwind(AssertUnwindSafe(|| ctx.check_consistency())).unwrap_err();
        let err = err.downcast_ref::<TraversalError>().unwrap();
        assert!(matches!(err, TraversalError::PinnedPathUnreached { path, .. } if path == "3"));
    }

    #[test]
    fn unreachable_pin_is_ignored_when_checks_are_off() {
        let mut ctx = Context::new(
            "suite",
            SuiteEnv::new().with_consistency(ConsistencyCheck::Off),
        );
        ctx.discovered = [3u8].iter().collect();
        ctx.begin_run();
        ctx.check_consistency();
    }

    #[test]
    fn strict_check_compares_section_names() {
        let mut ctx = Context::new(
            "suite",
            SuiteEnv::new().with_consistency(ConsistencyCheck::Strict),
        );
        ctx.discovered = [1u8].iter().collect();
        ctx.discovered_name = Some("expected".into());
        ctx.begin_run();
        ctx.section("first", |_| {});

        let err = catch_unwind(AssertUnwindSafe(|| ctx.section("renamed", |_| {}))).unwrap_err();
        let err = err.downcast_ref::<TraversalError>().unwrap();
        assert_eq!(
            *err,
            TraversalError::SectionMismatch {
                suite: "suite".into(),
                path: "1".into(),
                expected: "expected".into(),
                found: "renamed".into(),
            }
        );
    }

    #[test]
    fn too_many_siblings_exceed_index_limit() {
        let mut ctx = context();
        ctx.begin_run();
        let err = catch_unwind(AssertUnwindSafe(|| {
            for _ in 0..=256 {
                ctx.section("s", |_| {});
            }
        }))
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TraversalError>(),
            Some(&TraversalError::IndexLimitExceeded { depth: 0 })
        );
    }

    #[test]
    fn deep_nesting_exceeds_depth_limit() {
        fn nest(ctx: &mut Context, remaining: usize) {
            if remaining > 0 {
                ctx.section("nested", |ctx| nest(ctx, remaining - 1));
            }
        }

        let mut ctx = context();
        ctx.begin_run();
        let err = catch_unwind(AssertUnwindSafe(|| nest(&mut ctx, MAX_DEPTH + 1))).unwrap_err();
        assert_eq!(
            err.downcast_ref::<TraversalError>(),
            Some(&TraversalError::DepthLimitExceeded)
        );
    }
}
