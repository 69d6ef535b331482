use std::time::Duration;

use serde::Serialize;

use crate::result::{ResultTree, Tally};

/// Everything one suite produced across all of its thunks.
#[derive(Debug)]
#[non_exhaustive]
pub struct SuiteOutcome {
    /// One entry per instantiation bucket, in registration order.
    pub buckets: Vec<BucketOutcome>,
    /// Sum over every result tree of the suite.
    pub tally: Tally,
    /// Sum of the durations of every result tree of the suite.
    pub duration: Duration,
    /// The panic message, if the suite panicked and the panic was isolated.
    pub panic: Option<String>,
}

impl SuiteOutcome {
    /// Build an outcome from the buckets' trees, dropping empty trees.
    pub fn from_buckets(buckets: impl IntoIterator<Item = BucketOutcome>) -> Self {
        let mut tally = Tally::default();
        let mut duration = Duration::ZERO;
        let buckets = buckets
            .into_iter()
            .map(|mut bucket| {
                bucket.trees.retain(|tree| !tree.is_empty());
                for tree in &bucket.trees {
                    tally += tree.tally();
                    duration += tree.duration();
                }
                bucket
            })
            .collect();

        Self {
            buckets,
            tally,
            duration,
            panic: None,
        }
    }

    /// The outcome of a suite whose panic was caught, counted as one fatal.
    pub fn panicked(message: impl Into<String>, duration: Duration) -> Self {
        Self {
            buckets: Vec::new(),
            tally: Tally {
                fatal: 1,
                ..Tally::default()
            },
            duration,
            panic: Some(message.into()),
        }
    }

    /// Whether no thunk produced a result, which keeps the suite out of reports.
    pub fn skipped(&self) -> bool {
        self.panic.is_none() && self.trees().next().is_none()
    }

    pub fn passed(&self) -> bool {
        !self.skipped() && self.tally.is_ok()
    }

    pub fn failed(&self) -> bool {
        !self.tally.is_ok()
    }

    pub fn panicked_with(&self) -> Option<&str> {
        self.panic.as_deref()
    }

    pub fn trees(&self) -> impl Iterator<Item = &ResultTree> {
        self.buckets.iter().flat_map(|bucket| bucket.trees.iter())
    }
}

#[derive(Debug, Default)]
pub struct BucketOutcome {
    /// Readable names of the instantiation, empty if the suite is not
    /// instantiated over anything.
    pub type_names: Vec<String>,
    pub trees: Vec<ResultTree>,
}

/// Aggregates over all suites that ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub tally: Tally,
    /// Suites that were reported.
    pub suites: usize,
    /// Reported suites with at least one fail or fatal.
    pub failed_suites: usize,
    /// Suites that ran but produced no result.
    pub skipped: usize,
}

impl Totals {
    pub fn add(&mut self, outcome: &SuiteOutcome) {
        if outcome.skipped() {
            self.skipped += 1;
            return;
        }

        self.suites += 1;
        self.tally += outcome.tally;
        if outcome.failed() {
            self.failed_suites += 1;
        }
    }

    pub fn success(&self) -> bool {
        self.tally.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::Location;

    use super::*;
    use crate::{
        path::PathStack,
        result::{Assertion, Comparison, Outcome},
    };

    fn tree(pass: usize) -> ResultTree {
        let mut tree = ResultTree::new();
        tree.scope_open("suite", PathStack::new(), Location::caller(), Vec::new());
        for _ in 0..pass {
            tree.log_assertion(Assertion {
                lhs: "1".into(),
                rhs: "1".into(),
                lhs_source: None,
                rhs_source: None,
                comparison: Comparison::Equal,
                outcome: Outcome::Pass,
                annotation: None,
                location: Location::caller(),
            });
        }
        tree.scope_close();
        tree.sync();
        tree
    }

    #[test]
    fn empty_trees_are_dropped_and_skip_the_suite() {
        let outcome = SuiteOutcome::from_buckets([BucketOutcome {
            type_names: Vec::new(),
            trees: vec![ResultTree::new(), ResultTree::new()],
        }]);
        assert!(outcome.skipped());
        assert!(!outcome.passed());
        assert!(outcome.buckets[0].trees.is_empty());
    }

    #[test]
    fn tallies_sum_across_buckets() {
        let outcome = SuiteOutcome::from_buckets([
            BucketOutcome {
                type_names: vec!["u8".into()],
                trees: vec![tree(1), tree(2)],
            },
            BucketOutcome {
                type_names: vec!["u16".into()],
                trees: vec![tree(3)],
            },
        ]);
        assert_eq!(outcome.tally.pass, 6);
        assert!(outcome.passed());
        assert_eq!(outcome.trees().count(), 3);
    }

    #[test]
    fn panicked_suite_counts_one_fatal() {
        let outcome = SuiteOutcome::panicked("boom", Duration::ZERO);
        assert!(!outcome.skipped());
        assert!(outcome.failed());
        assert_eq!(outcome.panicked_with(), Some("boom"));

        let mut totals = Totals::default();
        totals.add(&outcome);
        totals.add(&SuiteOutcome::from_buckets([]));
        assert_eq!(totals.suites, 1);
        assert_eq!(totals.skipped, 1);
        assert_eq!(totals.failed_suites, 1);
        assert!(!totals.success());
    }
}
