//! The result record of one suite invocation.
//!
//! A [`ResultTree`] is a flat, append only list of [`Record`]s.
//! Nesting is encoded by pairing every [`ScopeRecord`] with a later
//! [`ScopeCloseRecord`] and by storing, on the scope, how many records lie
//! between the two. That count lets readers skip whole subtrees by index
//! instead of following pointers.
//!
//! While a suite runs, assertions only bump the counters of the scope directly
//! around them. [`ResultTree::sync`] folds those counters upwards once the run
//! is over.

use std::{
    fmt::{self, Display},
    ops::AddAssign,
    panic::Location,
    time::{Duration, Instant},
};

use serde::Serialize;

use crate::path::PathStack;

/// Pass, fail and fatal counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub pass: usize,
    pub fail: usize,
    pub fatal: usize,
}

impl Tally {
    pub const fn total(&self) -> usize {
        self.pass + self.fail + self.fatal
    }

    /// Whether nothing failed, fatally or otherwise.
    pub const fn is_ok(&self) -> bool {
        self.fail == 0 && self.fatal == 0
    }

    pub(crate) fn count(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Pass => self.pass += 1,
            Outcome::Fail => self.fail += 1,
            Outcome::Fatal => self.fatal += 1,
        }
    }
}

impl AddAssign for Tally {
    fn add_assign(&mut self, rhs: Self) {
        self.pass += rhs.pass;
        self.fail += rhs.fail;
        self.fatal += rhs.fatal;
    }
}

/// The outcome of a single assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Pass,
    Fail,
    /// A failed `require`, which stops the rest of the suite invocation.
    Fatal,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Pass => "pass",
            Outcome::Fail => "fail",
            Outcome::Fatal => "fatal",
        })
    }
}

/// The comparison an assertion performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl Comparison {
    pub const fn symbol(&self) -> &'static str {
        match self {
            Comparison::Equal => "==",
            Comparison::NotEqual => "!=",
            Comparison::LessThan => "<",
            Comparison::LessEqual => "<=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterEqual => ">=",
        }
    }
}

impl Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// An opened suite or section.
#[derive(Debug, Clone)]
pub struct ScopeRecord {
    pub name: String,
    pub params: Vec<String>,
    /// The path that led to this scope. Empty for the suite root.
    pub path: PathStack,
    pub location: &'static Location<'static>,
    /// Own counters until [`ResultTree::sync`], subtree totals afterwards.
    pub tally: Tally,
    /// Number of records between this scope and its close record.
    pub children: usize,
    pub started: Instant,
    pub ended: Option<Instant>,
}

impl ScopeRecord {
    /// Time between opening and closing the scope, zero while still open.
    pub fn duration(&self) -> Duration {
        self.ended
            .map(|ended| ended.saturating_duration_since(self.started))
            .unwrap_or_default()
    }

    /// Nesting depth, `0` for the suite root.
    pub fn depth(&self) -> usize {
        self.path.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeCloseRecord {
    /// Index of the [`ScopeRecord`] this record closes.
    pub scope: usize,
}

#[derive(Debug, Clone)]
pub struct AssertionRecord {
    pub lhs: String,
    pub rhs: String,
    pub lhs_source: Option<String>,
    pub rhs_source: Option<String>,
    pub comparison: Comparison,
    pub outcome: Outcome,
    pub annotation: Option<String>,
    pub location: &'static Location<'static>,
    /// Index of the enclosing [`ScopeRecord`].
    pub parent: usize,
}

#[derive(Debug, Clone)]
pub enum Record {
    Scope(ScopeRecord),
    ScopeClose(ScopeCloseRecord),
    Assertion(AssertionRecord),
}

impl Record {
    pub fn as_scope(&self) -> Option<&ScopeRecord> {
        match self {
            Record::Scope(scope) => Some(scope),
            _ => None,
        }
    }

    pub fn as_assertion(&self) -> Option<&AssertionRecord> {
        match self {
            Record::Assertion(assertion) => Some(assertion),
            _ => None,
        }
    }
}

/// An assertion as it is about to be logged.
#[derive(Debug, Clone)]
pub struct Assertion {
    pub lhs: String,
    pub rhs: String,
    pub lhs_source: Option<String>,
    pub rhs_source: Option<String>,
    pub comparison: Comparison,
    pub outcome: Outcome,
    pub annotation: Option<String>,
    pub location: &'static Location<'static>,
}

#[derive(Debug, Clone, Default)]
pub struct ResultTree {
    records: Vec<Record>,
    active: Vec<usize>,
    synced: bool,
}

impl ResultTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope and make it the parent of everything logged until the
    /// matching [`scope_close`](Self::scope_close).
    pub fn scope_open(
        &mut self,
        name: impl Into<String>,
        path: PathStack,
        location: &'static Location<'static>,
        params: Vec<String>,
    ) -> usize {
        let index = self.records.len();
        self.active.push(index);
        self.records.push(Record::Scope(ScopeRecord {
            name: name.into(),
            params,
            path,
            location,
            tally: Tally::default(),
            children: 0,
            started: Instant::now(),
            ended: None,
        }));
        index
    }

    /// Close the innermost open scope.
    ///
    /// # Panics
    /// Panics if no scope is open.
    pub fn scope_close(&mut self) {
        let index = self
            .active
            .pop()
            .expect("scope_close without matching scope_open");
        self.records.push(Record::ScopeClose(ScopeCloseRecord { scope: index }));
        let children = self.records.len() - index - 2;
        if let Record::Scope(scope) = &mut self.records[index] {
            scope.children = children;
            scope.ended = Some(Instant::now());
        }
    }

    /// Append an assertion below the innermost open scope and count it there.
    ///
    /// # Panics
    /// Panics if no scope is open.
    pub fn log_assertion(&mut self, assertion: Assertion) {
        let parent = *self
            .active
            .last()
            .expect("assertion logged outside of any scope");
        if let Record::Scope(scope) = &mut self.records[parent] {
            scope.tally.count(assertion.outcome);
        }

        let Assertion {
            lhs,
            rhs,
            lhs_source,
            rhs_source,
            comparison,
            outcome,
            annotation,
            location,
        } = assertion;
        self.records.push(Record::Assertion(AssertionRecord {
            lhs,
            rhs,
            lhs_source,
            rhs_source,
            comparison,
            outcome,
            annotation,
            location,
            parent,
        }));
    }

    /// Fold every scope's counters into all of its ancestors.
    ///
    /// Calling this more than once has no further effect.
    pub fn sync(&mut self) {
        if self.synced {
            return;
        }

        let mut index = 0;
        while index < self.records.len() {
            match &self.records[index] {
                Record::Scope(_) => {
                    self.fold(index);
                    index = self.next_sibling(index);
                }
                _ => index += 1,
            }
        }
        self.synced = true;
    }

    /// Add the totals of every nested scope to the scope at `index`,
    /// returning the scope's full subtree tally.
    fn fold(&mut self, index: usize) -> Tally {
        let end = index + 1 + self.children_of(index);
        let mut nested = Tally::default();
        let mut child = index + 1;
        while child < end {
            match &self.records[child] {
                Record::Scope(_) => {
                    nested += self.fold(child);
                    child = self.next_sibling(child);
                }
                _ => child += 1,
            }
        }

        let Record::Scope(scope) = &mut self.records[index] else {
            unreachable!("fold is only called on scope records");
        };
        scope.tally += nested;
        scope.tally
    }

    fn children_of(&self, index: usize) -> usize {
        match &self.records[index] {
            Record::Scope(scope) => scope.children,
            _ => 0,
        }
    }

    /// Index right after the close record of the scope at `index`.
    fn next_sibling(&self, index: usize) -> usize {
        index + self.children_of(index) + 2
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether every opened scope has been closed.
    pub fn is_balanced(&self) -> bool {
        self.active.is_empty()
    }

    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// The first record, which is the suite scope for trees built by a suite run.
    pub fn root(&self) -> Option<&ScopeRecord> {
        self.records.first().and_then(Record::as_scope)
    }

    pub fn scope(&self, index: usize) -> Option<&ScopeRecord> {
        self.records.get(index).and_then(Record::as_scope)
    }

    /// Totals of the root scope.
    pub fn tally(&self) -> Tally {
        self.root().map(|root| root.tally).unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.root().map(ScopeRecord::duration).unwrap_or_default()
    }

    /// The records strictly inside the root scope, each with its index.
    pub fn body(&self) -> impl Iterator<Item = (usize, &Record)> {
        let end = match self.root() {
            Some(root) => 1 + root.children,
            None => 0,
        };
        self.records
            .iter()
            .enumerate()
            .take(end)
            .skip(1)
    }

    /// Names of the scopes directly below the root, in order.
    pub fn leaf_scope_names(&self) -> Vec<&str> {
        self.body()
            .filter_map(|(_, record)| record.as_scope())
            .filter(|scope| scope.depth() == 1)
            .map(|scope| scope.name.as_str())
            .collect()
    }

    pub fn scope_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record, Record::Scope(_)))
            .count()
    }

    pub fn close_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| matches!(record, Record::ScopeClose(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here() -> &'static Location<'static> {
        Location::caller()
    }

    fn assertion(outcome: Outcome) -> Assertion {
        Assertion {
            lhs: "1".into(),
            rhs: "1".into(),
            lhs_source: None,
            rhs_source: None,
            comparison: Comparison::Equal,
            outcome,
            annotation: None,
            location: here(),
        }
    }

    fn path(indices: &[u8]) -> PathStack {
        indices.iter().collect()
    }

    #[test]
    fn close_patches_child_count() {
        let mut tree = ResultTree::new();
        tree.scope_open("root", PathStack::new(), here(), vec![]);
        tree.scope_open("a", path(&[0]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Pass));
        tree.scope_close();
        tree.scope_close();

        assert_eq!(tree.root().unwrap().children, 3);
        assert_eq!(tree.scope(1).unwrap().children, 1);
        assert!(tree.is_balanced());
        assert_eq!(tree.scope_count(), tree.close_count());
    }

    #[test]
    fn assertions_count_only_on_immediate_parent() {
        let mut tree = ResultTree::new();
        tree.scope_open("root", PathStack::new(), here(), vec![]);
        tree.scope_open("a", path(&[0]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Fail));
        tree.scope_close();
        tree.scope_close();

        assert_eq!(tree.root().unwrap().tally, Tally::default());
        assert_eq!(tree.scope(1).unwrap().tally.fail, 1);
    }

    #[test]
    fn sync_sums_nested_subtrees() {
        let mut tree = ResultTree::new();
        tree.scope_open("root", PathStack::new(), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Pass));
        tree.scope_open("a", path(&[0]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Pass));
        tree.scope_open("a1", path(&[0, 0]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Fail));
        tree.log_assertion(assertion(Outcome::Fatal));
        tree.scope_close();
        tree.scope_close();
        tree.scope_open("b", path(&[1]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Fail));
        tree.scope_close();
        tree.scope_close();
        tree.sync();

        let root = tree.root().unwrap();
        assert_eq!(
            root.tally,
            Tally {
                pass: 2,
                fail: 2,
                fatal: 1
            }
        );
        assert_eq!(
            tree.scope(2).unwrap().tally,
            Tally {
                pass: 1,
                fail: 1,
                fatal: 1
            }
        );
        assert_eq!(tree.scope(4).unwrap().tally.total(), 2);
        assert_eq!(tree.leaf_scope_names(), ["a", "b"]);
    }

    #[test]
    fn sync_is_idempotent() {
        let mut tree = ResultTree::new();
        tree.scope_open("root", PathStack::new(), here(), vec![]);
        tree.scope_open("a", path(&[0]), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Pass));
        tree.scope_close();
        tree.scope_close();

        tree.sync();
        tree.sync();
        assert_eq!(tree.tally().pass, 1);
    }

    #[test]
    fn body_excludes_root_records() {
        let mut tree = ResultTree::new();
        tree.scope_open("root", PathStack::new(), here(), vec![]);
        tree.log_assertion(assertion(Outcome::Pass));
        tree.scope_close();

        let body: Vec<_> = tree.body().map(|(index, _)| index).collect();
        assert_eq!(body, [1]);
        assert_eq!(ResultTree::new().body().count(), 0);
    }
}
