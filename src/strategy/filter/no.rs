use crate::{
    filter::{FilteredSuites, SuiteFilter},
    suite::Suite,
};

/// A [`SuiteFilter`] that keeps every suite.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct NoFilter;

impl NoFilter {
    pub fn new() -> Self {
        Self
    }
}

impl SuiteFilter for NoFilter {
    fn filter<'r>(
        &self,
        suites: &'r [Suite],
    ) -> FilteredSuites<'r, impl ExactSizeIterator<Item = &'r Suite>> {
        FilteredSuites {
            suites: suites.iter(),
            filtered_out: 0,
        }
    }
}
