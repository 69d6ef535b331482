use std::{slice, vec};

use crate::{
    filter::{FilteredSuites, SuiteFilter},
    suite::Suite,
};

/// Filters by suite name and by category.
///
/// A suite runs if
/// - `filter` is empty or its name matches one of the entries,
/// - its name matches none of the `skip` entries,
/// - `categories` is empty or one of its categories is listed there.
///
/// Names match by substring, or by equality when `exact` is set.
#[derive(Debug, Default, Clone)]
pub struct DefaultFilter {
    exact: bool,
    filter: Vec<String>,
    skip: Vec<String>,
    categories: Vec<String>,
}

impl DefaultFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exact(self, exact: bool) -> Self {
        Self { exact, ..self }
    }

    pub fn with_filter<I>(self, filter: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            filter: filter.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_skip<I>(self, skip: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            skip: skip.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    pub fn with_categories<I>(self, categories: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            ..self
        }
    }

    fn matches(&self, name: &str, pattern: &str) -> bool {
        match self.exact {
            true => name == pattern,
            false => name.contains(pattern),
        }
    }

    fn keeps(&self, suite: &Suite) -> bool {
        let name = suite.name.as_ref();
        let in_filter =
            self.filter.is_empty() || self.filter.iter().any(|filter| self.matches(name, filter));
        if !in_filter {
            return false;
        }

        if self.skip.iter().any(|skip| self.matches(name, skip)) {
            return false;
        }

        self.categories.is_empty()
            || suite
                .categories
                .iter()
                .any(|category| self.categories.iter().any(|allowed| allowed == category))
    }
}

#[derive(Debug)]
enum DefaultFilterIterator<'r> {
    Slice(slice::Iter<'r, Suite>),
    Vec(vec::IntoIter<&'r Suite>),
}

impl<'r> Iterator for DefaultFilterIterator<'r> {
    type Item = &'r Suite;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DefaultFilterIterator::Slice(iter) => iter.next(),
            DefaultFilterIterator::Vec(iter) => iter.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            DefaultFilterIterator::Slice(iter) => iter.size_hint(),
            DefaultFilterIterator::Vec(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for DefaultFilterIterator<'_> {}

impl SuiteFilter for DefaultFilter {
    fn filter<'r>(
        &self,
        suites: &'r [Suite],
    ) -> FilteredSuites<'r, impl ExactSizeIterator<Item = &'r Suite>> {
        if self.filter.is_empty() && self.skip.is_empty() && self.categories.is_empty() {
            return FilteredSuites {
                suites: DefaultFilterIterator::Slice(suites.iter()),
                filtered_out: 0,
            };
        }

        let mut remaining = Vec::new();
        let mut filtered = 0;
        for suite in suites {
            match self.keeps(suite) {
                true => remaining.push(suite),
                false => filtered += 1,
            }
        }

        FilteredSuites {
            suites: DefaultFilterIterator::Vec(remaining.into_iter()),
            filtered_out: filtered,
        }
    }
}
