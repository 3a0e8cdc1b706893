// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::TestList;
use crate::errors::SelectionBuildError;
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};
use regex::Regex;
use tracing::{debug, info};

/// The order tests are dispatched in.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum TestOrder {
    /// Sort tests by their full name.
    #[default]
    Sorted,

    /// Shuffle tests randomly.
    Shuffled {
        /// The seed to shuffle with. If `None`, a random seed is picked and logged so the order
        /// can be reproduced.
        seed: Option<u64>,
    },
}

/// Selects and orders the tests that will be run.
///
/// Selection happens in three steps, in this order: filtering by full name, ordering, and
/// limiting the number of tests.
#[derive(Clone, Debug, Default)]
pub struct TestSelection {
    filter: Option<Regex>,
    order: TestOrder,
    max_tests: Option<usize>,
}

impl TestSelection {
    /// Creates a new selection.
    ///
    /// `filter` is a regular expression searched for in each test's full name.
    pub fn new(
        filter: Option<&str>,
        order: TestOrder,
        max_tests: Option<usize>,
    ) -> Result<Self, SelectionBuildError> {
        let filter = filter
            .map(|pattern| {
                Regex::new(pattern).map_err(|err| SelectionBuildError::new(pattern, err))
            })
            .transpose()?;
        Ok(Self {
            filter,
            order,
            max_tests,
        })
    }

    /// Applies this selection to the list in place.
    ///
    /// Returns the seed used if tests were shuffled.
    pub fn apply<C>(&self, test_list: &mut TestList<C>) -> Option<u64> {
        let tests = test_list.tests_mut();

        if let Some(filter) = &self.filter {
            let before = tests.len();
            tests.retain(|test| filter.is_match(&test.full_name()));
            debug!(
                "filter {} matched {} of {} tests",
                filter.as_str(),
                tests.len(),
                before
            );
        }

        let seed = match self.order {
            TestOrder::Sorted => {
                tests.sort_by_cached_key(|test| test.full_name());
                None
            }
            TestOrder::Shuffled { seed } => {
                let seed = seed.unwrap_or_else(rand::random);
                info!("shuffling tests with seed {seed}");
                let mut rng = StdRng::seed_from_u64(seed);
                tests.shuffle(&mut rng);
                Some(seed)
            }
        };

        if let Some(max_tests) = self.max_tests {
            tests.truncate(max_tests);
        }

        seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::{Test, TestSuite};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn make_list(paths: &[&str]) -> TestList<()> {
        let suite = Arc::new(TestSuite::new("suite", "/src", "/build"));
        TestList::new(
            paths
                .iter()
                .map(|path| Test::new(suite.clone(), path.split('/'), ()))
                .collect(),
        )
    }

    fn names(list: &TestList<()>) -> Vec<String> {
        list.iter().map(|test| test.full_name()).collect()
    }

    #[test]
    fn default_selection_sorts() {
        let mut list = make_list(&["c", "a/b", "a"]);
        let seed = TestSelection::default().apply(&mut list);

        assert_eq!(seed, None);
        assert_eq!(
            names(&list),
            vec!["suite :: a", "suite :: a/b", "suite :: c"]
        );
        assert_eq!(list.discovered_count(), 3);
    }

    #[test]
    fn filter_then_limit() {
        let mut list = make_list(&["x86/add", "x86/sub", "arm/add", "x86/mul"]);
        let selection = TestSelection::new(Some("x86/"), TestOrder::Sorted, Some(2)).unwrap();
        selection.apply(&mut list);

        assert_eq!(names(&list), vec!["suite :: x86/add", "suite :: x86/mul"]);
        assert_eq!(list.len(), 2);
        assert_eq!(list.discovered_count(), 4, "discovered count is unchanged");
    }

    #[test]
    fn shuffle_is_reproducible_with_seed() {
        let paths: Vec<String> = (0..32).map(|i| format!("t{i:02}")).collect();
        let paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        let order = TestOrder::Shuffled { seed: Some(42) };

        let mut first = make_list(&paths);
        let mut second = make_list(&paths);
        let selection = TestSelection::new(None, order, None).unwrap();
        assert_eq!(selection.apply(&mut first), Some(42));
        selection.apply(&mut second);

        assert_eq!(names(&first), names(&second));
        let mut sorted = names(&first);
        sorted.sort();
        assert_eq!(sorted.len(), 32, "shuffling keeps every test");
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let err = TestSelection::new(Some("(unclosed"), TestOrder::Sorted, None)
            .expect_err("invalid regex");
        assert!(
            err.to_string().contains("(unclosed"),
            "error mentions the pattern: {err}"
        );
    }
}
