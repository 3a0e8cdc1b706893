// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::result::TestResult;
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    fmt,
    sync::{Arc, OnceLock},
};

/// A group of tests sharing a name and a set of directories.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestSuite {
    name: String,
    source_root: Utf8PathBuf,
    exec_root: Utf8PathBuf,
}

impl TestSuite {
    /// Creates a new test suite.
    pub fn new(
        name: impl Into<String>,
        source_root: impl Into<Utf8PathBuf>,
        exec_root: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            source_root: source_root.into(),
            exec_root: exec_root.into(),
        }
    }

    /// The name of the suite, used as the first component of test names.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The directory tests are defined in.
    pub fn source_root(&self) -> &Utf8Path {
        &self.source_root
    }

    /// The directory tests are executed in.
    pub fn exec_root(&self) -> &Utf8Path {
        &self.exec_root
    }
}

/// A single test, with an executor-specific configuration `C`.
///
/// The result slot starts out empty and is written exactly once: by the worker that ran the test,
/// or by the runner while reconciling tests that were never dispatched.
pub struct Test<C> {
    suite: Arc<TestSuite>,
    path_in_suite: Vec<String>,
    config: C,
    result: OnceLock<TestResult>,
}

impl<C> Test<C> {
    /// Creates a new test with an unset result.
    pub fn new(
        suite: Arc<TestSuite>,
        path_in_suite: impl IntoIterator<Item = impl Into<String>>,
        config: C,
    ) -> Self {
        Self {
            suite,
            path_in_suite: path_in_suite.into_iter().map(Into::into).collect(),
            config,
            result: OnceLock::new(),
        }
    }

    /// The suite this test belongs to.
    pub fn suite(&self) -> &Arc<TestSuite> {
        &self.suite
    }

    /// Path components identifying the test within its suite.
    pub fn path_in_suite(&self) -> &[String] {
        &self.path_in_suite
    }

    /// The executor-specific configuration for this test.
    pub fn config(&self) -> &C {
        &self.config
    }

    /// Returns the full display name: `<suite> :: <path/within/suite>`.
    pub fn full_name(&self) -> String {
        format!("{} :: {}", self.suite.name, self.path_in_suite.join("/"))
    }

    /// Returns the result, if one has been attached.
    pub fn result(&self) -> Option<&TestResult> {
        self.result.get()
    }

    /// Attaches a result to this test.
    ///
    /// Returns the result back if one was already attached.
    pub(crate) fn set_result(&self, result: TestResult) -> Result<(), TestResult> {
        self.result.set(result)
    }
}

impl<C> fmt::Debug for Test<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Test")
            .field("name", &self.full_name())
            .field("result", &self.result.get())
            .finish_non_exhaustive()
    }
}

/// An ordered list of tests.
pub struct TestList<C> {
    tests: Vec<Test<C>>,
    discovered_count: usize,
}

impl<C> TestList<C> {
    /// Creates a new test list. The order of `tests` is the dispatch order.
    pub fn new(tests: Vec<Test<C>>) -> Self {
        let discovered_count = tests.len();
        Self {
            tests,
            discovered_count,
        }
    }

    /// The number of tests that will be run.
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Returns true if there are no tests to run.
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// The number of tests that were discovered, before any selection was applied.
    pub fn discovered_count(&self) -> usize {
        self.discovered_count
    }

    /// Returns the test at `index`.
    pub fn get(&self, index: usize) -> Option<&Test<C>> {
        self.tests.get(index)
    }

    /// Iterates over tests in dispatch order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &Test<C>> + '_ {
        self.tests.iter()
    }

    /// Iterates over each suite and its tests, ordered by suite name.
    ///
    /// Tests within a suite keep their relative order.
    pub fn iter_by_suite(&self) -> impl Iterator<Item = (&Arc<TestSuite>, Vec<&Test<C>>)> + '_ {
        let mut suites: Vec<(&Arc<TestSuite>, Vec<&Test<C>>)> = Vec::new();
        for test in &self.tests {
            match suites
                .iter_mut()
                .find(|(suite, _)| Arc::ptr_eq(*suite, &test.suite))
            {
                Some((_, tests)) => tests.push(test),
                None => suites.push((&test.suite, vec![test])),
            }
        }
        suites.sort_by(|(a, _), (b, _)| a.name.cmp(&b.name));
        suites.into_iter()
    }

    pub(crate) fn tests_mut(&mut self) -> &mut Vec<Test<C>> {
        &mut self.tests
    }
}

impl<C> fmt::Debug for TestList<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestList")
            .field("tests", &self.tests)
            .field("discovered_count", &self.discovered_count)
            .finish()
    }
}
