// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::helpers::{BANNER, Styles};
use crate::{
    diagnostics::EngineDiagnostics,
    list::{Test, TestList},
    result::ResultCode,
    stopwatch::StopwatchSnapshot,
};
use chrono::{DateTime, Local};
use owo_colors::OwoColorize;
use parlit_metadata::{ParlitExitCode, RunSummaryReport};
use std::{collections::BTreeMap, fmt, io, sync::Arc, time::Duration};

/// The final classification of a run, produced by
/// [`TestRunner::execute`](crate::runner::TestRunner::execute).
///
/// Every test in the list has exactly one result by the time a summary exists. Tests are listed in
/// their original order, not the order they completed in.
pub struct RunSummary<C> {
    test_list: Arc<TestList<C>>,
    by_code: BTreeMap<ResultCode, Vec<usize>>,
    reconciled_count: usize,
    start_time: DateTime<Local>,
    elapsed: Duration,
}

impl<C> RunSummary<C> {
    pub(crate) fn new(
        test_list: Arc<TestList<C>>,
        reconciled_count: usize,
        snapshot: StopwatchSnapshot,
    ) -> Self {
        let mut by_code: BTreeMap<ResultCode, Vec<usize>> = BTreeMap::new();
        for (index, test) in test_list.iter().enumerate() {
            let result = test.result().unwrap_or_else(|| {
                panic!("{} has no result after reconciliation", test.full_name())
            });
            by_code.entry(result.code()).or_default().push(index);
        }

        Self {
            test_list,
            by_code,
            reconciled_count,
            start_time: snapshot.start_time,
            elapsed: snapshot.duration,
        }
    }

    /// The tests that were run, with their results attached.
    pub fn test_list(&self) -> &TestList<C> {
        &self.test_list
    }

    /// The number of tests with the given code.
    pub fn count(&self, code: ResultCode) -> usize {
        self.by_code.get(&code).map_or(0, Vec::len)
    }

    /// Iterates over tests with the given code, in list order.
    pub fn tests_with(&self, code: ResultCode) -> impl Iterator<Item = &Test<C>> + '_ {
        self.by_code
            .get(&code)
            .into_iter()
            .flatten()
            .filter_map(|&index| self.test_list.get(index))
    }

    /// Returns true if any test finished with a failing code.
    pub fn has_failures(&self) -> bool {
        self.by_code
            .iter()
            .any(|(code, tests)| code.is_failure() && !tests.is_empty())
    }

    /// The number of tests that never started and were marked unresolved.
    pub fn reconciled_count(&self) -> usize {
        self.reconciled_count
    }

    /// When the run started.
    pub fn start_time(&self) -> DateTime<Local> {
        self.start_time
    }

    /// How long the run took.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the exit code for the process.
    pub fn exit_code(&self, diagnostics: &EngineDiagnostics) -> i32 {
        if diagnostics.error_count() > 0 {
            ParlitExitCode::ENGINE_ERROR
        } else if self.has_failures() {
            ParlitExitCode::TEST_RUN_FAILED
        } else {
            ParlitExitCode::OK
        }
    }

    /// Converts this summary into its machine-readable form.
    pub fn to_report(&self, diagnostics: &EngineDiagnostics) -> RunSummaryReport {
        let counts = self
            .by_code
            .iter()
            .map(|(code, tests)| (code.name().to_owned(), tests.len()))
            .collect();
        let failures = self
            .by_code
            .keys()
            .filter(|code| code.is_failure())
            .map(|&code| {
                let names = self.tests_with(code).map(|test| test.full_name()).collect();
                (code.name().to_owned(), names)
            })
            .collect();

        RunSummaryReport {
            test_count: self.test_list.len(),
            reconciled_count: self.reconciled_count,
            elapsed_secs: self.elapsed.as_secs_f64(),
            counts,
            failures,
            exit_code: self.exit_code(diagnostics),
        }
    }
}

impl<C> fmt::Debug for RunSummary<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunSummary")
            .field("by_code", &self.by_code)
            .field("reconciled_count", &self.reconciled_count)
            .field("start_time", &self.start_time)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// Failure sections, in the order they're printed.
const FAILURE_SECTIONS: [(&str, ResultCode); 3] = [
    ("Unexpected Passing Tests", ResultCode::Xpass),
    ("Failing Tests", ResultCode::Fail),
    ("Unresolved Tests", ResultCode::Unresolved),
];

/// Count lines, in the order they're printed. Names are padded so the counts line up.
const COUNT_LINES: [(&str, ResultCode); 6] = [
    ("Expected Passes    ", ResultCode::Pass),
    ("Expected Failures  ", ResultCode::Xfail),
    ("Unsupported Tests  ", ResultCode::Unsupported),
    ("Unresolved Tests   ", ResultCode::Unresolved),
    ("Unexpected Passes  ", ResultCode::Xpass),
    ("Unexpected Failures", ResultCode::Fail),
];

/// Writes the final report for a run.
#[derive(Debug, Default)]
pub struct SummaryReporter {
    quiet: bool,
    styles: Styles,
}

impl SummaryReporter {
    /// Creates a new reporter. In quiet mode, only failures are mentioned.
    pub fn new(quiet: bool) -> Self {
        Self {
            quiet,
            styles: Styles::default(),
        }
    }

    /// Uses ANSI colors for output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Writes the summary, followed by a line about engine diagnostics if any were recorded.
    pub fn write_summary<C>(
        &self,
        summary: &RunSummary<C>,
        diagnostics: &EngineDiagnostics,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        if !self.quiet {
            writeln!(writer, "Testing Time: {:.2}s", summary.elapsed().as_secs_f64())?;
        }

        for (title, code) in FAILURE_SECTIONS {
            let count = summary.count(code);
            if count == 0 {
                continue;
            }
            writeln!(writer, "{}", BANNER.style(self.styles.banner))?;
            writeln!(
                writer,
                "{} ({}):",
                title.style(self.styles.for_code(code)),
                count.style(self.styles.count),
            )?;
            for test in summary.tests_with(code) {
                writeln!(writer, "    {}", test.full_name())?;
            }
            writeln!(writer)?;
        }

        for (name, code) in COUNT_LINES {
            if self.quiet && !code.is_failure() {
                continue;
            }
            let count = summary.count(code);
            if count > 0 {
                writeln!(
                    writer,
                    "  {name}: {}",
                    count.style(self.styles.for_code(code))
                )?;
            }
        }

        self.write_diagnostics(diagnostics, writer)
    }

    fn write_diagnostics(
        &self,
        diagnostics: &EngineDiagnostics,
        mut writer: impl io::Write,
    ) -> io::Result<()> {
        let errors = diagnostics.error_count();
        if errors > 0 {
            return writeln!(
                writer,
                "\n{} error(s), exiting.",
                errors.style(self.styles.fail)
            );
        }
        let warnings = diagnostics.warning_count();
        if warnings > 0 {
            writeln!(
                writer,
                "\n{} warning(s) in tests.",
                warnings.style(self.styles.skip)
            )?;
        }
        Ok(())
    }
}
