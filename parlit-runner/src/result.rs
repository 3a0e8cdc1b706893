// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outcomes attached to tests.

use crate::errors::ResultCodeParseError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

/// The kind of outcome a test finished with.
///
/// Each code carries a fixed "is failure" flag: [`Fail`](Self::Fail), [`Xpass`](Self::Xpass) and
/// [`Unresolved`](Self::Unresolved) are failures, everything else is not.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResultCode {
    /// The test passed.
    Pass,

    /// The test failed, and was expected to.
    Xfail,

    /// The test passed, but was expected to fail.
    Xpass,

    /// The test failed.
    Fail,

    /// The test is not supported in this configuration and was not run.
    Unsupported,

    /// The outcome of the test could not be determined.
    ///
    /// This is also the code assigned to tests that were never started.
    Unresolved,

    /// The test was excluded from the run.
    Excluded,
}

impl ResultCode {
    /// All result codes, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::Pass,
        Self::Xfail,
        Self::Xpass,
        Self::Fail,
        Self::Unsupported,
        Self::Unresolved,
        Self::Excluded,
    ];

    /// Returns true if a test with this code counts as a failure of the run.
    pub fn is_failure(self) -> bool {
        match self {
            Self::Fail | Self::Xpass | Self::Unresolved => true,
            Self::Pass | Self::Xfail | Self::Unsupported | Self::Excluded => false,
        }
    }

    /// Returns the upper-case name used in logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Xfail => "XFAIL",
            Self::Xpass => "XPASS",
            Self::Fail => "FAIL",
            Self::Unsupported => "UNSUPPORTED",
            Self::Unresolved => "UNRESOLVED",
            Self::Excluded => "EXCLUDED",
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResultCode {
    type Err = ResultCodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|code| code.name() == s)
            .ok_or_else(|| ResultCodeParseError::new(s))
    }
}

/// The outcome of a single test.
///
/// A `TestResult` is created once per test, either by a worker from the executor's return value or
/// by the runner while reconciling tests that never started. Once attached to a test it is never
/// modified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestResult {
    code: ResultCode,
    output: String,
    elapsed: Duration,
}

impl TestResult {
    /// Creates a new result with the given code and diagnostic output, and no elapsed time.
    pub fn new(code: ResultCode, output: impl Into<String>) -> Self {
        Self {
            code,
            output: output.into(),
            elapsed: Duration::ZERO,
        }
    }

    /// The result assigned to tests that were never dispatched.
    pub fn reconciled() -> Self {
        Self::new(ResultCode::Unresolved, "")
    }

    /// Returns a copy of this result with the elapsed time replaced.
    pub fn with_elapsed(self, elapsed: Duration) -> Self {
        Self { elapsed, ..self }
    }

    /// The result code.
    pub fn code(&self) -> ResultCode {
        self.code
    }

    /// Diagnostic output captured while running the test.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Time spent inside the executor for this test.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Shorthand for `self.code().is_failure()`.
    pub fn is_failure(&self) -> bool {
        self.code.is_failure()
    }
}
