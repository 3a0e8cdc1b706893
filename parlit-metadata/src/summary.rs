// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, io};

/// A machine-readable summary of a finished run.
///
/// Result codes are keyed by their display names (`PASS`, `FAIL`, ...), so this format stays stable
/// even if the runner adds new result codes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummaryReport {
    /// The number of tests that were selected to run.
    pub test_count: usize,

    /// The number of tests that never started and were assigned a synthetic result.
    pub reconciled_count: usize,

    /// Wall-clock duration of the run, in seconds.
    pub elapsed_secs: f64,

    /// The number of tests for each result code that occurred at least once.
    pub counts: BTreeMap<String, usize>,

    /// Full names of tests with a failing result code, keyed by that code.
    ///
    /// Tests are listed in run order.
    pub failures: BTreeMap<String, Vec<String>>,

    /// The exit code the run finished with. See [`ParlitExitCode`](crate::ParlitExitCode).
    pub exit_code: i32,
}

impl RunSummaryReport {
    /// Returns true if any test had a failing result code.
    pub fn has_failures(&self) -> bool {
        self.failures.values().any(|tests| !tests.is_empty())
    }

    /// Serializes this summary as pretty-printed JSON to the given writer.
    pub fn to_writer_pretty(&self, writer: impl io::Write) -> serde_json::Result<()> {
        serde_json::to_writer_pretty(writer, self)
    }

    /// Parses a summary previously written by [`Self::to_writer_pretty`].
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}
