// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ParlitProfile, TestThreads};
use crate::reporter::ReporterOpts;
use std::time::Duration;

/// Run-level settings, resolved from a profile and then overridden by command-line options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunConfig {
    /// The requested number of worker threads.
    pub test_threads: TestThreads,

    /// Stop dispatching tests once this much time has passed since the run started.
    pub max_duration: Option<Duration>,

    /// Only print failures.
    pub quiet: bool,

    /// Don't print a line for every non-failing test.
    pub succinct: bool,

    /// Print the output of failing tests as they finish.
    pub verbose: bool,

    /// Show a progress bar in succinct mode.
    pub progress_bar: bool,

    /// Turn executor errors into engine-fatal errors.
    pub debug: bool,
}

impl RunConfig {
    /// Resolves settings from a profile.
    pub fn from_profile(profile: &ParlitProfile<'_>) -> Self {
        Self {
            test_threads: profile.test_threads(),
            max_duration: profile.max_duration(),
            quiet: profile.quiet(),
            succinct: profile.succinct(),
            verbose: profile.verbose(),
            progress_bar: profile.progress_bar(),
            debug: profile.debug(),
        }
    }

    /// Returns the options for the progress aggregator.
    pub fn reporter_opts(&self) -> ReporterOpts {
        ReporterOpts {
            // Quiet implies succinct.
            quiet: self.quiet,
            succinct: self.succinct || self.quiet,
            verbose: self.verbose,
            progress_bar: self.progress_bar,
        }
    }
}
