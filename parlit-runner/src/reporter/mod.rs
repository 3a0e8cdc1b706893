// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reporting for test runs.
//!
//! [`ProgressAggregator`] prints a line as each test finishes, and [`SummaryReporter`] prints the
//! final classification held by a [`RunSummary`].

mod helpers;
mod progress;
mod summary;

pub use progress::*;
pub use summary::*;
