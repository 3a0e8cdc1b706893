// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for `parlit`, a concurrent test-execution engine.
//!
//! The flow of a run is:
//!
//! 1. A [`TestList`](list::TestList) is assembled by a discovery layer and narrowed down with a
//!    [`TestSelection`](list::TestSelection).
//! 2. A [`TestRunner`](runner::TestRunner) is built from the list, a pluggable
//!    [`TestExecutor`](runner::TestExecutor) and a
//!    [`ProgressAggregator`](reporter::ProgressAggregator).
//! 3. Workers pull tests from a shared work source until it is exhausted, canceled or past its
//!    deadline.
//! 4. Tests that never ran are reconciled, and everything is classified into a
//!    [`RunSummary`](reporter::RunSummary).

pub mod config;
pub mod diagnostics;
pub mod errors;
mod helpers;
pub mod list;
pub mod reporter;
pub mod result;
pub mod runner;
pub mod signal;
mod stopwatch;
