// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Engine-level diagnostics reported by executors.

use std::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};
use tracing::{error, info, warn};

/// A thread-safe sink for problems that aren't attributable to a single test's outcome, such as
/// a misconfigured suite or a missing tool.
///
/// Errors make the run exit with [`ParlitExitCode::ENGINE_ERROR`]. Warnings are counted and
/// reported in the summary, but don't change the exit status.
///
/// [`ParlitExitCode::ENGINE_ERROR`]: parlit_metadata::ParlitExitCode::ENGINE_ERROR
#[derive(Debug, Default)]
pub struct EngineDiagnostics {
    warnings: AtomicUsize,
    errors: AtomicUsize,
}

impl EngineDiagnostics {
    /// Creates a new, empty set of diagnostics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs an informational note.
    pub fn note(&self, message: impl fmt::Display) {
        info!("{message}");
    }

    /// Logs and counts a warning.
    pub fn warning(&self, message: impl fmt::Display) {
        self.warnings.fetch_add(1, Ordering::Relaxed);
        warn!("{message}");
    }

    /// Logs and counts an error.
    pub fn error(&self, message: impl fmt::Display) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        error!("{message}");
    }

    /// The number of warnings reported so far.
    pub fn warning_count(&self) -> usize {
        self.warnings.load(Ordering::Relaxed)
    }

    /// The number of errors reported so far.
    pub fn error_count(&self) -> usize {
        self.errors.load(Ordering::Relaxed)
    }
}
