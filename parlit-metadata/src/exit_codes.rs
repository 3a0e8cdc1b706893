// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `parlit` runs.
///
/// The set is deliberately small: callers are expected to distinguish between "every test was
/// resolved and some failed" and "the engine itself could not produce a trustworthy summary".
pub enum ParlitExitCode {}

impl ParlitExitCode {
    /// No test failed and no engine errors were recorded.
    pub const OK: i32 = 0;

    /// At least one test finished with a failing result code.
    pub const TEST_RUN_FAILED: i32 = 1;

    /// Engine-level errors were recorded while running tests, or the run could not be set up
    /// (invalid configuration, unreadable manifests, bad filters).
    pub const ENGINE_ERROR: i32 = 2;

    /// The run was interrupted before a summary was produced.
    ///
    /// This shares its value with [`ENGINE_ERROR`](Self::ENGINE_ERROR): both mean that the set
    /// of results is not authoritative.
    pub const INTERRUPTED: i32 = 2;
}
