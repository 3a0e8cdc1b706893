// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by parlit.

use crate::{result::ResultCode, signal::ShutdownEvent};
use camino::Utf8PathBuf;
use config::ConfigError;
use parlit_metadata::ParlitExitCode;
use std::fmt;
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse parlit config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),
}

/// An error which indicates that a profile was requested but not known to parlit.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An error that occurs while parsing a [`TestThreads`](crate::config::TestThreads) value.
#[derive(Clone, Debug, Error)]
#[error("unrecognized value for test-threads: {input}\n(hint: expected an integer or \"num-cpus\")")]
pub struct TestThreadsParseError {
    /// The input that failed to parse.
    pub input: String,
}

impl TestThreadsParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurs while parsing a [`ResultCode`] from its name.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized result code: {input}\n(known values: {})",
    ResultCode::ALL.iter().map(|code| code.name()).collect::<Vec<_>>().join(", "),
)]
pub struct ResultCodeParseError {
    input: String,
}

impl ResultCodeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurs while building a [`TestSelection`](crate::list::TestSelection).
#[derive(Debug, Error)]
#[error("invalid regular expression for filter: {pattern:?}")]
pub struct SelectionBuildError {
    pattern: String,
    #[source]
    err: regex::Error,
}

impl SelectionBuildError {
    pub(crate) fn new(pattern: impl Into<String>, err: regex::Error) -> Self {
        Self {
            pattern: pattern.into(),
            err,
        }
    }
}

/// An error returned by a [`TestExecutor`](crate::runner::TestExecutor) instead of a result.
///
/// The worker that called the executor decides what happens next: interrupts abort the run, while
/// failures become [`Unresolved`](ResultCode::Unresolved) results unless debug mode is enabled.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum ExecuteError {
    /// The operator asked for the run to be aborted while the test was executing.
    #[error("test execution was interrupted")]
    Interrupted,

    /// The executor could not produce a result for the test.
    #[error("{message}")]
    Failed {
        /// A diagnostic describing what went wrong.
        message: String,
    },
}

impl ExecuteError {
    /// Creates a new [`ExecuteError::Failed`].
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// An error occurred while setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);

/// An error that occurred while building a [`TestRunner`](crate::runner::TestRunner).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TestRunnerBuildError {
    /// An error occurred while setting up signals.
    #[error("error setting up signals")]
    SignalHandlerSetupError(#[from] SignalHandlerSetupError),
}

/// The reason a run was interrupted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InterruptReason {
    /// The process received a shutdown signal.
    Signal(ShutdownEvent),

    /// An executor reported that the user asked for the run to be aborted.
    Executor {
        /// The full name of the test that was executing.
        test_name: String,
    },
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(event) => write!(f, "received {event}"),
            Self::Executor { test_name } => write!(f, "interrupted while running {test_name}"),
        }
    }
}

/// An engine-fatal error that ended a run before a summary could be produced.
///
/// Errors from individual tests never show up here: those are turned into
/// [`TestResult`](crate::result::TestResult)s. A `RunError` means the results are not
/// authoritative, and callers are expected to exit with [`RunError::process_exit_code`] right
/// away. Worker threads may still be running executors when this is returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RunError {
    /// The run was interrupted by the operator.
    #[error("test run interrupted: {reason}")]
    Interrupted {
        /// Why the run was interrupted.
        reason: InterruptReason,
    },

    /// An executor returned an error while debug mode was enabled.
    #[error("executor failed for {test_name} (debug mode)\n{message}")]
    ExecutorFailed {
        /// The full name of the test.
        test_name: String,

        /// The diagnostic produced by the executor.
        message: String,
    },

    /// An executor panicked while debug mode was enabled.
    #[error("executor panicked for {test_name} (debug mode): {message}")]
    ExecutorPanicked {
        /// The full name of the test.
        test_name: String,

        /// The panic message.
        message: String,
    },

    /// A worker thread could not be spawned.
    #[error("failed to spawn worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    /// A worker thread panicked outside of an executor call.
    #[error("worker thread panicked: {message}")]
    WorkerPanicked {
        /// The panic message.
        message: String,
    },
}

impl RunError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::Interrupted { .. } => ParlitExitCode::INTERRUPTED,
            Self::ExecutorFailed { .. }
            | Self::ExecutorPanicked { .. }
            | Self::WorkerSpawn(_)
            | Self::WorkerPanicked { .. } => ParlitExitCode::ENGINE_ERROR,
        }
    }
}
