// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use parlit_metadata::ParlitExitCode;
use parlit_runner::{
    errors::{
        ConfigParseError, InterruptReason, ProfileNotFound, RunError, SelectionBuildError,
        TestRunnerBuildError,
    },
    signal::ShutdownEvent,
};
use std::{env::JoinPathsError, error::Error, path::PathBuf};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// An error that occurred while reading a test manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest couldn't be read.
    #[error("failed to read manifest `{path}`")]
    Read {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        err: std::io::Error,
    },

    /// The manifest isn't valid TOML, or doesn't describe a suite.
    #[error("failed to parse manifest `{path}`")]
    Parse {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        err: Box<toml::de::Error>,
    },

    /// A test has an empty path.
    #[error("a test in manifest `{path}` has an empty path")]
    EmptyTestPath {
        /// The manifest path.
        path: Utf8PathBuf,
    },

    /// Two tests in the same manifest share a path.
    #[error("test `{test}` is listed more than once in manifest `{path}`")]
    DuplicateTest {
        /// The manifest path.
        path: Utf8PathBuf,
        /// The duplicated test path, as written.
        test: String,
    },
}

// Note that the #[error()] strings are mostly placeholder messages: the expected way to print out
// errors is with the display_to_stderr method.

/// An error that ends the `parlit` process.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine the current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("manifest error")]
    ManifestError {
        #[from]
        err: ManifestError,
    },
    #[error("invalid --filter")]
    SelectionBuildError {
        #[from]
        err: SelectionBuildError,
    },
    #[error("invalid --path")]
    InvalidPath {
        #[source]
        err: JoinPathsError,
    },
    #[error("building test runner failed")]
    TestRunnerBuildError {
        #[from]
        err: TestRunnerBuildError,
    },
    #[error("test run aborted")]
    RunAborted {
        #[from]
        err: RunError,
    },
    #[error("writing output failed")]
    WriteOutputError {
        #[source]
        err: std::io::Error,
    },
    #[error("writing summary failed")]
    SummaryWriteError {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn write_output(err: std::io::Error) -> Self {
        Self::WriteOutputError { err }
    }

    pub(crate) fn summary_write(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::SummaryWriteError {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::RunAborted { err } => err.process_exit_code(),
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. }
            | Self::ManifestError { .. }
            | Self::SelectionBuildError { .. }
            | Self::InvalidPath { .. }
            | Self::TestRunnerBuildError { .. }
            | Self::WriteOutputError { .. }
            | Self::SummaryWriteError { .. } => ParlitExitCode::ENGINE_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine the current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse parlit config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{err}");
                err.source()
            }
            Self::ManifestError { err } => {
                error!("{err}");
                err.source()
            }
            Self::SelectionBuildError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InvalidPath { err } => {
                error!("a directory passed in with {} is invalid", "--path".style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::TestRunnerBuildError { err } => {
                error!("failed to build test runner");
                Some(err as &dyn Error)
            }
            Self::RunAborted { err } => {
                match err {
                    RunError::Interrupted {
                        reason:
                            InterruptReason::Signal(ShutdownEvent::Interrupt)
                            | InterruptReason::Executor { .. },
                    } => {
                        error!(target: NO_HEADING, "\nCtrl-C detected, goodbye.");
                    }
                    RunError::Interrupted {
                        reason: InterruptReason::Signal(event),
                    } => {
                        error!(target: NO_HEADING, "\nreceived {event}, goodbye.");
                    }
                    other => {
                        error!("{other}");
                    }
                }
                err.source()
            }
            Self::WriteOutputError { err } => {
                error!("failed to write to standard output");
                Some(err as &dyn Error)
            }
            Self::SummaryWriteError { path, err } => {
                error!(
                    "failed to write run summary to `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
