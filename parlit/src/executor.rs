// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use parlit_runner::{
    errors::ExecuteError,
    list::Test,
    result::{ResultCode, TestResult},
    runner::{ExecuteContext, TestExecutor},
};
use std::{
    collections::HashSet,
    env::{self, JoinPathsError},
    ffi::OsString,
    fmt::Write as _,
    process::ExitStatus,
    sync::{Mutex, PoisonError},
};

/// How to run a test from a manifest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct ShellTest {
    pub(crate) command: String,
    pub(crate) xfail: bool,
    pub(crate) unsupported: bool,
}

/// Runs test commands under valgrind's memcheck tool.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub(crate) struct Valgrind {
    pub(crate) leak_check: bool,
    pub(crate) extra_args: Vec<String>,
}

impl Valgrind {
    fn args(&self) -> Vec<String> {
        // Errors found by valgrind make it exit with 123, which fails the test.
        let mut args: Vec<String> = [
            "-q",
            "--run-libc-freeres=no",
            "--tool=memcheck",
            "--trace-children=yes",
            "--error-exitcode=123",
        ]
        .into_iter()
        .map(str::to_owned)
        .collect();
        args.push(if self.leak_check {
            "--leak-check=full".to_owned()
        } else {
            "--leak-check=no".to_owned()
        });
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Runs each test's command with `sh -c` in its suite's exec root.
///
/// User parameters are exported to the command as `PARLIT_PARAM_<NAME>` environment variables.
/// Problems with the suite itself, like a missing exec root or an empty command, are reported as
/// engine errors rather than test failures.
#[derive(Debug)]
pub(crate) struct ShellExecutor {
    path_env: Option<OsString>,
    no_execute: bool,
    valgrind: Option<Valgrind>,
    missing_roots: Mutex<HashSet<Utf8PathBuf>>,
}

impl ShellExecutor {
    /// Creates a new executor. `extra_paths` are prepended to `PATH` for every command.
    pub(crate) fn new(
        extra_paths: &[Utf8PathBuf],
        no_execute: bool,
    ) -> Result<Self, JoinPathsError> {
        let path_env = if extra_paths.is_empty() {
            None
        } else {
            let existing = env::var_os("PATH").unwrap_or_default();
            let paths = extra_paths
                .iter()
                .map(|path| path.as_std_path().to_owned())
                .chain(env::split_paths(&existing));
            Some(env::join_paths(paths)?)
        };
        Ok(Self {
            path_env,
            no_execute,
            valgrind: None,
            missing_roots: Mutex::new(HashSet::new()),
        })
    }

    /// Wraps every command in valgrind.
    pub(crate) fn with_valgrind(mut self, valgrind: Valgrind) -> Self {
        self.valgrind = Some(valgrind);
        self
    }

    /// Returns true the first time a missing exec root is seen, so each one is reported once.
    fn first_report_of_missing(&self, exec_root: &Utf8Path) -> bool {
        self.missing_roots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(exec_root.to_owned())
    }
}

impl TestExecutor for ShellExecutor {
    type Config = ShellTest;

    fn execute(
        &self,
        test: &Test<ShellTest>,
        cx: &ExecuteContext,
    ) -> Result<TestResult, ExecuteError> {
        let config = test.config();
        if config.unsupported {
            return Ok(TestResult::new(ResultCode::Unsupported, ""));
        }
        if config.command.trim().is_empty() {
            cx.diagnostics().error(format_args!(
                "test `{}` has no command to run",
                test.full_name()
            ));
            return Ok(TestResult::new(
                ResultCode::Unresolved,
                "Test has no command to run.\n",
            ));
        }
        if self.no_execute {
            return Ok(TestResult::new(ResultCode::Pass, ""));
        }

        let suite = test.suite();
        if !suite.exec_root().is_dir() {
            if self.first_report_of_missing(suite.exec_root()) {
                cx.diagnostics().error(format_args!(
                    "exec root `{}` of suite `{}` is not a directory",
                    suite.exec_root(),
                    suite.name()
                ));
            }
            return Ok(TestResult::new(
                ResultCode::Unresolved,
                format!("Exec root {} is not a directory.\n", suite.exec_root()),
            ));
        }

        let mut expression = match &self.valgrind {
            Some(valgrind) => {
                let shell = ["sh", "-c", config.command.as_str()].map(str::to_owned);
                duct::cmd("valgrind", valgrind.args().into_iter().chain(shell))
            }
            None => duct::cmd("sh", ["-c", config.command.as_str()]),
        }
        .dir(suite.exec_root().as_std_path())
        .env("PARLIT_SOURCE_ROOT", suite.source_root().as_str())
        .stderr_to_stdout()
        .stdout_capture()
        .unchecked();
        for (name, value) in cx.params() {
            expression = expression.env(format!("PARLIT_PARAM_{name}"), value);
        }
        if let Some(path) = &self.path_env {
            expression = expression.env("PATH", path);
        }

        let output = expression.run().map_err(|error| {
            ExecuteError::failed(format!(
                "failed to run `sh -c {}` in {}: {error}",
                config.command,
                suite.exec_root()
            ))
        })?;
        if killed_by_interrupt(output.status) {
            return Err(ExecuteError::Interrupted);
        }

        let code = match (output.status.success(), config.xfail) {
            (true, false) => ResultCode::Pass,
            (true, true) => ResultCode::Xpass,
            (false, false) => ResultCode::Fail,
            (false, true) => ResultCode::Xfail,
        };

        let mut text = format!("Script:\n--\n{}\n--\n", config.command);
        _ = match output.status.code() {
            Some(code) => writeln!(text, "Exit Code: {code}\n"),
            None => writeln!(text, "Exit Status: {}\n", output.status),
        };
        let captured = String::from_utf8_lossy(&output.stdout);
        if !captured.is_empty() {
            _ = write!(text, "Command Output:\n--\n{captured}");
            if !captured.ends_with('\n') {
                text.push('\n');
            }
            text.push_str("--\n");
        }

        Ok(TestResult::new(code, text))
    }
}

#[cfg(unix)]
fn killed_by_interrupt(status: ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;

    status.signal() == Some(libc::SIGINT)
}

#[cfg(not(unix))]
fn killed_by_interrupt(_status: ExitStatus) -> bool {
    false
}
