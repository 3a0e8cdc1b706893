// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{diagnostics::EngineDiagnostics, errors::ExecuteError, list::Test, result::TestResult};
use std::{collections::BTreeMap, sync::Arc};

/// Runs a single test and decides its outcome.
///
/// Executors are shared by all workers, and `execute` is called concurrently from several
/// threads. Each test is passed to `execute` at most once per run.
///
/// A panic inside `execute` is treated the same way as returning [`ExecuteError::Failed`].
pub trait TestExecutor: Send + Sync + 'static {
    /// Per-test configuration understood by this executor.
    type Config: Send + Sync + 'static;

    /// Executes the test.
    ///
    /// The elapsed time on the returned result is ignored: the worker measures the duration of
    /// this call and records that instead.
    fn execute(
        &self,
        test: &Test<Self::Config>,
        cx: &ExecuteContext,
    ) -> Result<TestResult, ExecuteError>;
}

/// Settings shared by every executor call in a run.
#[derive(Debug)]
pub struct ExecuteContext {
    debug: bool,
    params: BTreeMap<String, String>,
    diagnostics: Arc<EngineDiagnostics>,
}

impl ExecuteContext {
    /// Creates a new context.
    ///
    /// The runner creates one context per run. Executors may create their own to test `execute`
    /// in isolation.
    pub fn new(
        debug: bool,
        params: BTreeMap<String, String>,
        diagnostics: Arc<EngineDiagnostics>,
    ) -> Self {
        Self {
            debug,
            params,
            diagnostics,
        }
    }

    /// Returns true if executor errors abort the run.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// User-defined parameters, passed in as `NAME=VALUE` pairs.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns the value of a user-defined parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// The sink for engine-level diagnostics.
    pub fn diagnostics(&self) -> &EngineDiagnostics {
        &self.diagnostics
    }
}
