// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use parlit_runner::{
    config::TestThreads,
    diagnostics::EngineDiagnostics,
    errors::{ExecuteError, RunError, TestRunnerBuildError},
    list::{Test, TestList, TestSuite},
    reporter::{ProgressAggregator, ReporterOpts, RunSummary},
    result::{ResultCode, TestResult},
    runner::{ExecuteContext, TestExecutor, TestRunner, TestRunnerBuilder},
    signal::SignalHandlerKind,
};
use std::{
    collections::BTreeMap,
    io,
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

/// What the scripted executor does for a test.
#[derive(Clone, Copy, Debug)]
pub(crate) enum Outcome {
    Return(ResultCode),
    Fail(&'static str),
    Panic,
    Interrupt,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct Script {
    pub(crate) outcome: Outcome,
    pub(crate) sleep: Duration,
}

impl Script {
    pub(crate) fn returns(code: ResultCode) -> Self {
        Self {
            outcome: Outcome::Return(code),
            sleep: Duration::ZERO,
        }
    }

    pub(crate) fn with_sleep(self, sleep: Duration) -> Self {
        Self { sleep, ..self }
    }
}

impl From<Outcome> for Script {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            sleep: Duration::ZERO,
        }
    }
}

/// An executor that follows each test's script and records how often each test was executed.
#[derive(Clone, Debug, Default)]
pub(crate) struct ScriptedExecutor {
    calls: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl ScriptedExecutor {
    /// Returns the number of times each test was passed to the executor.
    pub(crate) fn calls(&self) -> BTreeMap<String, usize> {
        self.calls.lock().unwrap().clone()
    }
}

impl TestExecutor for ScriptedExecutor {
    type Config = Script;

    fn execute(
        &self,
        test: &Test<Script>,
        cx: &ExecuteContext,
    ) -> Result<TestResult, ExecuteError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(test.full_name())
            .or_default() += 1;

        let script = test.config();
        if !script.sleep.is_zero() {
            thread::sleep(script.sleep);
        }
        match script.outcome {
            Outcome::Return(code) => Ok(TestResult::new(
                code,
                format!("output of {}", test.full_name()),
            )),
            Outcome::Fail(message) => {
                cx.diagnostics()
                    .note(format_args!("{} failed to run", test.full_name()));
                Err(ExecuteError::failed(message))
            }
            Outcome::Panic => panic!("scripted panic in {}", test.full_name()),
            Outcome::Interrupt => Err(ExecuteError::Interrupted),
        }
    }
}

pub(crate) fn make_list(scripts: impl IntoIterator<Item = Script>) -> TestList<Script> {
    let suite = Arc::new(TestSuite::new("suite", "/src", "/build"));
    TestList::new(
        scripts
            .into_iter()
            .enumerate()
            .map(|(i, script)| Test::new(suite.clone(), [format!("test-{i:02}")], script))
            .collect(),
    )
}

/// Options for building a runner in tests.
#[derive(Clone, Debug)]
pub(crate) struct RunOpts {
    pub(crate) threads: usize,
    pub(crate) max_duration: Option<Duration>,
    pub(crate) debug: bool,
    pub(crate) reporter: ReporterOpts,
    pub(crate) signal_handler: SignalHandlerKind,
}

impl RunOpts {
    pub(crate) fn threads(threads: usize) -> Self {
        Self {
            threads,
            max_duration: None,
            debug: false,
            reporter: ReporterOpts::default(),
            signal_handler: SignalHandlerKind::Noop,
        }
    }
}

/// A writer whose contents can be inspected after the run.
#[derive(Clone, Debug, Default)]
pub(crate) struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) struct Harness {
    pub(crate) executor: ScriptedExecutor,
    pub(crate) diagnostics: Arc<EngineDiagnostics>,
    pub(crate) output: SharedBuffer,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            executor: ScriptedExecutor::default(),
            diagnostics: Arc::new(EngineDiagnostics::new()),
            output: SharedBuffer::default(),
        }
    }

    pub(crate) fn build(
        &self,
        test_list: TestList<Script>,
        opts: &RunOpts,
    ) -> Result<TestRunner<ScriptedExecutor>, TestRunnerBuildError> {
        let mut builder = TestRunnerBuilder::default();
        builder
            .set_test_threads(TestThreads::Count(opts.threads))
            .set_max_duration(opts.max_duration)
            .set_debug(opts.debug);
        builder.build(
            test_list,
            self.executor.clone(),
            ProgressAggregator::new(opts.reporter, self.output.clone()),
            self.diagnostics.clone(),
            opts.signal_handler,
        )
    }

    pub(crate) fn run(
        &self,
        test_list: TestList<Script>,
        opts: &RunOpts,
    ) -> Result<RunSummary<Script>, RunError> {
        self.build(test_list, opts)
            .expect("runner built successfully")
            .execute()
    }
}

/// Returns the count of each code that occurred at least once.
pub(crate) fn code_counts(summary: &RunSummary<Script>) -> BTreeMap<ResultCode, usize> {
    ResultCode::ALL
        .into_iter()
        .map(|code| (code, summary.count(code)))
        .filter(|(_, count)| *count > 0)
        .collect()
}
