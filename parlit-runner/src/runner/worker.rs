// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ExecuteContext, TestExecutor, work_source::WorkSource};
use crate::{
    errors::{ExecuteError, InterruptReason, RunError},
    helpers::panic_payload_to_string,
    list::Test,
    reporter::ProgressAggregator,
    result::{ResultCode, TestResult},
    signal::ShutdownEvent,
};
use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    time::Instant,
};
use tracing::debug;

/// Pulls tests from a shared source and runs them one at a time.
pub(super) struct Worker<E: TestExecutor> {
    index: usize,
    source: Arc<WorkSource<E::Config>>,
    executor: Arc<E>,
    cx: Arc<ExecuteContext>,
    progress: Arc<ProgressAggregator>,
}

impl<E: TestExecutor> Worker<E> {
    pub(super) fn new(
        index: usize,
        source: Arc<WorkSource<E::Config>>,
        executor: Arc<E>,
        cx: Arc<ExecuteContext>,
        progress: Arc<ProgressAggregator>,
    ) -> Self {
        Self {
            index,
            source,
            executor,
            cx,
            progress,
        }
    }

    /// Runs tests until the source is drained, canceled or past its deadline.
    ///
    /// `check_signal` is polled before every dispatch. Returns the number of tests this worker
    /// ran, or the error that should abort the run.
    pub(super) fn run(
        &self,
        mut check_signal: impl FnMut() -> Option<ShutdownEvent>,
    ) -> Result<usize, RunError> {
        debug!("worker {} started", self.index);
        let mut run_count = 0;

        loop {
            if let Some(event) = check_signal() {
                self.source.cancel();
                return Err(RunError::Interrupted {
                    reason: InterruptReason::Signal(event),
                });
            }
            let Some(test) = self.source.next() else {
                break;
            };
            self.run_one(test)?;
            run_count += 1;
        }

        debug!("worker {} finished after {run_count} tests", self.index);
        Ok(run_count)
    }

    fn run_one(&self, test: &Test<E::Config>) -> Result<(), RunError> {
        let start = Instant::now();
        let outcome = catch_unwind(AssertUnwindSafe(|| self.executor.execute(test, &self.cx)));
        let elapsed = start.elapsed();

        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(ExecuteError::Interrupted)) => {
                self.source.cancel();
                return Err(RunError::Interrupted {
                    reason: InterruptReason::Executor {
                        test_name: test.full_name(),
                    },
                });
            }
            Ok(Err(ExecuteError::Failed { message })) => {
                if self.cx.debug() {
                    self.source.cancel();
                    return Err(RunError::ExecutorFailed {
                        test_name: test.full_name(),
                        message,
                    });
                }
                unresolved(&message)
            }
            Err(payload) => {
                let message = panic_payload_to_string(payload);
                if self.cx.debug() {
                    self.source.cancel();
                    return Err(RunError::ExecutorPanicked {
                        test_name: test.full_name(),
                        message,
                    });
                }
                unresolved(&format!("executor panicked: {message}"))
            }
        };

        if test.set_result(result.with_elapsed(elapsed)).is_err() {
            panic!(
                "test {} was given more than one result: it was dispatched twice",
                test.full_name()
            );
        }
        self.progress.update(test);
        Ok(())
    }
}

fn unresolved(message: &str) -> TestResult {
    TestResult::new(
        ResultCode::Unresolved,
        format!("Exception during script execution:\n{message}\n"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::EngineDiagnostics,
        list::{TestList, TestSuite},
        reporter::ReporterOpts,
    };
    use pretty_assertions::assert_eq;
    use std::{collections::BTreeMap, time::Duration};

    /// Each test's config says what the executor should do with it.
    #[derive(Clone, Copy, Debug)]
    enum Behavior {
        Return(ResultCode),
        Fail,
        Panic,
        Interrupt,
    }

    struct ScriptedExecutor;

    impl TestExecutor for ScriptedExecutor {
        type Config = Behavior;

        fn execute(
            &self,
            test: &Test<Behavior>,
            _cx: &ExecuteContext,
        ) -> Result<TestResult, ExecuteError> {
            match *test.config() {
                Behavior::Return(code) => {
                    // The elapsed time reported here is replaced by the worker.
                    Ok(TestResult::new(code, "").with_elapsed(Duration::from_secs(3600)))
                }
                Behavior::Fail => Err(ExecuteError::failed("tool not found")),
                Behavior::Panic => panic!("executor bug"),
                Behavior::Interrupt => Err(ExecuteError::Interrupted),
            }
        }
    }

    fn make_worker(behaviors: &[Behavior], debug: bool) -> Worker<ScriptedExecutor> {
        let suite = Arc::new(TestSuite::new("suite", "/src", "/build"));
        let list = Arc::new(TestList::new(
            behaviors
                .iter()
                .enumerate()
                .map(|(i, behavior)| Test::new(suite.clone(), [format!("t{i}")], *behavior))
                .collect(),
        ));
        let cx = ExecuteContext::new(
            debug,
            BTreeMap::new(),
            Arc::new(EngineDiagnostics::new()),
        );
        let progress = ProgressAggregator::new(ReporterOpts::default(), std::io::sink());
        progress.run_started(list.len(), list.len(), 1);
        Worker::new(
            0,
            Arc::new(WorkSource::new(list, None)),
            Arc::new(ScriptedExecutor),
            Arc::new(cx),
            Arc::new(progress),
        )
    }

    fn codes(worker: &Worker<ScriptedExecutor>) -> Vec<Option<ResultCode>> {
        worker
            .source
            .test_list()
            .iter()
            .map(|test| test.result().map(TestResult::code))
            .collect()
    }

    #[test]
    fn errors_and_panics_become_unresolved() {
        let worker = make_worker(
            &[
                Behavior::Return(ResultCode::Pass),
                Behavior::Fail,
                Behavior::Panic,
                Behavior::Return(ResultCode::Fail),
            ],
            false,
        );
        assert_eq!(worker.run(|| None).unwrap(), 4, "every test is run");
        assert_eq!(
            codes(&worker),
            vec![
                Some(ResultCode::Pass),
                Some(ResultCode::Unresolved),
                Some(ResultCode::Unresolved),
                Some(ResultCode::Fail),
            ]
        );

        let failed = worker.source.test_list().get(1).unwrap().result().unwrap();
        assert_eq!(
            failed.output(),
            "Exception during script execution:\ntool not found\n"
        );
        let panicked = worker.source.test_list().get(2).unwrap().result().unwrap();
        assert_eq!(
            panicked.output(),
            "Exception during script execution:\nexecutor panicked: executor bug\n"
        );
    }

    #[test]
    fn elapsed_is_measured_by_the_worker() {
        let worker = make_worker(&[Behavior::Return(ResultCode::Pass)], false);
        worker.run(|| None).unwrap();
        let result = worker.source.test_list().get(0).unwrap().result().unwrap();
        assert!(result.elapsed() < Duration::from_secs(3600));
    }

    #[test]
    fn debug_mode_aborts_on_executor_error() {
        let worker = make_worker(
            &[
                Behavior::Fail,
                Behavior::Return(ResultCode::Pass),
            ],
            true,
        );
        let err = worker.run(|| None).expect_err("debug mode is fatal");
        match err {
            RunError::ExecutorFailed { test_name, message } => {
                assert_eq!(test_name, "suite :: t0");
                assert_eq!(message, "tool not found");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(codes(&worker), vec![None, None], "nothing else is dispatched");
        assert_eq!(worker.source.dispatched_count(), 1);
    }

    #[test]
    fn debug_mode_aborts_on_executor_panic() {
        let worker = make_worker(&[Behavior::Panic], true);
        let err = worker.run(|| None).expect_err("debug mode is fatal");
        assert!(
            matches!(&err, RunError::ExecutorPanicked { message, .. } if message == "executor bug"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn interrupt_aborts_the_run() {
        let worker = make_worker(
            &[
                Behavior::Return(ResultCode::Pass),
                Behavior::Interrupt,
                Behavior::Return(ResultCode::Pass),
            ],
            false,
        );
        let err = worker.run(|| None).expect_err("interrupts abort");
        assert_eq!(
            err.to_string(),
            "test run interrupted: interrupted while running suite :: t1"
        );
        assert_eq!(codes(&worker), vec![Some(ResultCode::Pass), None, None]);
        assert!(worker.source.next().is_none(), "source is canceled");
    }

    #[test]
    fn pending_signal_stops_before_dispatch() {
        let worker = make_worker(&[Behavior::Return(ResultCode::Pass); 3], false);
        let mut polls = 0;
        let err = worker
            .run(|| {
                polls += 1;
                (polls == 2).then_some(ShutdownEvent::Interrupt)
            })
            .expect_err("signal aborts");
        assert!(matches!(
            err,
            RunError::Interrupted {
                reason: InterruptReason::Signal(ShutdownEvent::Interrupt)
            }
        ));
        assert_eq!(worker.source.dispatched_count(), 1);
    }
}
