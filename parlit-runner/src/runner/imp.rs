// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    ExecuteContext, TestExecutor,
    work_source::{CancelHandle, WorkSource},
    worker::Worker,
};
use crate::{
    config::TestThreads,
    diagnostics::EngineDiagnostics,
    errors::{InterruptReason, RunError, TestRunnerBuildError},
    helpers::panic_payload_to_string,
    list::TestList,
    reporter::{ProgressAggregator, RunSummary},
    result::TestResult,
    signal::{ShutdownEvent, SignalHandler, SignalHandlerKind},
    stopwatch::{StopwatchStart, stopwatch},
};
use crossbeam_channel::{Receiver, Sender};
use std::{collections::BTreeMap, fmt, sync::Arc, thread, time::Duration};
use tracing::debug;

/// Test runner options.
#[derive(Debug, Default)]
pub struct TestRunnerBuilder {
    test_threads: Option<TestThreads>,
    max_duration: Option<Duration>,
    debug: bool,
    params: BTreeMap<String, String>,
}

impl TestRunnerBuilder {
    /// Sets the number of tests to run simultaneously. Defaults to the number of logical CPUs.
    pub fn set_test_threads(&mut self, test_threads: TestThreads) -> &mut Self {
        self.test_threads = Some(test_threads);
        self
    }

    /// Sets the wall-clock budget for dispatching tests, measured from when the runner is built.
    pub fn set_max_duration(&mut self, max_duration: Option<Duration>) -> &mut Self {
        self.max_duration = max_duration;
        self
    }

    /// Sets whether executor errors abort the whole run.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Sets user-defined parameters passed to every executor call.
    pub fn set_params(
        &mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> &mut Self {
        self.params = params.into_iter().collect();
        self
    }

    /// Creates a new test runner.
    ///
    /// The deadline set by [`set_max_duration`](Self::set_max_duration) starts counting down now.
    pub fn build<E: TestExecutor>(
        self,
        test_list: TestList<E::Config>,
        executor: E,
        progress: ProgressAggregator,
        diagnostics: Arc<EngineDiagnostics>,
        signal_handler: SignalHandlerKind,
    ) -> Result<TestRunner<E>, TestRunnerBuildError> {
        let requested = self.test_threads.unwrap_or_default().compute();
        let worker_count = requested.max(1).min(test_list.len());
        debug!(
            "requested {requested} workers, using {worker_count} for {} tests",
            test_list.len()
        );

        let signal_handler = signal_handler.build()?;
        let stopwatch = stopwatch();
        let test_list = Arc::new(test_list);
        let source = Arc::new(WorkSource::new(test_list.clone(), self.max_duration));

        Ok(TestRunner {
            test_list,
            source,
            executor: Arc::new(executor),
            cx: Arc::new(ExecuteContext::new(self.debug, self.params, diagnostics)),
            progress: Arc::new(progress),
            signal_handler,
            worker_count,
            stopwatch,
        })
    }
}

/// Context for running tests.
///
/// Created using [`TestRunnerBuilder::build`].
pub struct TestRunner<E: TestExecutor> {
    test_list: Arc<TestList<E::Config>>,
    source: Arc<WorkSource<E::Config>>,
    executor: Arc<E>,
    cx: Arc<ExecuteContext>,
    progress: Arc<ProgressAggregator>,
    signal_handler: SignalHandler,
    worker_count: usize,
    stopwatch: StopwatchStart,
}

impl<E: TestExecutor> TestRunner<E> {
    /// The number of workers that will run tests: the requested count, clamped to the number of
    /// tests.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Returns a handle that stops dispatching new tests when canceled.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle::new(self.source.clone())
    }

    /// Executes the listed tests and classifies their results.
    ///
    /// Workers run on their own threads while this thread waits for them, watching for shutdown
    /// signals. A single worker runs on the calling thread if no signal handler is installed: the
    /// default signal disposition then applies and ends the process right away.
    ///
    /// An `Err` means the run was aborted. In that case worker threads are not joined and may still
    /// be executing tests: the caller is expected to exit the process right away.
    pub fn execute(self) -> Result<RunSummary<E::Config>, RunError> {
        self.progress.run_started(
            self.test_list.len(),
            self.test_list.discovered_count(),
            self.worker_count,
        );

        match self.worker_count {
            0 => {}
            // An intercepted signal must not wait for a long-running test to return.
            1 if !self.signal_handler.is_active() => self.run_single()?,
            _ => self.run_threaded()?,
        }
        debug!(
            "all workers finished after dispatching {} of {} tests in {:?}",
            self.source.dispatched_count(),
            self.test_list.len(),
            self.stopwatch.elapsed(),
        );
        self.progress.finish();

        // Tests that were never dispatched get a synthetic result. Every worker has stopped, so
        // nothing else writes results now.
        let reconciled_count = self
            .test_list
            .iter()
            .filter(|test| test.set_result(TestResult::reconciled()).is_ok())
            .count();
        if reconciled_count > 0 {
            debug!("{reconciled_count} tests were never started and are marked unresolved");
        }

        Ok(RunSummary::new(
            self.test_list,
            reconciled_count,
            self.stopwatch.snapshot(),
        ))
    }

    fn make_worker(&self, index: usize) -> Worker<E> {
        Worker::new(
            index,
            self.source.clone(),
            self.executor.clone(),
            self.cx.clone(),
            self.progress.clone(),
        )
    }

    fn run_single(&self) -> Result<(), RunError> {
        let worker = self.make_worker(0);
        worker.run(|| self.signal_handler.try_recv())?;
        Ok(())
    }

    fn run_threaded(&self) -> Result<(), RunError> {
        let (abort_sender, abort_receiver) = crossbeam_channel::unbounded();

        let mut handles = Vec::with_capacity(self.worker_count);
        for index in 0..self.worker_count {
            let worker = self.make_worker(index);
            let abort_sender: Sender<RunError> = abort_sender.clone();
            let handle = thread::Builder::new()
                .name(format!("parlit-worker-{index}"))
                .spawn(move || {
                    if let Err(error) = worker.run(|| None) {
                        // Failure to send means the orchestrator already gave up on the run.
                        let _ = abort_sender.send(error);
                    }
                })
                .map_err(|error| {
                    self.source.cancel();
                    RunError::WorkerSpawn(error)
                })?;
            handles.push(handle);
        }

        // Once every worker has exited, all senders are dropped and the receiver disconnects.
        drop(abort_sender);
        self.wait_for_workers(&abort_receiver)?;

        for handle in handles {
            handle.join().map_err(|payload| RunError::WorkerPanicked {
                message: panic_payload_to_string(payload),
            })?;
        }
        Ok(())
    }

    fn wait_for_workers(&self, abort_receiver: &Receiver<RunError>) -> Result<(), RunError> {
        let mut signal_receiver = self.signal_handler.receiver().clone();

        loop {
            let event = crossbeam_channel::select! {
                recv(abort_receiver) -> event => match event {
                    Ok(error) => OrchestratorEvent::Abort(error),
                    Err(_) => {
                        // All workers have exited.
                        return Ok(());
                    }
                },
                recv(signal_receiver) -> event => match event {
                    Ok(event) => OrchestratorEvent::Signal(event),
                    Err(_) => OrchestratorEvent::SignalHandlerDropped,
                },
            };

            match event {
                OrchestratorEvent::Abort(error) => {
                    self.source.cancel();
                    return Err(error);
                }
                OrchestratorEvent::Signal(event) => {
                    debug!("received {event}, aborting run");
                    self.source.cancel();
                    return Err(RunError::Interrupted {
                        reason: InterruptReason::Signal(event),
                    });
                }
                OrchestratorEvent::SignalHandlerDropped => {
                    signal_receiver = crossbeam_channel::never();
                }
            }
        }
    }
}

impl<E: TestExecutor> fmt::Debug for TestRunner<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRunner")
            .field("source", &self.source)
            .field("worker_count", &self.worker_count)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum OrchestratorEvent {
    Abort(RunError),
    Signal(ShutdownEvent),
    SignalHandlerDropped,
}
