// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs that stop early: deadlines, cancellation and aborts.

use crate::fixtures::*;
use color_eyre::eyre::{Result, bail, ensure};
use maplit::btreemap;
use parlit_metadata::ParlitExitCode;
use parlit_runner::{
    errors::{InterruptReason, RunError},
    result::ResultCode,
};
use pretty_assertions::assert_eq;
use std::{thread, time::Duration};
use test_case::test_case;

#[test_case(1; "single thread")]
#[test_case(3; "three threads")]
fn zero_deadline_starves_every_test(threads: usize) -> Result<()> {
    let harness = Harness::new();
    let list = make_list(std::iter::repeat_n(Script::returns(ResultCode::Pass), 5));
    let opts = RunOpts {
        max_duration: Some(Duration::ZERO),
        ..RunOpts::threads(threads)
    };
    let summary = harness.run(list, &opts)?;

    assert_eq!(harness.executor.calls().len(), 0, "executor is never called");
    assert_eq!(summary.reconciled_count(), 5);
    assert_eq!(
        code_counts(&summary),
        btreemap! { ResultCode::Unresolved => 5 }
    );
    for test in summary.test_list().iter() {
        let result = test.result().expect("reconciled tests have a result");
        assert_eq!(result.output(), "");
        assert_eq!(result.elapsed(), Duration::ZERO);
    }
    assert_eq!(
        summary.exit_code(&harness.diagnostics),
        ParlitExitCode::TEST_RUN_FAILED
    );
    Ok(())
}

#[test]
fn deadline_lets_in_flight_test_finish() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(200)),
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Pass),
    ]);
    let opts = RunOpts {
        max_duration: Some(Duration::from_millis(100)),
        ..RunOpts::threads(1)
    };
    let summary = harness.run(list, &opts)?;

    assert_eq!(
        code_counts(&summary),
        btreemap! {
            ResultCode::Pass => 1,
            ResultCode::Unresolved => 3,
        }
    );
    assert_eq!(summary.reconciled_count(), 3);
    assert_eq!(
        harness.executor.calls(),
        btreemap! { "suite :: test-00".to_owned() => 1 }
    );
    Ok(())
}

#[test]
fn cancel_handle_stops_dispatch() -> Result<()> {
    let harness = Harness::new();
    let list = make_list(std::iter::repeat_n(
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(20)),
        50,
    ));
    let runner = harness.build(list, &RunOpts::threads(2))?;
    let cancel_handle = runner.cancel_handle();
    let canceler = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        cancel_handle.cancel();
    });

    let summary = runner.execute()?;
    canceler.join().expect("canceler thread didn't panic");

    let executed = harness.executor.calls().len();
    ensure!(
        executed > 0 && executed < 50,
        "cancellation happened mid-run ({executed} tests executed)"
    );
    assert_eq!(summary.count(ResultCode::Pass), executed);
    assert_eq!(summary.reconciled_count(), 50 - executed);
    ensure!(
        summary.test_list().iter().all(|test| test.result().is_some()),
        "every test has a result after the run"
    );
    Ok(())
}

#[test_case(1; "single thread")]
#[test_case(4; "four threads")]
fn debug_mode_executor_failure_aborts(threads: usize) -> Result<()> {
    let harness = Harness::new();
    let mut scripts: Vec<Script> = vec![Outcome::Fail("interpreter not found").into()];
    scripts.extend(std::iter::repeat_n(
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(10)),
        20,
    ));
    let opts = RunOpts {
        debug: true,
        ..RunOpts::threads(threads)
    };

    let error = match harness.run(make_list(scripts), &opts) {
        Ok(_) => bail!("debug mode run should have been aborted"),
        Err(error) => error,
    };
    match &error {
        RunError::ExecutorFailed { test_name, message } => {
            assert_eq!(test_name, "suite :: test-00");
            assert_eq!(message, "interpreter not found");
        }
        other => bail!("unexpected error: {other}"),
    }
    assert_eq!(error.process_exit_code(), ParlitExitCode::ENGINE_ERROR);
    ensure!(
        harness.executor.calls().len() < 21,
        "dispatch stopped after the failure"
    );
    Ok(())
}

#[test]
fn debug_mode_executor_panic_aborts() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([Outcome::Panic.into(), Script::returns(ResultCode::Pass)]);
    let opts = RunOpts {
        debug: true,
        ..RunOpts::threads(1)
    };

    let Err(error) = harness.run(list, &opts) else {
        bail!("debug mode run should have been aborted");
    };
    ensure!(
        matches!(&error, RunError::ExecutorPanicked { test_name, .. } if test_name == "suite :: test-00"),
        "unexpected error: {error}"
    );
    assert_eq!(error.process_exit_code(), ParlitExitCode::ENGINE_ERROR);
    assert_eq!(harness.executor.calls().len(), 1);
    Ok(())
}

#[test_case(1; "single thread")]
#[test_case(2; "two threads")]
fn executor_interrupt_aborts(threads: usize) -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass),
        Outcome::Interrupt.into(),
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(10)),
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(10)),
    ]);

    let Err(error) = harness.run(list, &RunOpts::threads(threads)) else {
        bail!("interrupted run should have been aborted");
    };
    match &error {
        RunError::Interrupted {
            reason: InterruptReason::Executor { test_name },
        } => assert_eq!(test_name, "suite :: test-01"),
        other => bail!("unexpected error: {other}"),
    }
    assert_eq!(error.process_exit_code(), ParlitExitCode::INTERRUPTED);
    Ok(())
}

#[test]
fn interrupt_stops_progress_output() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass),
        Outcome::Interrupt.into(),
        Script::returns(ResultCode::Pass),
    ]);

    ensure!(
        harness.run(list, &RunOpts::threads(1)).is_err(),
        "run is aborted"
    );
    assert_eq!(
        harness.output.contents(),
        "-- Testing: 3 tests, 1 thread --\n\
         PASS: suite :: test-00 (1 of 3)\n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn sigterm_aborts_single_worker_during_slow_test() -> Result<()> {
    use parlit_runner::signal::{ShutdownEvent, SignalHandlerKind};
    use signal_hook::{consts::SIGTERM, low_level::raise};
    use std::time::Instant;

    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_secs(3)),
        Script::returns(ResultCode::Pass),
    ]);
    let opts = RunOpts {
        signal_handler: SignalHandlerKind::Standard,
        ..RunOpts::threads(1)
    };
    let runner = harness.build(list, &opts)?;
    assert_eq!(runner.worker_count(), 1);

    let raiser = thread::spawn(|| {
        thread::sleep(Duration::from_millis(200));
        raise(SIGTERM)
    });
    let start = Instant::now();
    let result = runner.execute();
    let elapsed = start.elapsed();
    raiser.join().expect("signal thread doesn't panic")?;

    match result {
        Err(RunError::Interrupted {
            reason: InterruptReason::Signal(ShutdownEvent::Term),
        }) => {}
        other => bail!("expected the run to be interrupted by SIGTERM, got {other:?}"),
    }
    ensure!(
        elapsed < Duration::from_secs(2),
        "run took {elapsed:?} to notice SIGTERM"
    );
    assert_eq!(
        harness.executor.calls(),
        btreemap! { "suite :: test-00".to_owned() => 1 },
        "the second test is never started"
    );
    Ok(())
}
