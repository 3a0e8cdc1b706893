// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use maplit::btreemap;
use parlit_metadata::ParlitExitCode;
use parlit_runner::{
    list::{TestOrder, TestSelection},
    reporter::{ReporterOpts, SummaryReporter},
    result::ResultCode,
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_case::test_case;

#[test]
fn five_tests_two_workers() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Fail),
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Xfail),
    ]);

    let runner = harness.build(list, &RunOpts::threads(2))?;
    assert_eq!(runner.worker_count(), 2);
    let summary = runner.execute()?;

    assert_eq!(
        code_counts(&summary),
        btreemap! {
            ResultCode::Pass => 3,
            ResultCode::Fail => 1,
            ResultCode::Xfail => 1,
        }
    );
    assert_eq!(summary.reconciled_count(), 0);
    assert_eq!(
        summary.exit_code(&harness.diagnostics),
        ParlitExitCode::TEST_RUN_FAILED
    );

    let calls = harness.executor.calls();
    assert_eq!(calls.len(), 5);
    ensure!(
        calls.values().all(|&count| count == 1),
        "every test executed exactly once: {calls:?}"
    );
    Ok(())
}

#[test]
fn all_passing_exits_zero() -> Result<()> {
    let harness = Harness::new();
    let list = make_list(std::iter::repeat_n(Script::returns(ResultCode::Pass), 10));
    let summary = harness.run(list, &RunOpts::threads(4))?;

    assert!(!summary.has_failures());
    assert_eq!(summary.exit_code(&harness.diagnostics), ParlitExitCode::OK);
    for test in summary.test_list().iter() {
        let result = test.result().expect("every test has a result");
        assert_eq!(result.output(), format!("output of {}", test.full_name()));
    }
    Ok(())
}

#[test_case(ResultCode::Fail; "fail")]
#[test_case(ResultCode::Xpass; "xpass")]
#[test_case(ResultCode::Unresolved; "unresolved")]
fn failing_code_exits_one(code: ResultCode) -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass),
        Script::returns(code),
        Script::returns(ResultCode::Unsupported),
    ]);
    let summary = harness.run(list, &RunOpts::threads(3))?;
    assert_eq!(
        summary.exit_code(&harness.diagnostics),
        ParlitExitCode::TEST_RUN_FAILED
    );
    Ok(())
}

fn mixed_scripts() -> Vec<Script> {
    let codes = [
        ResultCode::Pass,
        ResultCode::Fail,
        ResultCode::Xfail,
        ResultCode::Xpass,
        ResultCode::Unsupported,
        ResultCode::Excluded,
    ];
    (0..30)
        .map(|i| match i % 7 {
            6 => Outcome::Fail("no such tool").into(),
            n => Script::returns(codes[n]),
        })
        .collect()
}

#[test]
fn single_thread_matches_many_threads() -> Result<()> {
    let single = Harness::new();
    let single_summary = single.run(make_list(mixed_scripts()), &RunOpts::threads(1))?;

    let many = Harness::new();
    let many_runner = many.build(make_list(mixed_scripts()), &RunOpts::threads(30))?;
    assert_eq!(many_runner.worker_count(), 30);
    let many_summary = many_runner.execute()?;

    assert_eq!(code_counts(&single_summary), code_counts(&many_summary));
    assert_eq!(single.executor.calls(), many.executor.calls());

    let names = |summary: &parlit_runner::reporter::RunSummary<Script>, code| {
        summary
            .tests_with(code)
            .map(|test| test.full_name())
            .collect::<Vec<_>>()
    };
    for code in ResultCode::ALL {
        assert_eq!(
            names(&single_summary, code),
            names(&many_summary, code),
            "tests with {code} are listed in list order"
        );
    }
    Ok(())
}

#[test]
fn executor_errors_are_contained() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Outcome::Fail("missing interpreter").into(),
        Script::returns(ResultCode::Pass),
        Outcome::Panic.into(),
        Script::returns(ResultCode::Pass),
    ]);
    let summary = harness.run(list, &RunOpts::threads(2))?;

    assert_eq!(
        code_counts(&summary),
        btreemap! {
            ResultCode::Pass => 2,
            ResultCode::Unresolved => 2,
        }
    );
    assert_eq!(harness.executor.calls().len(), 4, "remaining tests still ran");
    assert_eq!(summary.reconciled_count(), 0);

    let first = summary.test_list().get(0).unwrap().result().unwrap();
    assert_eq!(
        first.output(),
        "Exception during script execution:\nmissing interpreter\n"
    );
    let third = summary.test_list().get(2).unwrap().result().unwrap();
    ensure!(
        third.output().contains("scripted panic in suite :: test-02"),
        "panic message is kept: {:?}",
        third.output()
    );
    Ok(())
}

#[test]
fn elapsed_covers_executor_call() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass).with_sleep(Duration::from_millis(50)),
    ]);
    let summary = harness.run(list, &RunOpts::threads(1))?;

    let result = summary.test_list().get(0).unwrap().result().unwrap();
    ensure!(
        result.elapsed() >= Duration::from_millis(50),
        "elapsed time {:?} includes the executor call",
        result.elapsed()
    );
    Ok(())
}

#[test]
fn quiet_mode_counts_every_test() -> Result<()> {
    let harness = Harness::new();
    let opts = RunOpts {
        reporter: ReporterOpts {
            quiet: true,
            succinct: true,
            ..ReporterOpts::default()
        },
        ..RunOpts::threads(8)
    };
    let scripts = (0..200).map(|i| {
        if i == 150 {
            Script::returns(ResultCode::Fail)
        } else {
            Script::returns(ResultCode::Pass)
        }
    });
    let summary = harness.run(make_list(scripts), &opts)?;

    assert_eq!(summary.count(ResultCode::Pass), 199);
    let output = harness.output.contents();
    let lines: Vec<_> = output.lines().collect();
    assert_eq!(lines.len(), 1, "only the failure is printed: {output}");
    ensure!(
        lines[0].starts_with("FAIL: suite :: test-150 (") && lines[0].ends_with(" of 200)"),
        "unexpected line: {}",
        lines[0]
    );
    Ok(())
}

#[test]
fn progress_lines_and_summary() -> Result<()> {
    let harness = Harness::new();
    let list = make_list([
        Script::returns(ResultCode::Pass),
        Script::returns(ResultCode::Xpass),
    ]);
    let summary = harness.run(list, &RunOpts::threads(1))?;

    assert_eq!(
        harness.output.contents(),
        "-- Testing: 2 tests, 1 thread --\n\
         PASS: suite :: test-00 (1 of 2)\n\
         XPASS: suite :: test-01 (2 of 2)\n"
    );

    let mut report = Vec::new();
    SummaryReporter::new(true).write_summary(&summary, &harness.diagnostics, &mut report)?;
    assert_eq!(
        String::from_utf8(report)?,
        "********************\n\
         Unexpected Passing Tests (1):\n\
         \x20   suite :: test-01\n\
         \n\
         \x20 Unexpected Passes  : 1\n"
    );
    Ok(())
}

#[test]
fn selection_then_run() -> Result<()> {
    let harness = Harness::new();
    let mut list = make_list((0..12).map(|_| Script::returns(ResultCode::Pass)));
    TestSelection::new(Some("test-0[2468]"), TestOrder::Shuffled { seed: Some(7) }, Some(3))?
        .apply(&mut list);
    assert_eq!(list.len(), 3);
    assert_eq!(list.discovered_count(), 12);

    let summary = harness.run(list, &RunOpts::threads(2))?;
    assert_eq!(summary.count(ResultCode::Pass), 3);
    ensure!(
        harness
            .output
            .contents()
            .starts_with("-- Testing: 3 of 12 tests, 2 threads --\n"),
        "header mentions the discovered count"
    );
    Ok(())
}
