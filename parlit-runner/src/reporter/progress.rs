// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::helpers::{BANNER, Styles};
use crate::{helpers::plural, list::Test, result::TestResult};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::{
    fmt::Write as _,
    io::{self, IsTerminal, Write},
    sync::{
        Mutex, MutexGuard, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::warn;

/// Options controlling what [`ProgressAggregator`] prints.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ReporterOpts {
    /// Print nothing but failures.
    pub quiet: bool,

    /// Only print a line for failing tests.
    pub succinct: bool,

    /// Print the output of failing tests.
    pub verbose: bool,

    /// In succinct mode, draw a progress bar if stdout is a terminal.
    pub progress_bar: bool,
}

impl Default for ReporterOpts {
    fn default() -> Self {
        Self {
            quiet: false,
            succinct: false,
            verbose: false,
            progress_bar: true,
        }
    }
}

/// Receives completed tests from all workers and prints progress as they finish.
///
/// Lines are printed in completion order. The completed count is atomic: in quiet mode, tests that
/// didn't fail are only counted, without taking the output lock.
pub struct ProgressAggregator {
    opts: ReporterOpts,
    styles: Styles,
    use_bar: bool,
    completed: AtomicUsize,
    total: AtomicUsize,
    inner: Mutex<AggregatorInner>,
}

struct AggregatorInner {
    writer: Box<dyn Write + Send>,
    bar: Option<ProgressBar>,
}

impl ProgressAggregator {
    /// Creates a new aggregator writing to `writer`. No progress bar is drawn.
    pub fn new(opts: ReporterOpts, writer: impl Write + Send + 'static) -> Self {
        Self::new_impl(opts, Box::new(writer), false)
    }

    /// Creates a new aggregator writing to standard output.
    ///
    /// A progress bar is drawn in succinct mode if enabled in `opts` and stdout is a terminal.
    pub fn stdout(opts: ReporterOpts) -> Self {
        let use_bar =
            opts.succinct && !opts.quiet && opts.progress_bar && io::stdout().is_terminal();
        Self::new_impl(opts, Box::new(io::stdout()), use_bar)
    }

    fn new_impl(opts: ReporterOpts, writer: Box<dyn Write + Send>, use_bar: bool) -> Self {
        Self {
            opts,
            styles: Styles::default(),
            use_bar,
            completed: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            inner: Mutex::new(AggregatorInner { writer, bar: None }),
        }
    }

    /// Uses ANSI colors for output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// The options this aggregator was created with.
    pub fn opts(&self) -> ReporterOpts {
        self.opts
    }

    /// Called once before any test is run.
    ///
    /// `discovered_count` is the number of tests found before selection, which is mentioned in
    /// the header if some tests were filtered out.
    pub fn run_started(&self, test_count: usize, discovered_count: usize, worker_count: usize) {
        self.total.store(test_count, Ordering::SeqCst);
        if self.opts.quiet {
            return;
        }

        let mut header = format!("-- Testing: {test_count}");
        if discovered_count != test_count {
            _ = write!(header, " of {discovered_count}");
        }
        _ = write!(
            header,
            " {}, {worker_count} {} --",
            plural::tests_str(discovered_count),
            plural::threads_str(worker_count),
        );

        let mut inner = self.lock_inner();
        if self.use_bar {
            let bar = ProgressBar::new(test_count as u64);
            bar.set_style(
                ProgressStyle::default_bar()
                    .progress_chars("=> ")
                    .template("{prefix}\n{percent:>3}% [{wide_bar}] {msg}")
                    .expect("template is known to be valid"),
            );
            bar.set_prefix(header);
            bar.set_draw_target(ProgressDrawTarget::stdout_with_hz(20));
            inner.bar = Some(bar);
        } else {
            header.push('\n');
            inner.write_bytes(header.as_bytes());
        }
    }

    /// Records a completed test. Called once per test, from any worker thread.
    ///
    /// The test must already have its result attached.
    pub fn update<C>(&self, test: &Test<C>) {
        let Some(result) = test.result() else {
            warn!("progress update for {} without a result", test.full_name());
            return;
        };

        if self.opts.quiet && !result.is_failure() {
            self.completed.fetch_add(1, Ordering::SeqCst);
            return;
        }

        let mut inner = self.lock_inner();
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let full_name = test.full_name();

        if let Some(bar) = &inner.bar {
            bar.set_position(completed as u64);
            bar.set_message(full_name.clone());
        }

        if result.is_failure() || !self.opts.succinct {
            let line = self.format_test_line(&full_name, result, completed);
            inner.write_bytes(line.as_bytes());
        }
    }

    /// Called once after every worker has stopped.
    pub fn finish(&self) {
        let mut inner = self.lock_inner();
        if let Some(bar) = inner.bar.take() {
            bar.finish_and_clear();
        } else if self.opts.succinct && !self.opts.quiet {
            inner.write_bytes(b"\n");
        }
    }

    /// The number of tests recorded so far.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    fn format_test_line(&self, full_name: &str, result: &TestResult, completed: usize) -> String {
        let code = result.code();
        let mut line = format!(
            "{}: {full_name} ({} of {})\n",
            code.style(self.styles.for_code(code)),
            completed.style(self.styles.count),
            self.total.load(Ordering::SeqCst).style(self.styles.count),
        );

        if self.opts.verbose && result.is_failure() {
            _ = writeln!(
                line,
                "{} TEST '{full_name}' FAILED {}",
                BANNER.style(self.styles.banner),
                BANNER.style(self.styles.banner),
            );
            _ = writeln!(line, "{}", result.output());
            _ = writeln!(line, "{}", BANNER.style(self.styles.banner));
        }

        line
    }

    fn lock_inner(&self) -> MutexGuard<'_, AggregatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AggregatorInner {
    fn write_bytes(&mut self, buf: &[u8]) {
        let Self { writer, bar } = self;
        let res = match bar {
            // ProgressBar::println doesn't print lines if the bar is hidden. The suspend method
            // prints them in all cases.
            Some(bar) => bar.suspend(|| writer.write_all(buf).and_then(|()| writer.flush())),
            None => writer.write_all(buf).and_then(|()| writer.flush()),
        };
        if let Err(error) = res {
            warn!("failed to write progress output: {error}");
        }
    }
}

impl std::fmt::Debug for ProgressAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressAggregator")
            .field("opts", &self.opts)
            .field("use_bar", &self.use_bar)
            .field("completed", &self.completed)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}
