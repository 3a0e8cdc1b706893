// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError, Result,
    executor::{ShellExecutor, ShellTest, Valgrind},
    manifest::load_manifests,
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser};
use parlit_metadata::ParlitExitCode;
use parlit_runner::{
    config::{ParlitConfig, RunConfig, TestThreads},
    diagnostics::EngineDiagnostics,
    list::{TestList, TestOrder, TestSelection},
    reporter::SummaryReporter,
    runner::TestRunnerBuilder,
    signal::SignalHandlerKind,
};
use std::{io::Write, sync::Arc, time::Duration};
use supports_color::Stream;
use tracing::debug;

/// Runs suites of shell-driven tests in parallel.
///
/// Each MANIFEST is a TOML file describing one test suite.
#[derive(Debug, Parser)]
#[command(name = "parlit", version, max_term_width = 100)]
pub struct ParlitApp {
    /// Test manifests to load
    #[arg(required = true, value_name = "MANIFEST")]
    manifests: Vec<Utf8PathBuf>,

    /// Number of testing threads [default: from profile]
    #[arg(
        long,
        short = 'j',
        value_name = "N",
        allow_negative_numbers = true,
        env = "PARLIT_TEST_THREADS"
    )]
    threads: Option<TestThreads>,

    /// Add NAME=VAL to the user-defined parameters
    #[arg(long = "param", value_name = "NAME=VAL", value_parser = parse_param)]
    params: Vec<(String, String)>,

    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    config_opts: ConfigOpts,

    #[command(flatten)]
    reporter_opts: ReporterArgs,

    #[command(flatten)]
    execution_opts: ExecutionArgs,

    #[command(flatten)]
    selection_opts: SelectionArgs,

    #[command(flatten)]
    debug_opts: DebugArgs,
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: .config/parlit.toml in the current directory]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Config profile to use
    #[arg(long, short = 'P', value_name = "NAME", env = "PARLIT_PROFILE")]
    profile: Option<String>,
}

impl ConfigOpts {
    fn make_config(&self, workspace_root: &Utf8Path) -> Result<ParlitConfig> {
        Ok(ParlitConfig::from_sources(
            workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Output format")]
struct ReporterArgs {
    /// Suppress all output except failures
    #[arg(long, short)]
    quiet: bool,

    /// Only print a line for failing tests
    #[arg(long, short)]
    succinct: bool,

    /// Show the output of failing tests
    #[arg(long, short)]
    verbose: bool,

    /// Do not draw a progress bar in succinct mode
    #[arg(long)]
    no_progress_bar: bool,
}

impl ReporterArgs {
    fn apply(&self, run_config: &mut RunConfig) {
        run_config.quiet |= self.quiet;
        run_config.succinct |= self.succinct;
        run_config.verbose |= self.verbose;
        if self.no_progress_bar {
            run_config.progress_bar = false;
        }
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Test execution")]
struct ExecutionArgs {
    /// Additional directories to put in front of PATH for test commands
    #[arg(long = "path", value_name = "DIR")]
    paths: Vec<Utf8PathBuf>,

    /// Don't execute any tests (assume PASS)
    #[arg(long)]
    no_execute: bool,

    /// Stop starting new tests after this many seconds
    #[arg(long, value_name = "SECS", value_parser = parse_max_time)]
    max_time: Option<Duration>,

    /// Run tests under valgrind
    #[arg(long = "vg")]
    valgrind: bool,

    /// Check for memory leaks under valgrind
    #[arg(long = "vg-leak", requires = "valgrind")]
    valgrind_leak_check: bool,

    /// Specify an extra argument for valgrind
    #[arg(
        long = "vg-arg",
        value_name = "ARG",
        allow_hyphen_values = true,
        requires = "valgrind"
    )]
    valgrind_args: Vec<String>,
}

impl ExecutionArgs {
    fn make_executor(&self) -> Result<ShellExecutor> {
        let executor = ShellExecutor::new(&self.paths, self.no_execute)
            .map_err(|err| ExpectedError::InvalidPath { err })?;
        if !self.valgrind {
            return Ok(executor);
        }
        Ok(executor.with_valgrind(Valgrind {
            leak_check: self.valgrind_leak_check,
            extra_args: self.valgrind_args.clone(),
        }))
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Test selection")]
struct SelectionArgs {
    /// Maximum number of tests to run
    #[arg(long, value_name = "N")]
    max_tests: Option<usize>,

    /// Run tests in random order
    #[arg(long)]
    shuffle: bool,

    /// Seed for --shuffle [default: random]
    #[arg(long, value_name = "N", requires = "shuffle")]
    seed: Option<u64>,

    /// Only run tests whose full name matches the given regular expression
    #[arg(long, value_name = "REGEX")]
    filter: Option<String>,
}

impl SelectionArgs {
    fn to_selection(&self) -> Result<TestSelection> {
        let order = if self.shuffle {
            TestOrder::Shuffled { seed: self.seed }
        } else {
            TestOrder::Sorted
        };
        Ok(TestSelection::new(
            self.filter.as_deref(),
            order,
            self.max_tests,
        )?)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Debug options")]
struct DebugArgs {
    /// Abort the run if running a test fails, instead of marking it unresolved
    #[arg(long)]
    debug: bool,

    /// Show discovered test suites and exit
    #[arg(long)]
    show_suites: bool,

    /// Show all discovered tests and exit
    #[arg(long)]
    show_tests: bool,

    /// Write a machine-readable summary of the run to this file
    #[arg(long, value_name = "PATH")]
    summary_json: Option<Utf8PathBuf>,
}

impl ParlitApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let workspace_root = current_dir()?;
        let config = self.config_opts.make_config(&workspace_root)?;
        let profile = config.profile(
            self.config_opts
                .profile
                .as_deref()
                .unwrap_or(ParlitConfig::DEFAULT_PROFILE),
        )?;
        let mut run_config = RunConfig::from_profile(&profile);
        self.apply_overrides(&mut run_config);
        debug!("resolved run config for profile `{}`: {run_config:?}", profile.name());

        let mut test_list = load_manifests(&self.manifests)?;

        if self.debug_opts.show_suites || self.debug_opts.show_tests {
            let mut writer = output_writer.stdout_writer();
            write_listing(
                &test_list,
                self.debug_opts.show_suites,
                self.debug_opts.show_tests,
                &mut writer,
            )
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output)?;
            return Ok(ParlitExitCode::OK);
        }

        self.selection_opts.to_selection()?.apply(&mut test_list);

        let executor = self.execution_opts.make_executor()?;
        let mut progress = output_writer.progress(run_config.reporter_opts());
        if output.color.should_colorize(Stream::Stdout) {
            progress.colorize();
        }
        let diagnostics = Arc::new(EngineDiagnostics::new());

        let mut builder = TestRunnerBuilder::default();
        builder
            .set_test_threads(run_config.test_threads)
            .set_max_duration(run_config.max_duration)
            .set_debug(run_config.debug)
            .set_params(self.params);
        let runner = builder.build(
            test_list,
            executor,
            progress,
            diagnostics.clone(),
            SignalHandlerKind::Standard,
        )?;

        // An aborted run is returned as an error, and the process exits without waiting for
        // workers that are still running tests.
        let summary = runner.execute()?;

        let mut reporter = SummaryReporter::new(run_config.quiet);
        if output.color.should_colorize(Stream::Stdout) {
            reporter.colorize();
        }
        let mut writer = output_writer.stdout_writer();
        reporter
            .write_summary(&summary, &diagnostics, &mut writer)
            .and_then(|()| writer.flush())
            .map_err(ExpectedError::write_output)?;

        if let Some(path) = &self.debug_opts.summary_json {
            let report = summary.to_report(&diagnostics);
            let file = std::fs::File::create(path)
                .map_err(|err| ExpectedError::summary_write(path.clone(), err))?;
            report
                .to_writer_pretty(std::io::BufWriter::new(file))
                .map_err(|err| ExpectedError::summary_write(path.clone(), err.into()))?;
        }

        Ok(summary.exit_code(&diagnostics))
    }

    fn apply_overrides(&self, run_config: &mut RunConfig) {
        if let Some(threads) = self.threads {
            run_config.test_threads = threads;
        }
        if let Some(max_time) = self.execution_opts.max_time {
            run_config.max_duration = Some(max_time);
        }
        run_config.debug |= self.debug_opts.debug;
        self.reporter_opts.apply(run_config);
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let dir = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(dir)
        .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { path: err.into_path_buf() })
}

fn write_listing(
    test_list: &TestList<ShellTest>,
    show_suites: bool,
    show_tests: bool,
    mut writer: impl Write,
) -> std::io::Result<()> {
    if show_suites {
        writeln!(writer, "-- Test Suites --")?;
        for (suite, tests) in test_list.iter_by_suite() {
            writeln!(writer, "  {} - {} tests", suite.name(), tests.len())?;
            writeln!(writer, "    Source Root: {}", suite.source_root())?;
            writeln!(writer, "    Exec Root  : {}", suite.exec_root())?;
        }
    }

    if show_tests {
        writeln!(writer, "-- Available Tests --")?;
        for (_, mut tests) in test_list.iter_by_suite() {
            tests.sort_by(|a, b| a.path_in_suite().cmp(b.path_in_suite()));
            for test in tests {
                writeln!(writer, "  {}", test.full_name())?;
            }
        }
    }

    Ok(())
}

/// Parses `NAME=VAL`. A bare `NAME` sets the parameter to the empty string.
fn parse_param(input: &str) -> Result<(String, String), String> {
    let (name, value) = input.split_once('=').unwrap_or((input, ""));
    if name.is_empty() {
        return Err(format!("parameter name is empty in `{input}`"));
    }
    Ok((name.to_owned(), value.to_owned()))
}

fn parse_max_time(input: &str) -> Result<Duration, String> {
    let secs: f64 = input
        .parse()
        .map_err(|err| format!("invalid number of seconds `{input}`: {err}"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid duration `{input}`: {err}"))
}
