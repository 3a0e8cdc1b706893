// Copyright (c) The parlit Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::{Args, ValueEnum};
use owo_colors::{OwoColorize, Style, style};
use parlit_runner::reporter::{ProgressAggregator, ReporterOpts};
use std::{
    fmt,
    io::{self, BufWriter, Stdout, Write},
    sync::Once,
};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::{ParseError, Targets},
    fmt::{FmtContext, FormatEvent, FormatFields, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// Log target for lines printed without an `error:`/`warning:` heading.
pub(crate) const NO_HEADING: &str = "parlit::no_heading";

#[derive(Copy, Clone, Debug, Args)]
#[must_use]
pub(crate) struct OutputOpts {
    /// Produce color output: auto, always, never
    #[arg(
        long,
        value_enum,
        default_value_t,
        hide_possible_values = true,
        value_name = "WHEN",
        env = "PARLIT_COLOR"
    )]
    pub(crate) color: Color,
}

impl OutputOpts {
    pub(crate) fn init(self) -> OutputContext {
        let OutputOpts { color } = self;
        color.init();
        OutputContext { color }
    }
}

/// Output settings shared by everything `parlit` prints.
#[derive(Copy, Clone, Debug)]
#[must_use]
pub struct OutputContext {
    pub(crate) color: Color,
}

impl OutputContext {
    /// Returns general stderr styles for the current output context.
    pub fn stderr_styles(&self) -> StderrStyles {
        let mut styles = StderrStyles::default();
        if self.color.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }
        styles
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
#[must_use]
pub(crate) enum Color {
    #[default]
    Auto,
    Always,
    Never,
}

static INIT_LOGGER: Once = Once::new();

/// Parses a `PARLIT_LOG` value. Empty or invalid values log at INFO and above.
fn log_targets(level_str: &str) -> (Targets, Option<ParseError>) {
    let fallback = || Targets::new().with_default(LevelFilter::INFO);
    if level_str.is_empty() {
        return (fallback(), None);
    }
    match level_str.parse::<Targets>() {
        Ok(targets) => (targets, None),
        Err(error) => (fallback(), Some(error)),
    }
}

impl Color {
    pub(crate) fn init(self) {
        let mut log_styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            log_styles.colorize();
        }

        INIT_LOGGER.call_once(|| {
            let level_str = std::env::var("PARLIT_LOG").unwrap_or_default();
            let (targets, parse_error) = log_targets(&level_str);

            let layer = tracing_subscriber::fmt::layer()
                .event_format(SimpleFormatter { styles: log_styles })
                .with_writer(io::stderr)
                .with_filter(targets);
            tracing_subscriber::registry().with(layer).init();

            if let Some(error) = parse_error {
                tracing::warn!("ignoring invalid PARLIT_LOG value `{level_str}`: {error}");
            }
        });
    }

    pub(crate) fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }
}

struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING {
            let (heading, style) = self.styles.heading(*metadata.level());
            write!(writer, "{}: ", heading.style(style))?;
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

const MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            if let Err(error) = write!(self.writer, "{value:?}") {
                self.error = Some(error);
            }
        }
    }
}

/// Headings for log lines are colored by severity.
#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    other: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.other = style().bold();
    }

    fn heading(&self, level: Level) -> (&'static str, Style) {
        match level {
            Level::ERROR => ("error", self.error),
            Level::WARN => ("warning", self.warning),
            Level::INFO => ("info", self.other),
            Level::DEBUG => ("debug", self.other),
            Level::TRACE => ("trace", self.other),
        }
    }
}

/// Styles for errors printed to stderr.
#[derive(Debug, Default)]
pub struct StderrStyles {
    pub(crate) bold: Style,
}

impl StderrStyles {
    fn colorize(&mut self) {
        self.bold = style().bold();
    }
}

/// Where standard output goes.
///
/// Tests capture it in a buffer instead of writing to the terminal.
#[derive(Default)]
pub enum OutputWriter {
    /// Write to the process's standard output.
    #[default]
    Normal,

    /// Output captured.
    #[cfg(test)]
    Test {
        /// Captured standard output.
        stdout: CaptureBuffer,
    },
}

impl OutputWriter {
    /// Returns a progress aggregator writing to this output.
    pub(crate) fn progress(&self, opts: ReporterOpts) -> ProgressAggregator {
        match self {
            Self::Normal => ProgressAggregator::stdout(opts),
            #[cfg(test)]
            Self::Test { stdout } => ProgressAggregator::new(opts, stdout.clone()),
        }
    }

    pub(crate) fn stdout_writer(&self) -> StdoutWriter {
        match self {
            Self::Normal => StdoutWriter::Normal(BufWriter::new(io::stdout())),
            #[cfg(test)]
            Self::Test { stdout } => StdoutWriter::Test(stdout.clone()),
        }
    }
}

pub(crate) enum StdoutWriter {
    Normal(BufWriter<Stdout>),
    #[cfg(test)]
    Test(CaptureBuffer),
}

impl Write for StdoutWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self {
            Self::Normal(buf) => buf.write(data),
            #[cfg(test)]
            Self::Test(buf) => buf.write(data),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Normal(buf) => buf.flush(),
            #[cfg(test)]
            Self::Test(_) => Ok(()),
        }
    }
}

/// A shared in-memory buffer standing in for stdout.
#[cfg(test)]
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl CaptureBuffer {
    pub(crate) fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

#[cfg(test)]
impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
