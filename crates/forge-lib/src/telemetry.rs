use std::{io::Stderr, marker::PhantomData};

use chrono::Local;
use owo_colors::{
    colors::{Black, Default, Red, Yellow},
    Color, OwoColorize,
};
use tracing::{field::Visit, metadata::LevelFilter, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::Writer, FmtContext, FormatEvent, FormatFields, MakeWriter},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Registry,
};

/// Note that we cannot express the type of `std::io::stderr` directly, so
/// use a zero-size wrapper to call the function.
struct StdErrWrapper {}

impl<'a> MakeWriter<'a> for StdErrWrapper {
    type Writer = Stderr;

    fn make_writer(&'a self) -> Self::Writer {
        std::io::stderr()
    }
}

/// Installs the global tracing subscriber: a single stderr layer using
/// `ForgeFormatter`, gated by an `EnvFilter` keyed on `FORGE_LOG`.
///
/// `verbosity` comes from repeated `-v` flags and raises the level floor;
/// `0` leaves the floor at the env filter's default (`WARN`).
pub struct ForgeSubscriber;

impl ForgeSubscriber {
    pub fn install(verbosity: usize, ansi: bool) {
        let level_override = match verbosity {
            0 => None,
            1 => Some(LevelFilter::INFO),
            2 => Some(LevelFilter::DEBUG),
            _ => Some(LevelFilter::TRACE),
        };

        let filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::WARN.into())
            .with_env_var("FORGE_LOG")
            .from_env_lossy();

        let filter = match level_override {
            Some(max_level) => filter.add_directive(max_level.into()),
            None => filter,
        };

        let stderr = fmt::layer()
            .with_writer(StdErrWrapper {})
            .event_format(ForgeFormatter::new_with_ansi(ansi))
            .with_filter(filter);

        Registry::default().with(stderr).init();
    }
}

/// Determines whether ANSI color should be used for stderr output: disabled
/// when stderr is not a terminal or `NO_COLOR` is set, consistent with
/// `console`'s own detection.
pub fn stderr_supports_color() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::Term::stderr().features().colors_supported()
}

/// The event formatter for the `forge` CLI.
///
/// - Errors are red
/// - Warnings are yellow
/// - Info is default
/// - Debug and trace are default, but with a timestamp and target attached
///
/// Does not print span information, and prints only the `message` field of
/// an event (set by `debug!(...)`, `info!(...)`, etc).
pub struct ForgeFormatter {
    is_ansi: bool,
}

impl ForgeFormatter {
    pub fn new_with_ansi(is_ansi: bool) -> Self {
        Self { is_ansi }
    }
}

impl<S, N> FormatEvent<S, N> for ForgeFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let level = event.metadata().level();
        let target = event.metadata().target();

        match *level {
            Level::ERROR => write_string::<Red, Black>(writer.by_ref(), self.is_ansi, " ERROR ")
                .and_then(|_| write_message::<Red, Default>(writer, self.is_ansi, event)),
            Level::WARN => write_string::<Yellow, Black>(writer.by_ref(), self.is_ansi, " WARNING ")
                .and_then(|_| write_message::<Yellow, Default>(writer, self.is_ansi, event)),
            Level::INFO => write_message::<Default, Default>(writer, self.is_ansi, event),
            _ => {
                let now = Local::now();
                write!(
                    writer,
                    "{} [{}] {}: ",
                    now.format("%Y-%m-%dT%H:%M:%S.%3f%z"),
                    level,
                    target,
                )
                .and_then(|_| write_message::<Default, Default>(writer, self.is_ansi, event))
            }
        }
    }
}

struct MessageVisitor<'a, FG: Color, BG: Color> {
    colorize: bool,
    writer: Writer<'a>,
    _fg: PhantomData<FG>,
    _bg: PhantomData<BG>,
}

impl<'a, FG: Color, BG: Color> Visit for MessageVisitor<'a, FG, BG> {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            if self.colorize {
                let value = value.fg::<FG>().bg::<BG>();
                let _ = write!(self.writer, "{:?}", value);
            } else {
                let _ = write!(self.writer, "{:?}", value);
            }
        }
    }
}

fn write_string<FG: Color, BG: Color>(
    mut writer: Writer<'_>,
    colorize: bool,
    value: &str,
) -> Result<(), std::fmt::Error> {
    if colorize {
        let value = value.fg::<FG>().bg::<BG>();
        write!(writer, "{} ", value)
    } else {
        write!(writer, "{} ", value)
    }
}

fn write_message<FG: Color, BG: Color>(
    mut writer: Writer<'_>,
    colorize: bool,
    event: &Event,
) -> Result<(), std::fmt::Error> {
    let mut visitor = MessageVisitor::<FG, BG> {
        colorize,
        writer: writer.by_ref(),
        _fg: PhantomData,
        _bg: PhantomData,
    };
    event.record(&mut visitor);
    writeln!(writer)
}
