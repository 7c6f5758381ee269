//! Console log formatting for the server binary.
//!
//! One line per event: timestamp, colored level, service/component column,
//! message. The `component` field lets library code tag lines without its
//! own subscriber.

use std::fmt;
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::{format::Writer, FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

/// Event formatter for pixnetd's console output.
pub struct PixnetLogFormatter {
    service: String,
    color: bool,
}

impl PixnetLogFormatter {
    /// Create a formatter for the given service name.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            color: supports_color(),
        }
    }

    fn level_style(&self, level: &tracing::Level) -> (&'static str, &'static str) {
        if !self.color {
            return ("", "");
        }
        let color = match *level {
            tracing::Level::ERROR => "\x1b[91m",
            tracing::Level::WARN => "\x1b[93m",
            tracing::Level::INFO => "\x1b[32m",
            tracing::Level::DEBUG | tracing::Level::TRACE => "\x1b[90m",
        };
        (color, RESET)
    }
}

impl<S, N> FormatEvent<S, N> for PixnetLogFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = chrono::Local::now().format("%H:%M:%S%.3f");
        let level = event.metadata().level();
        let (color, reset) = self.level_style(level);
        let (dim, undim) = if self.color { (DIM, RESET) } else { ("", "") };

        let mut visitor = LineVisitor::default();
        event.record(&mut visitor);

        let origin = match &visitor.component {
            Some(component) => format!("{}/{}", self.service, component),
            None => self.service.clone(),
        };

        write!(
            writer,
            "{dim}{timestamp}{undim} {color}{level:>5}{reset} {dim}[{origin}]{undim} "
        )?;
        writeln!(writer, "{}", visitor.message)
    }
}

#[derive(Default)]
struct LineVisitor {
    message: String,
    component: Option<String>,
}

impl tracing::field::Visit for LineVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        match field.name() {
            "message" => self.message = value.to_string(),
            "component" => self.component = Some(value.to_string()),
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = format!("{value:?}"),
            "component" => {
                let raw = format!("{value:?}");
                self.component = Some(raw.trim_matches('"').to_string());
            }
            _ => {}
        }
    }
}

fn supports_color() -> bool {
    match std::env::var("TERM") {
        Ok(term) => term != "dumb",
        Err(_) => false,
    }
}
