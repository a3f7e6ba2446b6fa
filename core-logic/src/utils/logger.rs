use chrono::Local;
use nu_ansi_term::{Color, Style};
use std::fmt;
use std::path::Path;
use tracing::{Event, Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter, Layer,
};

/// Events logged with this target are rendered with the `success` marker.
pub const SUCCESS_TARGET: &str = "success";

/// Installs the global subscriber: colored console output filtered by
/// `RUST_LOG` (default `info`) and a daily rolling plain-text file in
/// `log_dir`. The returned guard must be kept alive by the caller.
pub fn setup_logger(log_dir: impl AsRef<Path>) -> Option<WorkerGuard> {
    let log_dir = log_dir.as_ref();
    let (file_layer, guard) = match std::fs::create_dir_all(log_dir) {
        Ok(()) => {
            let file_appender = tracing_appender::rolling::daily(log_dir, "tea-sepolia.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            let file_filter = tracing_subscriber::filter::Targets::new()
                .with_default(Level::DEBUG)
                .with_target("hyper", Level::WARN)
                .with_target("reqwest", Level::WARN);

            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .event_format(FileFormatter)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        Err(e) => {
            eprintln!("Unable to create log directory {:?}: {}", log_dir, e);
            (None, None)
        }
    };

    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .event_format(TerminalFormatter)
        .with_filter(console_filter);

    // Already initialized when called twice.
    let _ = tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init();

    guard
}

/// Severity label printed between the brackets.
pub fn level_label(target: &str, level: &Level) -> &'static str {
    if target == SUCCESS_TARGET {
        return "success";
    }
    match *level {
        Level::ERROR => "error",
        Level::WARN => "warning",
        Level::INFO => "info",
        Level::DEBUG => "debug",
        Level::TRACE => "trace",
    }
}

// --- Formatters ---

struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        }
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        }
    }
}

fn extract_message(event: &Event<'_>) -> String {
    let mut visitor = MessageVisitor {
        message: String::new(),
    };
    event.record(&mut visitor);
    visitor.message
}

pub struct TerminalFormatter;

impl<S, N> FormatEvent<S, N> for TerminalFormatter
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
        let meta = event.metadata();
        let label = level_label(meta.target(), meta.level());
        let style = match label {
            "success" => Style::new().fg(Color::LightGreen).bold(),
            "error" => Style::new().fg(Color::LightRed).bold(),
            "warning" => Style::new().fg(Color::Yellow),
            "info" => Style::new().fg(Color::Cyan),
            _ => Style::new().fg(Color::DarkGray),
        };

        let timestamp = Local::now().format("%H:%M:%S");
        let time_style = Style::new().fg(Color::DarkGray);

        write!(
            writer,
            "{}-[{}] : {}",
            time_style.paint(format!("[{}]", timestamp)),
            style.paint(label),
            extract_message(event)
        )?;
        writeln!(writer)
    }
}

pub struct FileFormatter;

impl<S, N> FormatEvent<S, N> for FileFormatter
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
        let meta = event.metadata();
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");

        writeln!(
            writer,
            "[{}]-[{}] : {}",
            timestamp,
            level_label(meta.target(), meta.level()),
            extract_message(event)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_labels() {
        assert_eq!(level_label("tea_project::spammer", &Level::WARN), "warning");
        assert_eq!(level_label("tea_project", &Level::ERROR), "error");
        assert_eq!(level_label(SUCCESS_TARGET, &Level::INFO), "success");
    }
}
