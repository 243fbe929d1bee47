//! Console line format: `{level:>8}: {channel}: {message}`.

use std::fmt::{self, Write as _};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;

/// Name of the event field that selects the channel.
pub const CHANNEL_FIELD: &str = "channel";

const RESET: &str = "\x1b[0m";

/// Formats events as `   INFO: Greeter: committing transaction`.
///
/// The channel is the event's `channel` field, falling back to the configured default and
/// then to the event target. Remaining fields are appended as `key=value`.
#[derive(Debug, Clone, Default)]
pub struct ChannelFormat {
    fallback: Option<String>,
}

impl ChannelFormat {
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self { fallback: Some(fallback.into()) }
    }
}

const fn color(level: Level) -> &'static str {
    match level {
        Level::ERROR => "\x1b[31m",
        Level::WARN => "\x1b[33m",
        Level::INFO => "\x1b[32m",
        Level::DEBUG => "\x1b[34m",
        Level::TRACE => "\x1b[35m",
    }
}

#[derive(Default)]
struct LineVisitor {
    channel: Option<String>,
    message: String,
    fields: String,
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            CHANNEL_FIELD => self.channel = Some(value.to_owned()),
            "message" => self.message.push_str(value),
            name => {
                let _ = write!(self.fields, " {name}={value:?}");
            },
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            CHANNEL_FIELD => self.channel = Some(format!("{value:?}")),
            "message" => {
                let _ = write!(self.message, "{value:?}");
            },
            name => {
                let _ = write!(self.fields, " {name}={value:?}");
            },
        }
    }
}

impl<S, N> FormatEvent<S, N> for ChannelFormat
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
        let mut line = LineVisitor::default();
        event.record(&mut line);

        let level = *meta.level();
        let padded = format!("{:>8}", level.as_str());
        if writer.has_ansi_escapes() {
            write!(writer, "{}{padded}{RESET}", color(level))?;
        } else {
            writer.write_str(&padded)?;
        }

        let channel =
            line.channel.as_deref().or(self.fallback.as_deref()).unwrap_or_else(|| meta.target());
        writeln!(writer, ": {channel}: {}{}", line.message, line.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn capture(ansi: bool, f: impl FnOnce()) -> String {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(ansi)
            .event_format(ChannelFormat::new("Fallback"))
            .with_writer(buffer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn formats_channel_lines() {
        let out = capture(false, || {
            tracing::info!(channel = "Greeter", "committing transaction");
            tracing::warn!("no channel here");
        });
        assert_eq!(out, "    INFO: Greeter: committing transaction\n    WARN: Fallback: no channel here\n");
    }

    #[test]
    fn appends_extra_fields() {
        let name = String::from("Greeter");
        let out = capture(false, || {
            tracing::error!(channel = %name, status = 500, "request failed");
        });
        assert_eq!(out, "   ERROR: Greeter: request failed status=500\n");
    }

    #[test]
    fn colors_levels_when_ansi() {
        let out = capture(true, || tracing::info!(channel = "App", "hi"));
        assert!(out.starts_with("\x1b[32m    INFO\x1b[0m: App: hi"));
    }
}
