//! # Diagnostic reporting
//!
//! Formats one diagnostic line per report and hands it to the configured
//! conversation sink. The line shape is fixed:
//!
//! - message and code: `"<prog>: <message>: <code-text>\n"`
//! - code only:        `"<prog>: <code-text>\n"`
//! - message only:     `"<prog>: <message>\n"`
//! - neither:          `"<prog>: (null)\n"`

use std::fmt;
use std::io::{self, Write};

use nix::errno::Errno;

/// Conversation-channel class for an emitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Informational output (stdout class).
    Info,
    /// Diagnostic output (stderr class). All warning and fatal reports
    /// use this class.
    Error,
}

/// Destination for formatted diagnostic lines.
///
/// `line` carries its own trailing newline; implementations write it
/// verbatim. Emission is best-effort: a diagnostic of last resort has
/// nowhere to report a write failure, so sinks swallow them.
pub trait ReportSink: Send {
    fn emit_line(&mut self, channel: Channel, line: &str);
}

/// Default console sink: `Error` lines to stderr, `Info` lines to stdout.
#[derive(Debug, Default)]
pub struct StderrSink;

impl ReportSink for StderrSink {
    fn emit_line(&mut self, channel: Channel, line: &str) {
        let _ = match channel {
            Channel::Error => io::stderr().write_all(line.as_bytes()),
            Channel::Info => io::stdout().write_all(line.as_bytes()),
        };
    }
}

/// Sink over an arbitrary byte stream (log file, pipe, IPC bridge).
///
/// Flushes after every line so nothing is buffered past a fatal
/// termination.
pub struct WriterSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> ReportSink for WriterSink<W> {
    fn emit_line(&mut self, _channel: Channel, line: &str) {
        let _ = self.writer.write_all(line.as_bytes());
        let _ = self.writer.flush();
    }
}

/// Human-readable description of an OS error code.
pub fn error_text(code: i32) -> &'static str {
    Errno::from_raw(code).desc()
}

/// One diagnostic: program name plus optional message and OS error code.
///
/// Built fresh per report and rendered immediately; never retained.
#[derive(Debug, Clone, Copy)]
pub struct Diagnostic<'a> {
    pub progname: &'a str,
    pub message: Option<&'a str>,
    pub code: Option<i32>,
}

impl Diagnostic<'_> {
    /// Render the emission line, trailing newline included.
    pub fn render(&self) -> String {
        match (self.message, self.code) {
            (Some(msg), Some(code)) => {
                format!("{}: {}: {}\n", self.progname, msg, error_text(code))
            }
            (None, Some(code)) => format!("{}: {}\n", self.progname, error_text(code)),
            (Some(msg), None) => format!("{}: {}\n", self.progname, msg),
            (None, None) => format!("{}: (null)\n", self.progname),
        }
    }
}

/// Formats diagnostics and emits them through the configured sink.
pub struct Reporter {
    progname: String,
    sink: Box<dyn ReportSink>,
}

impl Reporter {
    /// Reporter writing to the standard streams.
    pub fn new(progname: impl Into<String>) -> Self {
        Self::with_sink(progname, Box::new(StderrSink))
    }

    pub fn with_sink(progname: impl Into<String>, sink: Box<dyn ReportSink>) -> Self {
        Self {
            progname: progname.into(),
            sink,
        }
    }

    pub fn progname(&self) -> &str {
        &self.progname
    }

    pub fn set_progname(&mut self, progname: impl Into<String>) {
        self.progname = progname.into();
    }

    pub fn set_sink(&mut self, sink: Box<dyn ReportSink>) {
        self.sink = sink;
    }

    /// Emit exactly one line for the given code/message pair.
    pub fn report(&mut self, code: Option<i32>, msg: Option<fmt::Arguments<'_>>) {
        let rendered = msg.map(|m| m.to_string());
        let line = Diagnostic {
            progname: &self.progname,
            message: rendered.as_deref(),
            code,
        }
        .render();
        self.sink.emit_line(Channel::Error, &line);
    }
}

/// Report a warning through the process-wide handler and return.
///
/// `warn!()` with no arguments emits the `(null)` placeholder line.
#[macro_export]
macro_rules! warn {
    () => { $crate::warn_args(::core::option::Option::None) };
    ($($arg:tt)+) => {
        $crate::warn_args(::core::option::Option::Some(::core::format_args!($($arg)+)))
    };
}

/// Report a warning including the text for an OS error code.
///
/// `warn_code!(code)` with no format string emits the code-only line.
#[macro_export]
macro_rules! warn_code {
    ($code:expr $(,)?) => {
        $crate::warn_code_args($code, ::core::option::Option::None)
    };
    ($code:expr, $($arg:tt)+) => {
        $crate::warn_code_args($code, ::core::option::Option::Some(::core::format_args!($($arg)+)))
    };
}

/// Report a fatal condition: emit, run every registered cleanup action,
/// terminate the process with a failure status. Never returns.
#[macro_export]
macro_rules! fatal {
    () => { $crate::fatal_args(::core::option::Option::None) };
    ($($arg:tt)+) => {
        $crate::fatal_args(::core::option::Option::Some(::core::format_args!($($arg)+)))
    };
}

/// Fatal report including the text for an OS error code. Never returns.
#[macro_export]
macro_rules! fatal_code {
    ($code:expr $(,)?) => {
        $crate::fatal_code_args($code, ::core::option::Option::None)
    };
    ($code:expr, $($arg:tt)+) => {
        $crate::fatal_code_args($code, ::core::option::Option::Some(::core::format_args!($($arg)+)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CaptureSink;
    use std::fs;

    const ENOENT: i32 = 2;

    #[test]
    fn test_render_message_only() {
        let d = Diagnostic {
            progname: "toolx",
            message: Some("disk full"),
            code: None,
        };
        assert_eq!(d.render(), "toolx: disk full\n");
    }

    #[test]
    fn test_render_message_and_code() {
        let d = Diagnostic {
            progname: "toolx",
            message: Some("open failed"),
            code: Some(ENOENT),
        };
        assert_eq!(d.render(), "toolx: open failed: No such file or directory\n");
    }

    #[test]
    fn test_render_code_only() {
        let d = Diagnostic {
            progname: "toolx",
            message: None,
            code: Some(ENOENT),
        };
        assert_eq!(d.render(), "toolx: No such file or directory\n");
    }

    #[test]
    fn test_render_placeholder_when_empty() {
        let d = Diagnostic {
            progname: "toolx",
            message: None,
            code: None,
        };
        assert_eq!(d.render(), "toolx: (null)\n");
    }

    #[test]
    fn test_error_text_maps_known_code() {
        assert_eq!(error_text(ENOENT), "No such file or directory");
    }

    #[test]
    fn test_reporter_emits_one_line_per_report() {
        let sink = CaptureSink::new();
        let lines = sink.lines();
        let mut reporter = Reporter::with_sink("toolx", Box::new(sink));

        reporter.report(None, Some(format_args!("value {}", 42)));
        reporter.report(Some(ENOENT), None);

        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], (Channel::Error, "toolx: value 42\n".to_string()));
        assert_eq!(
            lines[1],
            (Channel::Error, "toolx: No such file or directory\n".to_string())
        );
    }

    #[test]
    fn test_writer_sink_writes_identical_bytes() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut reporter = Reporter::with_sink(
            "toolx",
            Box::new(WriterSink::new(file.reopen().unwrap())),
        );

        reporter.report(None, Some(format_args!("lock file left behind")));
        reporter.report(Some(ENOENT), Some(format_args!("open failed")));

        let written = fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            written,
            "toolx: lock file left behind\ntoolx: open failed: No such file or directory\n"
        );
    }
}
