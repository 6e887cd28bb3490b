//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields in alphabetical order
//! - Synchronous, no buffering
//! - Filtering by minimum severity, configured per engine context

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Debug-level detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Integrity failures
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lines captured by an in-memory logger
pub type LogBuffer = Arc<Mutex<Vec<String>>>;

#[derive(Debug, Clone)]
enum LogTarget {
    /// stdout, stderr for ERROR and FATAL
    Console,
    /// Captured lines, for embedding and tests
    Memory(LogBuffer),
}

/// A structured logger that outputs JSON lines
#[derive(Debug, Clone)]
pub struct Logger {
    enabled: bool,
    min_severity: Severity,
    target: LogTarget,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Severity::Info)
    }
}

impl Logger {
    /// Console logger emitting events at or above `min_severity`
    pub fn new(min_severity: Severity) -> Self {
        Self {
            enabled: true,
            min_severity,
            target: LogTarget::Console,
        }
    }

    /// Logger that emits nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_severity: Severity::Fatal,
            target: LogTarget::Console,
        }
    }

    /// Logger that captures every line into the returned buffer
    pub fn in_memory(min_severity: Severity) -> (Self, LogBuffer) {
        let buffer: LogBuffer = Arc::new(Mutex::new(Vec::new()));
        let logger = Self {
            enabled: true,
            min_severity,
            target: LogTarget::Memory(Arc::clone(&buffer)),
        };
        (logger, buffer)
    }

    /// True if events at `severity` are emitted
    pub fn is_enabled_for(&self, severity: Severity) -> bool {
        self.enabled && severity >= self.min_severity
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: Event, fields: &[(&str, &str)]) {
        if !self.is_enabled_for(severity) {
            return;
        }

        let line = render(severity, event.as_str(), fields);
        match &self.target {
            LogTarget::Console => {
                if severity >= Severity::Error {
                    write_line(&mut io::stderr(), &line);
                } else {
                    write_line(&mut io::stdout(), &line);
                }
            }
            LogTarget::Memory(buffer) => {
                if let Ok(mut lines) = buffer.lock() {
                    lines.push(line);
                }
            }
        }
    }

    /// Log at TRACE level
    pub fn trace(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    /// Log at ERROR level
    pub fn error(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}

fn write_line<W: Write>(writer: &mut W, line: &str) {
    // One write per line; a failing log sink never fails the engine
    let _ = writer.write_all(line.as_bytes());
    let _ = writer.write_all(b"\n");
    let _ = writer.flush();
}

/// Render one JSON log line (without trailing newline)
fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let mut output = String::with_capacity(128);

    output.push_str("{\"event\":\"");
    escape_json_string(&mut output, event);
    output.push_str("\",\"severity\":\"");
    output.push_str(severity.as_str());
    output.push('"');

    let mut sorted_fields: Vec<_> = fields.iter().collect();
    sorted_fields.sort_by_key(|(k, _)| *k);

    for (key, value) in sorted_fields {
        output.push_str(",\"");
        escape_json_string(&mut output, key);
        output.push_str("\":\"");
        escape_json_string(&mut output, value);
        output.push('"');
    }

    output.push('}');
    output
}

fn escape_json_string(output: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if c.is_control() => {
                output.push_str(&format!("\\u{:04x}", c as u32));
            }
            c => output.push(c),
        }
    }
}
