//! ## rapport-core::format
//! **Location/message assembly and per-channel line formatting**
//!
//! Every channel runs the same pipeline: assemble the location string,
//! assemble the message string, then hand both to a [`LineFormatter`].
//! Assemblers are plain function values; formatters are small trait objects
//! so they can carry their own options.

use std::fmt::Write as _;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::error::ReportError;
use crate::record::ReportRecord;
use crate::severity::EventKind;

/// Turns a record into the location or message part of a line.
pub type Assembler = Arc<dyn Fn(&ReportRecord) -> Result<String, ReportError> + Send + Sync>;

/// Replaces embedded line breaks in one-line formats.
pub const LINE_BREAK_PLACEHOLDER: &str = " \\n ";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Location as given, or empty.
pub fn default_location(record: &ReportRecord) -> Result<String, ReportError> {
    Ok(record.location().unwrap_or_default().trim().to_string())
}

/// Message followed by the cause and its source chain.
pub fn default_message(record: &ReportRecord) -> Result<String, ReportError> {
    let mut out = record.message().unwrap_or_default().to_string();
    if let Some(cause) = record.cause() {
        if out.is_empty() {
            let _ = write!(out, "{cause}");
        } else {
            let _ = write!(out, " (cause: {cause})");
        }
        let mut source = cause.source();
        while let Some(inner) = source {
            let _ = write!(out, " <- {inner}");
            source = inner.source();
        }
    }
    Ok(out)
}

pub fn default_location_assembler() -> Assembler {
    Arc::new(default_location)
}

pub fn default_message_assembler() -> Assembler {
    Arc::new(default_message)
}

/// Replaces `\r\n`, `\n` and `\r` with [`LINE_BREAK_PLACEHOLDER`].
pub fn escape_line_breaks(text: &str) -> String {
    if !text.contains(|c: char| c == '\n' || c == '\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', LINE_BREAK_PLACEHOLDER)
}

/// Indentation of persistent log lines: `initial + depth * spacing` characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndentSettings {
    pub initial: usize,
    pub spacing: usize,
    pub character: char,
}

impl IndentSettings {
    pub fn none() -> Self {
        Self {
            initial: 0,
            spacing: 0,
            character: ' ',
        }
    }

    pub fn width(&self, depth: usize) -> usize {
        self.initial + depth * self.spacing
    }

    pub fn render(&self, depth: usize) -> String {
        std::iter::repeat(self.character)
            .take(self.width(depth))
            .collect()
    }
}

impl Default for IndentSettings {
    fn default() -> Self {
        Self {
            initial: 0,
            spacing: 2,
            character: ' ',
        }
    }
}

/// Banner written to every newly attached sink of a channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IntroSettings {
    pub write_intro: bool,
    pub program_name: Option<String>,
    pub intro_text: Option<String>,
}

impl IntroSettings {
    pub fn banner(&self, now: DateTime<Local>) -> Option<String> {
        if !self.write_intro {
            return None;
        }
        let program = self.program_name.as_deref().unwrap_or("application");
        let mut out = format!(
            "==== {program} log started at {}",
            now.format(TIMESTAMP_FORMAT)
        );
        if let Some(text) = self.intro_text.as_deref().filter(|t| !t.is_empty()) {
            out.push('\n');
            out.push_str(text);
        }
        Some(out)
    }
}

/// Everything a formatter may need besides the assembled strings.
pub struct LineContext<'a> {
    pub depth: usize,
    pub indent: &'a IndentSettings,
    pub source_tag: Option<&'a str>,
    pub timestamp: DateTime<Local>,
}

/// Produces the final text written to every sink of a channel.
pub trait LineFormatter: Send + Sync {
    fn format(
        &self,
        kind: EventKind,
        location: &str,
        message: &str,
        ctx: &LineContext<'_>,
    ) -> Result<String, ReportError>;
}

/// Decorated multi-line block for interactive output.
#[derive(Clone, Debug)]
pub struct ConsoleFormatter {
    pub show_timestamp: bool,
}

impl Default for ConsoleFormatter {
    fn default() -> Self {
        Self {
            show_timestamp: true,
        }
    }
}

impl ConsoleFormatter {
    fn banner(kind: EventKind) -> &'static str {
        match kind {
            EventKind::Error => "==== ERROR",
            EventKind::Warning => "---- Warning",
            EventKind::Info => "Info",
            EventKind::Undefined => "Message",
        }
    }
}

impl LineFormatter for ConsoleFormatter {
    fn format(
        &self,
        kind: EventKind,
        location: &str,
        message: &str,
        ctx: &LineContext<'_>,
    ) -> Result<String, ReportError> {
        let mut out = String::from(Self::banner(kind));
        if !location.is_empty() {
            let _ = write!(out, " in {location}");
        }
        out.push(':');
        if !message.is_empty() {
            out.push('\n');
            out.push_str(message);
        }
        if self.show_timestamp {
            let _ = write!(out, "\n  ({})", ctx.timestamp.format("%H:%M:%S"));
        }
        Ok(out)
    }
}

/// Single-line record for persistent logs and the trace facility:
/// `[timestamp] <indent>Kind in location: message [tag]`.
#[derive(Clone, Debug, Default)]
pub struct LogLineFormatter {
    pub show_timestamp: bool,
}

impl LogLineFormatter {
    pub fn timestamped() -> Self {
        Self {
            show_timestamp: true,
        }
    }
}

impl LineFormatter for LogLineFormatter {
    fn format(
        &self,
        kind: EventKind,
        location: &str,
        message: &str,
        ctx: &LineContext<'_>,
    ) -> Result<String, ReportError> {
        let mut line = String::new();
        if self.show_timestamp {
            let _ = write!(line, "{} ", ctx.timestamp.format(TIMESTAMP_FORMAT));
        }
        line.push_str(&ctx.indent.render(ctx.depth));
        line.push_str(kind.label());
        if !location.is_empty() {
            let _ = write!(line, " in {}", escape_line_breaks(location));
        }
        line.push_str(": ");
        line.push_str(&escape_line_breaks(message));
        if let Some(tag) = ctx.source_tag.filter(|t| !t.is_empty()) {
            let _ = write!(line, " [{tag}]");
        }
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::cause;
    use std::fmt;

    fn ctx<'a>(indent: &'a IndentSettings, depth: usize, tag: Option<&'a str>) -> LineContext<'a> {
        LineContext {
            depth,
            indent,
            source_tag: tag,
            timestamp: Local::now(),
        }
    }

    #[derive(Debug)]
    struct Outer(Inner);
    #[derive(Debug)]
    struct Inner;

    impl fmt::Display for Outer {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("outer failed")
        }
    }
    impl fmt::Display for Inner {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("disk full")
        }
    }
    impl std::error::Error for Outer {
        fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
            Some(&self.0)
        }
    }
    impl std::error::Error for Inner {}

    #[test]
    fn message_includes_cause_chain() {
        let rec = ReportRecord::error("saver", "cannot save").with_cause(cause(Outer(Inner)));
        assert_eq!(
            default_message(&rec).unwrap(),
            "cannot save (cause: outer failed) <- disk full"
        );
        let bare = ReportRecord::new(EventKind::Error, None, None, Some(cause(Inner)));
        assert_eq!(default_message(&bare).unwrap(), "disk full");
        assert_eq!(default_location(&bare).unwrap(), "");
    }

    #[test]
    fn line_breaks_become_placeholders() {
        assert_eq!(escape_line_breaks("a\r\nb\nc\rd"), "a \\n b \\n c \\n d");
        assert_eq!(escape_line_breaks("plain"), "plain");
    }

    #[test]
    fn log_line_layout() {
        let indent = IndentSettings {
            initial: 1,
            spacing: 2,
            character: '.',
        };
        let line = LogLineFormatter::default()
            .format(
                EventKind::Warning,
                "loader",
                "two\nlines",
                &ctx(&indent, 2, Some("demo")),
            )
            .unwrap();
        assert_eq!(line, ".....Warning in loader: two \\n lines [demo]");
    }

    #[test]
    fn log_line_without_location_or_tag() {
        let indent = IndentSettings::none();
        let line = LogLineFormatter::default()
            .format(EventKind::Info, "", "hello", &ctx(&indent, 5, None))
            .unwrap();
        assert_eq!(line, "Info: hello");
    }

    #[test]
    fn timestamped_line_starts_with_date() {
        let indent = IndentSettings::none();
        let line = LogLineFormatter::timestamped()
            .format(EventKind::Error, "x", "y", &ctx(&indent, 0, None))
            .unwrap();
        assert!(line.ends_with("Error in x: y"));
        assert!(line.chars().next().unwrap().is_ascii_digit());
    }

    #[test]
    fn console_block() {
        let indent = IndentSettings::none();
        let block = ConsoleFormatter {
            show_timestamp: false,
        }
        .format(EventKind::Error, "main", "boom\nagain", &ctx(&indent, 0, None))
        .unwrap();
        assert_eq!(block, "==== ERROR in main:\nboom\nagain");
    }

    #[test]
    fn intro_banner() {
        let mut intro = IntroSettings::default();
        assert!(intro.banner(Local::now()).is_none());
        intro.write_intro = true;
        intro.program_name = Some("demo".into());
        intro.intro_text = Some("hello".into());
        let banner = intro.banner(Local::now()).unwrap();
        assert!(banner.starts_with("==== demo log started at "));
        assert!(banner.ends_with("\nhello"));
    }
}
