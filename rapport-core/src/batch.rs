//! ## rapport-core::batch
//! **Deferred reporting**
//!
//! A [`BatchLogger`] collects records during some operation and replays them
//! into a [`Reporter`] later, in arrival order. It holds no lock; share it
//! across threads behind your own.

use std::fmt::Write as _;

use chrono::Local;

use crate::format::{
    default_location, default_message, ConsoleFormatter, IndentSettings, LineContext,
    LineFormatter, LogLineFormatter,
};
use crate::record::{Cause, ReportRecord};
use crate::reporter::Reporter;
use crate::severity::EventKind;

/// Rendering options for summaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    /// Wrap each record in a severity banner.
    pub print_decoration: bool,
    /// Blank line after each record.
    pub new_line_after: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            print_decoration: true,
            new_line_after: false,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BatchLogger {
    records: Vec<ReportRecord>,
    options: BatchOptions,
}

impl BatchLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BatchOptions) -> Self {
        Self {
            records: Vec::new(),
            options,
        }
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    pub fn set_options(&mut self, options: BatchOptions) {
        self.options = options;
    }

    pub fn append(
        &mut self,
        kind: EventKind,
        location: Option<&str>,
        message: Option<&str>,
        cause: Option<Cause>,
    ) {
        self.records
            .push(ReportRecord::new(kind, location, message, cause));
    }

    pub fn push(&mut self, record: ReportRecord) {
        self.records.push(record);
    }

    pub fn add_error(&mut self, location: &str, message: &str) {
        self.push(ReportRecord::error(location, message));
    }

    pub fn add_warning(&mut self, location: &str, message: &str) {
        self.push(ReportRecord::warning(location, message));
    }

    pub fn add_info(&mut self, location: &str, message: &str) {
        self.push(ReportRecord::info(location, message));
    }

    pub fn records(&self) -> &[ReportRecord] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Replays every record into `reporter` in arrival order.
    pub fn report(&self, reporter: &Reporter) {
        for record in &self.records {
            reporter.report_record(record);
        }
    }

    pub fn report_and_clear(&mut self, reporter: &Reporter) {
        self.report(reporter);
        self.clear();
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn count_by_kind(&self, kind: EventKind) -> usize {
        self.records.iter().filter(|r| r.kind() == kind).count()
    }

    pub fn has_any(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn has_kind(&self, kind: EventKind) -> bool {
        self.records.iter().any(|r| r.kind() == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.has_kind(EventKind::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.has_kind(EventKind::Warning)
    }

    pub fn has_info(&self) -> bool {
        self.has_kind(EventKind::Info)
    }

    /// All records of `kind`, rendered per [`BatchOptions`].
    pub fn summary(&self, kind: EventKind) -> String {
        let mut out = String::new();
        for record in self.records.iter().filter(|r| r.kind() == kind) {
            out.push_str(&self.render(record));
            out.push('\n');
            if self.options.new_line_after {
                out.push('\n');
            }
        }
        out
    }

    pub fn errors_summary(&self) -> String {
        self.summary(EventKind::Error)
    }

    pub fn warnings_summary(&self) -> String {
        self.summary(EventKind::Warning)
    }

    pub fn info_summary(&self) -> String {
        self.summary(EventKind::Info)
    }

    fn render(&self, record: &ReportRecord) -> String {
        let location = default_location(record).unwrap_or_default();
        let message = default_message(record).unwrap_or_default();
        let indent = IndentSettings::none();
        let ctx = LineContext {
            depth: 0,
            indent: &indent,
            source_tag: None,
            timestamp: Local::now(),
        };
        let rendered = if self.options.print_decoration {
            ConsoleFormatter {
                show_timestamp: false,
            }
            .format(record.kind(), &location, &message, &ctx)
        } else {
            LogLineFormatter::default().format(record.kind(), &location, &message, &ctx)
        };
        rendered.unwrap_or_else(|_| {
            let mut fallback = String::from(record.kind().label());
            let _ = write!(fallback, ": {message}");
            fallback
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;
    use crate::severity::Threshold;
    use crate::sink::test_support::text_buffer;
    use crate::sink::SinkTarget;

    fn mixed() -> BatchLogger {
        let mut batch = BatchLogger::new();
        batch.add_info("a", "first");
        batch.add_error("b", "second");
        batch.append(EventKind::Undefined, None, Some("third"), None);
        batch.add_warning("c", "fourth");
        batch.add_error("d", "fifth");
        batch
    }

    #[test]
    fn counts_by_kind() {
        let batch = mixed();
        assert_eq!(batch.count(), 5);
        assert_eq!(batch.count_by_kind(EventKind::Error), 2);
        assert!(batch.has_kind(EventKind::Undefined));
        assert!(batch.has_any());
        assert!(!BatchLogger::new().has_any());
    }

    #[test]
    fn has_warnings_counts_warnings_not_errors() {
        let mut batch = BatchLogger::new();
        batch.add_error("x", "only an error");
        assert!(batch.has_errors());
        assert!(!batch.has_warnings());

        let mut batch = BatchLogger::new();
        batch.add_warning("x", "only a warning");
        assert!(batch.has_warnings());
        assert!(!batch.has_errors());
    }

    #[test]
    fn report_and_clear_replays_in_order() {
        let reporter = Reporter::new();
        reporter.remove_all_sinks(ChannelKind::Console).unwrap();
        let log = text_buffer();
        reporter
            .add_sink(ChannelKind::TextLogger, SinkTarget::text(log.clone()))
            .unwrap();
        reporter.set_logging_level(Threshold::Verbose);

        let mut batch = mixed();
        batch.report_and_clear(&reporter);
        assert_eq!(batch.count(), 0);

        let text = log.lock().clone();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "Info in a: first",
                "Error in b: second",
                "Undefined: third",
                "Warning in c: fourth",
                "Error in d: fifth",
            ]
        );
    }

    #[test]
    fn plain_summary() {
        let mut batch = mixed();
        batch.set_options(BatchOptions {
            print_decoration: false,
            new_line_after: true,
        });
        assert_eq!(
            batch.errors_summary(),
            "Error in b: second\n\nError in d: fifth\n\n"
        );
        assert_eq!(batch.info_summary(), "Info in a: first\n\n");
    }

    #[test]
    fn decorated_summary() {
        let batch = mixed();
        assert_eq!(batch.warnings_summary(), "---- Warning in c:\nfourth\n");
        assert_eq!(batch.summary(EventKind::Undefined), "Message:\nthird\n");
    }
}
