//! ## rapport-core::channel
//! **One reporting destination family with its own threshold and sinks**
//!
//! The four families (console, text log, indented text logger, trace) are all
//! the same [`Channel`] type; they differ only in the defaults chosen by
//! [`Channel::new`]: formatter, indentation and initial sink.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tracing::warn;

use crate::error::{Phase, ReportError};
use crate::format::{
    default_location_assembler, default_message_assembler, Assembler, ConsoleFormatter,
    IndentSettings, IntroSettings, LineContext, LineFormatter, LogLineFormatter,
};
use crate::record::ReportRecord;
use crate::severity::{passes, EventKind, Threshold};
use crate::sink::{Sink, SinkIdentity, SinkTarget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Console,
    TextLog,
    TextLogger,
    Trace,
}

impl ChannelKind {
    /// Dispatch order.
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Console,
        ChannelKind::TextLog,
        ChannelKind::TextLogger,
        ChannelKind::Trace,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            ChannelKind::Console => "console",
            ChannelKind::TextLog => "text-log",
            ChannelKind::TextLogger => "text-logger",
            ChannelKind::Trace => "trace",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of fanning one line out to a channel's sinks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub written: usize,
    pub failed: usize,
    pub last_error: Option<String>,
}

impl DispatchOutcome {
    /// Every sink failed; nothing reached its destination.
    pub fn is_total_failure(&self) -> bool {
        self.written == 0 && self.failed > 0
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs one pipeline step, turning both errors and panics into a tagged
/// [`ReportError`].
pub(crate) fn guarded<T>(
    channel: ChannelKind,
    phase: Phase,
    step: impl FnOnce() -> Result<T, ReportError>,
) -> Result<T, ReportError> {
    match panic::catch_unwind(AssertUnwindSafe(step)) {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(ReportError::Dispatch {
            channel,
            phase,
            message: err.to_string(),
        }),
        Err(payload) => Err(ReportError::HookPanicked {
            channel,
            phase,
            message: panic_message(payload.as_ref()),
        }),
    }
}

pub struct Channel {
    kind: ChannelKind,
    threshold: Threshold,
    enabled: bool,
    default_sink: Option<Sink>,
    extra_sinks: Vec<Sink>,
    location_assembler: Assembler,
    message_assembler: Assembler,
    formatter: Arc<dyn LineFormatter>,
    indent: IndentSettings,
    intro: IntroSettings,
}

impl Channel {
    /// Channel with the default pipeline of its family.
    ///
    /// | kind          | threshold | enabled | default sink | formatter              |
    /// |---------------|-----------|---------|--------------|------------------------|
    /// | `Console`     | warning   | yes     | stdout       | decorated block        |
    /// | `TextLog`     | info      | yes     | none         | timestamped line       |
    /// | `TextLogger`  | info      | yes     | none         | indented line          |
    /// | `Trace`       | warning   | no      | none         | plain line             |
    pub fn new(kind: ChannelKind) -> Self {
        let (threshold, enabled, formatter, indent): (_, _, Arc<dyn LineFormatter>, _) = match kind
        {
            ChannelKind::Console => (
                Threshold::Warning,
                true,
                Arc::new(ConsoleFormatter::default()),
                IndentSettings::none(),
            ),
            ChannelKind::TextLog => (
                Threshold::Info,
                true,
                Arc::new(LogLineFormatter::timestamped()),
                IndentSettings::none(),
            ),
            ChannelKind::TextLogger => (
                Threshold::Info,
                true,
                Arc::new(LogLineFormatter::default()),
                IndentSettings::default(),
            ),
            ChannelKind::Trace => (
                Threshold::Warning,
                false,
                Arc::new(LogLineFormatter::default()),
                IndentSettings::none(),
            ),
        };
        let default_sink = match kind {
            ChannelKind::Console => Sink::attach(SinkTarget::Stdout, false, None).ok(),
            _ => None,
        };
        Self {
            kind,
            threshold,
            enabled,
            default_sink,
            extra_sinks: Vec::new(),
            location_assembler: default_location_assembler(),
            message_assembler: default_message_assembler(),
            formatter,
            indent,
            intro: IntroSettings::default(),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: Threshold) {
        self.threshold = threshold;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Effective enablement: the channel is on and `kind` clears the threshold.
    pub fn enabled_for(&self, kind: EventKind) -> bool {
        self.enabled && passes(kind, self.threshold)
    }

    /// Whether the threshold is at least `level`.
    pub fn enabled_at(&self, level: Threshold) -> bool {
        self.threshold >= level
    }

    /// Raises the threshold to `level` when enabling, lowers it just below
    /// `level` when disabling. Never moves it the other way.
    pub fn set_enabled_at(&mut self, level: Threshold, on: bool) {
        self.threshold = if on {
            self.threshold.raised_to(level)
        } else {
            self.threshold.lowered_below(level)
        };
    }

    /// `None` restores the default assembler.
    pub fn set_location_assembler(&mut self, assembler: Option<Assembler>) {
        self.location_assembler = assembler.unwrap_or_else(default_location_assembler);
    }

    /// `None` restores the default assembler.
    pub fn set_message_assembler(&mut self, assembler: Option<Assembler>) {
        self.message_assembler = assembler.unwrap_or_else(default_message_assembler);
    }

    pub fn set_formatter(&mut self, formatter: Arc<dyn LineFormatter>) {
        self.formatter = formatter;
    }

    pub fn indent(&self) -> &IndentSettings {
        &self.indent
    }

    pub fn indent_mut(&mut self) -> &mut IndentSettings {
        &mut self.indent
    }

    pub fn intro(&self) -> &IntroSettings {
        &self.intro
    }

    pub fn intro_mut(&mut self) -> &mut IntroSettings {
        &mut self.intro
    }

    fn has_identity(&self, identity: &SinkIdentity) -> bool {
        self.all_sinks().any(|s| s.identity() == identity)
    }

    fn all_sinks(&self) -> impl Iterator<Item = &Sink> {
        self.default_sink.iter().chain(self.extra_sinks.iter())
    }

    fn all_sinks_mut(&mut self) -> impl Iterator<Item = &mut Sink> {
        self.default_sink.iter_mut().chain(self.extra_sinks.iter_mut())
    }

    pub fn sink_count(&self) -> usize {
        self.all_sinks().count()
    }

    pub fn extra_sink_count(&self) -> usize {
        self.extra_sinks.len()
    }

    pub fn has_sink(&self, identity: &SinkIdentity) -> bool {
        self.has_identity(identity)
    }

    pub fn default_sink_identity(&self) -> Option<&SinkIdentity> {
        self.default_sink.as_ref().map(Sink::identity)
    }

    pub fn sink_identities(&self) -> Vec<SinkIdentity> {
        self.all_sinks().map(|s| s.identity().clone()).collect()
    }

    /// Replaces the default sink. Re-setting the current default is a no-op;
    /// a target already attached as an extra sink is rejected.
    pub fn set_default_sink(&mut self, target: SinkTarget, owns: bool) -> Result<(), ReportError> {
        let identity = target.identity();
        if self.default_sink_identity() == Some(&identity) {
            return Ok(());
        }
        if self.extra_sinks.iter().any(|s| s.identity() == &identity) {
            return Err(ReportError::DuplicateSink {
                channel: self.kind,
                identity,
            });
        }
        let sink = Sink::attach(target, owns, self.intro.banner(Local::now()).as_deref())?;
        if let Some(mut old) = self.default_sink.replace(sink) {
            if let Err(err) = old.close() {
                warn!(channel = %self.kind, error = %err, "closing replaced default sink failed");
            }
        }
        Ok(())
    }

    pub fn clear_default_sink(&mut self) -> Result<(), ReportError> {
        match self.default_sink.take() {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        }
    }

    /// Appends an extra sink. Identities must be unique on the channel; the
    /// duplicate check runs before the target is opened.
    pub fn add_sink(
        &mut self,
        target: SinkTarget,
        owns: bool,
    ) -> Result<SinkIdentity, ReportError> {
        let identity = target.identity();
        if self.has_identity(&identity) {
            return Err(ReportError::DuplicateSink {
                channel: self.kind,
                identity,
            });
        }
        let sink = Sink::attach(target, owns, self.intro.banner(Local::now()).as_deref())?;
        self.extra_sinks.push(sink);
        Ok(identity)
    }

    /// Detaches and closes the sink with `identity`, default sink included.
    pub fn remove_sink(&mut self, identity: &SinkIdentity) -> Result<(), ReportError> {
        if let Some(pos) = self.extra_sinks.iter().position(|s| s.identity() == identity) {
            return self.extra_sinks.remove(pos).close();
        }
        if self.default_sink_identity() == Some(identity) {
            return self.clear_default_sink();
        }
        Err(ReportError::SinkNotFound {
            channel: self.kind,
            identity: identity.clone(),
        })
    }

    /// Detaches every sink. All sinks are closed even if some fail; the first
    /// failure is returned.
    pub fn remove_all_sinks(&mut self) -> Result<(), ReportError> {
        self.close_all().into_iter().next().map_or(Ok(()), Err)
    }

    /// Assembles, formats and fans the record out to every sink.
    ///
    /// Sink failures are counted, not returned; a failing sink never stops the
    /// remaining ones. `Err` means the pipeline itself failed before writing.
    pub fn dispatch(
        &mut self,
        record: &ReportRecord,
        depth: usize,
        timestamp: DateTime<Local>,
    ) -> Result<DispatchOutcome, ReportError> {
        let kind = self.kind;
        let location = guarded(kind, Phase::LocationAssembly, || {
            (self.location_assembler)(record)
        })?;
        let message = guarded(kind, Phase::MessageAssembly, || {
            (self.message_assembler)(record)
        })?;
        let ctx = LineContext {
            depth,
            indent: &self.indent,
            source_tag: self.intro.program_name.as_deref(),
            timestamp,
        };
        let formatter = &self.formatter;
        let line = guarded(kind, Phase::LineFormatting, || {
            formatter.format(record.kind(), &location, &message, &ctx)
        })?;
        Ok(self.fan_out(&line))
    }

    /// Writes `text` to every sink regardless of enablement or threshold.
    pub(crate) fn fan_out(&mut self, text: &str) -> DispatchOutcome {
        let kind = self.kind;
        let mut outcome = DispatchOutcome::default();
        for sink in self.all_sinks_mut() {
            let result = match panic::catch_unwind(AssertUnwindSafe(|| sink.write(text))) {
                Ok(result) => result,
                Err(payload) => Err(ReportError::HookPanicked {
                    channel: kind,
                    phase: Phase::Writing,
                    message: panic_message(payload.as_ref()),
                }),
            };
            match result {
                Ok(()) => outcome.written += 1,
                Err(err) => {
                    warn!(channel = %kind, error = %err, "sink write failed");
                    outcome.failed += 1;
                    outcome.last_error = Some(err.to_string());
                }
            }
        }
        outcome
    }

    /// Flushes every sink; the first failure is returned after all were tried.
    pub fn flush(&mut self) -> Result<(), ReportError> {
        let mut first = None;
        for sink in self.all_sinks_mut() {
            if let Err(err) = sink.flush() {
                first.get_or_insert(err);
            }
        }
        first.map_or(Ok(()), Err)
    }

    /// Closes and drops every sink, returning all close failures.
    pub(crate) fn close_all(&mut self) -> Vec<ReportError> {
        let mut errors = Vec::new();
        for mut sink in self.default_sink.take().into_iter().chain(self.extra_sinks.drain(..)) {
            if let Err(err) = sink.close() {
                errors.push(err);
            }
        }
        errors
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind)
            .field("threshold", &self.threshold)
            .field("enabled", &self.enabled)
            .field("sinks", &self.sink_identities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::*;

    fn text_log() -> Channel {
        Channel::new(ChannelKind::TextLogger)
    }

    fn dispatch(ch: &mut Channel, rec: &ReportRecord) -> Result<DispatchOutcome, ReportError> {
        ch.dispatch(rec, 0, Local::now())
    }

    #[test]
    fn defaults_per_family() {
        let console = Channel::new(ChannelKind::Console);
        assert_eq!(console.default_sink_identity(), Some(&SinkIdentity::Stdout));
        assert_eq!(console.threshold(), Threshold::Warning);
        let trace = Channel::new(ChannelKind::Trace);
        assert!(!trace.is_enabled());
        assert_eq!(trace.sink_count(), 0);
    }

    #[test]
    fn disabling_overrides_threshold() {
        let mut ch = text_log();
        ch.set_threshold(Threshold::Verbose);
        assert!(ch.enabled_for(EventKind::Undefined));
        ch.set_enabled(false);
        assert!(!ch.enabled_for(EventKind::Error));
    }

    #[test]
    fn enabled_at_moves_threshold_one_way() {
        let mut ch = text_log();
        ch.set_threshold(Threshold::Error);
        ch.set_enabled_at(Threshold::Info, true);
        assert_eq!(ch.threshold(), Threshold::Info);
        ch.set_enabled_at(Threshold::Warning, true);
        assert_eq!(ch.threshold(), Threshold::Info);
        ch.set_enabled_at(Threshold::Warning, false);
        assert_eq!(ch.threshold(), Threshold::Error);
        assert!(!ch.enabled_at(Threshold::Warning));
        ch.set_enabled_at(Threshold::Info, false);
        assert_eq!(ch.threshold(), Threshold::Error);
        ch.set_enabled_at(Threshold::Error, false);
        assert_eq!(ch.threshold(), Threshold::Off);
    }

    #[test]
    fn dispatch_writes_indented_line() {
        let buf = text_buffer();
        let mut ch = text_log();
        ch.add_sink(SinkTarget::text(buf.clone()), false).unwrap();
        let outcome = ch
            .dispatch(&ReportRecord::info("io", "opened"), 2, Local::now())
            .unwrap();
        assert_eq!(outcome.written, 1);
        assert_eq!(*buf.lock(), "    Info in io: opened\n");
    }

    #[test]
    fn fan_out_isolates_failing_sink() {
        let good = text_buffer();
        let mut ch = text_log();
        ch.add_sink(SinkTarget::stream(broken_stream()), false).unwrap();
        ch.add_sink(SinkTarget::text(good.clone()), false).unwrap();
        let outcome = dispatch(&mut ch, &ReportRecord::error("x", "still delivered")).unwrap();
        assert_eq!((outcome.written, outcome.failed), (1, 1));
        assert!(!outcome.is_total_failure());
        assert!(good.lock().contains("still delivered"));
    }

    #[test]
    fn all_sinks_failing_is_total_failure() {
        let mut ch = text_log();
        ch.add_sink(SinkTarget::stream(broken_stream()), false).unwrap();
        let outcome = dispatch(&mut ch, &ReportRecord::error("x", "lost")).unwrap();
        assert!(outcome.is_total_failure());
        assert!(outcome.last_error.unwrap().contains("pipe closed"));
    }

    #[test]
    fn no_sinks_is_not_a_failure() {
        let mut ch = text_log();
        let outcome = dispatch(&mut ch, &ReportRecord::error("x", "nowhere")).unwrap();
        assert_eq!(outcome, DispatchOutcome::default());
        assert!(!outcome.is_total_failure());
    }

    #[test]
    fn duplicate_file_is_rejected_before_opening() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dup.log");
        let mut ch = text_log();
        ch.add_sink(SinkTarget::file(&path, false), true).unwrap();
        dispatch(&mut ch, &ReportRecord::info("a", "kept")).unwrap();

        let err = ch.add_sink(SinkTarget::file(&path, false), true).unwrap_err();
        assert!(matches!(err, ReportError::DuplicateSink { .. }));
        assert_eq!(ch.extra_sink_count(), 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("kept"));
    }

    #[test]
    fn remove_by_identity() {
        let buf = text_buffer();
        let mut ch = text_log();
        let id = ch.add_sink(SinkTarget::text(buf), false).unwrap();
        assert!(ch.has_sink(&id));
        ch.remove_sink(&id).unwrap();
        assert!(!ch.has_sink(&id));
        assert!(matches!(
            ch.remove_sink(&id),
            Err(ReportError::SinkNotFound { .. })
        ));
    }

    #[test]
    fn default_sink_replacement_and_removal() {
        let first = text_buffer();
        let second = text_buffer();
        let mut ch = text_log();
        ch.set_default_sink(SinkTarget::text(first.clone()), false).unwrap();
        ch.set_default_sink(SinkTarget::text(first.clone()), false).unwrap();
        assert_eq!(ch.sink_count(), 1);
        ch.set_default_sink(SinkTarget::text(second.clone()), false).unwrap();
        dispatch(&mut ch, &ReportRecord::info("a", "b")).unwrap();
        assert!(first.lock().is_empty());
        assert!(!second.lock().is_empty());

        let extra = text_buffer();
        ch.add_sink(SinkTarget::text(extra.clone()), false).unwrap();
        assert!(matches!(
            ch.set_default_sink(SinkTarget::text(extra), false),
            Err(ReportError::DuplicateSink { .. })
        ));
        ch.remove_all_sinks().unwrap();
        assert_eq!(ch.sink_count(), 0);
    }

    #[test]
    fn failing_assembler_names_phase() {
        let mut ch = text_log();
        ch.set_message_assembler(Some(Arc::new(
            |_: &ReportRecord| -> Result<String, ReportError> {
                Err(ReportError::hook("no message"))
            },
        )));
        let err = dispatch(&mut ch, &ReportRecord::error("a", "b")).unwrap_err();
        assert!(matches!(
            err,
            ReportError::Dispatch {
                phase: Phase::MessageAssembly,
                ..
            }
        ));
        ch.set_message_assembler(None);
        assert!(dispatch(&mut ch, &ReportRecord::error("a", "b")).is_ok());
    }

    struct PanickingFormatter;

    impl LineFormatter for PanickingFormatter {
        fn format(
            &self,
            _: EventKind,
            _: &str,
            _: &str,
            _: &LineContext<'_>,
        ) -> Result<String, ReportError> {
            panic!("formatter exploded")
        }
    }

    #[test]
    fn panicking_formatter_is_contained() {
        let mut ch = text_log();
        ch.set_formatter(Arc::new(PanickingFormatter));
        let err = dispatch(&mut ch, &ReportRecord::error("a", "b")).unwrap_err();
        match err {
            ReportError::HookPanicked { phase, message, .. } => {
                assert_eq!(phase, Phase::LineFormatting);
                assert_eq!(message, "formatter exploded");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn intro_banner_reaches_new_sinks() {
        let buf = text_buffer();
        let mut ch = text_log();
        ch.intro_mut().write_intro = true;
        ch.intro_mut().program_name = Some("demo".into());
        ch.add_sink(SinkTarget::text(buf.clone()), false).unwrap();
        dispatch(&mut ch, &ReportRecord::info("a", "b")).unwrap();
        let text = buf.lock().clone();
        assert!(text.starts_with("==== demo log started at"));
        assert!(text.ends_with("Info in a: b [demo]\n"));
    }
}
