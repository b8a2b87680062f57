//! ## rapport-core::config
//! **Named configuration groups applied onto a reporter**
//!
//! A [`ConfigLoader`] reads the recognized keys of one group from any
//! [`ConfigSource`] and applies the values that are present. Groups are
//! remembered by name on the reporter so that applying one twice is a no-op
//! unless forced.
//!
//! Application order within a group: warning flag, levels, `level-on` and
//! `level-off`, channel enablement, indentation, intro settings, then files.
//! Intro settings come before files so that newly opened logs get the banner.

pub mod keys;
mod settings;

use std::path::PathBuf;
use std::sync::Arc;

use rapport_config::ConfigSource;
use tracing::{debug, warn};

use crate::channel::ChannelKind;
use crate::error::ReportError;
use crate::record::ReportRecord;
use crate::reporter::{Reporter, ReporterInner};
use crate::severity::EventKind;
use crate::sink::SinkTarget;

pub use settings::{FileSettings, GroupRead, GroupSettings, KeyFailure};

/// What [`ConfigLoader::apply_group`] did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GroupOutcome {
    /// The group had been applied before and was not re-applied.
    Skipped,
    /// Qualified keys that took effect and keys that failed.
    Applied {
        applied: Vec<String>,
        failed: Vec<String>,
    },
}

impl GroupOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, GroupOutcome::Applied { .. })
    }
}

#[derive(Clone)]
pub struct ConfigLoader {
    source: Arc<dyn ConfigSource>,
}

impl ConfigLoader {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    pub fn from_source<S: ConfigSource + 'static>(source: S) -> Self {
        Self::new(Arc::new(source))
    }

    pub fn source(&self) -> &dyn ConfigSource {
        self.source.as_ref()
    }

    /// Reads `group` without applying it.
    pub fn read_group(&self, group: &str) -> GroupRead {
        GroupSettings::read(self.source.as_ref(), group)
    }

    /// Applies `group` to `reporter` under the reporter's lock.
    ///
    /// With `only_once`, a group already applied is skipped. Either way a
    /// repeated application warns unless the reporter's
    /// `warn_on_duplicate_config_apply` flag is off. Each failing key is
    /// routed to the reserve path and the rest of the group still applies.
    pub fn apply_group(
        &self,
        reporter: &Reporter,
        group: &str,
        only_once: bool,
    ) -> Result<GroupOutcome, ReportError> {
        reporter.locked(|inner| {
            if inner.applied_groups.contains(group) {
                if inner.warn_on_duplicate_config_apply {
                    let record = ReportRecord::new(
                        EventKind::Warning,
                        Some("ConfigLoader::apply_group"),
                        Some(if only_once {
                            "group skipped"
                        } else {
                            "group re-applied"
                        }),
                        None,
                    );
                    reporter.reserve_locked(
                        inner,
                        &record,
                        &ReportError::DuplicateConfigGroup(group.to_string()),
                    );
                }
                if only_once {
                    debug!(group, "configuration group already applied");
                    return GroupOutcome::Skipped;
                }
            }

            let read = self.read_group(group);
            let mut failed = Vec::new();
            for failure in read.failures {
                let record = ReportRecord::new(
                    EventKind::Warning,
                    Some("ConfigLoader::apply_group"),
                    Some("configuration key ignored"),
                    None,
                );
                let err = ReportError::ConfigKey {
                    key: failure.key.clone(),
                    source: failure.error,
                };
                reporter.reserve_locked(inner, &record, &err);
                failed.push(failure.key);
            }

            failed.extend(apply_settings(reporter, inner, group, &read.settings));
            let applied: Vec<String> = read
                .present
                .into_iter()
                .filter(|key| !failed.contains(key))
                .collect();
            inner.applied_groups.insert(group.to_string());
            debug!(
                group,
                applied = applied.len(),
                failed = failed.len(),
                "configuration group applied"
            );
            GroupOutcome::Applied { applied, failed }
        })
    }
}

impl std::fmt::Debug for ConfigLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigLoader").finish_non_exhaustive()
    }
}

/// Applies present values; returns the qualified keys whose effect failed.
fn apply_settings(
    reporter: &Reporter,
    inner: &mut ReporterInner,
    group: &str,
    s: &GroupSettings,
) -> Vec<String> {
    if let Some(warn) = s.warn_on_duplicate_config_apply {
        inner.warn_on_duplicate_config_apply = warn;
    }

    if let Some(level) = s.reporting_level {
        inner.channel_mut(ChannelKind::Console).set_threshold(level);
    }
    if let Some(level) = s.logging_level {
        inner.channel_mut(ChannelKind::TextLog).set_threshold(level);
        inner.channel_mut(ChannelKind::TextLogger).set_threshold(level);
    }
    if let Some(level) = s.tracing_level {
        inner.channel_mut(ChannelKind::Trace).set_threshold(level);
    }
    if let Some(level) = s.level_on {
        for channel in inner.channels.iter_mut() {
            channel.set_enabled_at(level, true);
        }
    }
    if let Some(level) = s.level_off {
        for channel in inner.channels.iter_mut() {
            channel.set_enabled_at(level, false);
        }
    }

    for (kind, flag) in [
        (ChannelKind::Console, s.use_console),
        (ChannelKind::TextLog, s.use_text_log),
        (ChannelKind::TextLogger, s.use_text_logger),
        (ChannelKind::Trace, s.use_trace),
    ] {
        if let Some(on) = flag {
            inner.channel_mut(kind).set_enabled(on);
        }
    }

    let indent = inner.channel_mut(ChannelKind::TextLogger).indent_mut();
    if let Some(initial) = s.indent_initial {
        indent.initial = initial;
    }
    if let Some(spacing) = s.indent_spacing {
        indent.spacing = spacing;
    }
    if let Some(character) = s.indent_character {
        indent.character = character;
    }

    let mut failed = Vec::new();
    for (kind, files, file_keys) in [
        (ChannelKind::TextLog, &s.text_log, &keys::TEXT_LOG),
        (ChannelKind::TextLogger, &s.text_logger, &keys::TEXT_LOGGER),
    ] {
        let intro = inner.channel_mut(kind).intro_mut();
        if let Some(write) = files.write_intro {
            intro.write_intro = write;
        }
        if let Some(name) = &files.program_name {
            intro.program_name = Some(name.clone()).filter(|n| !n.is_empty());
        }
        if let Some(text) = &files.intro_text {
            intro.intro_text = Some(text.clone()).filter(|t| !t.is_empty());
        }

        let append = files.append.unwrap_or(false);
        if let Some(path) = &files.file {
            let target = SinkTarget::file(PathBuf::from(path.trim()), append);
            if let Err(err) = inner.channel_mut(kind).set_default_sink(target, true) {
                route_file_error(reporter, inner, &err);
                failed.push(keys::qualified(group, file_keys.file));
            }
        }
        for path in files.file_extra.iter().flatten() {
            let target = SinkTarget::file(PathBuf::from(path), append);
            if let Err(err) = inner.channel_mut(kind).add_sink(target, true) {
                route_file_error(reporter, inner, &err);
                let key = keys::qualified(group, file_keys.file_extra);
                if !failed.contains(&key) {
                    failed.push(key);
                }
            }
        }
    }
    failed
}

fn route_file_error(reporter: &Reporter, inner: &mut ReporterInner, err: &ReportError) {
    warn!(error = %err, "configured log file not attached");
    let kind = match err {
        ReportError::DuplicateSink { .. } => EventKind::Warning,
        _ => EventKind::Error,
    };
    let record = ReportRecord::new(
        kind,
        Some("ConfigLoader::apply_group"),
        Some("configured log file not attached"),
        None,
    );
    reporter.reserve_locked(inner, &record, err);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Threshold;
    use crate::sink::test_support::text_buffer;
    use rapport_config::MapSource;

    fn quiet_reporter() -> Reporter {
        let reporter = Reporter::new();
        reporter.remove_all_sinks(ChannelKind::Console).unwrap();
        reporter
    }

    #[test]
    fn applies_levels_and_enablement() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([
            ("reporting-level", "error"),
            ("logging-level", "verbose"),
            ("use-trace", "true"),
            ("tracing-level", "info"),
            ("text-logger-indent-spacing", "4"),
            ("text-logger-indent-character", "."),
        ]));
        let reporter = quiet_reporter();
        let outcome = loader.apply_group(&reporter, "", true).unwrap();
        match outcome {
            GroupOutcome::Applied { applied, failed } => {
                assert_eq!(applied.len(), 6);
                assert!(failed.is_empty());
            }
            GroupOutcome::Skipped => panic!("group was not applied"),
        }
        assert_eq!(reporter.reporting_level(), Threshold::Error);
        assert_eq!(reporter.threshold(ChannelKind::TextLogger), Threshold::Verbose);
        assert!(reporter.is_enabled(ChannelKind::Trace));
        assert_eq!(reporter.tracing_level(), Threshold::Info);
        let indent = reporter
            .with_channel(ChannelKind::TextLogger, |ch| ch.indent().clone())
            .unwrap();
        assert_eq!((indent.spacing, indent.character), (4, '.'));
        assert!(reporter.is_group_applied(""));
    }

    #[test]
    fn second_application_is_a_no_op() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([(
            "g.logging-level",
            "error",
        )]));
        let reporter = quiet_reporter();
        assert!(loader.apply_group(&reporter, "g", true).unwrap().is_applied());
        reporter.set_logging_level(Threshold::Info);

        let again = loader.apply_group(&reporter, "g", true).unwrap();
        assert_eq!(again, GroupOutcome::Skipped);
        assert_eq!(reporter.logging_level(), Threshold::Info);
        assert_eq!(reporter.reserve_count(), 1);
        assert_eq!(reporter.applied_groups(), vec!["g".to_string()]);
    }

    #[test]
    fn duplicate_warning_can_be_suppressed() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([(
            "warn-on-duplicate-config-apply",
            "off",
        )]));
        let reporter = quiet_reporter();
        loader.apply_group(&reporter, "", true).unwrap();
        assert!(!reporter.warn_on_duplicate_config_apply());
        assert_eq!(
            loader.apply_group(&reporter, "", true).unwrap(),
            GroupOutcome::Skipped
        );
        assert_eq!(reporter.reserve_count(), 0);
    }

    #[test]
    fn forced_reapplication_applies_again() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([(
            "reporting-level",
            "info",
        )]));
        let reporter = quiet_reporter();
        reporter.set_warn_on_duplicate_config_apply(false);
        loader.apply_group(&reporter, "", true).unwrap();
        reporter.set_reporting_level(Threshold::Off);
        assert!(loader.apply_group(&reporter, "", false).unwrap().is_applied());
        assert_eq!(reporter.reporting_level(), Threshold::Info);
    }

    #[test]
    fn bad_key_is_reserved_and_skipped() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([
            ("reporting-level", "loud"),
            ("logging-level", "error"),
        ]));
        let reporter = quiet_reporter();
        let log = text_buffer();
        reporter
            .add_sink(ChannelKind::TextLogger, SinkTarget::text(log.clone()))
            .unwrap();
        let outcome = loader.apply_group(&reporter, "", true).unwrap();
        assert_eq!(
            outcome,
            GroupOutcome::Applied {
                applied: vec!["logging-level".into()],
                failed: vec!["reporting-level".into()],
            }
        );
        assert_eq!(reporter.reporting_level(), Threshold::Warning);
        assert_eq!(reporter.logging_level(), Threshold::Error);
        assert_eq!(reporter.reserve_count(), 1);
        assert!(log.lock().contains("reporting-level"));
    }

    #[test]
    fn level_on_and_off_touch_every_channel() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([
            ("on.level-on", "verbose"),
            ("off.level-off", "warning"),
        ]));
        let reporter = quiet_reporter();
        loader.apply_group(&reporter, "on", true).unwrap();
        for kind in ChannelKind::ALL {
            assert_eq!(reporter.threshold(kind), Threshold::Verbose, "{kind}");
        }
        loader.apply_group(&reporter, "off", true).unwrap();
        for kind in ChannelKind::ALL {
            assert_eq!(reporter.threshold(kind), Threshold::Error, "{kind}");
        }
    }

    #[test]
    fn files_get_intro_and_source_tag() {
        let dir = tempfile::tempdir().unwrap();
        let main = dir.path().join("main.log");
        let extra = dir.path().join("extra.log");
        let extras = format!("{};{}", extra.display(), main.display());
        let loader = ConfigLoader::from_source(MapSource::from_pairs([
            ("Global.text-log-file", main.display().to_string()),
            ("Global.text-log-file-extra", extras),
            ("Global.text-log-write-intro", "yes".to_string()),
            ("Global.text-log-program-name", "demo".to_string()),
        ]));
        let reporter = quiet_reporter();
        let outcome = loader.apply_group(&reporter, "Global", true).unwrap();
        let GroupOutcome::Applied { failed, .. } = outcome else {
            panic!("group was not applied");
        };
        // The main file is already the default sink, so listing it again fails.
        assert_eq!(failed, vec!["Global.text-log-file-extra".to_string()]);

        reporter.report_info("boot", "ready");
        reporter.dispose();
        for path in [&main, &extra] {
            let text = std::fs::read_to_string(path).unwrap();
            assert!(text.starts_with("==== demo log started at"), "{text}");
            assert!(text.contains("Info in boot: ready [demo]"), "{text}");
        }
    }
}
