//! Typed snapshot of one configuration group.

use rapport_config::{ConfigError, ConfigSource, TypedConfig};

use super::keys::{self, FileKeys};
use crate::severity::Threshold;

/// File and intro settings of one persistent text channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileSettings {
    pub append: Option<bool>,
    pub file: Option<String>,
    pub file_extra: Option<Vec<String>>,
    pub write_intro: Option<bool>,
    pub program_name: Option<String>,
    pub intro_text: Option<String>,
}

/// Every recognized key of a group; `None` means the key was absent or failed
/// to parse.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupSettings {
    pub warn_on_duplicate_config_apply: Option<bool>,
    pub level_on: Option<Threshold>,
    pub level_off: Option<Threshold>,
    pub reporting_level: Option<Threshold>,
    pub logging_level: Option<Threshold>,
    pub tracing_level: Option<Threshold>,
    pub use_console: Option<bool>,
    pub use_text_log: Option<bool>,
    pub use_text_logger: Option<bool>,
    pub use_trace: Option<bool>,
    pub text_log: FileSettings,
    pub text_logger: FileSettings,
    pub indent_initial: Option<usize>,
    pub indent_spacing: Option<usize>,
    pub indent_character: Option<char>,
}

/// A key that was present but could not be read.
#[derive(Debug)]
pub struct KeyFailure {
    pub key: String,
    pub error: ConfigError,
}

/// Result of reading a group: the values, the qualified keys that were
/// present, and the keys that failed.
#[derive(Debug, Default)]
pub struct GroupRead {
    pub settings: GroupSettings,
    pub present: Vec<String>,
    pub failures: Vec<KeyFailure>,
}

struct GroupReader<'a> {
    source: &'a dyn ConfigSource,
    group: &'a str,
    present: Vec<String>,
    failures: Vec<KeyFailure>,
}

impl<'a> GroupReader<'a> {
    fn read<T>(
        &mut self,
        key: &str,
        get: impl FnOnce(&dyn ConfigSource, &str) -> Result<Option<T>, ConfigError>,
    ) -> Option<T> {
        let key = keys::qualified(self.group, key);
        match get(self.source, &key) {
            Ok(Some(value)) => {
                self.present.push(key);
                Some(value)
            }
            Ok(None) => None,
            Err(error) => {
                self.failures.push(KeyFailure { key, error });
                None
            }
        }
    }

    fn threshold(&mut self, key: &str) -> Option<Threshold> {
        self.read(key, |s, k| s.get_parsed::<Threshold>(k))
    }

    fn flag(&mut self, key: &str) -> Option<bool> {
        self.read(key, |s, k| s.get_bool(k))
    }

    fn text(&mut self, key: &str) -> Option<String> {
        self.read(key, |s, k| s.get_string(k))
    }

    fn files(&mut self, keys: &FileKeys) -> FileSettings {
        FileSettings {
            append: self.flag(keys.append),
            file: self.text(keys.file).filter(|p| !p.trim().is_empty()),
            file_extra: self.read(keys.file_extra, |s, k| s.get_list(k)),
            write_intro: self.flag(keys.write_intro),
            program_name: self.text(keys.program_name),
            intro_text: self.text(keys.intro_text),
        }
    }
}

impl GroupSettings {
    /// Reads every recognized key of `group`. A failing key is recorded and
    /// left unset; the remaining keys are still read.
    pub fn read(source: &dyn ConfigSource, group: &str) -> GroupRead {
        let mut r = GroupReader {
            source,
            group,
            present: Vec::new(),
            failures: Vec::new(),
        };
        let settings = GroupSettings {
            warn_on_duplicate_config_apply: r.flag(keys::WARN_ON_DUPLICATE_CONFIG_APPLY),
            level_on: r.threshold(keys::LEVEL_ON),
            level_off: r.threshold(keys::LEVEL_OFF),
            reporting_level: r.threshold(keys::REPORTING_LEVEL),
            logging_level: r.threshold(keys::LOGGING_LEVEL),
            tracing_level: r.threshold(keys::TRACING_LEVEL),
            use_console: r.flag(keys::USE_CONSOLE),
            use_text_log: r.flag(keys::USE_TEXT_LOG),
            use_text_logger: r.flag(keys::USE_TEXT_LOGGER),
            use_trace: r.flag(keys::USE_TRACE),
            text_log: r.files(&keys::TEXT_LOG),
            text_logger: r.files(&keys::TEXT_LOGGER),
            indent_initial: r.read(keys::TEXT_LOGGER_INDENT_INITIAL, |s, k| s.get_uint(k)),
            indent_spacing: r.read(keys::TEXT_LOGGER_INDENT_SPACING, |s, k| s.get_uint(k)),
            indent_character: r.read(keys::TEXT_LOGGER_INDENT_CHARACTER, |s, k| s.get_char(k)),
        };
        GroupRead {
            settings,
            present: r.present,
            failures: r.failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapport_config::MapSource;

    #[test]
    fn reads_only_present_keys() {
        let source = MapSource::from_pairs([
            ("g.reporting-level", "error"),
            ("g.use-trace", "yes"),
            ("g.text-log-file-extra", "a.log; b.log"),
            ("g.text-logger-indent-character", "tab"),
        ]);
        let read = GroupSettings::read(&source, "g");
        assert!(read.failures.is_empty());
        assert_eq!(read.present.len(), 4);
        let s = read.settings;
        assert_eq!(s.reporting_level, Some(Threshold::Error));
        assert_eq!(s.use_trace, Some(true));
        assert_eq!(
            s.text_log.file_extra,
            Some(vec!["a.log".to_string(), "b.log".to_string()])
        );
        assert_eq!(s.indent_character, Some('\t'));
        assert_eq!(s.logging_level, None);
    }

    #[test]
    fn malformed_key_does_not_stop_the_rest() {
        let source = MapSource::from_pairs([
            ("logging-level", "loud"),
            ("use-console", "perhaps"),
            ("tracing-level", "info"),
        ]);
        let read = GroupSettings::read(&source, "");
        let failed: Vec<_> = read.failures.iter().map(|f| f.key.as_str()).collect();
        assert_eq!(failed, ["logging-level", "use-console"]);
        assert_eq!(read.settings.tracing_level, Some(Threshold::Info));
    }
}
