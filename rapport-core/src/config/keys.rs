//! Recognized configuration keys, unqualified.
//!
//! A key `k` of group `g` is looked up as `g.k`; the empty group uses `k`.

pub const WARN_ON_DUPLICATE_CONFIG_APPLY: &str = "warn-on-duplicate-config-apply";

pub const LEVEL_ON: &str = "level-on";
pub const LEVEL_OFF: &str = "level-off";
pub const REPORTING_LEVEL: &str = "reporting-level";
pub const LOGGING_LEVEL: &str = "logging-level";
pub const TRACING_LEVEL: &str = "tracing-level";

pub const USE_CONSOLE: &str = "use-console";
pub const USE_TEXT_LOG: &str = "use-text-log";
pub const USE_TEXT_LOGGER: &str = "use-text-logger";
pub const USE_TRACE: &str = "use-trace";

pub const TEXT_LOGGER_INDENT_INITIAL: &str = "text-logger-indent-initial";
pub const TEXT_LOGGER_INDENT_SPACING: &str = "text-logger-indent-spacing";
pub const TEXT_LOGGER_INDENT_CHARACTER: &str = "text-logger-indent-character";

/// File and intro keys of one persistent text channel.
#[derive(Clone, Copy, Debug)]
pub struct FileKeys {
    pub append: &'static str,
    pub file: &'static str,
    pub file_extra: &'static str,
    pub write_intro: &'static str,
    pub program_name: &'static str,
    pub intro_text: &'static str,
}

pub const TEXT_LOG: FileKeys = FileKeys {
    append: "text-log-append",
    file: "text-log-file",
    file_extra: "text-log-file-extra",
    write_intro: "text-log-write-intro",
    program_name: "text-log-program-name",
    intro_text: "text-log-intro-text",
};

pub const TEXT_LOGGER: FileKeys = FileKeys {
    append: "text-logger-append",
    file: "text-logger-file",
    file_extra: "text-logger-file-extra",
    write_intro: "text-logger-write-intro",
    program_name: "text-logger-program-name",
    intro_text: "text-logger-intro-text",
};

/// Key of `key` within `group`.
pub fn qualified(group: &str, key: &str) -> String {
    if group.is_empty() {
        key.to_string()
    } else {
        format!("{group}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_group_is_unqualified() {
        assert_eq!(qualified("", USE_TRACE), "use-trace");
        assert_eq!(qualified("Global", USE_TRACE), "Global.use-trace");
    }
}
