use std::fmt;
use std::io;
use std::path::PathBuf;

use rapport_config::ConfigError;
use thiserror::Error;

use crate::channel::ChannelKind;
use crate::sink::SinkIdentity;

/// Step of a channel's pipeline that was running when it failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    LocationAssembly,
    MessageAssembly,
    LineFormatting,
    Writing,
    /// The synthetic failure raised by `Reporter::set_throw_test_exception`.
    SelfTest,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::LocationAssembly => "location assembly",
            Phase::MessageAssembly => "message assembly",
            Phase::LineFormatting => "line formatting",
            Phase::Writing => "writing",
            Phase::SelfTest => "self-test",
        })
    }
}

/// Failures of the reporting machinery itself.
///
/// None of these ever escape a `report*` call; they are routed to the
/// reserve path instead.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot open sink target {path}: {source}")]
    SinkOpen {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Sink {identity} write failed: {source}")]
    SinkWrite {
        identity: SinkIdentity,
        #[source]
        source: io::Error,
    },

    #[error("Sink {identity} flush failed: {source}")]
    SinkFlush {
        identity: SinkIdentity,
        #[source]
        source: io::Error,
    },

    #[error("Sink {0} is closed")]
    SinkClosed(SinkIdentity),

    #[error("Sink {identity} is already attached to the {channel} channel")]
    DuplicateSink {
        channel: ChannelKind,
        identity: SinkIdentity,
    },

    #[error("No sink {identity} on the {channel} channel")]
    SinkNotFound {
        channel: ChannelKind,
        identity: SinkIdentity,
    },

    #[error("{channel} channel failed during {phase}: {message}")]
    Dispatch {
        channel: ChannelKind,
        phase: Phase,
        message: String,
    },

    #[error("{channel} channel panicked during {phase}: {message}")]
    HookPanicked {
        channel: ChannelKind,
        phase: Phase,
        message: String,
    },

    #[error("Total failure of the {channel} channel: all {failed} sinks failed (last: {last})")]
    TotalChannelFailure {
        channel: ChannelKind,
        failed: usize,
        last: String,
    },

    #[error("Depth cannot be negative (requested {0}), clamped to 0")]
    NegativeDepth(i64),

    #[error("Configuration key '{key}' could not be applied: {source}")]
    ConfigKey {
        key: String,
        #[source]
        source: ConfigError,
    },

    #[error("Configuration group '{0}' has already been applied")]
    DuplicateConfigGroup(String),

    #[error("Re-entrant report while a dispatch is in progress")]
    Reentrant,

    #[error("Synthetic test failure raised after dispatch")]
    TestException,

    #[error("Reporter has been disposed")]
    Disposed,

    /// Free-form failure returned by a user-supplied assembler or formatter.
    #[error("{0}")]
    Hook(String),
}

impl ReportError {
    pub fn hook(message: impl Into<String>) -> Self {
        ReportError::Hook(message.into())
    }
}
