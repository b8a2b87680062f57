//! ## rapport-core::severity
//! **Event kinds, channel thresholds and the rule between them**
//!
//! Both enumerations are ordinal. An [`EventKind`] passes a [`Threshold`] when
//! the threshold is at least the kind's required level:
//!
//! | kind        | needs threshold ≥ |
//! |-------------|-------------------|
//! | `Error`     | `Error`           |
//! | `Warning`   | `Warning`         |
//! | `Info`      | `Info`            |
//! | `Undefined` | `Verbose`         |

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Severity of a reported event. `Error` has the highest priority.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum EventKind {
    Error,
    Warning,
    Info,
    Undefined,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Error,
        EventKind::Warning,
        EventKind::Info,
        EventKind::Undefined,
    ];

    /// Lowest threshold at which this kind is emitted.
    pub fn required_threshold(self) -> Threshold {
        match self {
            EventKind::Error => Threshold::Error,
            EventKind::Warning => Threshold::Warning,
            EventKind::Info => Threshold::Info,
            EventKind::Undefined => Threshold::Verbose,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EventKind::Error => "Error",
            EventKind::Warning => "Warning",
            EventKind::Info => "Info",
            EventKind::Undefined => "Undefined",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Minimum severity a channel emits. `Off` lets nothing through, `Verbose` everything.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub enum Threshold {
    Off,
    Error,
    #[default]
    Warning,
    Info,
    Verbose,
}

impl Threshold {
    pub const ALL: [Threshold; 5] = [
        Threshold::Off,
        Threshold::Error,
        Threshold::Warning,
        Threshold::Info,
        Threshold::Verbose,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(ordinal: u8) -> Option<Threshold> {
        Self::ALL.get(ordinal as usize).copied()
    }

    /// The next lower threshold, saturating at `Off`.
    pub fn pred(self) -> Threshold {
        Self::from_ordinal(self.ordinal().saturating_sub(1)).unwrap_or(Threshold::Off)
    }

    /// `self`, raised to `level` if currently lower.
    pub fn raised_to(self, level: Threshold) -> Threshold {
        self.max(level)
    }

    /// `self`, lowered to just below `level` if currently at or above it.
    pub fn lowered_below(self, level: Threshold) -> Threshold {
        if self >= level {
            level.pred()
        } else {
            self
        }
    }

    /// Lowest threshold that lets `kind` through.
    pub fn lowest_enabling(kind: EventKind) -> Threshold {
        kind.required_threshold()
    }

    pub fn passes(self, kind: EventKind) -> bool {
        passes(kind, self)
    }

    pub fn label(self) -> &'static str {
        match self {
            Threshold::Off => "off",
            Threshold::Error => "error",
            Threshold::Warning => "warning",
            Threshold::Info => "info",
            Threshold::Verbose => "verbose",
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown threshold '{0}'")]
pub struct ParseThresholdError(pub String);

impl FromStr for Threshold {
    type Err = ParseThresholdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(ordinal) = trimmed.parse::<u8>() {
            return Self::from_ordinal(ordinal).ok_or_else(|| ParseThresholdError(s.to_string()));
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "off" | "none" => Ok(Threshold::Off),
            "error" | "errors" => Ok(Threshold::Error),
            "warning" | "warnings" | "warn" => Ok(Threshold::Warning),
            "info" => Ok(Threshold::Info),
            "verbose" | "all" => Ok(Threshold::Verbose),
            _ => Err(ParseThresholdError(s.to_string())),
        }
    }
}

/// Whether an event of `kind` clears `threshold`.
pub fn passes(kind: EventKind, threshold: Threshold) -> bool {
    threshold >= kind.required_threshold()
}
