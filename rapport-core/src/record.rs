//! Immutable report records.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use crate::severity::EventKind;

/// Shared error value attached to a report as its cause.
pub type Cause = Arc<dyn Error + Send + Sync + 'static>;

/// Wraps any error into a [`Cause`].
pub fn cause<E: Error + Send + Sync + 'static>(err: E) -> Cause {
    Arc::new(err)
}

/// One report: what happened, where, and optionally why.
///
/// Records are never mutated once built; clones share the cause.
#[derive(Clone)]
pub struct ReportRecord {
    kind: EventKind,
    location: Option<String>,
    message: Option<String>,
    cause: Option<Cause>,
}

impl ReportRecord {
    pub fn new(
        kind: EventKind,
        location: Option<&str>,
        message: Option<&str>,
        cause: Option<Cause>,
    ) -> Self {
        Self {
            kind,
            location: location.map(str::to_string),
            message: message.map(str::to_string),
            cause,
        }
    }

    pub fn error(location: &str, message: &str) -> Self {
        Self::new(EventKind::Error, Some(location), Some(message), None)
    }

    pub fn warning(location: &str, message: &str) -> Self {
        Self::new(EventKind::Warning, Some(location), Some(message), None)
    }

    pub fn info(location: &str, message: &str) -> Self {
        Self::new(EventKind::Info, Some(location), Some(message), None)
    }

    pub fn with_cause(mut self, cause: Cause) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn cause(&self) -> Option<&Cause> {
        self.cause.as_ref()
    }
}

impl fmt::Debug for ReportRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReportRecord")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("message", &self.message)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}
