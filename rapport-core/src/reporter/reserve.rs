//! Last-resort reporting path.
//!
//! Used whenever ordinary dispatch fails. Every step is guarded on its own:
//! building the decorated text, falling back to a minimal text, writing to the
//! raw console and writing to every reachable sink. Nothing here may panic out
//! or return an error.

use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;

use tracing::error;

use super::{Reporter, ReporterInner};
use crate::error::ReportError;
use crate::format::escape_line_breaks;
use crate::record::{Cause, ReportRecord};
use crate::severity::EventKind;

pub(crate) const RESERVE_PREFIX: &str = "RESERVE REPORT";

/// Borrowed view of the report that could not be delivered.
#[derive(Clone, Copy)]
pub(crate) struct ReserveInput<'a> {
    pub kind: EventKind,
    pub location: Option<&'a str>,
    pub message: Option<&'a str>,
    pub cause: Option<&'a Cause>,
    pub failure: Option<&'a ReportError>,
}

impl<'a> ReserveInput<'a> {
    pub fn from_record(record: &'a ReportRecord, failure: &'a ReportError) -> Self {
        Self {
            kind: record.kind(),
            location: record.location(),
            message: record.message(),
            cause: record.cause(),
            failure: Some(failure),
        }
    }
}

fn decorated(input: &ReserveInput<'_>) -> String {
    let failure = input
        .failure
        .map(|f| f.to_string())
        .unwrap_or_else(|| "unspecified reporting failure".to_string());
    let mut out = format!("{RESERVE_PREFIX} ({failure}): {}", input.kind);
    if let Some(location) = input.location.filter(|l| !l.is_empty()) {
        out.push_str(" in ");
        out.push_str(location);
    }
    out.push_str(": ");
    out.push_str(input.message.unwrap_or("<no message>"));
    if let Some(cause) = input.cause {
        out.push_str(&format!(" (cause: {cause})"));
    }
    escape_line_breaks(&out)
}

/// Renders `value` unless its `Display` panics.
fn try_render(render: impl FnOnce() -> String) -> Option<String> {
    panic::catch_unwind(AssertUnwindSafe(render)).ok()
}

fn minimal(input: &ReserveInput<'_>) -> String {
    let mut out = String::from(RESERVE_PREFIX);
    out.push_str(" (details partly unavailable): ");
    out.push_str(input.kind.label());
    if let Some(location) = input.location {
        out.push_str(" in ");
        out.push_str(location);
    }
    out.push_str(": ");
    out.push_str(input.message.unwrap_or("<no message>"));
    if let Some(cause) = input.cause {
        let rendered = try_render(|| cause.to_string());
        out.push_str(" (cause: ");
        out.push_str(rendered.as_deref().unwrap_or("<unavailable>"));
        out.push(')');
    }
    if let Some(failure) = input.failure {
        let rendered = try_render(|| failure.to_string());
        out.push_str(" [failure: ");
        out.push_str(rendered.as_deref().unwrap_or("<unavailable>"));
        out.push(']');
    }
    escape_line_breaks(&out)
}

/// Steps (a) and (b): decorated text, else the minimal hand-built one.
pub(crate) fn compose(input: &ReserveInput<'_>) -> String {
    try_render(|| decorated(input)).unwrap_or_else(|| minimal(input))
}

/// Step (c): raw console, failures ignored.
fn write_console(text: &str) {
    let _ = writeln!(io::stderr().lock(), "{text}");
}

impl Reporter {
    /// Surfaces a failure of the reporting machinery. Writes to standard
    /// error and to every sink of every channel, ignoring enablement and
    /// thresholds. Never fails; returns the text that was written.
    pub fn reserve(
        &self,
        kind: EventKind,
        location: Option<&str>,
        message: Option<&str>,
        cause: Option<&Cause>,
        failure: Option<&ReportError>,
    ) -> String {
        let input = ReserveInput {
            kind,
            location,
            message,
            cause,
            failure,
        };
        let guard = self.inner.lock();
        let borrowed = guard.try_borrow_mut();
        match borrowed {
            Ok(mut inner) => self.reserve_with(Some(&mut inner), &input),
            Err(_) => self.reserve_with(None, &input),
        }
    }

    /// Reserve path for callers already holding the inner state.
    pub(crate) fn reserve_locked(
        &self,
        inner: &mut ReporterInner,
        record: &ReportRecord,
        failure: &ReportError,
    ) -> String {
        self.reserve_with(Some(inner), &ReserveInput::from_record(record, failure))
    }

    /// Console-only reserve, for contexts where the sinks are unavailable.
    pub(crate) fn reserve_console(&self, record: &ReportRecord, failure: &ReportError) -> String {
        self.reserve_with(None, &ReserveInput::from_record(record, failure))
    }

    fn reserve_with(&self, inner: Option<&mut ReporterInner>, input: &ReserveInput<'_>) -> String {
        self.reserve_count.fetch_add(1, Ordering::Relaxed);
        let text = compose(input);
        write_console(&text);
        error!(reserve = %text, "reporting failure routed to reserve");
        if let Some(inner) = inner {
            // Step (d): every reachable sink, per-sink failures ignored.
            let _ = panic::catch_unwind(AssertUnwindSafe(|| {
                for channel in inner.channels.iter_mut() {
                    channel.fan_out(&text);
                }
            }));
        }
        text
    }
}
