//! ## rapport-core::reporter
//! **The reporter: four channels behind one lock**
//!
//! A [`Reporter`] owns one [`Channel`] per [`ChannelKind`] and dispatches each
//! report to every channel that is enabled for the report's kind. Nothing the
//! channels do can make a `report*` call fail or panic; problems go to the
//! reserve path (see [`Reporter::reserve`]).
//!
//! The state lives behind a re-entrant mutex so that a sink or hook which
//! reports from inside a dispatch, on the same thread, does not deadlock. Such
//! nested reports cannot touch the channels while they are in use and are
//! written to the console-only reserve instead.

mod reserve;

use std::any::Any;
use std::cell::RefCell;
use std::panic;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Local;
use parking_lot::ReentrantMutex;
use tracing::{debug, trace};

use crate::channel::{guarded, Channel, ChannelKind};
use crate::error::{Phase, ReportError};
use crate::record::{Cause, ReportRecord};
use crate::severity::{EventKind, Threshold};
use crate::sink::{SinkIdentity, SinkTarget, TraceSink};

/// Negative depth requests are warned about this many times per process.
const MAX_NEGATIVE_DEPTH_WARNINGS: usize = 3;

static NEGATIVE_DEPTH_WARNINGS: AtomicUsize = AtomicUsize::new(0);

fn claim_negative_depth_warning(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
            (n < MAX_NEGATIVE_DEPTH_WARNINGS).then_some(n + 1)
        })
        .is_ok()
}

/// Opaque value a caller may attach to a reporter.
pub type UserContext = Arc<dyn Any + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReporterState {
    Initialized,
    Disposed,
}

pub(crate) struct ReporterInner {
    pub(crate) channels: [Channel; 4],
    pub(crate) depth: usize,
    pub(crate) applied_groups: BTreeSet<String>,
    pub(crate) warn_on_duplicate_config_apply: bool,
    user_context: Option<UserContext>,
    state: ReporterState,
}

impl ReporterInner {
    fn new() -> Self {
        Self {
            channels: ChannelKind::ALL.map(Channel::new),
            depth: 0,
            applied_groups: BTreeSet::new(),
            warn_on_duplicate_config_apply: true,
            user_context: None,
            state: ReporterState::Initialized,
        }
    }

    pub(crate) fn channel(&self, kind: ChannelKind) -> &Channel {
        &self.channels[kind.index()]
    }

    pub(crate) fn channel_mut(&mut self, kind: ChannelKind) -> &mut Channel {
        &mut self.channels[kind.index()]
    }
}

pub struct Reporter {
    inner: ReentrantMutex<RefCell<ReporterInner>>,
    is_global: AtomicBool,
    throw_test_exception: AtomicBool,
    disposing: AtomicBool,
    reserve_count: AtomicUsize,
    depth_warnings: &'static AtomicUsize,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter {
    /// Reporter with every channel at its family defaults: console on stdout
    /// at warning, text channels at info with no sinks, trace disabled.
    pub fn new() -> Self {
        Self::with_depth_warnings(&NEGATIVE_DEPTH_WARNINGS)
    }

    /// `depth_warnings` counts negative-depth warnings against
    /// [`MAX_NEGATIVE_DEPTH_WARNINGS`].
    fn with_depth_warnings(depth_warnings: &'static AtomicUsize) -> Self {
        Self {
            inner: ReentrantMutex::new(RefCell::new(ReporterInner::new())),
            is_global: AtomicBool::new(false),
            throw_test_exception: AtomicBool::new(false),
            disposing: AtomicBool::new(false),
            reserve_count: AtomicUsize::new(0),
            depth_warnings,
        }
    }

    /// Runs `f` with exclusive access to the state. Fails with
    /// [`ReportError::Reentrant`] when called from inside a dispatch.
    pub(crate) fn locked<R>(
        &self,
        f: impl FnOnce(&mut ReporterInner) -> R,
    ) -> Result<R, ReportError> {
        let guard = self.inner.lock();
        let mut inner = guard.try_borrow_mut().map_err(|_| ReportError::Reentrant)?;
        Ok(f(&mut inner))
    }

    /// Read access for getters; falls back to `default` on re-entrant calls.
    fn read<R>(&self, default: R, f: impl FnOnce(&ReporterInner) -> R) -> R {
        let guard = self.inner.lock();
        let borrowed = guard.try_borrow();
        match borrowed {
            Ok(inner) => f(&inner),
            Err(_) => default,
        }
    }

    // ---- reporting ----

    pub fn report(
        &self,
        kind: EventKind,
        location: Option<&str>,
        message: Option<&str>,
        cause: Option<Cause>,
    ) {
        self.report_record(&ReportRecord::new(kind, location, message, cause));
    }

    /// Dispatches `record` to every channel enabled for its kind, in
    /// [`ChannelKind::ALL`] order. Never fails.
    pub fn report_record(&self, record: &ReportRecord) {
        let guard = self.inner.lock();
        let Ok(mut inner) = guard.try_borrow_mut() else {
            self.reserve_console(record, &ReportError::Reentrant);
            return;
        };
        if inner.state == ReporterState::Disposed {
            debug!(kind = %record.kind(), "report on disposed reporter ignored");
            return;
        }
        let now = Local::now();
        let depth = inner.depth;
        for kind in ChannelKind::ALL {
            let channel = inner.channel_mut(kind);
            if !channel.enabled_for(record.kind()) {
                continue;
            }
            match channel.dispatch(record, depth, now) {
                Ok(outcome) if outcome.is_total_failure() => {
                    let failure = ReportError::TotalChannelFailure {
                        channel: kind,
                        failed: outcome.failed,
                        last: outcome.last_error.unwrap_or_default(),
                    };
                    self.reserve_locked(&mut inner, record, &failure);
                }
                Ok(outcome) => {
                    trace!(channel = %kind, written = outcome.written, "dispatched");
                }
                Err(err) => {
                    self.reserve_locked(&mut inner, record, &err);
                }
            }
        }
        if self.throw_test_exception.swap(false, Ordering::SeqCst) {
            if let Err(err) = raise_test_exception() {
                self.reserve_locked(&mut inner, record, &err);
            }
        }
    }

    pub fn report_error(&self, location: &str, message: &str) {
        self.report(EventKind::Error, Some(location), Some(message), None);
    }

    pub fn report_error_msg(&self, message: &str) {
        self.report(EventKind::Error, None, Some(message), None);
    }

    pub fn report_error_cause(&self, location: &str, cause: Cause) {
        self.report(EventKind::Error, Some(location), None, Some(cause));
    }

    pub fn report_warning(&self, location: &str, message: &str) {
        self.report(EventKind::Warning, Some(location), Some(message), None);
    }

    pub fn report_warning_msg(&self, message: &str) {
        self.report(EventKind::Warning, None, Some(message), None);
    }

    pub fn report_warning_cause(&self, location: &str, cause: Cause) {
        self.report(EventKind::Warning, Some(location), None, Some(cause));
    }

    pub fn report_info(&self, location: &str, message: &str) {
        self.report(EventKind::Info, Some(location), Some(message), None);
    }

    pub fn report_info_msg(&self, message: &str) {
        self.report(EventKind::Info, None, Some(message), None);
    }

    pub fn report_info_cause(&self, location: &str, cause: Cause) {
        self.report(EventKind::Info, Some(location), None, Some(cause));
    }

    /// Number of times the reserve path has run on this reporter.
    pub fn reserve_count(&self) -> usize {
        self.reserve_count.load(Ordering::Relaxed)
    }

    // ---- depth ----

    pub fn depth(&self) -> usize {
        self.read(0, |inner| inner.depth)
    }

    /// Sets the nesting depth. Negative values clamp to zero with a warning,
    /// shown at most a few times per process.
    pub fn set_depth(&self, depth: i64) {
        let _ = self.locked(|inner| self.store_depth(inner, depth));
    }

    pub fn increase_depth(&self) {
        self.increase_depth_by(1);
    }

    pub fn increase_depth_by(&self, step: i64) {
        let _ = self.locked(|inner| {
            let current = i64::try_from(inner.depth).unwrap_or(i64::MAX);
            self.store_depth(inner, current.saturating_add(step));
        });
    }

    pub fn decrease_depth(&self) {
        self.decrease_depth_by(1);
    }

    pub fn decrease_depth_by(&self, step: i64) {
        let _ = self.locked(|inner| {
            let current = i64::try_from(inner.depth).unwrap_or(i64::MAX);
            self.store_depth(inner, current.saturating_sub(step));
        });
    }

    fn store_depth(&self, inner: &mut ReporterInner, depth: i64) {
        if depth >= 0 {
            inner.depth = usize::try_from(depth).unwrap_or(usize::MAX);
            return;
        }
        inner.depth = 0;
        if claim_negative_depth_warning(self.depth_warnings) {
            let record = ReportRecord::new(
                EventKind::Warning,
                Some("Reporter::set_depth"),
                Some("negative depth requested"),
                None,
            );
            self.reserve_locked(inner, &record, &ReportError::NegativeDepth(depth));
        }
    }

    // ---- thresholds ----

    pub fn threshold(&self, channel: ChannelKind) -> Threshold {
        self.read(Threshold::Off, |inner| inner.channel(channel).threshold())
    }

    pub fn set_threshold(&self, channel: ChannelKind, threshold: Threshold) {
        let _ = self.locked(|inner| inner.channel_mut(channel).set_threshold(threshold));
    }

    pub fn is_enabled(&self, channel: ChannelKind) -> bool {
        self.read(false, |inner| inner.channel(channel).is_enabled())
    }

    pub fn set_enabled(&self, channel: ChannelKind, enabled: bool) {
        let _ = self.locked(|inner| inner.channel_mut(channel).set_enabled(enabled));
    }

    /// Whether `channel` would emit a report of `kind` right now.
    pub fn enabled_for(&self, channel: ChannelKind, kind: EventKind) -> bool {
        self.read(false, |inner| inner.channel(channel).enabled_for(kind))
    }

    pub fn enabled_at(&self, channel: ChannelKind, level: Threshold) -> bool {
        self.read(false, |inner| inner.channel(channel).enabled_at(level))
    }

    pub fn set_enabled_at(&self, channel: ChannelKind, level: Threshold, on: bool) {
        let _ = self.locked(|inner| inner.channel_mut(channel).set_enabled_at(level, on));
    }

    /// Console threshold.
    pub fn reporting_level(&self) -> Threshold {
        self.threshold(ChannelKind::Console)
    }

    pub fn set_reporting_level(&self, threshold: Threshold) {
        self.set_threshold(ChannelKind::Console, threshold);
    }

    /// Text-log threshold.
    pub fn logging_level(&self) -> Threshold {
        self.threshold(ChannelKind::TextLog)
    }

    /// Sets both text channels.
    pub fn set_logging_level(&self, threshold: Threshold) {
        let _ = self.locked(|inner| {
            inner.channel_mut(ChannelKind::TextLog).set_threshold(threshold);
            inner.channel_mut(ChannelKind::TextLogger).set_threshold(threshold);
        });
    }

    pub fn tracing_level(&self) -> Threshold {
        self.threshold(ChannelKind::Trace)
    }

    pub fn set_tracing_level(&self, threshold: Threshold) {
        self.set_threshold(ChannelKind::Trace, threshold);
    }

    // ---- sinks ----

    fn route_sink_error(&self, inner: &mut ReporterInner, operation: &str, err: &ReportError) {
        let kind = match err {
            ReportError::DuplicateSink { .. } => EventKind::Warning,
            _ => EventKind::Error,
        };
        let record = ReportRecord::new(kind, Some(operation), Some("sink operation failed"), None);
        self.reserve_locked(inner, &record, err);
    }

    /// Replaces the default sink of `channel`. Files are owned and closed by
    /// the reporter; shared writers and streams are not.
    pub fn set_default_sink(
        &self,
        channel: ChannelKind,
        target: SinkTarget,
    ) -> Result<(), ReportError> {
        let owns = target.owned_by_default();
        self.locked(|inner| {
            reject_if_disposed(inner)?;
            let result = inner.channel_mut(channel).set_default_sink(target, owns);
            if let Err(err) = &result {
                self.route_sink_error(inner, "Reporter::set_default_sink", err);
            }
            result
        })?
    }

    /// Attaches an extra sink. Errors are also routed to the reserve path.
    pub fn add_sink(
        &self,
        channel: ChannelKind,
        target: SinkTarget,
    ) -> Result<SinkIdentity, ReportError> {
        let owns = target.owned_by_default();
        self.locked(|inner| {
            reject_if_disposed(inner)?;
            let result = inner.channel_mut(channel).add_sink(target, owns);
            if let Err(err) = &result {
                self.route_sink_error(inner, "Reporter::add_sink", err);
            }
            result
        })?
    }

    /// Detaches a sink by identity. An unknown identity is returned as an
    /// error without involving the reserve path.
    pub fn remove_sink(
        &self,
        channel: ChannelKind,
        identity: &SinkIdentity,
    ) -> Result<(), ReportError> {
        self.locked(|inner| {
            let result = inner.channel_mut(channel).remove_sink(identity);
            match &result {
                Err(ReportError::SinkNotFound { .. }) | Ok(()) => {}
                Err(err) => self.route_sink_error(inner, "Reporter::remove_sink", err),
            }
            result
        })?
    }

    pub fn remove_all_sinks(&self, channel: ChannelKind) -> Result<(), ReportError> {
        self.locked(|inner| {
            let result = inner.channel_mut(channel).remove_all_sinks();
            if let Err(err) = &result {
                self.route_sink_error(inner, "Reporter::remove_all_sinks", err);
            }
            result
        })?
    }

    /// Routes the trace channel to `sink` and enables it.
    pub fn set_trace_sink(&self, sink: Arc<dyn TraceSink>) -> Result<(), ReportError> {
        self.set_default_sink(ChannelKind::Trace, SinkTarget::Trace(sink))?;
        self.set_enabled(ChannelKind::Trace, true);
        Ok(())
    }

    pub fn sink_identities(&self, channel: ChannelKind) -> Vec<SinkIdentity> {
        self.read(Vec::new(), |inner| inner.channel(channel).sink_identities())
    }

    /// Flushes every sink of every channel; the first failure is returned.
    pub fn flush(&self) -> Result<(), ReportError> {
        self.locked(|inner| {
            let mut first = None;
            for channel in inner.channels.iter_mut() {
                if let Err(err) = channel.flush() {
                    first.get_or_insert(err);
                }
            }
            first.map_or(Ok(()), Err)
        })?
    }

    /// Read access to one channel.
    pub fn with_channel<R>(
        &self,
        channel: ChannelKind,
        f: impl FnOnce(&Channel) -> R,
    ) -> Result<R, ReportError> {
        self.locked(|inner| f(inner.channel(channel)))
    }

    /// Mutable access to one channel, for assemblers, formatters, indentation
    /// and intro settings.
    pub fn with_channel_mut<R>(
        &self,
        channel: ChannelKind,
        f: impl FnOnce(&mut Channel) -> R,
    ) -> Result<R, ReportError> {
        self.locked(|inner| f(inner.channel_mut(channel)))
    }

    // ---- configuration bookkeeping ----

    pub fn is_group_applied(&self, group: &str) -> bool {
        self.read(false, |inner| inner.applied_groups.contains(group))
    }

    pub fn applied_groups(&self) -> Vec<String> {
        self.read(Vec::new(), |inner| inner.applied_groups.iter().cloned().collect())
    }

    pub fn warn_on_duplicate_config_apply(&self) -> bool {
        self.read(true, |inner| inner.warn_on_duplicate_config_apply)
    }

    pub fn set_warn_on_duplicate_config_apply(&self, warn: bool) {
        let _ = self.locked(|inner| inner.warn_on_duplicate_config_apply = warn);
    }

    // ---- misc ----

    pub fn user_context(&self) -> Option<UserContext> {
        self.read(None, |inner| inner.user_context.clone())
    }

    pub fn set_user_context(&self, context: Option<UserContext>) {
        let _ = self.locked(|inner| inner.user_context = context);
    }

    pub fn is_global(&self) -> bool {
        self.is_global.load(Ordering::Acquire)
    }

    /// One-way; repeated calls are no-ops.
    pub(crate) fn promote_to_global(&self) {
        if !self.is_global.swap(true, Ordering::AcqRel) {
            debug!("reporter promoted to global");
        }
    }

    /// When set, the next report raises a synthetic failure after dispatch.
    /// The flag clears itself once consumed.
    pub fn set_throw_test_exception(&self, on: bool) {
        self.throw_test_exception.store(on, Ordering::SeqCst);
    }

    pub fn throw_test_exception(&self) -> bool {
        self.throw_test_exception.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> ReporterState {
        // A re-entrant caller is inside a dispatch, which only runs while
        // initialized.
        self.read(ReporterState::Initialized, |inner| inner.state)
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == ReporterState::Disposed
    }

    /// Flushes and closes every owned sink on every channel. Later reports
    /// are ignored. Repeated or nested calls are no-ops.
    pub fn dispose(&self) {
        if self.disposing.swap(true, Ordering::SeqCst) {
            return;
        }
        let guard = self.inner.lock();
        let Ok(mut inner) = guard.try_borrow_mut() else {
            // Called from inside a dispatch; the sinks are in use.
            self.disposing.store(false, Ordering::SeqCst);
            return;
        };
        if inner.state == ReporterState::Disposed {
            return;
        }
        let mut failures = Vec::new();
        for channel in inner.channels.iter_mut() {
            failures.extend(channel.close_all());
        }
        inner.state = ReporterState::Disposed;
        drop(inner);
        for err in &failures {
            let record = ReportRecord::new(
                EventKind::Warning,
                Some("Reporter::dispose"),
                Some("closing sink failed"),
                None,
            );
            self.reserve_console(&record, err);
        }
        debug!(close_failures = failures.len(), "reporter disposed");
    }
}

/// Raises the synthetic self-test failure through the same guard that wraps
/// every pipeline step, so it arrives as a contained panic.
fn raise_test_exception() -> Result<(), ReportError> {
    guarded(ChannelKind::Console, Phase::SelfTest, || {
        panic::resume_unwind(Box::new(ReportError::TestException.to_string()))
    })
}

fn reject_if_disposed(inner: &ReporterInner) -> Result<(), ReportError> {
    if inner.state == ReporterState::Disposed {
        debug!("sink change on disposed reporter rejected");
        return Err(ReportError::Disposed);
    }
    Ok(())
}

impl Drop for Reporter {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Reporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = self.inner.lock();
        let mut s = f.debug_struct("Reporter");
        match guard.try_borrow() {
            Ok(inner) => s
                .field("state", &inner.state)
                .field("depth", &inner.depth)
                .field("channels", &inner.channels),
            Err(_) => s.field("state", &"<dispatching>"),
        };
        s.field("is_global", &self.is_global())
            .field("reserve_count", &self.reserve_count())
            .finish()
    }
}
