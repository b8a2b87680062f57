//! # rapport-core
//!
//! Process-local diagnostic reporting: severity-classified reports fanned out
//! to independent channels, each with its own threshold and sinks.
//!
//! ### Guarantees:
//! - No `report*` call ever fails or panics; machinery failures go to the
//!   reserve path, which writes to stderr and to every reachable sink
//! - A failing sink never stops delivery to the other sinks of its channel
//! - Reports are totally ordered per reporter; sink I/O runs under its lock
//!
//! ### Key Submodules:
//! - `severity`: event kinds, thresholds and the `passes` rule
//! - `sink`: writable destinations and their identities
//! - `channel`: per-family pipeline (assemble, format, fan out)
//! - `reporter`: dispatch, depth, reserve path and disposal
//! - `config`: named configuration groups applied onto a reporter
//! - `batch`: deferred reporting
//! - `registry`: lazily built process-wide reporter

pub mod batch;
pub mod channel;
pub mod config;
pub mod error;
pub mod format;
pub mod record;
pub mod registry;
pub mod reporter;
pub mod severity;
pub mod sink;

pub mod prelude {
    pub use crate::batch::{BatchLogger, BatchOptions};
    pub use crate::channel::ChannelKind;
    pub use crate::config::{ConfigLoader, GroupOutcome};
    pub use crate::error::ReportError;
    pub use crate::record::{cause, Cause, ReportRecord};
    pub use crate::reporter::Reporter;
    pub use crate::severity::{EventKind, Threshold};
    pub use crate::sink::{SinkIdentity, SinkTarget, TraceSink};
}

pub use batch::{BatchLogger, BatchOptions};
pub use channel::{Channel, ChannelKind, DispatchOutcome};
pub use config::{ConfigLoader, GroupOutcome};
pub use error::{Phase, ReportError};
pub use record::{cause, Cause, ReportRecord};
pub use registry::{global, ReporterRegistry};
pub use reporter::{Reporter, ReporterState, UserContext};
pub use severity::{passes, EventKind, Threshold};
pub use sink::{SharedStream, SharedText, SinkIdentity, SinkTarget, TraceSink};
