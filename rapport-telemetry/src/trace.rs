//! ## rapport-telemetry::trace
//! **Trace channel backed by `tracing`**

use std::io;

use rapport_core::TraceSink;
use tracing::Level;

/// Emits every trace-channel line as a `tracing` event at a fixed level.
#[derive(Clone, Copy, Debug)]
pub struct TracingTraceSink {
    level: Level,
}

impl Default for TracingTraceSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl TracingTraceSink {
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    pub fn level(&self) -> Level {
        self.level
    }
}

impl TraceSink for TracingTraceSink {
    fn write_line(&self, line: &str) -> io::Result<()> {
        match self.level {
            Level::ERROR => tracing::error!(report = line),
            Level::WARN => tracing::warn!(report = line),
            Level::INFO => tracing::info!(report = line),
            Level::DEBUG => tracing::debug!(report = line),
            _ => tracing::trace!(report = line),
        }
        Ok(())
    }
}
