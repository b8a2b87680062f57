//! ## rapport-telemetry::logging
//! **Subscriber setup for internal diagnostics**
//!
//! The core logs sink failures, reserve invocations and disposal through
//! `tracing`. Nothing is printed until a subscriber is installed.

use tracing_subscriber::{fmt, EnvFilter};

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Clone)]
pub struct EventLogger;

impl EventLogger {
    /// Installs the global subscriber. Panics if one is already set.
    pub fn init() {
        fmt()
            .with_env_filter(Self::filter(DEFAULT_DIRECTIVE))
            .with_thread_names(true)
            .init()
    }

    /// Like [`EventLogger::init`] but returns an error when a global
    /// subscriber already exists.
    pub fn try_init() -> Result<(), InitError> {
        Self::try_init_with(DEFAULT_DIRECTIVE)
    }

    /// `directive` applies when `RUST_LOG` is unset, e.g. `"rapport_core=debug"`.
    pub fn try_init_with(directive: &str) -> Result<(), InitError> {
        fmt()
            .with_env_filter(Self::filter(directive))
            .with_thread_names(true)
            .try_init()
    }

    fn filter(directive: &str) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive))
    }
}
