//! ## rapport-core::registry
//! **Lazily constructed process-wide reporter**
//!
//! A [`ReporterRegistry`] builds its reporter once, on first access, and never
//! replaces it. Construction is serialized by the registry's own cell, not by
//! any reporter lock, so a slow first construction never blocks reporting on
//! other live reporters.
//!
//! Tests create their own registry with [`ReporterRegistry::new`]; the
//! process-wide one is reached through [`global`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use rapport_config::FigmentSource;
use tracing::{debug, warn};

use crate::config::ConfigLoader;
use crate::reporter::Reporter;

/// Groups applied on first construction when auto-load is on.
pub const AUTO_LOAD_GROUPS: [&str; 2] = ["", "Global"];

static AUTO_LOAD_GLOBAL_SETTINGS: AtomicBool = AtomicBool::new(false);

static PROCESS_REGISTRY: Lazy<ReporterRegistry> = Lazy::new(ReporterRegistry::new);

/// Whether the process-wide reporter applies the [`AUTO_LOAD_GROUPS`] when it
/// is first built. Has no effect once it exists.
pub fn set_auto_load_global_settings(on: bool) {
    AUTO_LOAD_GLOBAL_SETTINGS.store(on, Ordering::SeqCst);
}

pub fn auto_load_global_settings() -> bool {
    AUTO_LOAD_GLOBAL_SETTINGS.load(Ordering::SeqCst)
}

pub fn process_registry() -> &'static ReporterRegistry {
    &PROCESS_REGISTRY
}

/// The process-wide reporter. Settings come from `config/rapport.yaml` and
/// `RAPPORT_*` variables unless a loader was set on [`process_registry`].
pub fn global() -> Arc<Reporter> {
    PROCESS_REGISTRY.build(auto_load_global_settings(), || {
        ConfigLoader::from_source(FigmentSource::load())
    })
}

#[derive(Default)]
struct RegistrySettings {
    auto_load: bool,
    loader: Option<ConfigLoader>,
}

#[derive(Default)]
pub struct ReporterRegistry {
    instance: OnceCell<Arc<Reporter>>,
    settings: Mutex<RegistrySettings>,
}

impl ReporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that auto-loads settings from `loader`.
    pub fn with_loader(loader: ConfigLoader) -> Self {
        Self {
            instance: OnceCell::new(),
            settings: Mutex::new(RegistrySettings {
                auto_load: true,
                loader: Some(loader),
            }),
        }
    }

    pub fn set_auto_load(&self, on: bool) {
        self.settings.lock().auto_load = on;
    }

    pub fn set_loader(&self, loader: Option<ConfigLoader>) {
        self.settings.lock().loader = loader;
    }

    /// The reporter if it has been built.
    pub fn get(&self) -> Option<Arc<Reporter>> {
        self.instance.get().cloned()
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// The registry's reporter, built on first call.
    pub fn global(&self) -> Arc<Reporter> {
        self.build(false, || ConfigLoader::from_source(rapport_config::MapSource::new()))
    }

    /// `force_auto_load` adds to the registry's own flag; `fallback` supplies a
    /// loader when none was set.
    fn build(
        &self,
        force_auto_load: bool,
        fallback: impl FnOnce() -> ConfigLoader,
    ) -> Arc<Reporter> {
        if let Some(reporter) = self.instance.get() {
            return reporter.clone();
        }
        self.instance
            .get_or_init(|| {
                let reporter = Arc::new(Reporter::new());
                reporter.promote_to_global();
                let (auto_load, loader) = {
                    let settings = self.settings.lock();
                    (settings.auto_load || force_auto_load, settings.loader.clone())
                };
                if auto_load {
                    let loader = loader.unwrap_or_else(fallback);
                    for group in AUTO_LOAD_GROUPS {
                        if let Err(err) = loader.apply_group(&reporter, group, true) {
                            warn!(group, error = %err, "auto-loading settings failed");
                        }
                    }
                }
                debug!(auto_load, "global reporter constructed");
                reporter
            })
            .clone()
    }
}

impl std::fmt::Debug for ReporterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReporterRegistry")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Threshold;
    use rapport_config::MapSource;
    use std::thread;

    #[test]
    fn builds_once_and_promotes() {
        let registry = ReporterRegistry::new();
        assert!(registry.get().is_none());
        let first = registry.global();
        let second = registry.global();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(first.is_global());
        assert!(first.applied_groups().is_empty());
    }

    #[test]
    fn concurrent_first_access_yields_one_instance() {
        let registry = Arc::new(ReporterRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                thread::spawn(move || registry.global())
            })
            .collect();
        let reporters: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for r in &reporters[1..] {
            assert!(Arc::ptr_eq(&reporters[0], r));
        }
    }

    #[test]
    fn auto_load_applies_default_and_global_groups() {
        let loader = ConfigLoader::from_source(MapSource::from_pairs([
            ("reporting-level", "error"),
            ("Global.logging-level", "verbose"),
        ]));
        let registry = ReporterRegistry::with_loader(loader);
        let reporter = registry.global();
        assert_eq!(reporter.reporting_level(), Threshold::Error);
        assert_eq!(reporter.logging_level(), Threshold::Verbose);
        assert!(reporter.is_group_applied(""));
        assert!(reporter.is_group_applied("Global"));
    }

    #[test]
    fn settings_after_construction_have_no_effect() {
        let registry = ReporterRegistry::new();
        let reporter = registry.global();
        registry.set_loader(Some(ConfigLoader::from_source(MapSource::from_pairs([(
            "reporting-level",
            "off",
        )]))));
        registry.set_auto_load(true);
        assert!(Arc::ptr_eq(&reporter, &registry.global()));
        assert_eq!(reporter.reporting_level(), Threshold::Warning);
    }
}
