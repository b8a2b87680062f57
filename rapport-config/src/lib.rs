//! # Rapport Configuration Sources
//!
//! Key/value configuration lookup consumed by the reporting core.
//!
//! ## Features
//! - **Single primitive**: every source implements one `get_string` lookup
//! - **Typed getters**: integers, booleans, floats, characters, lists and
//!   `FromStr` enums layered on that lookup through [`TypedConfig`]
//! - **Backends**: an in-memory [`MapSource`] and a YAML/environment
//!   [`FigmentSource`]

#![warn(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

mod error;
mod figment_source;
mod map;
pub mod parse;
mod provider;

pub use error::ConfigError;
pub use figment_source::{FigmentSource, DEFAULT_CONFIG_FILE, ENV_PREFIX};
pub use map::MapSource;
pub use provider::{ConfigSource, TypedConfig};
