//! Configuration source trait and the typed getters layered on top of it.
//!
//! A source only has to answer one question: "what is the raw string stored
//! under this key, if any?". Every typed accessor is built on that single
//! lookup, so new backends stay trivial to write.

use std::str::FromStr;
use std::sync::Arc;

use crate::error::ConfigError;
use crate::parse;

/// Trait for looking up raw configuration values by key.
pub trait ConfigSource: Send + Sync {
    /// Returns `Ok(None)` when the key is absent and `Ok(Some(value))` when present.
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError>;
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        (**self).get_string(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Arc<T> {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        (**self).get_string(key)
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for Box<T> {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        (**self).get_string(key)
    }
}

/// Typed accessors available on every [`ConfigSource`], including trait objects.
///
/// Absent keys yield `Ok(None)`; present but malformed values yield
/// [`ConfigError::InvalidValue`].
pub trait TypedConfig: ConfigSource {
    fn get_int(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.get_with(key, |raw| {
            raw.trim()
                .parse::<i64>()
                .map_err(|_| ConfigError::invalid(key, raw, "an integer"))
        })
    }

    fn get_uint(&self, key: &str) -> Result<Option<usize>, ConfigError> {
        self.get_with(key, |raw| {
            raw.trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::invalid(key, raw, "a non-negative integer"))
        })
    }

    fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.get_with(key, |raw| {
            parse::parse_bool(raw).ok_or_else(|| ConfigError::invalid(key, raw, "a boolean"))
        })
    }

    fn get_float(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.get_with(key, |raw| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::invalid(key, raw, "a number"))
        })
    }

    fn get_char(&self, key: &str) -> Result<Option<char>, ConfigError> {
        self.get_with(key, |raw| {
            parse::parse_char(raw)
                .ok_or_else(|| ConfigError::invalid(key, raw, "a single character"))
        })
    }

    fn get_char_list(&self, key: &str) -> Result<Option<Vec<char>>, ConfigError> {
        self.get_with(key, |raw| {
            parse::parse_char_list(raw).ok_or_else(|| {
                ConfigError::invalid(key, raw, "a comma-separated list of characters")
            })
        })
    }

    /// Splits the value on `;`, dropping empty entries.
    fn get_list(&self, key: &str) -> Result<Option<Vec<String>>, ConfigError> {
        self.get_with(key, |raw| Ok(parse::parse_list(raw)))
    }

    /// Parses the value through `FromStr`; used for enumerations.
    fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.get_with(key, |raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| ConfigError::invalid(key, raw, std::any::type_name::<T>()))
        })
    }

    fn get_with<T, F>(&self, key: &str, convert: F) -> Result<Option<T>, ConfigError>
    where
        F: FnOnce(&str) -> Result<T, ConfigError>,
    {
        match self.get_string(key)? {
            Some(raw) => convert(&raw).map(Some),
            None => Ok(None),
        }
    }
}

impl<S: ConfigSource + ?Sized> TypedConfig for S {}
