//! In-memory configuration source.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::provider::ConfigSource;

/// A fixed key/value map. Handy for programmatic setup and tests.
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    values: BTreeMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ConfigSource for MapSource {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        Ok(self.values.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_and_absent() {
        let mut src = MapSource::new();
        src.insert("reporting-level", "warning");
        assert_eq!(
            src.get_string("reporting-level").unwrap().as_deref(),
            Some("warning")
        );
        assert_eq!(src.get_string("logging-level").unwrap(), None);
    }

    #[test]
    fn empty_value_is_still_present() {
        let src = MapSource::from_pairs([("text-log-intro-text", "")]);
        assert_eq!(src.get_string("text-log-intro-text").unwrap(), Some(String::new()));
        assert_eq!(src.len(), 1);
    }
}
