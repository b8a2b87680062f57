//! `figment`-backed configuration source (YAML files and environment).

use std::path::Path;

use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::provider::ConfigSource;

/// Default file consulted by [`FigmentSource::load`].
pub const DEFAULT_CONFIG_FILE: &str = "config/rapport.yaml";

/// Prefix of environment variables merged by [`FigmentSource::load`].
pub const ENV_PREFIX: &str = "RAPPORT_";

/// Any scalar a YAML document or the environment can hold for a setting.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s,
        }
    }
}

/// Configuration source reading dotted keys (`Group.key`) out of a [`Figment`].
#[derive(Debug, Clone)]
pub struct FigmentSource {
    figment: Figment,
}

impl FigmentSource {
    pub fn new(figment: Figment) -> Self {
        Self { figment }
    }

    /// Load configuration from default files and environment.
    ///
    /// Hierarchy:
    /// 1. `config/rapport.yaml` if it exists.
    /// 2. `RAPPORT_*` environment variables, `__` separating nesting levels.
    pub fn load() -> Self {
        let mut figment = Figment::new();
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            figment = figment.merge(Yaml::file(DEFAULT_CONFIG_FILE));
        }
        Self::new(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    /// Load configuration from a specific YAML file, environment on top.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }
        Ok(Self::new(
            Figment::new()
                .merge(Yaml::file(path))
                .merge(Env::prefixed(ENV_PREFIX).split("__")),
        ))
    }

    pub fn figment(&self) -> &Figment {
        &self.figment
    }

    /// Spellings tried for `key`: as written, `-` folded to `_`, and with the
    /// group part lower-cased (figment lower-cases environment keys).
    fn candidates(key: &str) -> Vec<String> {
        let mut out = vec![key.to_string()];
        let folded = key.replace('-', "_");
        let lowered = folded.to_lowercase();
        for candidate in [folded, lowered] {
            if !out.contains(&candidate) {
                out.push(candidate);
            }
        }
        out
    }
}

impl ConfigSource for FigmentSource {
    fn get_string(&self, key: &str) -> Result<Option<String>, ConfigError> {
        for candidate in Self::candidates(key) {
            if self.figment.contains(&candidate) {
                let value: Scalar = self.figment.extract_inner(&candidate)?;
                return Ok(Some(value.into_string()));
            }
        }
        Ok(None)
    }
}
