//! Engine limits

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_MAX_DEPTH: usize = 64;
pub const DEFAULT_MAX_TOKENS: usize = 1024;
pub const DEFAULT_MAX_FORMULA_LENGTH: usize = 4096;

pub const ENV_MAX_DEPTH: &str = "TALLY_MAX_DEPTH";
pub const ENV_MAX_TOKENS: &str = "TALLY_MAX_TOKENS";
pub const ENV_MAX_FORMULA_LENGTH: &str = "TALLY_MAX_FORMULA_LENGTH";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive integer, got '{value}'")]
    InvalidLimit { var: &'static str, value: String },
}

/// Per-call resource bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Nesting depth for both parsing and evaluation
    pub max_depth: usize,
    /// Token count, excluding end of input
    pub max_tokens: usize,
    /// Source length in bytes
    pub max_length: usize,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_tokens: DEFAULT_MAX_TOKENS,
            max_length: DEFAULT_MAX_FORMULA_LENGTH,
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_max_tokens(mut self, tokens: usize) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_max_length(mut self, length: usize) -> Self {
        self.max_length = length;
        self
    }

    /// Defaults overridden by `TALLY_MAX_DEPTH`, `TALLY_MAX_TOKENS` and
    /// `TALLY_MAX_FORMULA_LENGTH` when set
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |var: &'static str, default: usize| -> Result<usize, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<usize>() {
                    Ok(n) if n > 0 => Ok(n),
                    _ => Err(ConfigError::InvalidLimit { var, value: raw }),
                },
            }
        };
        Ok(Self {
            max_depth: read(ENV_MAX_DEPTH, DEFAULT_MAX_DEPTH)?,
            max_tokens: read(ENV_MAX_TOKENS, DEFAULT_MAX_TOKENS)?,
            max_length: read(ENV_MAX_FORMULA_LENGTH, DEFAULT_MAX_FORMULA_LENGTH)?,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_depth, 64);
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.max_length, 4096);
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[("TALLY_MAX_DEPTH", " 16 ")])).unwrap();
        assert_eq!(config, EngineConfig::new().with_max_depth(16));
    }

    #[test]
    fn test_env_rejects_garbage() {
        let err = EngineConfig::from_lookup(lookup(&[("TALLY_MAX_TOKENS", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "TALLY_MAX_TOKENS must be a positive integer, got 'lots'");
        assert!(EngineConfig::from_lookup(lookup(&[("TALLY_MAX_DEPTH", "0")])).is_err());
    }
}
