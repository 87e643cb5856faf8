//! Environment lookups.

use std::collections::HashMap;
use std::str::FromStr;

use crate::errors::{PipelineError, PipelineResult};

/// A source of named configuration values.
pub trait EnvSource: Send + Sync {
    /// Returns the value for `name`, or `None` if unset.
    fn get(&self, name: &str) -> Option<String>;

    /// Returns the value for `name` if set and non-empty. Whitespace counts
    /// as a value.
    fn non_empty(&self, name: &str) -> Option<String> {
        self.get(name).filter(|value| !value.is_empty())
    }
}

/// Reads from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// An in-memory environment, used by tests and embedders.
#[derive(Debug, Clone, Default)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    /// Creates an empty environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variable.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl EnvSource for MapEnv {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Resolves every name in `names`, reporting all missing ones together.
pub(crate) fn require_all(
    env: &dyn EnvSource,
    stage: &str,
    names: &[&str],
) -> PipelineResult<Vec<String>> {
    let mut values = Vec::with_capacity(names.len());
    let mut missing = Vec::new();

    for name in names {
        match env.non_empty(name) {
            Some(value) => values.push(value),
            None => missing.push((*name).to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(PipelineError::ConfigurationMissing {
            stage: stage.to_string(),
            names: missing,
        });
    }

    Ok(values)
}

/// Parses an optional value, rejecting present-but-invalid input.
pub(crate) fn optional<T>(env: &dyn EnvSource, name: &str) -> PipelineResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env.non_empty(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|err| PipelineError::InvalidConfiguration {
                    name: name.to_string(),
                    reason: err.to_string(),
                })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_all_collects_every_missing_name() {
        let env = MapEnv::new().with("B", "value");
        let err = require_all(&env, "preprocess", &["A", "B", "C"]).unwrap_err();

        match err {
            PipelineError::ConfigurationMissing { stage, names } => {
                assert_eq!(stage, "preprocess");
                assert_eq!(names, vec!["A".to_string(), "C".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_value_counts_as_missing() {
        let env = MapEnv::new().with("A", "");
        assert!(require_all(&env, "postprocess", &["A"]).is_err());
    }

    #[test]
    fn test_whitespace_value_counts_as_set() {
        let env = MapEnv::new().with("A", "  ");
        assert_eq!(require_all(&env, "postprocess", &["A"]).unwrap(), vec!["  ".to_string()]);
    }

    #[test]
    fn test_optional_parse() {
        let env = MapEnv::new().with("N", "42").with("BAD", "x");

        assert_eq!(optional::<u64>(&env, "N").unwrap(), Some(42));
        assert_eq!(optional::<u64>(&env, "UNSET").unwrap(), None);
        assert!(matches!(
            optional::<u64>(&env, "BAD"),
            Err(PipelineError::InvalidConfiguration { .. })
        ));
    }
}
