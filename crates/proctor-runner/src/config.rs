use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::select::Pattern;

/// Settings for one run. Fixed once handed to the orchestrator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunConfig {
    /// Test cases allowed to drive the processor at the same time.
    pub parallel: usize,
    /// Glob on test case names.
    pub filter: Option<String>,
    /// A test case runs when it carries any of these (case-insensitive).
    pub tags: Vec<String>,
    pub update_snapshots: bool,
    /// Let a test case with no expectations pass instead of failing it.
    pub allow_empty_expectations: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            parallel: 1,
            filter: None,
            tags: vec![],
            update_snapshots: false,
            allow_empty_expectations: false,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        if let Some(filter) = &self.filter {
            Pattern::new(filter).map_err(|source| ConfigError::InvalidFilter {
                pattern: filter.clone(),
                source,
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sequential() {
        let config = RunConfig::default();
        assert_eq!(config.parallel, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_parallelism_and_bad_filter() {
        let config = RunConfig {
            parallel: 0,
            ..RunConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::ZeroParallelism)));

        let config = RunConfig {
            filter: Some("auth-[".into()),
            ..RunConfig::default()
        };
        match config.validate() {
            Err(ConfigError::InvalidFilter { pattern, .. }) => assert_eq!(pattern, "auth-["),
            other => panic!("unexpected {other:?}"),
        }
    }
}
