//! Environment variable access.
//!
//! Credentials and endpoint overrides are read through [`Environment`] so
//! config loading can be exercised without touching process state.

use std::collections::HashMap;

/// Read-only view of environment-style key/value configuration.
pub trait Environment: Send + Sync {
    /// Value of `name`, or `None` when unset or empty.
    fn get_var(&self, name: &str) -> Option<String>;
}

/// The process environment.
pub struct NativeEnvironment;

impl Environment for NativeEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    }
}

/// A fixed map of variables, for tests and embedders that manage
/// credentials themselves.
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl Environment for MapEnvironment {
    fn get_var(&self, name: &str) -> Option<String> {
        self.vars.get(name).filter(|v| !v.is_empty()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_reads_path() {
        assert!(NativeEnvironment.get_var("PATH").is_some());
    }

    #[test]
    fn native_missing_var_is_none() {
        assert!(NativeEnvironment.get_var("STREAMWELL_DEFINITELY_NOT_SET_9911").is_none());
    }

    #[test]
    fn map_environment_ignores_empty_values() {
        let env = MapEnvironment::new()
            .with_var("ARK_API_KEY", "k")
            .with_var("DEEPSEEK_API_KEY", "");
        assert_eq!(env.get_var("ARK_API_KEY").as_deref(), Some("k"));
        assert!(env.get_var("DEEPSEEK_API_KEY").is_none());
        assert!(env.get_var("OTHER").is_none());
    }
}
