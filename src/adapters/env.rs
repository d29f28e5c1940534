use std::collections::HashMap;
use std::sync::Mutex;

use crate::ports::EnvSource;

/// Reads the process environment at call time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// In-memory environment for tests and embedders that do not want process globals.
#[derive(Debug, Default)]
pub struct MapEnv {
    vars: Mutex<HashMap<String, String>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        let env = Self::new();
        for (name, value) in pairs {
            env.set(name, value);
        }
        env
    }

    pub fn set(&self, name: &str, value: &str) {
        if let Ok(mut vars) = self.vars.lock() {
            vars.insert(name.to_string(), value.to_string());
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut vars) = self.vars.lock() {
            vars.remove(name);
        }
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.lock().ok()?.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_prefers_lowercase() {
        let env = MapEnv::from_pairs(&[("no_proxy", "a.com"), ("NO_PROXY", "b.com")]);
        assert_eq!(env.lookup("NO_PROXY").as_deref(), Some("a.com"));
    }

    #[test]
    fn test_lookup_skips_empty_values() {
        let env = MapEnv::from_pairs(&[("http_proxy", "  "), ("HTTP_PROXY", "http://proxy:3128")]);
        assert_eq!(env.lookup("http_proxy").as_deref(), Some("http://proxy:3128"));

        env.remove("HTTP_PROXY");
        assert_eq!(env.lookup("http_proxy"), None);
    }
}
