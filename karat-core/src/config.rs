//! # Karat Configuration
//!
//! A minimal string key/value store, in the spirit of Feathers'
//! `app.set()` / `app.get()`. Applications layer defaults first and then
//! environment overrides on top.
//!
//! ```rust
//! use karat_core::KaratConfig;
//! let mut cfg = KaratConfig::new();
//!
//! cfg.set("session.window", "12h");
//! cfg.set("http.port", "3036");
//!
//! assert_eq!(cfg.get("http.port"), Some("3036"));
//! ```
//!
//! ## Environment overrides
//!
//! [`KaratConfig::load_env`] copies every variable carrying the prefix,
//! lower-cased, with `__` turned into `.`:
//!
//! ```bash
//! export KARAT__SESSION__WINDOW=30m   # session.window = 30m
//! ```

use std::collections::HashMap;
use std::time::Duration;

use humantime_serde::re::humantime;

#[derive(Debug, Default)]
pub struct KaratConfig {
    values: HashMap<String, String>,
}

impl KaratConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only when it is not already present.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Apply overrides from an iterator of `(name, value)` pairs, e.g.
    /// `std::env::vars()`. Only names starting with `prefix` are used.
    pub fn apply_overrides<I>(&mut self, prefix: &str, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if !normalized.is_empty() {
                    self.set(normalized, value);
                }
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn load_env(&mut self, prefix: &str) {
        self.apply_overrides(prefix, std::env::vars());
    }

    pub fn snapshot(&self) -> KaratConfigSnapshot {
        KaratConfigSnapshot::new(self.values.clone())
    }
}

/// Immutable view of the config taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct KaratConfigSnapshot {
    map: HashMap<String, String>,
}

impl KaratConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.parse::<usize>().ok())
    }

    /// Parse a humantime duration such as `12h` or `90s`.
    pub fn get_duration(&self, key: &str) -> Option<Duration> {
        self.get(key)
            .and_then(|v| humantime::parse_duration(v.trim()).ok())
    }

    /// Like [`get_string`](Self::get_string) but errors on a missing or
    /// blank value.
    pub fn require(&self, key: &str) -> anyhow::Result<String> {
        self.get(key)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("missing required configuration key '{key}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_are_normalized() {
        let mut cfg = KaratConfig::new();
        cfg.set("session.window", "12h");
        cfg.apply_overrides(
            "KARAT__",
            vec![
                ("KARAT__SESSION__WINDOW".to_string(), "30m".to_string()),
                ("KARAT__MASTER__PROJECT_ID".to_string(), "master-1".to_string()),
                ("OTHER__HTTP__PORT".to_string(), "1".to_string()),
            ],
        );

        let snap = cfg.snapshot();
        assert_eq!(snap.get("session.window"), Some("30m"));
        assert_eq!(snap.get("master.project_id"), Some("master-1"));
        assert!(snap.get("http.port").is_none());
    }

    #[test]
    fn set_default_keeps_existing_value() {
        let mut cfg = KaratConfig::new();
        cfg.set("http.port", "9000");
        cfg.set_default("http.port", "3036");
        cfg.set_default("http.host", "127.0.0.1");
        assert_eq!(cfg.get("http.port"), Some("9000"));
        assert_eq!(cfg.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn durations_parse_humantime() {
        let mut cfg = KaratConfig::new();
        cfg.set("session.window", "12h");
        cfg.set("bad", "soon");
        let snap = cfg.snapshot();
        assert_eq!(snap.get_duration("session.window"), Some(Duration::from_secs(12 * 3600)));
        assert_eq!(snap.get_duration("bad"), None);
    }

    #[test]
    fn require_rejects_blank() {
        let mut cfg = KaratConfig::new();
        cfg.set("master.api_key", "  ");
        let snap = cfg.snapshot();
        assert!(snap.require("master.api_key").is_err());
        assert!(snap.require("master.project_id").is_err());
    }
}
