// Authentication options and configuration.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail};
use karat_core::KaratConfigSnapshot;
use serde::{Deserialize, Serialize};

use crate::verifier::CredentialScheme;

pub const DEFAULT_SESSION_KEY: &str = "jewellery_admin_session";
pub const DEFAULT_DIRECTORY_COLLECTION: &str = "shops";

/// Where the persisted session lives.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    #[default]
    File,
    Memory,
}

impl FromStr for SlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown session slot '{other}'")),
        }
    }
}

/// Session and directory settings.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthOptions {
    /// Storage key of the persisted session.
    pub session_key: String,
    /// How long a saved session stays valid after login.
    #[serde(with = "humantime_serde")]
    pub session_window: Duration,
    pub session_dir: PathBuf,
    pub session_slot: SlotKind,
    /// Collection of the master store holding shop records.
    pub directory_collection: String,
    pub credentials: CredentialScheme,
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            session_key: DEFAULT_SESSION_KEY.to_string(),
            session_window: Duration::from_secs(12 * 60 * 60),
            session_dir: PathBuf::from(".karat"),
            session_slot: SlotKind::File,
            directory_collection: DEFAULT_DIRECTORY_COLLECTION.to_string(),
            credentials: CredentialScheme::Plaintext,
        }
    }
}

impl AuthOptions {
    /// Read `session.*` and `directory.*` keys, falling back to defaults.
    pub fn from_config(config: &KaratConfigSnapshot) -> anyhow::Result<Self> {
        let mut opts = Self::default();

        if let Some(key) = config.get_string("session.key") {
            opts.session_key = key;
        }
        if let Some(raw) = config.get("session.window") {
            opts.session_window = config
                .get_duration("session.window")
                .ok_or_else(|| anyhow!("session.window: cannot parse '{raw}' as a duration"))?;
        }
        if let Some(dir) = config.get_string("session.dir") {
            opts.session_dir = PathBuf::from(dir);
        }
        if let Some(slot) = config.get("session.slot") {
            opts.session_slot = slot.parse().map_err(|e: String| anyhow!("session.slot: {e}"))?;
        }
        if let Some(collection) = config.get_string("directory.collection") {
            opts.directory_collection = collection;
        }
        if let Some(scheme) = config.get("directory.credentials") {
            opts.credentials = scheme
                .parse()
                .map_err(|e: String| anyhow!("directory.credentials: {e}"))?;
        }

        opts.validate()?;
        Ok(opts)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.session_key.trim().is_empty() {
            bail!("session.key must not be empty");
        }
        if self.session_key.contains(['/', '\\']) {
            bail!("session.key must not contain path separators");
        }
        if self.session_window.is_zero() {
            bail!("session.window must be greater than zero");
        }
        if self.directory_collection.trim().is_empty() {
            bail!("directory.collection must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karat_core::KaratConfig;

    #[test]
    fn defaults_match_console_conventions() {
        let opts = AuthOptions::default();
        assert_eq!(opts.session_key, "jewellery_admin_session");
        assert_eq!(opts.session_window, Duration::from_secs(43_200));
        assert_eq!(opts.directory_collection, "shops");
        assert_eq!(opts.credentials, CredentialScheme::Plaintext);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn reads_overrides_from_config() {
        let mut cfg = KaratConfig::new();
        cfg.set("session.window", "30m");
        cfg.set("session.slot", "memory");
        cfg.set("directory.credentials", "bcrypt");
        let opts = AuthOptions::from_config(&cfg.snapshot()).unwrap();
        assert_eq!(opts.session_window, Duration::from_secs(1800));
        assert_eq!(opts.session_slot, SlotKind::Memory);
        assert_eq!(opts.credentials, CredentialScheme::Bcrypt);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = KaratConfig::new();
        cfg.set("session.window", "soon");
        assert!(AuthOptions::from_config(&cfg.snapshot()).is_err());

        let mut cfg = KaratConfig::new();
        cfg.set("session.key", "../escape");
        assert!(AuthOptions::from_config(&cfg.snapshot()).is_err());
    }
}
