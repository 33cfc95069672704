//! Console settings: defaults, then `KARAT__*` environment overrides.

use std::time::Duration;

use anyhow::{anyhow, Context};
use karat_auth::AuthOptions;
use karat_catalog::ImageOptions;
use karat_core::{ConnectionParams, KaratConfig, KaratConfigSnapshot};

pub const ENV_PREFIX: &str = "KARAT__";

/// Seed every key that has a default.
pub fn apply_defaults(cfg: &mut KaratConfig) {
    cfg.set_default("http.host", "127.0.0.1");
    cfg.set_default("http.port", "3036");
    cfg.set_default("session.key", karat_auth::options::DEFAULT_SESSION_KEY);
    cfg.set_default("session.window", "12h");
    cfg.set_default("session.dir", ".karat");
    cfg.set_default("session.slot", "file");
    cfg.set_default("directory.collection", karat_auth::options::DEFAULT_DIRECTORY_COLLECTION);
    cfg.set_default("directory.credentials", "plaintext");
    cfg.set_default("firestore.base_url", karat_firestore::DEFAULT_BASE_URL);
    cfg.set_default("firestore.timeout", "15s");
    cfg.set_default("images.max_bytes", karat_catalog::image::DEFAULT_MAX_BYTES.to_string());
    cfg.set_default("images.max_dimension", karat_catalog::image::DEFAULT_MAX_DIMENSION.to_string());
    cfg.set_default("images.quality", karat_catalog::image::DEFAULT_QUALITY.to_string());
}

/// Environment first, then defaults for whatever is still unset.
pub fn load_from_env() -> KaratConfig {
    let mut cfg = KaratConfig::new();
    cfg.load_env(ENV_PREFIX);
    apply_defaults(&mut cfg);
    cfg
}

#[derive(Debug, Clone)]
pub struct ConsoleSettings {
    pub host: String,
    pub port: u16,
    pub firestore_base_url: String,
    pub firestore_timeout: Duration,
    /// Connection to the master directory.
    pub master: ConnectionParams,
    pub auth: AuthOptions,
    pub images: ImageOptions,
}

impl ConsoleSettings {
    pub fn from_config(cfg: &KaratConfigSnapshot) -> anyhow::Result<Self> {
        let port = cfg
            .get("http.port")
            .unwrap_or("3036")
            .trim()
            .parse::<u16>()
            .context("http.port must be a port number")?;

        let firestore_timeout = match cfg.get("firestore.timeout") {
            Some(raw) => cfg
                .get_duration("firestore.timeout")
                .ok_or_else(|| anyhow!("firestore.timeout: cannot parse '{raw}' as a duration"))?,
            None => Duration::from_secs(15),
        };

        let master = ConnectionParams {
            api_key: cfg.require("master.api_key")?,
            auth_domain: cfg.get_string("master.auth_domain").unwrap_or_default(),
            project_id: cfg.require("master.project_id")?,
            app_id: cfg.get_string("master.app_id").unwrap_or_default(),
            messaging_sender_id: cfg.get_string("master.messaging_sender_id").unwrap_or_default(),
            measurement_id: cfg.get_string("master.measurement_id").unwrap_or_default(),
            shop_name: cfg.get_string("master.shop_name").unwrap_or_default(),
        };

        let images = ImageOptions {
            max_bytes: match cfg.get("images.max_bytes") {
                Some(raw) => cfg
                    .get_usize("images.max_bytes")
                    .ok_or_else(|| anyhow!("images.max_bytes: '{raw}' is not a byte count"))?,
                None => karat_catalog::image::DEFAULT_MAX_BYTES,
            },
            max_dimension: match cfg.get("images.max_dimension") {
                Some(raw) => raw
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|d| *d > 0)
                    .ok_or_else(|| anyhow!("images.max_dimension: '{raw}' is not a pixel size"))?,
                None => karat_catalog::image::DEFAULT_MAX_DIMENSION,
            },
            quality: match cfg.get("images.quality") {
                Some(raw) => raw
                    .trim()
                    .parse::<u8>()
                    .ok()
                    .filter(|q| (1..=100).contains(q))
                    .ok_or_else(|| anyhow!("images.quality: '{raw}' is not between 1 and 100"))?,
                None => karat_catalog::image::DEFAULT_QUALITY,
            },
        };

        Ok(Self {
            host: cfg.get_string("http.host").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            firestore_base_url: cfg
                .get_string("firestore.base_url")
                .unwrap_or_else(|| karat_firestore::DEFAULT_BASE_URL.to_string()),
            firestore_timeout,
            master,
            auth: AuthOptions::from_config(cfg)?,
            images,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured(pairs: &[(&str, &str)]) -> KaratConfig {
        let mut cfg = KaratConfig::new();
        cfg.apply_overrides(
            ENV_PREFIX,
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())),
        );
        apply_defaults(&mut cfg);
        cfg
    }

    #[test]
    fn env_overrides_beat_defaults() {
        let cfg = configured(&[
            ("KARAT__MASTER__API_KEY", "master-key"),
            ("KARAT__MASTER__PROJECT_ID", "jewel-master"),
            ("KARAT__HTTP__PORT", "8080"),
            ("KARAT__SESSION__WINDOW", "30m"),
        ]);
        let settings = ConsoleSettings::from_config(&cfg.snapshot()).unwrap();
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.addr(), "127.0.0.1:8080");
        assert_eq!(settings.master.project_id, "jewel-master");
        assert_eq!(settings.auth.session_window, Duration::from_secs(1800));
        assert_eq!(settings.firestore_timeout, Duration::from_secs(15));
        assert_eq!(settings.images.max_bytes, 900 * 1024);
        assert_eq!(settings.images.max_dimension, 900);
        assert_eq!(settings.images.quality, 75);
    }

    #[test]
    fn image_quality_must_be_a_percentage() {
        let cfg = configured(&[
            ("KARAT__MASTER__API_KEY", "k"),
            ("KARAT__MASTER__PROJECT_ID", "p"),
            ("KARAT__IMAGES__QUALITY", "0"),
        ]);
        let err = ConsoleSettings::from_config(&cfg.snapshot()).unwrap_err();
        assert!(err.to_string().contains("images.quality"));

        let cfg = configured(&[
            ("KARAT__MASTER__API_KEY", "k"),
            ("KARAT__MASTER__PROJECT_ID", "p"),
            ("KARAT__IMAGES__MAX_DIMENSION", "600"),
        ]);
        let settings = ConsoleSettings::from_config(&cfg.snapshot()).unwrap();
        assert_eq!(settings.images.max_dimension, 600);
    }

    #[test]
    fn master_project_is_required() {
        let cfg = configured(&[("KARAT__MASTER__API_KEY", "k")]);
        let err = ConsoleSettings::from_config(&cfg.snapshot()).unwrap_err();
        assert!(err.to_string().contains("master.project_id"));
    }

    #[test]
    fn bad_port_is_reported() {
        let cfg = configured(&[
            ("KARAT__MASTER__API_KEY", "k"),
            ("KARAT__MASTER__PROJECT_ID", "p"),
            ("KARAT__HTTP__PORT", "eighty"),
        ]);
        assert!(ConsoleSettings::from_config(&cfg.snapshot()).is_err());
    }
}
