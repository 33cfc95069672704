//! Persisted login sessions with a fixed validity window.

use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use karat_core::{Clock, ConnectionParams};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AuthResult;

/// A single named string slot that survives process restarts.
pub trait SessionSlot: Send + Sync {
    fn read(&self) -> io::Result<Option<String>>;
    fn write(&self, value: &str) -> io::Result<()>;
    /// Removing an empty slot is not an error.
    fn remove(&self) -> io::Result<()>;
}

/// Stores the slot as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionSlot for FileSlot {
    fn read(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn write(&self, value: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        // Write then rename so a crash never leaves half a session behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &self.path)
    }

    fn remove(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process slot, used by tests and `session.slot = memory`.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(value.into())),
        }
    }

    pub fn peek(&self) -> Option<String> {
        self.value.lock().clone()
    }
}

impl SessionSlot for MemorySlot {
    fn read(&self) -> io::Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    fn write(&self, value: &str) -> io::Result<()> {
        *self.value.lock() = Some(value.to_string());
        Ok(())
    }

    fn remove(&self) -> io::Result<()> {
        self.value.lock().take();
        Ok(())
    }
}

/// The stored form: connection parameters plus an absolute expiry in
/// epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSession {
    pub connection_params: ConnectionParams,
    pub expires_at: i64,
}

impl PersistedSession {
    /// A session is dead from its expiry instant onward.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp_millis() >= self.expires_at
    }
}

/// Saves, loads and clears the one persisted session.
pub struct SessionStore {
    slot: Arc<dyn SessionSlot>,
    clock: Arc<dyn Clock>,
    window_ms: i64,
}

impl SessionStore {
    pub fn new(slot: Arc<dyn SessionSlot>, clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            slot,
            clock,
            window_ms: i64::try_from(window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    /// Persist `params` with an expiry of now plus the window, replacing
    /// any previous session. Returns the expiry.
    pub fn save(&self, params: &ConnectionParams) -> AuthResult<i64> {
        let expires_at = self.clock.now().timestamp_millis().saturating_add(self.window_ms);
        let record = PersistedSession {
            connection_params: params.clone(),
            expires_at,
        };
        self.slot.write(&serde_json::to_string(&record)?)?;
        debug!(tenant = %params.project_id, expires_at, "session saved");
        Ok(expires_at)
    }

    /// The saved parameters if a live session exists.
    ///
    /// An expired or unreadable session is deleted and reported as
    /// absent.
    pub fn load(&self) -> Option<ConnectionParams> {
        let raw = match self.slot.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "cannot read persisted session");
                return None;
            }
        };

        let record: PersistedSession = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "discarding corrupt session");
                self.discard();
                return None;
            }
        };

        if record.is_expired_at(self.clock.now()) {
            debug!(expires_at = record.expires_at, "session expired");
            self.discard();
            return None;
        }

        Some(record.connection_params)
    }

    pub fn clear(&self) -> AuthResult<()> {
        self.slot.remove()?;
        debug!("session cleared");
        Ok(())
    }

    fn discard(&self) {
        if let Err(e) = self.slot.remove() {
            warn!(error = %e, "cannot remove stale session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use karat_core::ManualClock;

    const HOUR: Duration = Duration::from_secs(3600);

    fn params() -> ConnectionParams {
        ConnectionParams::new("k1", "p1").with_shop_name("Shop One")
    }

    fn fixture(window: Duration) -> (Arc<MemorySlot>, Arc<ManualClock>, SessionStore) {
        let slot = Arc::new(MemorySlot::new());
        let clock = Arc::new(ManualClock::new(Utc.timestamp_millis_opt(1_000_000).unwrap()));
        let store = SessionStore::new(slot.clone(), clock.clone(), window);
        (slot, clock, store)
    }

    #[test]
    fn expiry_is_window_after_save() {
        let (slot, _clock, store) = fixture(12 * HOUR);
        let expires = store.save(&params()).unwrap();
        assert_eq!(expires, 1_000_000 + 12 * 3_600_000);

        let stored: serde_json::Value = serde_json::from_str(&slot.peek().unwrap()).unwrap();
        assert_eq!(stored["expiresAt"], expires);
        assert_eq!(stored["connectionParams"]["projectId"], "p1");
    }

    #[test]
    fn boundary_instant_is_expired() {
        let (slot, clock, store) = fixture(HOUR);
        store.save(&params()).unwrap();

        clock.advance(chrono::Duration::milliseconds(3_600_000 - 1));
        assert_eq!(store.load(), Some(params()));

        clock.advance(chrono::Duration::milliseconds(1));
        assert_eq!(store.load(), None);
        assert!(slot.peek().is_none());
    }

    #[test]
    fn corrupt_value_is_removed() {
        let slot = Arc::new(MemorySlot::with_value("{not json"));
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = SessionStore::new(slot.clone(), clock, HOUR);
        assert_eq!(store.load(), None);
        assert!(slot.peek().is_none());
    }

    #[test]
    fn save_replaces_previous_session() {
        let (_slot, _clock, store) = fixture(HOUR);
        store.save(&params()).unwrap();
        let other = ConnectionParams::new("k2", "p2");
        store.save(&other).unwrap();
        assert_eq!(store.load(), Some(other));
    }

    #[test]
    fn file_slot_round_trips_and_clears() {
        let dir = std::env::temp_dir().join(format!("karat-slot-{}", std::process::id()));
        let slot = FileSlot::new(&dir, "jewellery_admin_session");
        assert_eq!(slot.read().unwrap(), None);
        slot.write("{\"a\":1}").unwrap();
        assert_eq!(slot.read().unwrap().as_deref(), Some("{\"a\":1}"));
        slot.remove().unwrap();
        slot.remove().unwrap();
        assert_eq!(slot.read().unwrap(), None);
        let _ = fs::remove_dir_all(&dir);
    }
}
