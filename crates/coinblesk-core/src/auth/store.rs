use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::session::SessionKeys;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Session expiry time in minutes.
/// The server drops sessions idle for 10 minutes.
const SESSION_EXPIRY_MINUTES: i64 = 10;

/// `last_used` is only rewritten when it is at least this old
const TOUCH_INTERVAL_SECS: i64 = 60;

/// Persisted session keys, restored at startup for silent re-authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub token: Option<String>,
    pub session_id: Option<String>,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

impl SessionData {
    pub fn new(keys: SessionKeys, username: String) -> Self {
        let now = Utc::now();
        Self {
            token: keys.auth_token,
            session_id: keys.session_id,
            username,
            created_at: now,
            last_used: now,
        }
    }

    pub fn keys(&self) -> SessionKeys {
        SessionKeys::new(self.token.clone(), self.session_id.clone())
    }

    pub fn is_expired(&self) -> bool {
        let expiry = self.last_used + Duration::minutes(SESSION_EXPIRY_MINUTES);
        Utc::now() > expiry
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        let expiry = self.last_used + Duration::minutes(SESSION_EXPIRY_MINUTES);
        (expiry - Utc::now()).num_minutes().max(0)
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    cache_dir: PathBuf,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Load a persisted session, ignoring expired ones
    pub fn load(&self) -> Result<Option<SessionData>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;

        if data.is_expired() {
            return Ok(None);
        }
        Ok(Some(data))
    }

    pub fn save(&self, data: &SessionData) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create cache directory")?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(path, contents).context("Failed to write session file")?;
        Ok(())
    }

    /// Record that the server just accepted the persisted session.
    ///
    /// Returns true if the file was rewritten.
    pub fn touch(&self) -> Result<bool> {
        let Some(mut data) = self.load()? else {
            return Ok(false);
        };
        let now = Utc::now();
        if now - data.last_used < Duration::seconds(TOUCH_INTERVAL_SECS) {
            return Ok(false);
        }
        data.last_used = now;
        self.save(&data)?;
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn keys() -> SessionKeys {
        SessionKeys::new(Some("abc".to_string()), Some("sess-1".to_string()))
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("nested"));
        assert!(store.load().unwrap().is_none());

        store.save(&SessionData::new(keys(), "alice".to_string())).unwrap();
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.keys(), keys());
        assert_eq!(loaded.username, "alice");
        assert!(loaded.minutes_until_expiry() <= SESSION_EXPIRY_MINUTES);
    }

    #[test]
    fn test_expired_session_is_ignored() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let mut data = SessionData::new(keys(), "alice".to_string());
        data.last_used = Utc::now() - Duration::minutes(SESSION_EXPIRY_MINUTES + 1);
        assert!(data.is_expired());

        store.save(&data).unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_old_session_in_use_stays_alive() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        let mut data = SessionData::new(keys(), "alice".to_string());
        data.created_at = Utc::now() - Duration::minutes(SESSION_EXPIRY_MINUTES * 3);
        data.last_used = Utc::now() - Duration::minutes(SESSION_EXPIRY_MINUTES - 1);
        store.save(&data).unwrap();

        assert!(store.touch().unwrap());
        let loaded = store.load().unwrap().unwrap();
        assert!(loaded.last_used > data.last_used);
        assert_eq!(loaded.created_at, data.created_at);
        assert!(loaded.minutes_until_expiry() >= SESSION_EXPIRY_MINUTES - 1);
    }

    #[test]
    fn test_touch_skips_recent_and_missing() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        assert!(!store.touch().unwrap());

        store.save(&SessionData::new(keys(), "alice".to_string())).unwrap();
        assert!(!store.touch().unwrap());
    }

    #[test]
    fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().to_path_buf());
        store.clear().unwrap();

        store.save(&SessionData::new(keys(), "alice".to_string())).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
