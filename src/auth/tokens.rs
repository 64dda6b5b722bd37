//! Token storage and management

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Credential record as persisted in the token file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Token lifetime in seconds, as returned by the identity provider.
    /// Absent in hand-written files, which then count as already expired.
    #[serde(default)]
    pub expires_in: u64,
    /// Milliseconds since the Unix epoch at which the token was issued.
    #[serde(default)]
    pub issued_at: i64,
}

impl CredentialRecord {
    /// Record for a token issued right now.
    pub fn issued_now(access_token: String, refresh_token: String, expires_in: u64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_in,
            issued_at: now_millis(),
        }
    }

    /// Absolute expiry instant in milliseconds since the Unix epoch.
    pub fn expires_at(&self) -> i64 {
        let lifetime_ms = i64::try_from(self.expires_in)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        self.issued_at.saturating_add(lifetime_ms)
    }
}

/// In-memory credential state held by the authenticator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialState {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Absolute expiry in milliseconds since the Unix epoch.
    pub token_expiry: i64,
}

impl CredentialState {
    /// Whether the access token stays valid for at least `buffer_ms` past `now_ms`.
    pub fn is_fresh(&self, now_ms: i64, buffer_ms: i64) -> bool {
        self.access_token.is_some() && now_ms.saturating_add(buffer_ms) < self.token_expiry
    }

    /// Drop both tokens. The next validity check fails until a reseed.
    pub fn clear(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }
}

impl From<CredentialRecord> for CredentialState {
    fn from(record: CredentialRecord) -> Self {
        let token_expiry = record.expires_at();
        Self {
            access_token: non_empty(record.access_token),
            refresh_token: non_empty(record.refresh_token),
            token_expiry,
        }
    }
}

fn non_empty(token: String) -> Option<String> {
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Reads and writes the credential record. Holds no state besides the path.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached record. A missing, unreadable or malformed file yields `None`.
    pub fn load(&self) -> Option<CredentialRecord> {
        match self.try_load() {
            Ok(record) => record,
            Err(e) => {
                tracing::error!("Ignoring token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn try_load(&self) -> Result<Option<CredentialRecord>, StoreError> {
        if !self.path.exists() {
            tracing::debug!("No token file at {}", self.path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Write the record, creating the parent directory if needed.
    pub fn save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let content = serde_json::to_string_pretty(record)?;
        fs::write(&self.path, content)?;

        // Token file holds secrets
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        tracing::debug!("Saved tokens to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> CredentialRecord {
        CredentialRecord {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 600,
            issued_at: 1_700_000_000_000,
        }
    }

    #[test]
    fn test_expires_at() {
        assert_eq!(record().expires_at(), 1_700_000_600_000);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_save_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("tokens.json");
        let store = TokenStore::new(&path);

        store.save(&record()).unwrap();

        assert!(path.exists());
        assert_eq!(store.load(), Some(record()));
    }

    #[test]
    fn test_saved_file_is_field_for_field_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.save(&record()).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["access_token"], "access");
        assert_eq!(value["refresh_token"], "refresh");
        assert_eq!(value["expires_in"], 600);
        assert_eq!(value["issued_at"], 1_700_000_000_000_i64);
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens.json"));
        store.save(&record()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_malformed_file_yields_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(TokenStore::new(&path).load().is_none());
    }

    #[test]
    fn test_load_record_without_lifetime() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();

        let rec = TokenStore::new(&path).load().unwrap();
        assert_eq!(rec.expires_at(), 0);

        let state = CredentialState::from(rec);
        assert_eq!(state.refresh_token.as_deref(), Some("r"));
        assert!(!state.is_fresh(now_millis(), 30_000));
    }

    #[test]
    fn test_state_from_record() {
        let state = CredentialState::from(record());
        assert_eq!(state.access_token.as_deref(), Some("access"));
        assert_eq!(state.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(state.token_expiry, 1_700_000_600_000);
    }

    #[test]
    fn test_state_treats_empty_tokens_as_absent() {
        let mut rec = record();
        rec.access_token.clear();
        let state = CredentialState::from(rec);
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_some());
    }

    #[test]
    fn test_is_fresh_honours_buffer() {
        let state = CredentialState::from(record());
        let expiry = state.token_expiry;

        assert!(state.is_fresh(expiry - 60_000, 30_000));
        assert!(!state.is_fresh(expiry - 30_000, 30_000));
        assert!(!state.is_fresh(expiry - 10_000, 30_000));
    }

    #[test]
    fn test_clear() {
        let mut state = CredentialState::from(record());
        state.clear();
        assert!(state.access_token.is_none());
        assert!(state.refresh_token.is_none());
        assert!(!state.is_fresh(0, 0));
    }
}
