//! Session Store
//!
//! Single source of truth for "am I logged in, as whom, with what token".
//! The store is a cheap handle over an injected [`SessionStorage`]; clones
//! share the same backend.
//!
//! Read paths never fail: storage errors and malformed data degrade to
//! `None`/`false`/`0`. Write paths given empty input never mutate anything.

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::sync::Arc;

use crate::models::{AuthData, UserRecord};
use crate::session::claims::{self, Claims, Role};
use crate::session::storage::{MemoryStorage, SessionStorage, StorageError};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Legacy alias for the access token, read as a fallback only
pub const LEGACY_TOKEN_KEY: &str = "token";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";

#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =============================================================================
// Construction
// =============================================================================

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self { storage }
    }

    /// Store backed by a fresh in-memory map
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }
}

// =============================================================================
// Writes
// =============================================================================

impl SessionStore {
    /// Persist the access token; `None` or empty is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects the write.
    pub fn set_access_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        self.set_non_empty(ACCESS_TOKEN_KEY, token)
    }

    /// Persist the refresh token; `None` or empty is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects the write.
    pub fn set_refresh_token(&self, token: Option<&str>) -> Result<(), StorageError> {
        self.set_non_empty(REFRESH_TOKEN_KEY, token)
    }

    /// Persist the user record as JSON; `None` is a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails.
    pub fn set_user(&self, user: Option<&UserRecord>) -> Result<(), StorageError> {
        match user {
            Some(user) => self.storage.set(USER_KEY, serde_json::to_string(user)?),
            None => Ok(()),
        }
    }

    /// Write every present field of `data` in a single storage transaction
    ///
    /// Omitted fields keep their stored value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the storage write fails. Nothing
    /// is written in that case.
    pub fn set_auth_data(&self, data: &AuthData) -> Result<(), StorageError> {
        let mut entries: Vec<(&str, String)> = Vec::with_capacity(3);
        if let Some(token) = data.access_token.as_deref().filter(|t| !t.is_empty()) {
            entries.push((ACCESS_TOKEN_KEY, token.to_string()));
        }
        if let Some(token) = data.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            entries.push((REFRESH_TOKEN_KEY, token.to_string()));
        }
        if let Some(user) = &data.user {
            entries.push((USER_KEY, serde_json::to_string(user)?));
        }

        if entries.is_empty() {
            return Ok(());
        }
        debug!("Writing {} session field(s)", entries.len());
        self.storage.set_many(&entries)
    }

    /// Remove the whole session record, including the legacy token alias
    ///
    /// Safe to call when no session exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects the removal.
    pub fn clear_auth_data(&self) -> Result<(), StorageError> {
        debug!("Clearing session");
        self.storage.remove_many(&[
            ACCESS_TOKEN_KEY,
            LEGACY_TOKEN_KEY,
            REFRESH_TOKEN_KEY,
            USER_KEY,
        ])
    }

    fn set_non_empty(&self, key: &str, value: Option<&str>) -> Result<(), StorageError> {
        match value.filter(|v| !v.is_empty()) {
            Some(v) => self.storage.set(key, v.to_string()),
            None => Ok(()),
        }
    }
}

// =============================================================================
// Reads
// =============================================================================

impl SessionStore {
    /// Stored access token, falling back to the legacy key
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
            .or_else(|| self.read(LEGACY_TOKEN_KEY))
    }

    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    /// Stored user record; unparseable data reads as absent
    #[must_use]
    pub fn user(&self) -> Option<UserRecord> {
        let raw = self.read(USER_KEY)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Ignoring unparseable stored user record: {e}");
                None
            }
        }
    }

    /// The session triple, each field read independently
    #[must_use]
    pub fn auth_data(&self) -> AuthData {
        AuthData {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
            user: self.user(),
        }
    }

    /// Whether an access token is present
    ///
    /// Expiry is deliberately not consulted; see [`Self::has_live_session`].
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Whether an access token is present and not yet expired
    #[must_use]
    pub fn has_live_session(&self) -> bool {
        self.has_live_session_at(Utc::now())
    }

    #[must_use]
    pub fn has_live_session_at(&self, now: DateTime<Utc>) -> bool {
        self.access_token()
            .is_some_and(|t| !claims::is_token_expired_at(Some(&t), now))
    }

    /// Role claimed by the stored access token
    #[must_use]
    pub fn current_role(&self) -> Option<Role> {
        Self::user_role(self.access_token().as_deref())
    }

    /// Provider id claimed by the stored access token
    #[must_use]
    pub fn current_provider_id(&self) -> Option<String> {
        Self::provider_id(self.access_token().as_deref())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Session storage read of '{key}' failed: {e}");
                None
            }
        }
    }
}

// =============================================================================
// Token inspection
// =============================================================================

impl SessionStore {
    #[must_use]
    pub fn decode_token(token: &str) -> Option<Claims> {
        claims::decode_token(token)
    }

    #[must_use]
    pub fn is_token_expired(token: Option<&str>) -> bool {
        claims::is_token_expired_at(token, Utc::now())
    }

    #[must_use]
    pub fn token_expiration(token: Option<&str>) -> Option<DateTime<Utc>> {
        token.and_then(claims::decode_token)?.expires_at()
    }

    /// Seconds until expiry, floored at zero
    #[must_use]
    pub fn time_until_expiration(token: Option<&str>) -> u64 {
        claims::time_until_expiration_at(token, Utc::now())
    }

    #[must_use]
    pub fn user_role(token: Option<&str>) -> Option<Role> {
        token.and_then(claims::decode_token)?.role()
    }

    #[must_use]
    pub fn provider_id(token: Option<&str>) -> Option<String> {
        token.and_then(claims::decode_token)?.provider_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::builders::TestTokenBuilder;
    use serde_json::json;

    /// Storage that fails every operation
    struct BrokenStorage;

    impl SessionStorage for BrokenStorage {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io {
                path: "broken".into(),
                source: std::io::Error::other("disk gone"),
            })
        }

        fn set_many(&self, _entries: &[(&str, String)]) -> Result<(), StorageError> {
            Err(StorageError::Io {
                path: "broken".into(),
                source: std::io::Error::other("disk gone"),
            })
        }

        fn remove_many(&self, _keys: &[&str]) -> Result<(), StorageError> {
            Ok(())
        }
    }

    #[test]
    fn test_set_and_get_access_token() {
        let store = SessionStore::in_memory();
        store.set_access_token(Some("abc")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("abc"));
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_empty_writes_are_noops() {
        let store = SessionStore::in_memory();
        store.set_access_token(Some("abc")).unwrap();

        store.set_access_token(None).unwrap();
        store.set_access_token(Some("")).unwrap();
        store.set_user(None).unwrap();

        assert_eq!(store.access_token().as_deref(), Some("abc"));
        assert!(store.user().is_none());
    }

    #[test]
    fn test_legacy_token_fallback() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LEGACY_TOKEN_KEY, "legacy".to_string()).unwrap();
        let store = SessionStore::new(storage);

        assert_eq!(store.access_token().as_deref(), Some("legacy"));

        store.set_access_token(Some("fresh")).unwrap();
        assert_eq!(store.access_token().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_clear_removes_everything_including_legacy_key() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(LEGACY_TOKEN_KEY, "legacy".to_string()).unwrap();
        let store = SessionStore::new(storage.clone());
        store
            .set_auth_data(&AuthData::new(
                Some("a".into()),
                Some("r".into()),
                Some(UserRecord::new("1", "Mai")),
            ))
            .unwrap();

        store.clear_auth_data().unwrap();
        store.clear_auth_data().unwrap();

        assert!(!store.is_authenticated());
        assert!(store.user().is_none());
        assert!(store.refresh_token().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_partial_auth_data_keeps_omitted_fields() {
        let store = SessionStore::in_memory();
        store
            .set_auth_data(&AuthData::new(
                Some("a1".into()),
                Some("r1".into()),
                Some(UserRecord::new("1", "Mai")),
            ))
            .unwrap();

        store
            .set_auth_data(&AuthData::new(Some("a2".into()), None, None))
            .unwrap();

        let data = store.auth_data();
        assert_eq!(data.access_token.as_deref(), Some("a2"));
        assert_eq!(data.refresh_token.as_deref(), Some("r1"));
        assert_eq!(data.user.and_then(|u| u.name).as_deref(), Some("Mai"));
    }

    #[test]
    fn test_corrupt_user_reads_as_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, "{broken".to_string()).unwrap();
        assert!(SessionStore::new(storage).user().is_none());
    }

    #[test]
    fn test_storage_failures_degrade_reads_and_surface_writes() {
        let store = SessionStore::new(Arc::new(BrokenStorage));

        assert!(store.access_token().is_none());
        assert!(!store.is_authenticated());
        assert!(store.set_access_token(Some("x")).is_err());
        // Empty input never reaches the backend
        assert!(store.set_access_token(None).is_ok());
    }

    #[test]
    fn test_live_session_checks_expiry_but_authenticated_does_not() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let store = SessionStore::in_memory();
        let stale = TestTokenBuilder::new().claim("exp", json!(1_600_000_000)).build();
        store.set_access_token(Some(&stale)).unwrap();

        assert!(store.is_authenticated());
        assert!(!store.has_live_session_at(now));

        let fresh = TestTokenBuilder::new().claim("exp", json!(1_800_000_000)).build();
        store.set_access_token(Some(&fresh)).unwrap();
        assert!(store.has_live_session_at(now));
    }

    #[test]
    fn test_current_role_and_provider_from_stored_token() {
        let store = SessionStore::in_memory();
        assert!(store.current_role().is_none());

        let token = TestTokenBuilder::new()
            .claim("role", json!("ServiceProvider"))
            .claim("providerId", json!(9))
            .build();
        store.set_access_token(Some(&token)).unwrap();

        assert_eq!(store.current_role(), Some(Role::Provider));
        assert_eq!(store.current_provider_id().as_deref(), Some("9"));
    }

    #[test]
    fn test_token_expiration_as_datetime() {
        let token = TestTokenBuilder::new().claim("exp", json!(1_700_000_000)).build();
        assert_eq!(
            SessionStore::token_expiration(Some(&token)),
            DateTime::from_timestamp(1_700_000_000, 0)
        );
        assert!(SessionStore::token_expiration(Some("nope")).is_none());
        assert!(SessionStore::token_expiration(None).is_none());
    }
}
