//! Persistence of the session tokens and user profile.
//!
//! The access token lives in two places: the durable key-value store (read
//! when attaching credentials to API calls) and the `auth-token` cookie
//! (read by the route gate). Both copies are written by the same call and
//! cleared by the same call; nothing else in the crate touches them.
//!
//! A store built with [`TokenStore::detached`] has no backing storage at
//! all. Every write is a no-op and every read returns `None`, which is what
//! code running before a storage context exists should observe.

use std::path::Path;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::models::{AuthTokens, RefreshedTokens, User};

use super::cookie::{auth_cookie, CookieJar, AUTH_COOKIE};
use super::storage::{FileStore, KeyValueStore, MemoryStore};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_KEY: &str = "user";
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirectAfterLogin";

/// Key-value file name in the cache directory
const STORAGE_FILE: &str = "storage.json";

/// Cookie jar file name in the cache directory
const COOKIE_FILE: &str = "cookies.json";

#[derive(Clone)]
struct Backends {
    kv: Arc<dyn KeyValueStore>,
    cookies: CookieJar,
}

/// Handle to the persisted session. Clone is cheap; clones share storage.
#[derive(Clone)]
pub struct TokenStore {
    backends: Option<Backends>,
}

impl TokenStore {
    pub fn new(kv: Arc<dyn KeyValueStore>, cookie_store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            backends: Some(Backends {
                kv,
                cookies: CookieJar::new(cookie_store),
            }),
        }
    }

    /// Store with no storage context. All operations are no-ops.
    pub fn detached() -> Self {
        Self { backends: None }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), Arc::new(MemoryStore::new()))
    }

    /// File-backed store rooted in `cache_dir`.
    pub fn open(cache_dir: &Path) -> Self {
        Self::new(
            Arc::new(FileStore::new(cache_dir.join(STORAGE_FILE))),
            Arc::new(FileStore::new(cache_dir.join(COOKIE_FILE))),
        )
    }

    pub fn is_attached(&self) -> bool {
        self.backends.is_some()
    }

    // ===== Writes =====

    /// Persist a freshly issued session: access token (key-value store and
    /// cookie), user profile and, when issued, the refresh token. A session
    /// issued without a refresh token drops any refresh token left by the
    /// previous one.
    pub fn set_session(&self, tokens: &AuthTokens) {
        let Some(b) = &self.backends else { return };

        Self::write(b, ACCESS_TOKEN_KEY, &tokens.access_token);
        Self::set_cookie(b, &tokens.access_token);

        match serde_json::to_string(&tokens.user) {
            Ok(user) => Self::write(b, USER_KEY, &user),
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }

        match tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            Some(refresh) => Self::write(b, REFRESH_TOKEN_KEY, refresh),
            None => {
                if let Err(e) = b.kv.remove(REFRESH_TOKEN_KEY) {
                    warn!(error = %e, "Failed to drop previous refresh token");
                }
            }
        }

        debug!(username = %tokens.user.username, "Session stored");
    }

    /// Replace both tokens after a successful refresh. The cookie copy is
    /// re-mirrored so it keeps matching the key-value copy.
    pub fn store_refreshed(&self, tokens: &RefreshedTokens) {
        let Some(b) = &self.backends else { return };

        Self::write(b, ACCESS_TOKEN_KEY, &tokens.access_token);
        Self::write(b, REFRESH_TOKEN_KEY, &tokens.refresh_token);
        Self::set_cookie(b, &tokens.access_token);

        debug!("Refreshed tokens stored");
    }

    /// Remove every trace of the session. Safe to call repeatedly.
    pub fn clear_session(&self) {
        let Some(b) = &self.backends else { return };

        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = b.kv.remove(key) {
                warn!(key, error = %e, "Failed to remove session entry");
            }
        }
        if let Err(e) = b.cookies.expire(AUTH_COOKIE) {
            warn!(error = %e, "Failed to expire auth cookie");
        }

        debug!("Session cleared");
    }

    /// Record where the user was when the session ended, so the login flow
    /// can send them back.
    pub fn remember_location(&self, location: &str) {
        let Some(b) = &self.backends else { return };
        Self::write(b, REDIRECT_AFTER_LOGIN_KEY, location);
    }

    /// Read and remove the remembered location.
    pub fn take_redirect_after_login(&self) -> Option<String> {
        let b = self.backends.as_ref()?;
        let location = Self::read(b, REDIRECT_AFTER_LOGIN_KEY)?;
        if let Err(e) = b.kv.remove(REDIRECT_AFTER_LOGIN_KEY) {
            warn!(error = %e, "Failed to consume redirect location");
        }
        Some(location)
    }

    // ===== Reads =====

    pub fn access_token(&self) -> Option<String> {
        Self::read(self.backends.as_ref()?, ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Option<String> {
        Self::read(self.backends.as_ref()?, REFRESH_TOKEN_KEY)
    }

    /// The cookie copy of the access token.
    pub fn cookie_token(&self) -> Option<String> {
        let b = self.backends.as_ref()?;
        match b.cookies.get(AUTH_COOKIE) {
            Ok(value) => value,
            Err(e) => {
                debug!(error = %e, "Auth cookie unreadable");
                None
            }
        }
    }

    /// Stored user profile. A corrupt profile reads as absent.
    pub fn user(&self) -> Option<User> {
        self.load(USER_KEY)
    }

    /// Signed in only while both copies of the access token are present.
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some() && self.cookie_token().is_some()
    }

    // ===== Auxiliary entries =====

    /// Persist an arbitrary JSON value next to the session.
    pub fn stash<T: Serialize>(&self, key: &str, value: &T) {
        let Some(b) = &self.backends else { return };
        match serde_json::to_string(value) {
            Ok(json) => Self::write(b, key, &json),
            Err(e) => warn!(key, error = %e, "Failed to serialize stashed value"),
        }
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = Self::read(self.backends.as_ref()?, key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key, error = %e, "Ignoring unparsable stored value");
                None
            }
        }
    }

    pub fn discard(&self, key: &str) {
        let Some(b) = &self.backends else { return };
        if let Err(e) = b.kv.remove(key) {
            warn!(key, error = %e, "Failed to remove stored value");
        }
    }

    fn read(b: &Backends, key: &str) -> Option<String> {
        match b.kv.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                debug!(key, error = %e, "Storage read failed");
                None
            }
        }
    }

    fn write(b: &Backends, key: &str, value: &str) {
        if let Err(e) = b.kv.set(key, value) {
            warn!(key, error = %e, "Failed to persist session entry");
        }
    }

    fn set_cookie(b: &Backends, token: &str) {
        if let Err(e) = b.cookies.set(&auth_cookie(token)) {
            warn!(error = %e, "Failed to set auth cookie");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cookie::CookieJar;

    fn tokens(access: &str) -> AuthTokens {
        AuthTokens {
            access_token: access.to_string(),
            user: User {
                user_id: "u-1".to_string(),
                username: "amy".to_string(),
                email: "amy@example.com".to_string(),
                role: "admin".to_string(),
            },
            refresh_token: Some("r1".to_string()),
        }
    }

    fn store_with_handles() -> (TokenStore, MemoryStore, MemoryStore) {
        let kv = MemoryStore::new();
        let cookies = MemoryStore::new();
        let store = TokenStore::new(Arc::new(kv.clone()), Arc::new(cookies.clone()));
        (store, kv, cookies)
    }

    #[test]
    fn test_set_session_round_trip() {
        let (store, _, _) = store_with_handles();
        let issued = tokens("t1");
        store.set_session(&issued);

        assert_eq!(store.access_token().as_deref(), Some("t1"));
        assert_eq!(store.cookie_token().as_deref(), Some("t1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));
        assert_eq!(store.user(), Some(issued.user));
        assert!(store.is_authenticated());
    }

    #[test]
    fn test_new_session_without_refresh_token_drops_old_one() {
        let (store, _, _) = store_with_handles();
        store.set_session(&tokens("t1"));
        assert_eq!(store.refresh_token().as_deref(), Some("r1"));

        let second = AuthTokens {
            user: User {
                user_id: "u-2".to_string(),
                username: "bob".to_string(),
                email: "bob@example.com".to_string(),
                role: "staff".to_string(),
            },
            refresh_token: None,
            ..tokens("t2")
        };
        store.set_session(&second);

        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.access_token().as_deref(), Some("t2"));
        assert_eq!(store.user().map(|u| u.username).as_deref(), Some("bob"));

        // An empty refresh token counts as none
        store.set_session(&tokens("t3"));
        store.set_session(&AuthTokens {
            refresh_token: Some(String::new()),
            ..tokens("t4")
        });
        assert_eq!(store.refresh_token(), None);
    }

    #[test]
    fn test_clear_session_is_idempotent() {
        let (store, _, _) = store_with_handles();
        store.set_session(&tokens("t1"));

        store.clear_session();
        store.clear_session();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert_eq!(store.cookie_token(), None);
        assert_eq!(store.user(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clear_on_empty_store() {
        let store = TokenStore::in_memory();
        store.clear_session();
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_authenticated_requires_both_copies() {
        let (store, kv, cookies) = store_with_handles();
        store.set_session(&tokens("t1"));

        // Cookie gone, key-value copy remains
        CookieJar::new(Arc::new(cookies.clone())).expire(AUTH_COOKIE).unwrap();
        assert!(store.access_token().is_some());
        assert!(!store.is_authenticated());

        // Cookie back, key-value copy gone
        store.set_session(&tokens("t1"));
        kv.remove(ACCESS_TOKEN_KEY).unwrap();
        assert!(store.cookie_token().is_some());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_corrupt_user_reads_as_absent() {
        let (store, kv, _) = store_with_handles();
        store.set_session(&tokens("t1"));
        kv.set(USER_KEY, "{broken").unwrap();

        assert_eq!(store.user(), None);
        assert_eq!(store.access_token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_store_refreshed_overwrites_both_tokens() {
        let (store, _, _) = store_with_handles();
        store.set_session(&tokens("t1"));
        store.store_refreshed(&RefreshedTokens {
            access_token: "t2".to_string(),
            refresh_token: "r2".to_string(),
        });

        assert_eq!(store.access_token().as_deref(), Some("t2"));
        assert_eq!(store.refresh_token().as_deref(), Some("r2"));
        assert_eq!(store.cookie_token().as_deref(), Some("t2"));
    }

    #[test]
    fn test_redirect_location_is_consumed_once() {
        let store = TokenStore::in_memory();
        store.remember_location("/dashboard/customer?page=2");
        assert_eq!(
            store.take_redirect_after_login().as_deref(),
            Some("/dashboard/customer?page=2")
        );
        assert_eq!(store.take_redirect_after_login(), None);
    }

    #[test]
    fn test_detached_store_is_inert() {
        let store = TokenStore::detached();
        store.set_session(&tokens("t1"));
        store.remember_location("/dashboard");
        store.clear_session();

        assert!(!store.is_attached());
        assert_eq!(store.access_token(), None);
        assert_eq!(store.user(), None);
        assert_eq!(store.take_redirect_after_login(), None);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_open_persists_to_cache_dir() {
        let dir = tempfile::tempdir().unwrap();
        TokenStore::open(dir.path()).set_session(&tokens("t1"));

        let reopened = TokenStore::open(dir.path());
        assert!(reopened.is_authenticated());
        assert_eq!(reopened.user().map(|u| u.username).as_deref(), Some("amy"));
    }
}
