//! The `auth-token` cookie and a persistent cookie jar.
//!
//! The `auth-token` cookie is the copy of the access token the route gate
//! inspects. It is written with the same attributes a browser would get
//! (`path=/; max-age=604800; secure; samesite=strict`) and expires on its
//! own after seven days, independently of the key-value copy.

use std::sync::Arc;

use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::storage::{KeyValueStore, StorageError};

/// Name of the cookie carrying the access token.
pub const AUTH_COOKIE: &str = "auth-token";

/// Seven days, in seconds.
pub const AUTH_COOKIE_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 7;

/// Prefix for jar entries in the backing store
const JAR_KEY_PREFIX: &str = "cookie:";

/// The site-wide, seven-day `auth-token` cookie.
pub fn auth_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token.to_string()))
        .path("/")
        .max_age(Duration::seconds(AUTH_COOKIE_MAX_AGE_SECS))
        .secure(true)
        .same_site(SameSite::Strict)
        .build()
}

/// An empty cookie dated `Thu, 01 Jan 1970 00:00:01 GMT`, which deletes
/// `name` when set.
pub fn removal_cookie(name: &str) -> Cookie<'static> {
    Cookie::build((name.to_string(), ""))
        .path("/")
        .expires(OffsetDateTime::UNIX_EPOCH + Duration::seconds(1))
        .build()
}

/// Absolute expiry of a cookie set at `set_at`. `max-age` wins over
/// `expires`; neither means a session cookie with no expiry.
fn expiry_from(cookie: &Cookie<'_>, set_at: OffsetDateTime) -> Option<OffsetDateTime> {
    match cookie.max_age() {
        Some(max_age) => Some(set_at + max_age),
        None => cookie.expires_datetime(),
    }
}

/// Find a cookie value in a `Cookie:` request header (`a=1; b=2`).
/// An empty value counts as absent.
pub fn find_in_header(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredCookie {
    /// Rendered `Set-Cookie` string
    set_cookie: String,
    /// Unix seconds
    expires_at: Option<i64>,
}

/// Cookie jar persisted in a key-value store, honouring expiry on read.
#[derive(Clone)]
pub struct CookieJar {
    store: Arc<dyn KeyValueStore>,
}

impl CookieJar {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(name: &str) -> String {
        format!("{}{}", JAR_KEY_PREFIX, name)
    }

    /// Store a cookie. A cookie whose expiry is already past removes any
    /// existing cookie with the same name, as a browser would.
    pub fn set(&self, cookie: &Cookie<'_>) -> Result<(), StorageError> {
        self.set_at(cookie, OffsetDateTime::now_utc())
    }

    fn set_at(&self, cookie: &Cookie<'_>, now: OffsetDateTime) -> Result<(), StorageError> {
        let expires_at = expiry_from(cookie, now);
        if expires_at.is_some_and(|at| at <= now) {
            debug!(cookie = cookie.name(), "Expiring cookie");
            return self.store.remove(&Self::key(cookie.name()));
        }
        let stored = StoredCookie {
            set_cookie: cookie.to_string(),
            expires_at: expires_at.map(OffsetDateTime::unix_timestamp),
        };
        self.store
            .set(&Self::key(cookie.name()), &serde_json::to_string(&stored)?)
    }

    /// Current value of a live cookie, if any.
    pub fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.get_at(name, OffsetDateTime::now_utc())
    }

    fn get_at(&self, name: &str, now: OffsetDateTime) -> Result<Option<String>, StorageError> {
        let Some(raw) = self.store.get(&Self::key(name))? else {
            return Ok(None);
        };
        let stored: StoredCookie = match serde_json::from_str(&raw) {
            Ok(stored) => stored,
            Err(e) => {
                debug!(cookie = name, error = %e, "Ignoring unreadable cookie");
                return Ok(None);
            }
        };
        if stored.expires_at.is_some_and(|at| at <= now.unix_timestamp()) {
            return Ok(None);
        }
        match Cookie::parse(stored.set_cookie) {
            Ok(cookie) => Ok(Some(cookie.value().to_string()).filter(|v| !v.is_empty())),
            Err(e) => {
                debug!(cookie = name, error = %e, "Ignoring malformed cookie");
                Ok(None)
            }
        }
    }

    /// Expire a cookie immediately.
    pub fn expire(&self, name: &str) -> Result<(), StorageError> {
        self.set(&removal_cookie(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::storage::MemoryStore;

    #[test]
    fn test_auth_cookie_attributes() {
        let cookie = auth_cookie("t1");
        assert_eq!(cookie.name(), AUTH_COOKIE);
        assert_eq!(cookie.value(), "t1");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(Duration::seconds(604_800)));
        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));

        // The rendered form parses back with the same attributes
        let parsed = Cookie::parse(cookie.to_string()).unwrap();
        assert_eq!(parsed.max_age(), cookie.max_age());
        assert_eq!(parsed.same_site(), Some(SameSite::Strict));
    }

    #[test]
    fn test_removal_cookie_is_dated_in_the_past() {
        let cookie = removal_cookie(AUTH_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(
            cookie.expires_datetime().map(OffsetDateTime::unix_timestamp),
            Some(1)
        );
        assert!(cookie
            .to_string()
            .contains("Expires=Thu, 01 Jan 1970 00:00:01 GMT"));
    }

    #[test]
    fn test_find_in_header() {
        let header = "theme=dark; auth-token=abc.def; other=1";
        assert_eq!(find_in_header(header, "auth-token").as_deref(), Some("abc.def"));
        assert_eq!(find_in_header(header, "missing"), None);
        assert_eq!(find_in_header("auth-token=", "auth-token"), None);
        assert_eq!(find_in_header("", "auth-token"), None);
        // Value containing '=' is kept whole
        assert_eq!(find_in_header("auth-token=a=b", "auth-token").as_deref(), Some("a=b"));
    }

    #[test]
    fn test_jar_expires_after_max_age() {
        let jar = CookieJar::new(Arc::new(MemoryStore::new()));
        let set_at = OffsetDateTime::now_utc();
        jar.set_at(&auth_cookie("t1"), set_at).unwrap();

        let almost = set_at + Duration::seconds(AUTH_COOKIE_MAX_AGE_SECS - 1);
        assert_eq!(jar.get_at(AUTH_COOKIE, almost).unwrap().as_deref(), Some("t1"));

        let after = set_at + Duration::seconds(AUTH_COOKIE_MAX_AGE_SECS);
        assert_eq!(jar.get_at(AUTH_COOKIE, after).unwrap(), None);
    }

    #[test]
    fn test_jar_expire_removes_cookie() {
        let store = MemoryStore::new();
        let jar = CookieJar::new(Arc::new(store.clone()));
        jar.set(&auth_cookie("t1")).unwrap();
        assert_eq!(store.len(), 1);

        jar.expire(AUTH_COOKIE).unwrap();
        assert_eq!(jar.get(AUTH_COOKIE).unwrap(), None);
        assert!(store.is_empty());

        // Expiring again is harmless
        jar.expire(AUTH_COOKIE).unwrap();
    }

    #[test]
    fn test_jar_ignores_garbage_entries() {
        let store = MemoryStore::new();
        store.set("cookie:auth-token", "garbage").unwrap();
        store
            .set("cookie:other", r#"{"setCookie":"","expiresAt":null}"#)
            .unwrap();
        let jar = CookieJar::new(Arc::new(store));
        assert_eq!(jar.get(AUTH_COOKIE).unwrap(), None);
        assert_eq!(jar.get("other").unwrap(), None);
    }
}
