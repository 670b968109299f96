//! Observable in-memory view of the current session.
//!
//! `SessionState` is what display code reads to show "who is signed in".
//! It never touches storage or the network; the gateway and the auth flows
//! update it alongside [`TokenStore`](super::TokenStore).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::models::{AuthTokens, User};

use super::tokens::TokenStore;

/// User record with the display fields derived at assignment time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub name: String,
    pub avatar: String,
}

impl AuthUser {
    pub fn from_user(user: &User) -> Self {
        let name = [&user.username, &user.email]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_default();

        Self {
            user_id: user.user_id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            name,
            // No avatar source upstream
            avatar: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub access_token: Option<String>,
    pub user: Option<AuthUser>,
}

impl SessionSnapshot {
    pub fn is_signed_in(&self) -> bool {
        self.access_token.is_some() && self.user.is_some()
    }
}

/// Shared session state. Every mutation replaces the whole snapshot in one
/// step, so subscribers never see a token from one session paired with the
/// user of another.
#[derive(Clone)]
pub struct SessionState {
    tx: Arc<watch::Sender<SessionSnapshot>>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::with_snapshot(SessionSnapshot::default())
    }
}

impl SessionState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// State seeded from whatever the token store has persisted.
    pub fn init(tokens: &TokenStore) -> Self {
        Self::with_snapshot(SessionSnapshot {
            access_token: tokens.access_token(),
            user: tokens.user().as_ref().map(AuthUser::from_user),
        })
    }

    fn with_snapshot(snapshot: SessionSnapshot) -> Self {
        let (tx, _rx) = watch::channel(snapshot);
        Self { tx: Arc::new(tx) }
    }

    pub fn set_from_tokens(&self, tokens: &AuthTokens) {
        self.tx.send_replace(SessionSnapshot {
            access_token: Some(tokens.access_token.clone()),
            user: Some(AuthUser::from_user(&tokens.user)),
        });
    }

    /// Swap in a refreshed access token, keeping the signed-in user.
    pub fn set_access_token(&self, token: &str) {
        self.tx.send_modify(|snapshot| {
            if snapshot.user.is_some() {
                snapshot.access_token = Some(token.to_string());
            }
        });
    }

    pub fn clear(&self) {
        self.tx.send_replace(SessionSnapshot::default());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.tx.borrow().clone()
    }

    pub fn current_user(&self) -> Option<AuthUser> {
        self.tx.borrow().user.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, email: &str) -> User {
        User {
            user_id: "u-1".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            role: "operator".to_string(),
        }
    }

    fn tokens(access: &str, user: User) -> AuthTokens {
        AuthTokens {
            access_token: access.to_string(),
            user,
            refresh_token: None,
        }
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(AuthUser::from_user(&user("amy", "amy@x.io")).name, "amy");
        assert_eq!(AuthUser::from_user(&user("", "amy@x.io")).name, "amy@x.io");
        assert_eq!(AuthUser::from_user(&user("", "")).name, "");
        assert_eq!(AuthUser::from_user(&user("amy", "")).avatar, "");
    }

    #[test]
    fn test_set_and_clear() {
        let state = SessionState::new();
        assert!(!state.snapshot().is_signed_in());

        state.set_from_tokens(&tokens("t1", user("amy", "amy@x.io")));
        let snap = state.snapshot();
        assert_eq!(snap.access_token.as_deref(), Some("t1"));
        assert_eq!(snap.user.map(|u| u.name).as_deref(), Some("amy"));

        state.clear();
        assert_eq!(state.snapshot(), SessionSnapshot::default());
        assert_eq!(state.current_user(), None);
    }

    #[test]
    fn test_refreshed_token_keeps_user() {
        let state = SessionState::new();
        state.set_access_token("t2");
        assert_eq!(state.snapshot().access_token, None);

        state.set_from_tokens(&tokens("t1", user("amy", "amy@x.io")));
        state.set_access_token("t2");
        let snap = state.snapshot();
        assert_eq!(snap.access_token.as_deref(), Some("t2"));
        assert_eq!(snap.user.map(|u| u.username).as_deref(), Some("amy"));
    }

    #[test]
    fn test_init_reads_persisted_session() {
        let store = TokenStore::in_memory();
        store.set_session(&tokens("t1", user("amy", "amy@x.io")));

        let state = SessionState::init(&store);
        assert!(state.snapshot().is_signed_in());
        assert_eq!(state.current_user().map(|u| u.username).as_deref(), Some("amy"));

        assert_eq!(SessionState::init(&TokenStore::detached()).snapshot(), SessionSnapshot::default());
    }

    #[tokio::test]
    async fn test_subscribers_see_whole_snapshots() {
        let state = SessionState::new();
        let mut rx = state.subscribe();

        state.set_from_tokens(&tokens("t1", user("amy", "amy@x.io")));
        rx.changed().await.unwrap();
        {
            let seen = rx.borrow_and_update();
            assert_eq!(seen.access_token.as_deref(), Some("t1"));
            assert_eq!(seen.user.as_ref().map(|u| u.username.as_str()), Some("amy"));
        }

        state.clear();
        rx.changed().await.unwrap();
        assert!(!rx.borrow().is_signed_in());
    }
}
