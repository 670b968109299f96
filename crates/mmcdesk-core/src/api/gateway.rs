//! Authenticated request gateway.
//!
//! Every call to the protected API goes through [`AuthGateway::request`],
//! which attaches the stored bearer token and recovers from a 401 at most
//! once per call:
//!
//! 1. send with the stored access token (or none);
//! 2. any status other than 401 is handed back untouched;
//! 3. on a 401, exchange the stored refresh token for a new pair and
//!    replay the original request once with the new access token;
//! 4. if there is no refresh token, the refresh fails, or the replay is
//!    also rejected, end the session: clear the stores, remember where the
//!    user was, navigate to the login page and fail with
//!    [`ApiError::SessionTerminated`].
//!
//! Refreshes are serialized. A call that was rejected while another call
//! was refreshing reuses the token that call obtained instead of spending
//! the refresh token a second time.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::gate::LOGIN_PATH;
use crate::auth::{SessionState, TokenStore};
use crate::models::{RefreshRequest, RefreshedTokens};

use super::navigator::Navigator;
use super::request::{ApiRequest, RequestBody};
use super::{envelope, ApiError};

/// Endpoint that trades a refresh token for a new token pair
pub const REFRESH_ENDPOINT: &str = "/api/auth/refresh";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Gateway to the protected API.
/// Clone is cheap - clones share the connection pool, the stores and the
/// refresh lock.
#[derive(Clone)]
pub struct AuthGateway {
    http: Client,
    base_url: String,
    tokens: TokenStore,
    session: SessionState,
    navigator: Arc<dyn Navigator>,
    refresh_lock: Arc<Mutex<()>>,
}

impl AuthGateway {
    pub fn new(
        base_url: &str,
        tokens: TokenStore,
        session: SessionState,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self::with_client(http, base_url, tokens, session, navigator))
    }

    pub fn with_client(
        http: Client,
        base_url: &str,
        tokens: TokenStore,
        session: SessionState,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
            session,
            navigator,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    /// Unauthenticated client for endpoints outside the gateway (login,
    /// registration).
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an API path. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    /// Send a request with credentials and one-shot 401 recovery.
    pub async fn request(&self, req: &ApiRequest) -> Result<Response, ApiError> {
        let sent_token = self.tokens.access_token();
        let response = self.send(req, sent_token.as_deref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        debug!(method = %req.method, path = %req.path, "Unauthorized, attempting recovery");

        if let Some(token) = self.recover(sent_token.as_deref()).await {
            let retried = self.send(req, Some(token.as_str())).await?;
            if retried.status() != StatusCode::UNAUTHORIZED {
                return Ok(retried);
            }
            warn!(path = %req.path, "Replay after refresh was still unauthorized");
        }

        Err(self.terminate())
    }

    async fn send(&self, req: &ApiRequest, token: Option<&str>) -> Result<Response, ApiError> {
        let mut headers = req.headers.clone();
        if let Some(token) = token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ApiError::InvalidRequest(format!("Unusable access token: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        if req.forces_json() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let mut builder = self.http.request(req.method.clone(), self.url(&req.path));
        if !req.query.is_empty() {
            builder = builder.query(&req.query);
        }

        builder = match req.wire_body() {
            RequestBody::Empty => builder.headers(headers),
            RequestBody::Json(body) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                builder.headers(headers).json(&body)
            }
            RequestBody::Form(form) => {
                // reqwest sets the multipart boundary header itself
                headers.remove(CONTENT_TYPE);
                builder.headers(headers).multipart(form.to_multipart()?)
            }
        };

        let response = builder.send().await?;
        debug!(
            method = %req.method,
            path = %req.path,
            status = response.status().as_u16(),
            authenticated = token.is_some(),
            "API response"
        );
        Ok(response)
    }

    /// Obtain a token worth replaying with, or `None` when the session
    /// cannot be recovered.
    async fn recover(&self, rejected: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        // Another call may have refreshed while this one waited.
        if let Some(current) = self.tokens.access_token() {
            if rejected != Some(current.as_str()) {
                debug!("Access token replaced concurrently, reusing it");
                return Some(current);
            }
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            debug!("No refresh token stored, skipping refresh");
            return None;
        };

        match self.refresh(&refresh_token).await {
            Ok(fresh) => {
                self.tokens.store_refreshed(&fresh);
                self.session.set_access_token(&fresh.access_token);
                info!("Access token refreshed");
                Some(fresh.access_token)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                None
            }
        }
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let response = self
            .http
            .post(self.url(REFRESH_ENDPOINT))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ApiError::from_response(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Refresh response: {}", e)))?;
        envelope::decode(body)
    }

    /// End the session for good and send the user to the login page.
    fn terminate(&self) -> ApiError {
        self.tokens.clear_session();
        self.session.clear();

        if let Some(location) = self.navigator.current_location() {
            self.tokens.remember_location(&location);
        }
        self.navigator.navigate(LOGIN_PATH);

        info!("Session terminated, redirected to login");
        ApiError::SessionTerminated
    }
}
