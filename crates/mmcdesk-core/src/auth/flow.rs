//! Sign-in, sign-out and the two-step registration wizard.
//!
//! These endpoints are public, so requests go straight out on the
//! gateway's HTTP client instead of through the 401 recovery path. A
//! successful sign-in stores the session the same way the gateway's
//! refresh does and then navigates.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{envelope, ApiError, AuthGateway};
use crate::models::{
    AuthTokens, LoginRequest, RegisterRequest, ResendVerificationRequest, VerifyRegistrationRequest,
};

use super::gate::{LANDING_PATH, LOGIN_PATH};
use super::validation::{LoginForm, RegisterForm, ValidationError, VerificationCode};

pub const LOGIN_ENDPOINT: &str = "/api/v1/auth/login";
pub const REGISTER_ENDPOINT: &str = "/api/v1/auth/register";
pub const VERIFY_ENDPOINT: &str = "/api/v1/auth/verify-registration";
pub const RESEND_ENDPOINT: &str = "/api/v1/auth/resend-verification";

/// Key under which a registration awaiting its code is kept
pub const PENDING_REGISTRATION_KEY: &str = "pendingRegistration";

/// Seconds before another verification code may be requested
pub const RESEND_COOLDOWN_SECS: i64 = 60;

pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const RESEND_UNAVAILABLE: &str =
    "Resending the code is not available right now. If no code arrives, please try registering again later.";

#[derive(Error, Debug)]
pub enum FlowError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// The server refused; the message is ready to show to the user.
    #[error("{0}")]
    Rejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No registration is waiting for a verification code")]
    NotAwaitingVerification,

    #[error("Please wait {0} seconds before requesting another code")]
    Cooldown(i64),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<reqwest::Error> for FlowError {
    fn from(e: reqwest::Error) -> Self {
        FlowError::Network(e.to_string())
    }
}

// ============================================================================
// Sign-in / sign-out
// ============================================================================

/// Entry points for the public auth endpoints. Clone is cheap.
#[derive(Clone)]
pub struct Authenticator {
    gateway: AuthGateway,
}

impl Authenticator {
    pub fn new(gateway: AuthGateway) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &AuthGateway {
        &self.gateway
    }

    /// Sign in and return where the user should land: the location saved
    /// when the last session ended, or the dashboard.
    pub async fn login(&self, form: &LoginForm) -> Result<String, FlowError> {
        form.validate()?;
        let tokens = self.sign_in(&form.username, &form.password).await?;
        self.establish(&tokens);

        let destination = self
            .gateway
            .tokens()
            .take_redirect_after_login()
            .unwrap_or_else(|| LANDING_PATH.to_string());
        self.gateway.navigator().navigate(&destination);
        info!(username = %tokens.user.username, %destination, "Signed in");
        Ok(destination)
    }

    pub fn logout(&self) {
        self.gateway.tokens().clear_session();
        self.gateway.session().clear();
        self.gateway.navigator().navigate(LOGIN_PATH);
        info!("Signed out");
    }

    async fn sign_in(&self, username: &str, password: &str) -> Result<AuthTokens, FlowError> {
        let (status, body) = self
            .post_json(LOGIN_ENDPOINT, &LoginRequest { username, password })
            .await?;
        if !status.is_success() {
            debug!(status = status.as_u16(), "Login rejected");
            return Err(FlowError::Rejected(login_failure_message(&body)));
        }
        Ok(envelope::decode(body)?)
    }

    fn establish(&self, tokens: &AuthTokens) {
        self.gateway.tokens().set_session(tokens);
        self.gateway.session().set_from_tokens(tokens);
    }

    /// POST a JSON body without credentials. Bodies that are not JSON read
    /// as `Null`.
    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(StatusCode, Value), FlowError> {
        let response = self
            .gateway
            .http()
            .post(self.gateway.url(path))
            .json(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        debug!(path, status = status.as_u16(), "Auth endpoint response");
        Ok((status, body))
    }
}

// ============================================================================
// Registration wizard
// ============================================================================

/// A registration accepted by the server and waiting for its emailed code.
/// The password is only held in memory for the auto sign-in after
/// verification and is never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRegistration {
    pub username: String,
    pub email: String,
    pub code_sent_at: DateTime<Utc>,
    #[serde(skip)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationStep {
    Register,
    Verify(PendingRegistration),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// A code was emailed; the wizard moved to the verify step.
    VerificationRequired,
    /// The server signed the user in directly.
    SignedIn { destination: String },
    /// Registered without a session; the user has to sign in.
    Registered { destination: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    SignedIn { destination: String },
    /// Verified, but the automatic sign-in did not go through.
    VerifiedPleaseLogin { destination: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResendOutcome {
    Sent,
    Unavailable,
}

pub struct RegistrationFlow {
    auth: Authenticator,
    step: RegistrationStep,
    code: VerificationCode,
}

impl RegistrationFlow {
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth,
            step: RegistrationStep::Register,
            code: VerificationCode::default(),
        }
    }

    /// Pick up a registration saved by an earlier run, if any.
    pub fn restore(auth: Authenticator) -> Self {
        let pending = auth
            .gateway()
            .tokens()
            .load::<PendingRegistration>(PENDING_REGISTRATION_KEY);
        let mut flow = Self::new(auth);
        if let Some(pending) = pending {
            debug!(username = %pending.username, "Restored pending registration");
            flow.step = RegistrationStep::Verify(pending);
        }
        flow
    }

    pub fn step(&self) -> &RegistrationStep {
        &self.step
    }

    pub fn pending(&self) -> Option<&PendingRegistration> {
        match &self.step {
            RegistrationStep::Verify(pending) => Some(pending),
            _ => None,
        }
    }

    /// Supply the password for the sign-in that follows verification.
    pub fn set_password(&mut self, password: impl Into<String>) {
        if let RegistrationStep::Verify(pending) = &mut self.step {
            pending.password = Some(password.into());
        }
    }

    pub fn set_code(&mut self, raw: &str) {
        self.code = VerificationCode::sanitize(raw);
    }

    pub fn code(&self) -> &VerificationCode {
        &self.code
    }

    pub async fn register(&mut self, form: &RegisterForm) -> Result<RegisterOutcome, FlowError> {
        form.validate()?;

        let request = RegisterRequest {
            username: &form.username,
            email: &form.email,
            password: &form.password,
            first_name: &form.first_name,
            last_name: &form.last_name,
        };
        let (status, body) = self.auth.post_json(REGISTER_ENDPOINT, &request).await?;
        if status != StatusCode::OK && status != StatusCode::CREATED {
            warn!(status = status.as_u16(), "Registration failed");
            return Err(FlowError::Rejected(register_failure_message(status.as_u16(), &body)));
        }

        let data = envelope::unwrap_data(body);
        if data.get("requiresVerification").and_then(Value::as_bool) == Some(true) {
            self.enter_verify(PendingRegistration {
                username: form.username.clone(),
                email: form.email.clone(),
                code_sent_at: Utc::now(),
                password: Some(form.password.clone()),
            });
            info!(username = %form.username, "Registered, awaiting verification");
            return Ok(RegisterOutcome::VerificationRequired);
        }

        self.finish();
        let has_session = (data.get("access_token").is_some() || data.get("accessToken").is_some())
            && data.get("user").is_some();
        if has_session {
            let tokens: AuthTokens = envelope::decode(data)?;
            self.auth.establish(&tokens);
            self.auth.gateway().navigator().navigate(LANDING_PATH);
            return Ok(RegisterOutcome::SignedIn { destination: LANDING_PATH.to_string() });
        }

        self.auth.gateway().navigator().navigate(LOGIN_PATH);
        Ok(RegisterOutcome::Registered { destination: LOGIN_PATH.to_string() })
    }

    pub async fn verify(&mut self) -> Result<VerifyOutcome, FlowError> {
        let pending = self.pending().cloned().ok_or(FlowError::NotAwaitingVerification)?;
        self.code.validate()?;

        let request = VerifyRegistrationRequest {
            username: &pending.username,
            verification_code: self.code.as_str(),
        };
        let (status, body) = self.auth.post_json(VERIFY_ENDPOINT, &request).await?;
        if status != StatusCode::OK {
            if status == StatusCode::BAD_REQUEST {
                self.code.clear();
            }
            warn!(status = status.as_u16(), "Verification failed");
            return Err(FlowError::Rejected(verify_failure_message(status.as_u16(), &body)));
        }

        info!(username = %pending.username, "Registration verified");
        self.finish();

        let signed_in = match pending.password.as_deref() {
            Some(password) => match self.auth.sign_in(&pending.username, password).await {
                Ok(tokens) => Some(tokens),
                Err(e) => {
                    warn!(error = %e, "Sign-in after verification failed");
                    None
                }
            },
            None => None,
        };

        match signed_in {
            Some(tokens) => {
                self.auth.establish(&tokens);
                self.auth.gateway().navigator().navigate(LANDING_PATH);
                Ok(VerifyOutcome::SignedIn { destination: LANDING_PATH.to_string() })
            }
            None => {
                self.auth.gateway().navigator().navigate(LOGIN_PATH);
                Ok(VerifyOutcome::VerifiedPleaseLogin { destination: LOGIN_PATH.to_string() })
            }
        }
    }

    /// Seconds until another code may be requested.
    pub fn resend_wait(&self, now: DateTime<Utc>) -> i64 {
        self.pending()
            .map(|p| (RESEND_COOLDOWN_SECS - (now - p.code_sent_at).num_seconds()).max(0))
            .unwrap_or(0)
    }

    pub async fn resend(&mut self) -> Result<ResendOutcome, FlowError> {
        let now = Utc::now();
        let pending = self.pending().cloned().ok_or(FlowError::NotAwaitingVerification)?;
        let wait = self.resend_wait(now);
        if wait > 0 {
            return Err(FlowError::Cooldown(wait));
        }

        let request = ResendVerificationRequest { username: &pending.username };
        match self.auth.post_json(RESEND_ENDPOINT, &request).await {
            Ok((status, _)) if status == StatusCode::OK => {
                self.enter_verify(PendingRegistration { code_sent_at: now, ..pending });
                Ok(ResendOutcome::Sent)
            }
            Ok((status, _)) => {
                debug!(status = status.as_u16(), "Resend not accepted");
                Ok(ResendOutcome::Unavailable)
            }
            Err(e) => {
                warn!(error = %e, "Resend request failed");
                Ok(ResendOutcome::Unavailable)
            }
        }
    }

    /// Abandon the pending registration and start over.
    pub fn back_to_register(&mut self) {
        self.auth.gateway().tokens().discard(PENDING_REGISTRATION_KEY);
        self.step = RegistrationStep::Register;
        self.code.clear();
    }

    fn enter_verify(&mut self, pending: PendingRegistration) {
        self.auth.gateway().tokens().stash(PENDING_REGISTRATION_KEY, &pending);
        self.step = RegistrationStep::Verify(pending);
        self.code.clear();
    }

    fn finish(&mut self) {
        self.auth.gateway().tokens().discard(PENDING_REGISTRATION_KEY);
        self.step = RegistrationStep::Done;
        self.code.clear();
    }
}

// ============================================================================
// Failure messages
// ============================================================================

fn str_at<'a>(value: Option<&'a Value>) -> Option<&'a str> {
    value.and_then(Value::as_str).filter(|s| !s.trim().is_empty())
}

/// `message.message[0]`, then a plain `message`, then a generic notice.
pub fn login_failure_message(body: &Value) -> String {
    let message = body.get("message");
    str_at(message.and_then(|m| m.get("message")).and_then(|m| m.get(0)))
        .or_else(|| str_at(message))
        .unwrap_or(LOGIN_FAILED)
        .to_string()
}

pub fn register_failure_message(status: u16, body: &Value) -> String {
    match status {
        500 => "Internal server error. Please try again later or contact an administrator.".to_string(),
        400 => envelope::server_message(body)
            .unwrap_or_else(|| "Invalid request parameters. Please check your input.".to_string()),
        401 => "User already exists. Please use a different username or email.".to_string(),
        409 => "Username or email already exists. Please use different details.".to_string(),
        _ => "Registration failed. Please check your input.".to_string(),
    }
}

pub fn verify_failure_message(status: u16, body: &Value) -> String {
    match status {
        400 => {
            let server = envelope::server_message(body);
            match server.as_deref() {
                Some(m) if m.contains("expired") => {
                    "The verification code has expired. Please request a new one.".to_string()
                }
                Some(m) if m.contains("invalid") || m.contains("incorrect") => {
                    "The verification code is incorrect. Please check it and try again.".to_string()
                }
                Some(m) => m.to_string(),
                None => "The verification code is malformed or has expired.".to_string(),
            }
        }
        409 => "This account is already verified. Please log in.".to_string(),
        404 => "User not found. Please register again.".to_string(),
        _ => "Verification failed. Please check the code and try again.".to_string(),
    }
}
