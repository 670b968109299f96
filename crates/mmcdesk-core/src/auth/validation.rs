//! Client-side checks for the sign-in, registration and verification
//! inputs. Each form reports every failing field, not just the first.

use std::fmt;

use thiserror::Error;

/// Characters a registration password must draw its special character from.
pub const PASSWORD_SPECIALS: &str = "@$!%*?&";

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MIN_USERNAME_LEN: usize = 3;
pub const VERIFICATION_CODE_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join(.0))]
pub struct ValidationError(pub Vec<FieldError>);

fn join(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message)
        .collect::<Vec<_>>()
        .join(" ")
}

impl ValidationError {
    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn message_for(&self, field: &str) -> Option<&'static str> {
        self.0.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

#[derive(Default)]
struct Collector(Vec<FieldError>);

impl Collector {
    fn check(&mut self, ok: bool, field: &'static str, message: &'static str) {
        if !ok {
            self.0.push(FieldError { field, message });
        }
    }

    fn finish(self) -> Result<(), ValidationError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(ValidationError(self.0))
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

// ============================================================================
// Login
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub remember: bool,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Collector::default();
        c.check(!self.username.is_empty(), "username", "Username is required.");
        c.check(
            char_len(&self.password) >= MIN_PASSWORD_LEN,
            "password",
            "Password must be at least 8 characters.",
        );
        c.finish()
    }
}

// ============================================================================
// Registration
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub first_name: String,
    pub last_name: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Collector::default();
        c.check(
            char_len(&self.username) >= MIN_USERNAME_LEN,
            "username",
            "Username must be at least 3 characters.",
        );
        c.check(is_valid_email(&self.email), "email", "Please enter a valid email address.");
        if char_len(&self.password) < MIN_PASSWORD_LEN {
            c.check(false, "password", "Password must be at least 8 characters.");
        } else {
            c.check(
                is_strong_password(&self.password),
                "password",
                "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character.",
            );
        }
        c.check(
            char_len(&self.confirm_password) >= MIN_PASSWORD_LEN,
            "confirmPassword",
            "Confirm Password must be at least 8 characters.",
        );
        c.check(!self.first_name.is_empty(), "firstName", "First name is required.");
        c.check(!self.last_name.is_empty(), "lastName", "Last name is required.");
        c.check(
            self.password == self.confirm_password,
            "confirmPassword",
            "Passwords do not match.",
        );
        c.finish()
    }
}

fn is_password_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || PASSWORD_SPECIALS.contains(ch)
}

/// Lower, upper, digit and special character present, and the password
/// starts with a character from the allowed set.
pub fn is_strong_password(password: &str) -> bool {
    password.chars().next().is_some_and(is_password_char)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

/// `local@domain.tld` with no whitespace and a dot somewhere after the `@`
/// that is neither the first nor last character of the domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || local.starts_with('.') || local.ends_with('.') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| !l.is_empty() && !l.starts_with('-') && !l.ends_with('-'))
        && labels.last().is_some_and(|tld| tld.len() >= 2)
}

// ============================================================================
// Verification code
// ============================================================================

/// Emailed registration code. Input is normalised as it is entered:
/// anything but ASCII digits is dropped and the result capped at six.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerificationCode(String);

impl VerificationCode {
    pub fn sanitize(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(char::is_ascii_digit)
                .take(VERIFICATION_CODE_LEN)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut c = Collector::default();
        c.check(
            self.0.len() == VERIFICATION_CODE_LEN,
            "verificationCode",
            "The verification code must be 6 digits.",
        );
        c.check(
            self.0.chars().all(|ch| ch.is_ascii_digit()),
            "verificationCode",
            "The verification code may only contain digits.",
        );
        c.finish()
    }
}
