//! Session handling for the console.
//!
//! - `TokenStore`: persisted tokens (key-value store plus `auth-token` cookie)
//! - `SessionState`: observable signed-in user for the running process
//! - `RouteGate`: cookie-presence check in front of the protected area
//! - `Authenticator`, `RegistrationFlow`: sign-in, sign-out and sign-up
//! - `CredentialStore`: OS keychain for remembered passwords

pub mod cookie;
pub mod credentials;
pub mod flow;
pub mod gate;
pub mod state;
pub mod storage;
pub mod tokens;
pub mod validation;

pub use credentials::{CredentialStore, Slot as CredentialSlot};
pub use flow::{
    Authenticator, FlowError, PendingRegistration, RegisterOutcome, RegistrationFlow,
    RegistrationStep, ResendOutcome, VerifyOutcome,
};
pub use gate::{GateConfig, GateDecision, RouteGate, LANDING_PATH, LOGIN_PATH};
pub use state::{AuthUser, SessionSnapshot, SessionState};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use tokens::TokenStore;
pub use validation::{LoginForm, RegisterForm, ValidationError, VerificationCode};
