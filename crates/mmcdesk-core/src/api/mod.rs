//! REST API access for the back-office console.
//!
//! - `AuthGateway`: wraps every protected call with bearer credentials and
//!   one-shot token refresh, ending the session when recovery fails
//! - `ApiClient`: typed customer, product and transaction endpoints on top
//!   of the gateway
//! - `ApiRequest`: replayable request description, including the proxy
//!   tunnelling convention
//!
//! Non-2xx responses are mapped to `ApiError` using the message the server
//! put in the body.

pub mod client;
pub mod envelope;
pub mod error;
pub mod gateway;
pub mod navigator;
pub mod request;

pub use client::ApiClient;
pub use error::ApiError;
pub use gateway::AuthGateway;
pub use navigator::{Navigator, NoopNavigator, RecordingNavigator};
pub use request::{ApiRequest, FormData, ProxyParams, RequestBody};
