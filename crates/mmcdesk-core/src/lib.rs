//! mmcdesk core library.
//!
//! Client-side plumbing for the mmc back-office console: session
//! persistence, the authenticated request gateway, the route gate, the
//! sign-in and registration flows, and typed access to the customer,
//! product and transaction resources of the remote REST API.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, AuthGateway};
pub use auth::{RouteGate, SessionState, TokenStore};
pub use config::Config;
