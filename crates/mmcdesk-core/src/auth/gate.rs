//! Navigation gate for protected areas.
//!
//! The gate looks only at whether the `auth-token` cookie is present. It
//! does not validate the token; the API rejects stale tokens with a 401
//! and the gateway takes it from there.

use super::cookie::{find_in_header, AUTH_COOKIE};

pub const PROTECTED_PREFIX: &str = "/dashboard";
pub const LOGIN_PATH: &str = "/auth/v1/login";
pub const LANDING_PATH: &str = "/dashboard";

/// Login pages an authenticated user is bounced away from
const LOGIN_ALIASES: [&str; 3] = ["/auth/v1/login", "/auth/v2/login", "/auth/login"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Redirect(String),
}

#[derive(Debug, Clone)]
pub struct GateConfig {
    pub protected_prefix: String,
    pub login_path: String,
    pub login_aliases: Vec<String>,
    pub landing_path: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            protected_prefix: PROTECTED_PREFIX.to_string(),
            login_path: LOGIN_PATH.to_string(),
            login_aliases: LOGIN_ALIASES.iter().map(|s| s.to_string()).collect(),
            landing_path: LANDING_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RouteGate {
    config: GateConfig,
}

impl RouteGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn evaluate(&self, path: &str, cookie_token: Option<&str>) -> GateDecision {
        let has_token = cookie_token.is_some_and(|t| !t.is_empty());

        if !has_token && path.starts_with(&self.config.protected_prefix) {
            return GateDecision::Redirect(self.config.login_path.clone());
        }

        if has_token && self.config.login_aliases.iter().any(|alias| alias == path) {
            return GateDecision::Redirect(self.config.landing_path.clone());
        }

        GateDecision::Proceed
    }

    /// Evaluate against a raw `Cookie:` request header.
    pub fn evaluate_request(&self, path: &str, cookie_header: Option<&str>) -> GateDecision {
        let token = cookie_header.and_then(|h| find_in_header(h, AUTH_COOKIE));
        self.evaluate(path, token.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_without_cookie_redirects_to_login() {
        let gate = RouteGate::default();
        assert_eq!(
            gate.evaluate("/dashboard/customer", None),
            GateDecision::Redirect("/auth/v1/login".to_string())
        );
        assert_eq!(
            gate.evaluate("/dashboard", Some("")),
            GateDecision::Redirect("/auth/v1/login".to_string())
        );
    }

    #[test]
    fn test_login_with_cookie_redirects_to_dashboard() {
        let gate = RouteGate::default();
        for path in ["/auth/v1/login", "/auth/v2/login", "/auth/login"] {
            assert_eq!(
                gate.evaluate(path, Some("t1")),
                GateDecision::Redirect("/dashboard".to_string())
            );
        }
    }

    #[test]
    fn test_pass_through() {
        let gate = RouteGate::default();
        assert_eq!(gate.evaluate("/dashboard/products", Some("t1")), GateDecision::Proceed);
        assert_eq!(gate.evaluate("/auth/v1/login", None), GateDecision::Proceed);
        assert_eq!(gate.evaluate("/auth/v1/register", Some("t1")), GateDecision::Proceed);
        assert_eq!(gate.evaluate("/", None), GateDecision::Proceed);
    }

    #[test]
    fn test_evaluate_request_reads_cookie_header() {
        let gate = RouteGate::default();
        assert_eq!(
            gate.evaluate_request("/dashboard", Some("theme=dark; auth-token=t1")),
            GateDecision::Proceed
        );
        assert_eq!(
            gate.evaluate_request("/dashboard", Some("theme=dark")),
            GateDecision::Redirect(LOGIN_PATH.to_string())
        );
        assert_eq!(
            gate.evaluate_request("/auth/login", Some("auth-token=t1")),
            GateDecision::Redirect(LANDING_PATH.to_string())
        );
    }

    #[test]
    fn test_custom_config() {
        let gate = RouteGate::new(GateConfig {
            protected_prefix: "/admin".to_string(),
            login_path: "/signin".to_string(),
            login_aliases: vec!["/signin".to_string()],
            landing_path: "/admin/home".to_string(),
        });
        assert_eq!(gate.evaluate("/admin/x", None), GateDecision::Redirect("/signin".to_string()));
        assert_eq!(gate.evaluate("/signin", Some("t")), GateDecision::Redirect("/admin/home".to_string()));
        assert_eq!(gate.evaluate("/dashboard", None), GateDecision::Proceed);
    }
}
