use serde::{Deserialize, Serialize};

/// Profile of the signed-in back-office user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

/// Login response: the access token plus the user it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthTokens {
    #[serde(alias = "accessToken")]
    pub access_token: String,
    pub user: User,
    #[serde(default, alias = "refreshToken", skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Token pair minted by the refresh endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedTokens {
    #[serde(alias = "access_token")]
    pub access_token: String,
    #[serde(alias = "refresh_token")]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRegistrationRequest<'a> {
    pub username: &'a str,
    pub verification_code: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResendVerificationRequest<'a> {
    pub username: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_tokens_accepts_both_casings() {
        let snake: AuthTokens = serde_json::from_str(
            r#"{"access_token":"t1","user":{"userId":"u1","username":"amy","email":"a@x.io","role":"admin"}}"#,
        )
        .unwrap();
        assert_eq!(snake.access_token, "t1");
        assert_eq!(snake.refresh_token, None);
        assert_eq!(snake.user.role, "admin");

        let camel: AuthTokens = serde_json::from_str(
            r#"{"accessToken":"t2","refreshToken":"r2","user":{"userId":"u1"}}"#,
        )
        .unwrap();
        assert_eq!(camel.access_token, "t2");
        assert_eq!(camel.refresh_token.as_deref(), Some("r2"));
        assert_eq!(camel.user.username, "");
    }

    #[test]
    fn test_refresh_request_shape() {
        let body = serde_json::to_value(RefreshRequest { refresh_token: "r1" }).unwrap();
        assert_eq!(body, serde_json::json!({ "refreshToken": "r1" }));
    }
}
