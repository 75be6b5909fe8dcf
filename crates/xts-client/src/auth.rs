//! Session boundary: exchange credentials for a [`Session`].

use serde::Deserialize;
use tracing::{debug, info};
use xts_core::{Credentials, Session};

use crate::error::{ClientError, ClientResult};
use crate::transport::{LoginRequest, MarketDataTransport};

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(rename = "type", default)]
    response_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    result: Option<LoginResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResult {
    #[serde(default)]
    token: Option<String>,
    #[serde(rename = "userID", default)]
    user_id: Option<String>,
    #[serde(default)]
    is_investor_client: bool,
}

/// Log in and return an authenticated session.
///
/// Every failure (transport, non-2xx, unreadable body, missing or empty
/// token) is reported as [`ClientError::Auth`].
pub async fn authenticate(
    transport: &dyn MarketDataTransport,
    credentials: &Credentials,
) -> ClientResult<Session> {
    let request = LoginRequest::from_credentials(credentials);
    let response = transport
        .login(&request)
        .await
        .map_err(|e| ClientError::Auth(e.to_string()))?;

    if !response.is_success() {
        return Err(ClientError::Auth(format!(
            "HTTP {}: {}",
            response.status, response.body
        )));
    }

    let parsed: LoginResponse = serde_json::from_str(&response.body)
        .map_err(|e| ClientError::Auth(format!("Unreadable login response: {e}")))?;

    let result = parsed.result.ok_or_else(|| {
        ClientError::Auth(format!(
            "Login response has no result ({}: {})",
            parsed.response_type.as_deref().unwrap_or("unknown"),
            parsed.description.as_deref().unwrap_or("")
        ))
    })?;

    let token = result.token.unwrap_or_default();
    if token.is_empty() {
        return Err(ClientError::Auth("Login response has an empty token".to_string()));
    }

    let session = Session::authenticated(token, result.user_id.unwrap_or_default());
    debug!(investor_client = result.is_investor_client, "Login result");
    info!(
        user_id = %session.user_id(),
        token = %session.token_preview(),
        "Market data login successful"
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockReply, MockTransport};

    fn credentials() -> Credentials {
        Credentials::new("key", "secret", "WEBAPI")
    }

    #[tokio::test]
    async fn test_login_produces_authenticated_session() {
        let transport = MockTransport::new();
        transport.set_login_reply(MockReply::login("abc.def.ghi", "USER1"));

        let session = authenticate(&transport, &credentials()).await.unwrap();
        assert!(session.is_authenticated());
        assert_eq!(session.token(), "abc.def.ghi");
        assert_eq!(session.user_id(), "USER1");
        assert_eq!(transport.login_count(), 1);
    }

    #[tokio::test]
    async fn test_login_rejected_status_is_auth_error() {
        let transport = MockTransport::new();
        transport.set_login_reply(MockReply::status(401, r#"{"type":"error"}"#));

        let err = authenticate(&transport, &credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn test_login_empty_token_is_auth_error() {
        let transport = MockTransport::new();
        transport.set_login_reply(MockReply::login("", "USER1"));

        let err = authenticate(&transport, &credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn test_login_missing_result_or_garbage_is_auth_error() {
        let transport = MockTransport::new();
        transport.set_login_reply(MockReply::ok(r#"{"type":"error","description":"Invalid key"}"#));
        let err = authenticate(&transport, &credentials()).await.unwrap_err();
        assert!(err.to_string().contains("Invalid key"));

        transport.set_login_reply(MockReply::ok("<html>"));
        let err = authenticate(&transport, &credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }

    #[tokio::test]
    async fn test_login_network_failure_is_auth_error() {
        let transport = MockTransport::new();
        transport.set_login_reply(MockReply::NetworkError("connection refused".to_string()));

        let err = authenticate(&transport, &credentials()).await.unwrap_err();
        assert!(matches!(err, ClientError::Auth(_)));
    }
}
