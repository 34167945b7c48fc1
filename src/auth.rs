//! Authentication handshake against the hosting service.
//!
//! Two modes are supported:
//!
//! - **Token probe**: call a test endpoint, optionally presenting a bearer
//!   token. The server may answer with a fresh token in its `Authorization`
//!   header, or with a `WWW-Authenticate` challenge on 401.
//! - **Signed-assertion exchange**: post a DID Document and its private key
//!   to the verification endpoint and receive an access token. The key is
//!   forwarded as-is; signing happens on the other side.
//!
//! Each call is a single exchange. Retrying is left to the caller, who can
//! fold results through [`AuthState::advance`] to carry tokens forward.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::did::endpoint_url;
use crate::error::ResolutionError;
use crate::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::types::{ApiResult, AuthRequest, AuthResponse, AuthResult, TestEndpoint};
use crate::validation;

const BEARER_PREFIX: &str = "Bearer ";

/// Where a caller stands after the latest probe
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    /// The last probe succeeded; `token` is the most recent one issued
    Authenticated { token: Option<String> },
    /// The server answered 401 with a challenge
    Challenged { www_authenticate: String },
    /// The probe failed without a challenge
    Failed { status: u16, error: String },
}

impl AuthState {
    /// The state a single probe result leads to
    pub fn from_result(result: &AuthResult) -> Self {
        if result.ok {
            return Self::Authenticated {
                token: result.token.clone(),
            };
        }

        match (&result.www_authenticate, result.status) {
            (Some(challenge), status) if status != 0 => Self::Challenged {
                www_authenticate: challenge.clone(),
            },
            _ => Self::Failed {
                status: result.status,
                error: result
                    .error_message
                    .clone()
                    .unwrap_or_else(|| format!("Authentication test failed with status: {}", result.status)),
            },
        }
    }

    /// Moves to the state `result` leads to.
    ///
    /// A successful probe that did not issue a new token keeps the token
    /// that was already held.
    pub fn advance(self, result: &AuthResult) -> Self {
        match (Self::from_result(result), self) {
            (Self::Authenticated { token: None }, Self::Authenticated { token }) => {
                Self::Authenticated { token }
            }
            (next, _) => next,
        }
    }

    /// The bearer token to present on the next probe, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authenticated { token } => token.as_deref(),
            _ => None,
        }
    }
}

/// Client for the authentication endpoints
#[derive(Clone)]
pub struct AuthClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl AuthClient {
    /// Creates a client that talks HTTP through `reqwest`
    pub fn new(config: ClientConfig) -> Result<Self, ResolutionError> {
        let transport = ReqwestTransport::new(&config)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Creates a client on top of an arbitrary transport
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// Probes a test endpoint, presenting `token` when one is given
    pub async fn probe(&self, endpoint: TestEndpoint, token: Option<&str>) -> AuthResult {
        match self.try_probe(endpoint, token).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, endpoint = endpoint.as_str(), "authentication probe failed");
                AuthResult::from_error(&e)
            }
        }
    }

    async fn try_probe(
        &self,
        endpoint: TestEndpoint,
        token: Option<&str>,
    ) -> Result<AuthResult, ResolutionError> {
        let url = endpoint_url(&self.config.base_url, &["wba", endpoint.as_str()])?;

        let mut request = HttpRequest::new(Method::Get, url);
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            request = request.bearer_auth(token);
        }

        let response = self.transport.fetch(request).await?;
        let result = probe_result(response);

        debug!(
            status = result.status,
            issued_token = result.token.is_some(),
            challenged = result.www_authenticate.is_some(),
            "authentication probe answered"
        );

        Ok(result)
    }

    /// Exchanges a DID Document and its private key for an access token.
    ///
    /// The document is validated first; an invalid document or an empty key
    /// fails without a request being made.
    pub async fn exchange(&self, did_document: &str, private_key: &str) -> ApiResult<AuthResponse> {
        self.try_exchange(did_document, private_key).await.into()
    }

    async fn try_exchange(
        &self,
        did_document: &str,
        private_key: &str,
    ) -> Result<ApiResult<AuthResponse>, ResolutionError> {
        validation::validate(did_document)?;
        if private_key.trim().is_empty() {
            return Ok(ApiResult::failure(0, "Private key is empty"));
        }

        let url = endpoint_url(&self.config.base_url, &["wba", "demo", "auth"])?;
        let body = AuthRequest {
            did_document: did_document.to_string(),
            private_key: private_key.to_string(),
            auth_url: self.config.auth_url.clone(),
        };

        info!(%url, auth_url = %self.config.auth_url, "exchanging signed assertion");

        let request = HttpRequest::new(Method::Post, url).json_body(serde_json::to_string(&body)?);
        let response = self.transport.fetch(request).await?;

        if !response.is_success() {
            let message = serde_json::from_str::<AuthResponse>(&response.body)
                .ok()
                .and_then(|r| r.error_message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| format!("Authentication failed with status: {}", response.status));
            warn!(status = response.status, %message, "signed-assertion exchange rejected");
            return Ok(ApiResult::failure(response.status, message));
        }

        let auth: AuthResponse = serde_json::from_str(&response.body)?;
        Ok(ApiResult::success(response.status, auth))
    }
}

fn probe_result(response: HttpResponse) -> AuthResult {
    let ok = response.is_success();
    let token = response.header("Authorization").map(strip_bearer);
    let www_authenticate = response.header("WWW-Authenticate").map(str::to_string);

    let error_message = if ok {
        None
    } else if !response.body.trim().is_empty() {
        Some(response.body.clone())
    } else {
        Some(format!("Authentication test failed with status: {}", response.status))
    };

    AuthResult {
        ok,
        status: response.status,
        token,
        www_authenticate,
        body: ok.then(|| response.body),
        error_message,
    }
}

fn strip_bearer(value: &str) -> String {
    value
        .strip_prefix(BEARER_PREFIX)
        .unwrap_or(value)
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use crate::validation::tests::MINIMAL_DOCUMENT;
    use serde_json::json;

    const TEST_URL: &str = "https://pi-unlimited.com/wba/test";
    const TEST401_URL: &str = "https://pi-unlimited.com/wba/test401";
    const EXCHANGE_URL: &str = "https://pi-unlimited.com/wba/demo/auth";
    const CHALLENGE: &str = r#"Bearer error="invalid_request", error_description="Missing authorization header""#;

    fn mock_client(transport: MockTransport) -> (AuthClient, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let client = AuthClient::with_transport(ClientConfig::default(), transport.clone());
        (client, transport)
    }

    #[tokio::test]
    async fn test_probe_without_token_is_challenged() {
        let (client, transport) = mock_client(MockTransport::new().route(
            Method::Get,
            TEST401_URL,
            HttpResponse::new(401, "").with_header("WWW-Authenticate", CHALLENGE),
        ));

        let result = client.probe(TestEndpoint::Test401, None).await;
        assert!(!result.ok);
        assert_eq!(result.status, 401);
        assert_eq!(result.www_authenticate.as_deref(), Some(CHALLENGE));
        assert!(result.body.is_none());
        assert_eq!(transport.requests()[0].header_value("Authorization"), None);

        assert_eq!(
            AuthState::from_result(&result),
            AuthState::Challenged {
                www_authenticate: CHALLENGE.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_probe_with_token_strips_bearer_prefix() {
        let (client, transport) = mock_client(MockTransport::new().route(
            Method::Get,
            TEST_URL,
            HttpResponse::new(200, "Hello, authenticated agent")
                .with_header("authorization", "Bearer refreshed-token"),
        ));

        let result = client.probe(TestEndpoint::Test, Some("old-token")).await;
        assert!(result.ok);
        assert_eq!(result.status, 200);
        assert_eq!(result.token.as_deref(), Some("refreshed-token"));
        assert_eq!(result.body.as_deref(), Some("Hello, authenticated agent"));
        assert!(result.error_message.is_none());
        assert_eq!(
            transport.requests()[0].header_value("Authorization"),
            Some("Bearer old-token")
        );
    }

    #[tokio::test]
    async fn test_probe_empty_token_is_not_sent() {
        let (client, transport) = mock_client(MockTransport::new().route(
            Method::Get,
            TEST_URL,
            HttpResponse::new(200, "ok"),
        ));

        client.probe(TestEndpoint::Test, Some("")).await;
        assert_eq!(transport.requests()[0].header_value("Authorization"), None);
    }

    #[tokio::test]
    async fn test_probe_rejection_without_challenge() {
        let (client, _) = mock_client(MockTransport::new().route(
            Method::Get,
            TEST_URL,
            HttpResponse::new(500, ""),
        ));

        let result = client.probe(TestEndpoint::Test, None).await;
        assert!(!result.ok);
        assert_eq!(result.status, 500);
        assert!(matches!(
            AuthState::from_result(&result),
            AuthState::Failed { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_probe_transport_failure() {
        let (client, _) = mock_client(MockTransport::unreachable());

        let result = client.probe(TestEndpoint::Test, Some("token")).await;
        assert!(!result.ok);
        assert_eq!(result.status, 0);
        assert!(!result.error_message.unwrap().is_empty());
    }

    #[test]
    fn test_state_keeps_token_when_none_issued() {
        let issued = AuthResult {
            ok: true,
            status: 200,
            token: Some("t1".to_string()),
            ..Default::default()
        };
        let silent = AuthResult {
            ok: true,
            status: 200,
            ..Default::default()
        };

        let state = AuthState::default().advance(&issued).advance(&silent);
        assert_eq!(state.token(), Some("t1"));

        let challenged = AuthResult {
            ok: false,
            status: 401,
            www_authenticate: Some(CHALLENGE.to_string()),
            ..Default::default()
        };
        let state = state.advance(&challenged);
        assert_eq!(state.token(), None);
        assert!(matches!(state, AuthState::Challenged { .. }));
    }

    #[test]
    fn test_strip_bearer() {
        assert_eq!(strip_bearer("Bearer abc"), "abc");
        assert_eq!(strip_bearer("abc"), "abc");
    }

    #[tokio::test]
    async fn test_exchange_posts_request() {
        let (client, transport) = mock_client(MockTransport::new().route(
            Method::Post,
            EXCHANGE_URL,
            HttpResponse::new(
                200,
                json!({
                    "authorization": "DIDWba did=\"did:wba:example.com:user:alice\"",
                    "auth_code": 200,
                    "error_message": null,
                    "access_token": "access-123",
                })
                .to_string(),
            ),
        ));

        let result = client.exchange(MINIMAL_DOCUMENT, "opaque-key").await;
        assert!(result.ok);
        let auth = result.data.unwrap();
        assert_eq!(auth.access_token, "access-123");
        assert_eq!(auth.auth_code, 200);
        assert!(auth.error_message.is_none());

        let request = &transport.requests()[0];
        assert_eq!(request.method, Method::Post);
        let sent: AuthRequest = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(sent.did_document, MINIMAL_DOCUMENT);
        assert_eq!(sent.private_key, "opaque-key");
        assert_eq!(sent.auth_url, "https://pi-unlimited.com/wba/test");
    }

    #[tokio::test]
    async fn test_exchange_rejection_uses_server_message() {
        let (client, _) = mock_client(MockTransport::new().route(
            Method::Post,
            EXCHANGE_URL,
            HttpResponse::new(
                401,
                json!({"auth_code": 401, "error_message": "signature mismatch"}).to_string(),
            ),
        ));

        let result = client.exchange(MINIMAL_DOCUMENT, "opaque-key").await;
        assert!(!result.ok);
        assert_eq!(result.status, 401);
        assert_eq!(result.error.as_deref(), Some("signature mismatch"));
    }

    #[tokio::test]
    async fn test_exchange_fails_fast_on_invalid_input() {
        let (client, transport) = mock_client(MockTransport::new());

        let invalid_doc = client.exchange("{}", "opaque-key").await;
        assert!(!invalid_doc.ok);
        assert_eq!(invalid_doc.status, 0);

        let empty_key = client.exchange(MINIMAL_DOCUMENT, "  ").await;
        assert!(!empty_key.ok);
        assert_eq!(empty_key.status, 0);

        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_exchange_transport_failure() {
        let (client, _) = mock_client(MockTransport::unreachable());

        let result = client.exchange(MINIMAL_DOCUMENT, "opaque-key").await;
        assert!(!result.ok);
        assert_eq!(result.status, 0);
        assert!(result.error.is_some());
    }
}
