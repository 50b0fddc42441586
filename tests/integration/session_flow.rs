//! Session flows over the mock transport

use super::*;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use oauth2_session::error::{ConfigurationError, ProtocolError};
use oauth2_session::signing::mac::NormalizedRequest;
use oauth2_session::{
    FlowPhase, HttpMethod, HttpRequest, HttpResponse, HttpTransport, MacAlgorithm, OAuthError,
    OAuthResult, ParameterList, Session, Token, TokenKind, TokenType,
};
use serde_json::json;
use std::time::Duration;

fn bearer_response() -> serde_json::Value {
    json!({
        "access_token": "access-1",
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1"
    })
}

fn expired_bearer(value: &str) -> Token {
    Token::bearer(value)
        .with_lifetime(60)
        .with_issued_at(Utc::now() - ChronoDuration::seconds(600))
}

#[tokio::test]
async fn test_authorization_code_grant_stores_tokens() {
    let session = mock_session(test_config());
    session.set_scope(["read", "write"]).unwrap();
    session.transport().queue_json_response(200, &bearer_response());

    let parsed = session
        .authorization_code_grant("c0de", ParameterList::new().with("device", "phone"))
        .await
        .unwrap();
    assert!(parsed.has_access_token());

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url, "https://auth.example.com/token");
    assert_eq!(
        request.body.as_deref(),
        Some(
            "client_id=client-1&client_secret=secret-1\
             &redirect_uri=https%3A%2F%2Fapp.example.com%2Fcallback\
             &grant_type=authorization_code&code=c0de&device=phone"
        )
    );

    let access = session.access_token().unwrap();
    assert_eq!(access.kind(), TokenKind::Bearer);
    assert_eq!(access.value(), "access-1");
    assert_eq!(access.scope(), "read write");
    assert_eq!(access.lifetime_secs(), 3600);
    assert_eq!(session.refresh_token().unwrap().value(), "refresh-1");
    assert_eq!(session.phase(), FlowPhase::AccessTokenObtained);
}

#[tokio::test]
async fn test_password_grant_with_form_response() {
    let session = mock_session(test_config());
    session.transport().queue_form_response(
        200,
        "access_token=form-token&token_type=Bearer&expires_in=120",
    );

    session
        .password_grant("alice", "hunter2", ParameterList::new())
        .await
        .unwrap();

    let body = session.transport().get_last_request().unwrap().body.unwrap();
    assert!(body.ends_with("&grant_type=password&username=alice&password=hunter2"));
    assert_eq!(session.access_token().unwrap().value(), "form-token");
    assert!(session.refresh_token().is_none());
}

#[tokio::test]
async fn test_failed_grant_leaves_tokens_untouched() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(Token::bearer("old")), Some(Token::refresh("old-refresh")))
        .unwrap();
    session.transport().queue_json_response(
        400,
        &json!({"error": "invalid_grant", "error_description": "code used"}),
    );

    let result = session.authorization_code_grant("c0de", ParameterList::new()).await;
    match result {
        Err(OAuthError::InvalidGrant(detail)) => {
            assert_eq!(detail.description.as_deref(), Some("code used"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(session.access_token().unwrap().value(), "old");
    assert_eq!(session.refresh_token().unwrap().value(), "old-refresh");
}

#[tokio::test]
async fn test_unrecognised_token_type_is_rejected() {
    let session = mock_session(test_config());
    session.transport().queue_json_response(
        200,
        &json!({"access_token": "abc", "token_type": "jwt"}),
    );

    let result = session.client_credentials_grant(ParameterList::new()).await;
    assert!(matches!(result, Err(OAuthError::InvalidTokenType { .. })));
    assert!(session.access_token().is_none());
    assert_eq!(session.phase(), FlowPhase::Unauthenticated);
}

#[tokio::test]
async fn test_bearer_resource_request_with_header() {
    let session = mock_session(test_config());
    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();
    session
        .transport()
        .queue_json_response(200, &json!({"id": 1, "name": "me"}));

    let parsed = session
        .request_resource("me", &ParameterList::new().with("fields", "id,name"), Some(HttpMethod::Get))
        .await
        .unwrap();
    assert_eq!(parsed.parameter("name").as_deref(), Some("me"));
    assert!(!parsed.has_access_token());

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.url, "https://auth.example.com/api/me?fields=id%2Cname");
    assert_eq!(request.header("Authorization"), Some("Bearer abc"));
    assert_eq!(session.access_token().unwrap().value(), "abc");
}

#[tokio::test]
async fn test_bearer_inline_never_sends_header() {
    let config = config_builder("https://auth.example.com")
        .use_authorization_header(false)
        .build()
        .unwrap();
    let session = mock_session(config);
    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();
    session.transport().queue_json_response(200, &json!({}));
    session.transport().queue_json_response(200, &json!({}));

    let params = ParameterList::new().with("photo", "1.jpg");
    session
        .request_resource("/photos", &params, Some(HttpMethod::Post))
        .await
        .unwrap();
    session
        .request_resource("/photos", &params, Some(HttpMethod::Delete))
        .await
        .unwrap();

    let requests = session.transport().get_requests();
    assert!(requests.iter().all(|r| r.header("authorization").is_none()));
    assert_eq!(requests[0].body.as_deref(), Some("photo=1.jpg&access_token=abc"));
    assert_eq!(
        requests[1].url,
        "https://auth.example.com/api/photos?photo=1.jpg&access_token=abc"
    );
}

#[tokio::test]
async fn test_resource_request_uses_preferred_method() {
    let config = config_builder("https://auth.example.com")
        .preferred_method(HttpMethod::Get)
        .build()
        .unwrap();
    let session = mock_session(config);
    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();
    session.transport().queue_json_response(200, &json!({}));

    session
        .request_resource("/me", &ParameterList::new(), None)
        .await
        .unwrap();
    assert_eq!(
        session.transport().get_last_request().unwrap().method,
        HttpMethod::Get
    );
}

#[tokio::test]
async fn test_mac_resource_request_is_signed() {
    let session = mock_session(test_config());
    session.transport().queue_json_response(
        200,
        &json!({
            "access_token": "h480djs93hd8",
            "token_type": "mac",
            "secret": "489dks293j39",
            "algorithm": "hmac-sha-1"
        }),
    );
    session.transport().queue_json_response(200, &json!({"ok": true}));

    session
        .client_credentials_grant(ParameterList::new())
        .await
        .unwrap();
    let token = session.access_token().unwrap();
    assert_eq!(token.kind(), TokenKind::Mac);

    session
        .request_resource("/request", &ParameterList::new().with("hello", "world!"), Some(HttpMethod::Post))
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.body.as_deref(), Some("hello=world%21"));
    let header = request.header("authorization").unwrap().to_string();
    assert!(header.starts_with("MAC id=\"h480djs93hd8\",nonce=\""));
    assert!(!header.contains("ext="));

    let nonce = header
        .split("nonce=\"")
        .nth(1)
        .and_then(|rest| rest.split('"').next())
        .unwrap()
        .to_string();
    assert!(nonce.ends_with(":n0ncen0ncen0nce"));
    let expected = NormalizedRequest {
        nonce,
        method: HttpMethod::Post,
        target: "/api/request".to_string(),
        host: "auth.example.com".to_string(),
        port: 443,
        body_hash: "k9kbtCIy0CkI3/FEfpS/oIDjk6k=".to_string(),
        ext: String::new(),
    };
    let mac = expected.mac(MacAlgorithm::HmacSha1, "489dks293j39");
    assert_eq!(
        header,
        expected.authorization_header("h480djs93hd8", &mac)
    );
}

#[tokio::test]
async fn test_pinned_mac_type_rejects_bearer_token() {
    let config = config_builder("https://auth.example.com")
        .token_type(TokenType::Mac)
        .build()
        .unwrap();
    let session = mock_session(config);
    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();

    let result = session
        .request_resource("/me", &ParameterList::new(), Some(HttpMethod::Get))
        .await;
    assert!(matches!(result, Err(OAuthError::InvalidTokenType { .. })));
    assert!(session.transport().get_requests().is_empty());
}

#[tokio::test]
async fn test_resource_401_carries_www_authenticate() {
    let session = mock_session(test_config());
    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();
    session.transport().queue_response(
        HttpResponse::new(401, "text/plain", "")
            .with_header("WWW-Authenticate", "Bearer error=\"invalid_token\""),
    );

    match session
        .request_resource("/me", &ParameterList::new(), Some(HttpMethod::Get))
        .await
    {
        Err(OAuthError::UnauthorizedClient(detail)) => assert_eq!(
            detail.description.as_deref(),
            Some("Bearer error=\"invalid_token\"")
        ),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_requires_refresh_token() {
    let session = mock_session(test_config());
    assert!(matches!(
        session.refresh_access_token(None).await,
        Err(OAuthError::InvalidTokenType { .. })
    ));

    session.restore_tokens(Some(Token::bearer("abc")), None).unwrap();
    assert!(matches!(
        session.refresh_access_token(Some(HttpMethod::Post)).await,
        Err(OAuthError::InvalidTokenType { .. })
    ));
    assert!(session.transport().get_requests().is_empty());
}

#[tokio::test]
async fn test_refresh_replaces_tokens() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();
    session.transport().queue_json_response(200, &bearer_response());

    let token = session.refresh_access_token(None).await.unwrap();
    assert_eq!(token.value(), "access-1");
    assert_eq!(session.access_token().unwrap().value(), "access-1");
    assert_eq!(session.refresh_token().unwrap().value(), "refresh-1");

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(
        request.body.as_deref(),
        Some("grant_type=refresh_token&client_id=client-1&refresh_token=refresh-0")
    );
    // base64("client-1:secret-1")
    assert_eq!(
        request.header("authorization"),
        Some("Basic Y2xpZW50LTE6c2VjcmV0LTE=")
    );
}

#[tokio::test]
async fn test_refresh_with_get_keeps_refresh_token() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();
    session.transport().queue_json_response(
        200,
        &json!({"access_token": "access-2", "token_type": "bearer"}),
    );

    session
        .refresh_access_token(Some(HttpMethod::Get))
        .await
        .unwrap();

    let request = session.transport().get_last_request().unwrap();
    assert_eq!(request.method, HttpMethod::Get);
    assert!(request.url.starts_with("https://auth.example.com/token?grant_type=refresh_token"));
    assert!(request.body.is_none());
    assert_eq!(session.access_token().unwrap().value(), "access-2");
    assert_eq!(session.refresh_token().unwrap().value(), "refresh-0");
}

#[tokio::test]
async fn test_refresh_without_access_token_changes_nothing() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();
    session
        .transport()
        .queue_json_response(200, &json!({"refresh_token": "refresh-9"}));

    let result = session.refresh_access_token(None).await;
    assert!(matches!(
        result,
        Err(OAuthError::Protocol(ProtocolError::MissingField { .. }))
    ));
    assert_eq!(session.access_token().unwrap().value(), "old");
    assert_eq!(session.refresh_token().unwrap().value(), "refresh-0");
    assert_eq!(session.phase(), FlowPhase::AccessTokenObtained);
}

#[tokio::test]
async fn test_refresh_rejects_put() {
    let session = mock_session(test_config());
    session
        .restore_tokens(None, Some(Token::refresh("refresh-0")))
        .unwrap();

    let result = session.refresh_access_token(Some(HttpMethod::Put)).await;
    assert!(matches!(
        result,
        Err(OAuthError::Configuration(ConfigurationError::UnsupportedMethod { .. }))
    ));
}

#[tokio::test]
async fn test_auto_refresh_before_resource_request() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();
    session.transport().queue_json_response(200, &bearer_response());
    session.transport().queue_json_response(200, &json!({"ok": true}));

    session
        .request_resource("/me", &ParameterList::new(), Some(HttpMethod::Get))
        .await
        .unwrap();

    let requests = session.transport().get_requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].url, "https://auth.example.com/token");
    assert_eq!(requests[1].header("authorization"), Some("Bearer access-1"));
}

#[tokio::test]
async fn test_auto_refresh_disabled_sends_stale_token() {
    let config = config_builder("https://auth.example.com")
        .auto_refresh(false)
        .build()
        .unwrap();
    let session = mock_session(config);
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();
    session.transport().queue_json_response(200, &json!({}));

    session
        .request_resource("/me", &ParameterList::new(), Some(HttpMethod::Get))
        .await
        .unwrap();

    let requests = session.transport().get_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].header("authorization"), Some("Bearer old"));
}

/// Transport that holds every request for a while before answering.
struct SlowTransport {
    inner: oauth2_session::MockHttpTransport,
    delay: Duration,
}

#[async_trait]
impl HttpTransport for SlowTransport {
    async fn send(&self, request: HttpRequest) -> OAuthResult<HttpResponse> {
        tokio::time::sleep(self.delay).await;
        self.inner.send(request).await
    }
}

#[tokio::test]
async fn test_concurrent_refresh_is_single_flight() {
    let transport = SlowTransport {
        inner: oauth2_session::MockHttpTransport::new(),
        delay: Duration::from_millis(50),
    };
    transport.inner.queue_json_response(200, &bearer_response());

    let session = Session::with_components(
        test_config(),
        transport,
        oauth2_session::MockNonceGenerator::new("n"),
    );
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();

    let results =
        futures::future::join_all((0..5).map(|_| session.ensure_valid_access_token())).await;

    for result in results {
        assert_eq!(result.unwrap().value(), "access-1");
    }
    assert_eq!(session.transport().inner.get_requests().len(), 1);
    assert_eq!(session.phase(), FlowPhase::AccessTokenObtained);
}

#[tokio::test]
async fn test_valid_token_needs_no_refresh() {
    let session = mock_session(test_config());
    session
        .restore_tokens(Some(Token::bearer("fresh").with_lifetime(3600)), Some(Token::refresh("r")))
        .unwrap();

    let token = session.ensure_valid_access_token().await.unwrap();
    assert_eq!(token.value(), "fresh");
    assert!(session.transport().get_requests().is_empty());
}

#[tokio::test]
async fn test_cancelled_refresh_clears_phase() {
    let transport = SlowTransport {
        inner: oauth2_session::MockHttpTransport::new(),
        delay: Duration::from_secs(5),
    };
    transport.inner.queue_json_response(200, &bearer_response());

    let session = Session::with_components(
        test_config(),
        transport,
        oauth2_session::MockNonceGenerator::new("n"),
    );
    session
        .restore_tokens(Some(expired_bearer("old")), Some(Token::refresh("refresh-0")))
        .unwrap();

    let result =
        tokio::time::timeout(Duration::from_millis(50), session.refresh_access_token(None)).await;
    assert!(result.is_err());

    assert_eq!(session.phase(), FlowPhase::AccessTokenObtained);
    assert_eq!(session.access_token().unwrap().value(), "old");
    assert!(session.transport().inner.get_requests().is_empty());
}

#[tokio::test]
async fn test_invalid_client_on_401_keeps_description() {
    let session = mock_session(test_config());
    session.transport().queue_response(
        HttpResponse::new(
            401,
            "application/json",
            r#"{"error":"invalid_client","error_description":"bad secret"}"#,
        )
        .with_header("WWW-Authenticate", "Basic realm=\"x\""),
    );

    match session.client_credentials_grant(ParameterList::new()).await {
        Err(OAuthError::InvalidClient(detail)) => {
            assert_eq!(detail.description.as_deref(), Some("bad secret"))
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(session.access_token().is_none());
}
