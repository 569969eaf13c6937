//! One-time-code login and token revocation against a mock API.

use luxer_core::{
    ApiEndpointConfig, ApiError, AuthSession, ConfigSource, LuxerClient, Token, TransportError,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EMAIL: &str = "resident@example.com";

fn client_for(server: &MockServer) -> LuxerClient {
    let config = ApiEndpointConfig {
        base_url: server.uri(),
        source: ConfigSource::Environment,
    };
    LuxerClient::new(&config).expect("client")
}

#[tokio::test]
async fn test_request_then_verify_yields_token() {
    let server = MockServer::start().await;
    let device = AuthSession::generate_device_identifier();

    Mock::given(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/loginUsingEmail"))
        .and(body_json(json!({"email": EMAIL})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/verifyOtpUsingEmail"))
        .and(body_json(json!({
            "email": EMAIL,
            "uuid": device.as_str(),
            "otp": "123456",
            "as": "token",
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "new-token"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = AuthSession::new(client_for(&server));
    assert!(!session.is_authenticated());

    assert!(session.request_code(EMAIL).await.expect("request code"));
    let token = session
        .verify_code(EMAIL, " 123456\n", &device)
        .await
        .expect("verify code");

    assert!(!token.is_empty());
    assert_eq!(token.as_str(), "new-token");
    assert_eq!(session.token(), Some(&token));
    assert_eq!(session.client().token(), Some(&token));
}

#[tokio::test]
async fn test_unacknowledged_code_request_is_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/loginUsingEmail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ERROR"})))
        .mount(&server)
        .await;

    let session = AuthSession::new(client_for(&server));
    assert!(!session.request_code(EMAIL).await.expect("request code"));
}

#[tokio::test]
async fn test_code_request_transport_failure_propagates() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/loginUsingEmail"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let session = AuthSession::new(client_for(&server));
    let err = session.request_code(EMAIL).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(TransportError::Status { status: 502, .. })));
}

#[tokio::test]
async fn test_rejected_code_keeps_previous_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verifyOtpUsingEmail"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "InvalidOtp",
            "message": "The code is invalid or has expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = AuthSession::with_token(client_for(&server), Token::new("old-token"));
    let device = AuthSession::generate_device_identifier();

    let err = session.verify_code(EMAIL, "000000", &device).await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {err:?}");
    assert_eq!(session.token().map(Token::as_str), Some("old-token"));
}

#[tokio::test]
async fn test_verify_without_token_field_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verifyOtpUsingEmail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "FAILED"})))
        .mount(&server)
        .await;

    let mut session = AuthSession::new(client_for(&server));
    let device = AuthSession::generate_device_identifier();

    let err = session.verify_code(EMAIL, "111111", &device).await.unwrap_err();
    assert!(
        matches!(err, ApiError::Transport(TransportError::Shape { .. })),
        "got {err:?}"
    );
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_empty_token_is_rejected_and_previous_token_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/verifyOtpUsingEmail"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": ""})))
        .mount(&server)
        .await;

    let mut session = AuthSession::with_token(client_for(&server), Token::new("old-token"));
    let device = AuthSession::generate_device_identifier();

    let err = session.verify_code(EMAIL, "123456", &device).await.unwrap_err();
    assert!(
        matches!(err, ApiError::Transport(TransportError::Shape { .. })),
        "got {err:?}"
    );
    assert_eq!(session.token().map(Token::as_str), Some("old-token"));
}

#[tokio::test]
async fn test_revoke_posts_token_and_clears_it() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .and(header("Authorization", "LuxerOneApi tok-9"))
        .and(body_json(json!({"revoke": "tok-9"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "OK"})))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = AuthSession::with_token(client_for(&server), Token::new("tok-9"));
    session.revoke().await;
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_revoke_without_token_is_noop() {
    let server = MockServer::start().await;
    Mock::given(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut session = AuthSession::new(client_for(&server));
    session.revoke().await;
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_revoke_failure_is_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = AuthSession::with_token(client_for(&server), Token::new("tok"));
    session.revoke().await;
    assert!(session.token().is_none());
}

#[tokio::test]
async fn test_user_label_from_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "firstName": "Grace",
            "lastName": "Hopper",
            "email": EMAIL,
            "phone": "+1 555 0100"
        })))
        .mount(&server)
        .await;

    let session = AuthSession::with_token(client_for(&server), Token::new("tok"));
    assert_eq!(session.user_label().await.expect("label"), "Grace Hopper");
}
