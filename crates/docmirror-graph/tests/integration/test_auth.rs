//! Integration tests for the device code flow and token refresh against a
//! mock identity endpoint

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use docmirror_graph::auth::{
    refresh_tokens, DeviceCodeFlow, DevicePrompt, GraphSession, LoginMethod, OAuth2Config, Tokens,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_PATH: &str = "/organizations/oauth2/v2.0/token";
const DEVICE_PATH: &str = "/organizations/oauth2/v2.0/devicecode";

fn config(server: &MockServer) -> OAuth2Config {
    OAuth2Config::new("client-123", "organizations").with_authority(server.uri())
}

fn token_body(access: &str, refresh: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access,
        "token_type": "Bearer",
        "expires_in": 3600,
        "scope": "Sites.Read.All Files.Read.All"
    });
    if let Some(refresh) = refresh {
        body["refresh_token"] = refresh.into();
    }
    body
}

async fn mount_device_code(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(DEVICE_PATH))
        .and(body_string_contains("client_id=client-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "device_code": "dev-code-1",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900,
            "interval": 1
        })))
        .mount(server)
        .await;
}

fn recording_prompt() -> (Arc<Mutex<Vec<DevicePrompt>>>, impl Fn(&DevicePrompt) + Send + Sync) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |prompt: &DevicePrompt| {
        sink.lock().unwrap().push(prompt.clone());
    })
}

#[tokio::test]
async fn test_device_code_flow_obtains_tokens() {
    let server = MockServer::start().await;
    mount_device_code(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("device_code=dev-code-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-1", Some("refresh-1"))))
        .mount(&server)
        .await;

    let (seen, prompt) = recording_prompt();
    let tokens = DeviceCodeFlow::new(&config(&server))
        .unwrap()
        .login(&prompt)
        .await
        .expect("device code sign-in failed");

    assert_eq!(tokens.access_token, "access-1");
    assert_eq!(tokens.refresh_token.as_deref(), Some("refresh-1"));
    assert!(tokens.expires_at > Utc::now() + Duration::minutes(50));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].user_code, "ABCD-EFGH");
    assert!(seen[0].verification_uri.contains("devicelogin"));
}

#[tokio::test]
async fn test_device_code_flow_polls_while_pending() {
    let server = MockServer::start().await;
    mount_device_code(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "authorization_pending",
            "error_description": "The user has not yet completed sign-in"
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("access-2", None)))
        .mount(&server)
        .await;

    let (_seen, prompt) = recording_prompt();
    let tokens = DeviceCodeFlow::new(&config(&server))
        .unwrap()
        .login(&prompt)
        .await
        .expect("device code sign-in failed");

    assert_eq!(tokens.access_token, "access-2");
}

#[tokio::test]
async fn test_session_connect_with_device_code() {
    let server = MockServer::start().await;
    mount_device_code(&server).await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("session-access", Some("r"))))
        .mount(&server)
        .await;

    let (_seen, prompt) = recording_prompt();
    let session = GraphSession::connect(config(&server), LoginMethod::DeviceCode, &prompt, false)
        .await
        .expect("connect failed");

    assert_eq!(session.access_token().await.unwrap(), "session-access");
}

#[tokio::test]
async fn test_refresh_keeps_refresh_token_when_not_rotated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=old-refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("fresh", None)))
        .mount(&server)
        .await;

    let tokens = refresh_tokens(&config(&server), "old-refresh").await.unwrap();
    assert_eq!(tokens.access_token, "fresh");
    assert_eq!(tokens.refresh_token.as_deref(), Some("old-refresh"));
}

#[tokio::test]
async fn test_session_refreshes_expiring_token_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("refreshed", Some("r-2"))))
        .expect(1)
        .mount(&server)
        .await;

    let session = GraphSession::from_tokens(
        config(&server),
        Tokens {
            access_token: "stale".into(),
            refresh_token: Some("r-1".into()),
            expires_at: Utc::now() + Duration::minutes(1),
        },
        false,
    );

    assert_eq!(session.access_token().await.unwrap(), "refreshed");
    // Now valid for an hour, so no second refresh
    assert_eq!(session.access_token().await.unwrap(), "refreshed");
    assert!(session.expires_at().await > Utc::now() + Duration::minutes(50));
}

#[tokio::test]
async fn test_session_refresh_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "Refresh token has expired"
        })))
        .mount(&server)
        .await;

    let session = GraphSession::from_tokens(
        config(&server),
        Tokens {
            access_token: "stale".into(),
            refresh_token: Some("expired".into()),
            expires_at: Utc::now() - Duration::minutes(1),
        },
        false,
    );

    assert!(session.access_token().await.is_err());
}
