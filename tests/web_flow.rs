//! End-to-end flow through the router with the identity provider stubbed.

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use serde_json::json;
use tower::ServiceExt;
use url::Url;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reportdeck::{AppConfig, AppState};

fn test_config(server: &MockServer) -> AppConfig {
    AppConfig::new(
        "test-client",
        "test-secret",
        "http://localhost:3456/redirect".parse().unwrap(),
    )
    .with_authority(server.uri().parse().unwrap())
    .with_userinfo_url(format!("{}/oidc/userinfo", server.uri()).parse().unwrap())
    .with_reporting_base(format!("{}/v1.0/myorg", server.uri()).parse().unwrap())
    .with_pipeline_base(server.uri().parse().unwrap())
    .with_graph_base(format!("{}/v1.0", server.uri()).parse().unwrap())
    .with_secure_cookies(false)
}

fn test_app(server: &MockServer) -> Router {
    reportdeck::router(AppState::new(test_config(server)))
}

/// Cookie pairs (`name=value`) set by a response.
fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .map(ToString::to_string)
        .collect()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
}

async fn get(app: &Router, uri: &str, cookies: &[String]) -> Response {
    let mut request = Request::builder().uri(uri);
    if !cookies.is_empty() {
        request = request.header(header::COOKIE, cookies.join("; "));
    }
    app.clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn stub_sign_in_endpoints(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "T",
            "token_type": "Bearer",
            "expires_in": 3600,
            "refresh_token": "R",
            "scope": "https://analysis.windows.net/powerbi/api/.default",
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/oidc/userinfo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": "sub-1",
            "preferred_username": "u@x.com",
            "name": "U",
        })))
        .mount(server)
        .await;
}

/// Run the sign-in flow; returns the cookies a signed-in browser would hold.
async fn sign_in(app: &Router, server: &MockServer) -> Vec<String> {
    stub_sign_in_endpoints(server).await;

    let login = get(app, "/login", &[]).await;
    assert!(login.status().is_redirection());
    let login_cookies = set_cookies(&login);
    let auth_url: Url = location(&login).parse().unwrap();
    let state = auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .expect("authorization URL must carry state");

    let callback = get(
        app,
        &format!("/redirect?code=abc&state={state}"),
        &login_cookies,
    )
    .await;
    assert!(callback.status().is_redirection());
    assert_eq!(location(&callback), "/dashboard");

    set_cookies(&callback)
        .into_iter()
        .filter(|c| c.starts_with("__reportdeck_session="))
        .collect()
}

#[tokio::test]
async fn test_landing_page_when_anonymous() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(&app, "/", &[]).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("Sign in"));
}

#[tokio::test]
async fn test_login_redirects_to_authority_with_client_and_scopes() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(&app, "/login", &[]).await;
    assert!(response.status().is_redirection());

    let target = location(&response);
    assert!(target.starts_with(&format!("{}/oauth2/v2.0/authorize", server.uri())));
    assert!(target.contains("client_id=test-client"));
    assert!(target.contains("powerbi"));
    assert!(target.contains("code_challenge_method=S256"));
}

#[tokio::test]
async fn test_full_sign_in_dashboard_logout_flow() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    // Anonymous dashboard access goes back to the landing page, never a render.
    let response = get(&app, "/dashboard", &[]).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let session_cookies = sign_in(&app, &server).await;
    assert_eq!(session_cookies.len(), 1);

    // Signed in: the dashboard renders the username from the session.
    let response = get(&app, "/dashboard", &session_cookies).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("u@x.com"));
    assert!(body.contains("Welcome, U"));

    // The landing page now forwards to the dashboard.
    let response = get(&app, "/", &session_cookies).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/dashboard");

    // Logout destroys the session.
    let response = get(&app, "/logout", &session_cookies).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let response = get(&app, "/dashboard", &session_cookies).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_without_session_still_redirects() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(&app, "/logout", &[]).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_callback_with_mismatched_state_is_rejected() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    stub_sign_in_endpoints(&server).await;

    let login = get(&app, "/login", &[]).await;
    let login_cookies = set_cookies(&login);

    let response = get(
        &app,
        "/redirect?code=abc&state=forged-state",
        &login_cookies,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_callback_with_provider_error_is_rejected() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    let response = get(
        &app,
        "/redirect?error=access_denied&error_description=denied",
        &[],
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn test_failed_token_exchange_is_a_generic_500() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    Mock::given(method("POST"))
        .and(path("/oauth2/v2.0/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The authorization code has expired",
        })))
        .mount(&server)
        .await;

    let login = get(&app, "/login", &[]).await;
    let login_cookies = set_cookies(&login);
    let auth_url: Url = location(&login).parse().unwrap();
    let state = auth_url
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.to_string())
        .unwrap();

    let response = get(
        &app,
        &format!("/redirect?code=expired&state={state}"),
        &login_cookies,
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_string(response).await;
    assert!(!body.contains("invalid_grant"), "provider detail must not leak");
}

#[tokio::test]
async fn test_embed_token_bundle_for_signed_in_user() {
    let server = MockServer::start().await;
    let config = test_config(&server);
    let workspace_id = config.workspace_id().to_string();
    let report_id = config.report_id().to_string();
    let app = reportdeck::router(AppState::new(config));

    let session_cookies = sign_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1.0/myorg/groups/{workspace_id}/reports/{report_id}/GenerateToken"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "ET",
            "tokenId": "tid",
            "expiration": "2026-01-01T00:00:00Z",
        })))
        .mount(&server)
        .await;

    let response = get(&app, "/embed-token", &session_cookies).await;
    assert_eq!(response.status(), StatusCode::OK);

    let bundle: serde_json::Value =
        serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(bundle["accessToken"], "T");
    assert_eq!(bundle["embedToken"]["token"], "ET");
    assert_eq!(bundle["workspaceId"], workspace_id);
    assert_eq!(bundle["reportId"], report_id);

    let embed_url = bundle["embedTokenURL"].as_str().unwrap();
    assert!(embed_url.contains(&format!("reportId={report_id}")));
    assert!(embed_url.contains(&format!("groupId={workspace_id}")));
    assert!(embed_url.contains("embedToken=ET"));
}

#[tokio::test]
async fn test_protected_routes_redirect_when_anonymous() {
    let server = MockServer::start().await;
    let app = test_app(&server);

    for uri in ["/embed-token", "/trigger-pipeline", "/send-email"] {
        let response = get(&app, uri, &[]).await;
        assert!(
            response.status().is_redirection(),
            "{uri} should redirect anonymous visitors"
        );
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_trigger_pipeline_reports_acceptance_and_failure() {
    let server = MockServer::start().await;
    let app = test_app(&server);
    let session_cookies = sign_in(&app, &server).await;

    Mock::given(method("POST"))
        .and(wiremock::matchers::path_regex(
            "^/workspaces/.+/items/.+/jobs/instances$",
        ))
        .respond_with(ResponseTemplate::new(202))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let response = get(&app, "/trigger-pipeline", &session_cookies).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    // Once the single accepting stub is spent, the server answers 404 and
    // the route must surface a gateway error instead of pretending success.
    let response = get(&app, "/trigger-pipeline", &session_cookies).await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}
