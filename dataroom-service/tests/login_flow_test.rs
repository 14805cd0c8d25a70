mod common;

use axum::http::{header, StatusCode};
use axum_extra::extract::cookie::SameSite;
use common::*;
use dataroom_service::models::{AuthProvider, DataroomRole, User};
use dataroom_service::services::UserStore;
use serde_json::json;
use wiremock::{
    matchers::{any, method, path},
    Mock, ResponseTemplate,
};

async fn forbid_provider_calls(app: &TestApp) {
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&app.provider)
        .await;
}

fn assert_login_failure(response: &axum::response::Response, marker: &str) {
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(response), format!("/admin/login?error={}", marker));
    assert!(set_cookie(response, "payload-token").is_none());
}

#[tokio::test]
async fn login_redirects_to_provider_with_fresh_state() {
    let app = TestApp::spawn().await;

    let first = app.get("/api/auth/okta", &[]).await;
    let second = app.get("/api/auth/okta", &[]).await;

    assert_eq!(first.status(), StatusCode::FOUND);
    let target = reqwest::Url::parse(&location(&first)).unwrap();
    assert_eq!(
        target.as_str().split('?').next().unwrap(),
        format!("{}/v1/authorize", app.provider.uri())
    );

    let params: std::collections::HashMap<_, _> = target.query_pairs().into_owned().collect();
    assert_eq!(params["client_id"], CLIENT_ID);
    assert_eq!(params["response_type"], "code");
    assert_eq!(params["scope"], "openid email profile groups");
    assert_eq!(
        params["redirect_uri"],
        format!("{}/api/auth/callback", PUBLIC_BASE_URL)
    );
    assert_eq!(params["code_challenge_method"], "S256");

    let state_cookie = set_cookie(&first, "oauth_state").expect("state cookie");
    assert_eq!(params["state"], state_cookie.value());
    assert_eq!(state_cookie.http_only(), Some(true));
    assert_eq!(state_cookie.same_site(), Some(SameSite::Lax));
    assert!(set_cookie(&first, "oauth_pkce").is_some());

    let other_state = set_cookie(&second, "oauth_state").unwrap();
    assert_ne!(state_cookie.value(), other_state.value());
}

#[tokio::test]
async fn login_without_provider_config_fails_cleanly() {
    let app = TestApp::spawn_without_provider().await;

    let response = app.get("/api/auth/okta", &[]).await;
    assert_login_failure(&response, "auth_failed");

    let response = app.callback(CODE).await;
    assert_login_failure(&response, "auth_failed");
}

#[tokio::test]
async fn missing_code_short_circuits_before_provider() {
    let app = TestApp::spawn().await;
    forbid_provider_calls(&app).await;

    let response = app
        .get(
            &format!("/api/auth/callback?state={}", FLOW_STATE),
            &[("oauth_state", FLOW_STATE), ("oauth_pkce", VERIFIER)],
        )
        .await;
    assert_login_failure(&response, "missing_params");

    let response = app.get("/api/auth/callback?code=abc", &[]).await;
    assert_login_failure(&response, "missing_params");

    app.provider.verify().await;
}

#[tokio::test]
async fn empty_code_or_state_counts_as_missing() {
    let app = TestApp::spawn().await;
    forbid_provider_calls(&app).await;
    let flow_cookies = [("oauth_state", FLOW_STATE), ("oauth_pkce", VERIFIER)];

    let response = app
        .get(
            &format!("/api/auth/callback?code=&state={}", FLOW_STATE),
            &flow_cookies,
        )
        .await;
    assert_login_failure(&response, "missing_params");

    let response = app
        .get("/api/auth/callback?code=good-code&state=", &flow_cookies)
        .await;
    assert_login_failure(&response, "missing_params");

    app.provider.verify().await;
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn malformed_callback_query_redirects_without_detail() {
    let app = TestApp::spawn().await;
    forbid_provider_calls(&app).await;

    let response = app
        .get(
            &format!("/api/auth/callback?code=a&code=b&state={}", FLOW_STATE),
            &[("oauth_state", FLOW_STATE), ("oauth_pkce", VERIFIER)],
        )
        .await;

    assert_login_failure(&response, "missing_params");
    assert!(set_cookie(&response, "oauth_state").is_some());
    let body = body_string(response).await;
    assert!(!body.contains("deserialize"));

    app.provider.verify().await;
}

#[tokio::test]
async fn mismatched_state_is_rejected_before_provider() {
    let app = TestApp::spawn().await;
    forbid_provider_calls(&app).await;

    let response = app
        .get(
            "/api/auth/callback?code=good-code&state=attacker-state",
            &[("oauth_state", FLOW_STATE), ("oauth_pkce", VERIFIER)],
        )
        .await;
    assert_login_failure(&response, "invalid_state");

    // No flow cookies at all, as when the login was never started here.
    let response = app
        .get(
            &format!("/api/auth/callback?code=good-code&state={}", FLOW_STATE),
            &[],
        )
        .await;
    assert_login_failure(&response, "invalid_state");

    app.provider.verify().await;
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn provider_error_parameters_still_need_code_and_state() {
    let app = TestApp::spawn().await;
    forbid_provider_calls(&app).await;

    let response = app
        .get(
            "/api/auth/callback?error=access_denied&error_description=User+cancelled",
            &[],
        )
        .await;
    assert_login_failure(&response, "missing_params");

    app.provider.verify().await;
}

#[tokio::test]
async fn rejected_token_exchange_does_not_leak_provider_body() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "The authorization code is invalid or has expired."
        })))
        .expect(1)
        .mount(&app.provider)
        .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "auth_failed");
    assert!(!location(&response).contains("invalid_grant"));
    let body = body_string(response).await;
    assert!(!body.contains("invalid_grant"));
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn userinfo_failure_is_auth_failed() {
    let app = TestApp::spawn().await;
    mount_token_success(&app.provider, None).await;
    Mock::given(method("GET"))
        .and(path("/v1/userinfo"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&app.provider)
        .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "auth_failed");
    assert!(app.users.is_empty());
}

#[tokio::test]
async fn malformed_token_response_is_auth_failed() {
    let app = TestApp::spawn().await;
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&app.provider)
        .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "auth_failed");
}

#[tokio::test]
async fn non_member_is_unauthorized_and_not_provisioned() {
    let app = TestApp::spawn().await;
    mount_token_success(&app.provider, Some("not-a-jwt".to_string())).await;
    mount_userinfo(
        &app.provider,
        json!({ "sub": "00u-guest", "email": "guest@example.org", "name": "Guest" }),
    )
    .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "unauthorized");
    assert_eq!(app.users.count_by_email("guest@example.org"), 0);
}

#[tokio::test]
async fn id_token_groups_are_used_when_userinfo_has_none() {
    let app = TestApp::spawn().await;
    let token = id_token(json!({
        "sub": "00u-admin",
        "aud": "someone-else",
        "exp": 1,
        "groups": [REQUIRED_GROUP],
    }));
    mount_token_success(&app.provider, Some(token)).await;
    mount_userinfo(
        &app.provider,
        json!({ "sub": "00u-admin", "email": "ops@example.org", "name": "Ops" }),
    )
    .await;

    let response = app.callback(CODE).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response, "payload-token").is_some());
    assert_eq!(app.users.count_by_email("ops@example.org"), 1);
}

#[tokio::test]
async fn userinfo_groups_take_precedence_over_id_token() {
    let app = TestApp::spawn().await;
    let token = id_token(json!({ "sub": "00u-x", "groups": [REQUIRED_GROUP] }));
    mount_token_success(&app.provider, Some(token)).await;
    mount_userinfo(
        &app.provider,
        json!({
            "sub": "00u-x",
            "email": "x@example.org",
            "groups": ["Everyone"],
        }),
    )
    .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "unauthorized");
}

#[tokio::test]
async fn group_match_is_exact() {
    let app = TestApp::spawn().await;
    mount_token_success(&app.provider, None).await;
    mount_userinfo(
        &app.provider,
        json!({
            "sub": "00u-x",
            "email": "x@example.org",
            "groups": ["dataroom admins", "Dataroom Admins "],
        }),
    )
    .await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "unauthorized");
}

#[tokio::test]
async fn successful_login_sets_session_and_provisions_admin() {
    let app = TestApp::spawn().await;
    mount_admin_login(&app.provider, "ops@example.org").await;

    let response = app.callback(CODE).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));

    let session = set_cookie(&response, "payload-token").expect("session cookie");
    assert_eq!(session.http_only(), Some(true));
    assert_eq!(session.same_site(), Some(SameSite::Strict));
    assert_eq!(session.path(), Some("/"));
    assert_eq!(session.max_age(), Some(time::Duration::seconds(604800)));
    assert_ne!(session.secure(), Some(true));

    let state_removal = set_cookie(&response, "oauth_state").expect("state cookie removed");
    assert_eq!(state_removal.max_age(), Some(time::Duration::ZERO));

    let claims = app.sessions.verify(session.value()).unwrap();
    assert_eq!(claims.email, "ops@example.org");
    assert_eq!(claims.collection, "users");

    let user = app
        .users
        .find_by_email("ops@example.org")
        .await
        .unwrap()
        .expect("account provisioned");
    assert_eq!(claims.sub, user.id);
    assert_eq!(user.dataroom_role, DataroomRole::Admin);
    assert_eq!(user.auth_provider, AuthProvider::External);
    assert_eq!(user.name, "Ops Person");

    let body = body_string(response).await;
    assert!(body.contains("url=/admin"));
}

#[tokio::test]
async fn production_session_cookie_is_secure() {
    let app = TestApp::spawn_production().await;
    mount_admin_login(&app.provider, "ops@example.org").await;

    let response = app.callback(CODE).await;

    let session = set_cookie(&response, "payload-token").expect("session cookie");
    assert_eq!(session.secure(), Some(true));
}

#[tokio::test]
async fn repeat_login_reuses_account() {
    let app = TestApp::spawn().await;
    mount_admin_login(&app.provider, "ops@example.org").await;

    let first = app.callback(CODE).await;
    let second = app.callback(CODE).await;

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(app.users.count_by_email("ops@example.org"), 1);

    let first_claims = app
        .sessions
        .verify(set_cookie(&first, "payload-token").unwrap().value())
        .unwrap();
    let second_claims = app
        .sessions
        .verify(set_cookie(&second, "payload-token").unwrap().value())
        .unwrap();
    assert_eq!(first_claims.sub, second_claims.sub);
}

#[tokio::test]
async fn existing_role_is_not_changed_on_login() {
    let app = TestApp::spawn().await;
    let existing = app.add_user("ops@example.org", DataroomRole::Investor).await;
    mount_admin_login(&app.provider, "ops@example.org").await;

    let response = app.callback(CODE).await;

    assert_eq!(response.status(), StatusCode::OK);
    let user = app.users.find_by_id(&existing.id).await.unwrap().unwrap();
    assert_eq!(user.dataroom_role, DataroomRole::Investor);
    assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn existing_local_account_is_not_signed_in() {
    let app = TestApp::spawn().await;
    let local = User::new(
        "ops@example.org".to_string(),
        "Ops".to_string(),
        DataroomRole::Admin,
    );
    app.users.insert(&local).await.unwrap();
    mount_admin_login(&app.provider, "ops@example.org").await;

    let response = app.callback(CODE).await;

    assert_login_failure(&response, "auth_failed");
    assert_eq!(app.users.count_by_email("ops@example.org"), 1);
}

#[tokio::test]
async fn admin_gate_redirects_anonymous_callers() {
    let app = TestApp::spawn().await;

    let response = app.get("/admin", &[]).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/api/auth/okta");

    let response = app.get("/admin", &[("payload-token", "garbage")]).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/api/auth/okta");
}

#[tokio::test]
async fn admin_gate_rejects_sessions_for_unknown_accounts() {
    let app = TestApp::spawn().await;
    let ghost = User::external_admin("ghost@example.org".to_string(), None);
    let token = app.session_for(&ghost);

    let response = app.get("/admin", &[("payload-token", &token)]).await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/api/auth/okta");
}

#[tokio::test]
async fn login_then_admin_dashboard() {
    let app = TestApp::spawn().await;
    mount_admin_login(&app.provider, "ops@example.org").await;

    let response = app.callback(CODE).await;
    let session = set_cookie(&response, "payload-token").unwrap();

    let response = app
        .get("/admin", &[("payload-token", session.value())])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(body.contains("ops@example.org"));
    assert!(body.contains("restricted"));
}

#[tokio::test]
async fn login_page_renders_fixed_messages() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/admin/login?error=%3Cscript%3Ealert(1)%3C%2Fscript%3E", &[])
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(!body.contains("<script>"));
    assert!(body.contains("/api/auth/okta"));
}

#[tokio::test]
async fn logout_clears_session_cookie() {
    let app = TestApp::spawn().await;
    let user = app.add_user("ops@example.org", DataroomRole::Admin).await;
    let token = app.session_for(&user);

    let response = app
        .get("/api/auth/logout", &[("payload-token", &token)])
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    let removal = set_cookie(&response, "payload-token").expect("removal cookie");
    assert_eq!(removal.value(), "");
    assert_eq!(removal.max_age(), Some(time::Duration::ZERO));
}
