//! Shared harness: the router over in-memory stores, with a wiremock server
//! playing the identity provider.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use axum_extra::extract::cookie::Cookie;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use dataroom_service::{
    build_router,
    config::{DataroomConfig, Environment, MongoConfig, OidcConfig, SessionConfig},
    models::{DataroomRole, User},
    services::{InMemoryDocumentStore, InMemoryUserStore, OidcClient, SessionIssuer, UserStore},
    AppState,
};
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    matchers::{bearer_token, body_string_contains, header as header_matcher, method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const CLIENT_ID: &str = "dataroom-client";
pub const CLIENT_SECRET: &str = "dataroom-client-secret";
pub const REQUIRED_GROUP: &str = "Dataroom Admins";
pub const PUBLIC_BASE_URL: &str = "https://dataroom.test";
pub const ACCESS_TOKEN: &str = "provider-access-token";
pub const CODE: &str = "good-code";
pub const FLOW_STATE: &str = "flow-state-1";
pub const VERIFIER: &str = "test-code-verifier";

pub struct TestApp {
    pub router: Router,
    pub provider: MockServer,
    pub users: Arc<InMemoryUserStore>,
    pub documents: Arc<InMemoryDocumentStore>,
    pub sessions: SessionIssuer,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::build(Environment::Dev, true).await
    }

    pub async fn spawn_production() -> Self {
        Self::build(Environment::Prod, true).await
    }

    pub async fn spawn_without_provider() -> Self {
        Self::build(Environment::Dev, false).await
    }

    async fn build(environment: Environment, with_provider: bool) -> Self {
        let provider = MockServer::start().await;

        let oidc_config = with_provider.then(|| OidcConfig {
            issuer: provider.uri(),
            client_id: CLIENT_ID.to_string(),
            client_secret: Secret::new(CLIENT_SECRET.to_string()),
            required_group: REQUIRED_GROUP.to_string(),
            http_timeout_seconds: 5,
        });

        let config = DataroomConfig {
            common: service_core::config::Config::default(),
            environment: environment.clone(),
            service_name: "dataroom-service".to_string(),
            service_version: "test".to_string(),
            log_level: "debug".to_string(),
            otlp_endpoint: None,
            public_base_url: PUBLIC_BASE_URL.to_string(),
            oidc: oidc_config,
            session: SessionConfig {
                secret: Secret::new("integration-test-session-secret-0123456789".to_string()),
            },
            mongodb: MongoConfig {
                uri: "mongodb://unused".to_string(),
                database: "unused".to_string(),
            },
        };

        let oidc = config.oidc.as_ref().map(|c| {
            Arc::new(OidcClient::new(c, &config.public_base_url).expect("valid OIDC config"))
        });
        let sessions = SessionIssuer::new(&config.session, environment.is_production());
        let users = Arc::new(InMemoryUserStore::new());
        let documents = Arc::new(InMemoryDocumentStore::new());

        let state = AppState {
            config: Arc::new(config),
            oidc,
            sessions: sessions.clone(),
            users: users.clone(),
            documents: documents.clone(),
            metrics: None,
        };

        Self {
            router: build_router(state),
            provider,
            users,
            documents,
            sessions,
        }
    }

    pub async fn get(&self, uri: &str, cookies: &[(&str, &str)]) -> Response<Body> {
        let mut builder = Request::builder().uri(uri);
        if !cookies.is_empty() {
            let cookie_header = cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(header::COOKIE, cookie_header);
        }

        self.router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    /// Provider redirect back to us with matching flow cookies.
    pub async fn callback(&self, code: &str) -> Response<Body> {
        self.get(
            &format!("/api/auth/callback?code={}&state={}", code, FLOW_STATE),
            &[("oauth_state", FLOW_STATE), ("oauth_pkce", VERIFIER)],
        )
        .await
    }

    pub async fn add_user(&self, email: &str, role: DataroomRole) -> User {
        let mut user = User::external_admin(email.to_string(), None);
        user.dataroom_role = role;
        self.users.insert(&user).await.unwrap();
        user
    }

    pub fn session_for(&self, user: &User) -> String {
        self.sessions.issue(user).unwrap()
    }
}

pub fn location(response: &Response<Body>) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .unwrap()
        .to_string()
}

pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<Cookie<'static>> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|raw| Cookie::parse(raw.to_string()).ok())
        .find(|cookie| cookie.name() == name)
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

pub fn basic_auth() -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", CLIENT_ID, CLIENT_SECRET))
    )
}

/// ID token as the provider would sign it; we never check the signature.
pub fn id_token(claims: Value) -> String {
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"provider-signing-key"),
    )
    .unwrap()
}

pub async fn mount_token_success(provider: &MockServer, id_token: Option<String>) {
    Mock::given(method("POST"))
        .and(path("/v1/token"))
        .and(header_matcher("authorization", basic_auth().as_str()))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains(format!("code={}", CODE)))
        .and(body_string_contains(format!("code_verifier={}", VERIFIER)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3600,
            "id_token": id_token,
        })))
        .mount(provider)
        .await;
}

pub async fn mount_userinfo(provider: &MockServer, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/userinfo"))
        .and(bearer_token(ACCESS_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(provider)
        .await;
}

pub async fn mount_admin_login(provider: &MockServer, email: &str) {
    mount_token_success(provider, None).await;
    mount_userinfo(
        provider,
        json!({
            "sub": "00u-admin",
            "email": email,
            "name": "Ops Person",
            "groups": ["Everyone", REQUIRED_GROUP],
        }),
    )
    .await;
}
