//! OIDC login entry point, callback and logout.

use askama::Template;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::found;
use crate::services::{find_or_provision_admin, oidc::resolve_groups, OidcError, ServiceError};
use crate::AppState;

/// Holds the per-flow `state` value between redirect and callback.
pub const STATE_COOKIE: &str = "oauth_state";

/// Holds the PKCE verifier between redirect and callback.
pub const PKCE_COOKIE: &str = "oauth_pkce";

pub const LOGIN_PAGE: &str = "/admin/login";
pub const LOGIN_ENTRY: &str = "/api/auth/okta";

const FLOW_COOKIE_MINUTES: i64 = 5;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Terminal login failures. Each maps to a short marker on the login page;
/// the detail only goes to the logs.
#[derive(Debug, Error)]
pub enum LoginError {
    #[error("identity provider is not configured")]
    NotConfigured,

    #[error("callback is missing code or state")]
    MissingParams,

    #[error("callback state does not match the login request")]
    StateMismatch,

    #[error(transparent)]
    Provider(#[from] OidcError),

    #[error("{email} is not a member of the required group")]
    NotAuthorized { email: String },

    #[error("account provisioning failed: {0}")]
    Provisioning(#[source] ServiceError),

    #[error("session issuance failed: {0}")]
    Session(#[source] ServiceError),
}

impl LoginError {
    pub fn marker(&self) -> &'static str {
        match self {
            LoginError::MissingParams => "missing_params",
            LoginError::StateMismatch => "invalid_state",
            LoginError::NotAuthorized { .. } => "unauthorized",
            LoginError::NotConfigured
            | LoginError::Provider(_)
            | LoginError::Provisioning(_)
            | LoginError::Session(_) => "auth_failed",
        }
    }
}

impl IntoResponse for LoginError {
    fn into_response(self) -> Response {
        let marker = self.marker();
        tracing::warn!(error = %self, outcome = marker, "Login failed");
        metrics::counter!("dataroom_login_attempts_total", "outcome" => marker).increment(1);
        found(&format!("{}?error={}", LOGIN_PAGE, marker))
    }
}

/// `GET /api/auth/okta`: sends the browser to the identity provider.
pub async fn okta_login(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(oidc) = state.oidc.as_deref() else {
        return LoginError::NotConfigured.into_response();
    };

    let request = oidc.authorization_request();
    let secure = state.sessions.secure_cookies();

    let jar = jar
        .add(flow_cookie(STATE_COOKIE, request.state, secure))
        .add(flow_cookie(PKCE_COOKIE, request.code_verifier, secure));

    tracing::info!("Redirecting to identity provider");
    (jar, found(request.url.as_str())).into_response()
}

/// `GET /api/auth/callback`: completes the login started by [`okta_login`].
pub async fn okta_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<CallbackQuery>, QueryRejection>,
) -> Response {
    let outcome = match query {
        Ok(Query(query)) => complete_login(&state, &jar, query).await,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Malformed callback query");
            Err(LoginError::MissingParams)
        }
    };

    let jar = jar
        .remove(Cookie::build(STATE_COOKIE).path("/"))
        .remove(Cookie::build(PKCE_COOKIE).path("/"));

    match outcome {
        Ok(token) => {
            metrics::counter!("dataroom_login_attempts_total", "outcome" => "success")
                .increment(1);
            let jar = jar.add(state.sessions.session_cookie(token));
            (jar, SignedInTemplate {}).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

async fn complete_login(
    state: &AppState,
    jar: &CookieJar,
    query: CallbackQuery,
) -> Result<String, LoginError> {
    if let Some(error) = query.error.as_deref() {
        tracing::warn!(
            error = %error,
            description = ?query.error_description,
            "Identity provider returned an error"
        );
    }

    // Present but empty counts as missing.
    let code = query.code.filter(|c| !c.is_empty());
    let returned_state = query.state.filter(|s| !s.is_empty());
    let (Some(code), Some(returned_state)) = (code, returned_state) else {
        return Err(LoginError::MissingParams);
    };

    let oidc = state.oidc.as_deref().ok_or(LoginError::NotConfigured)?;

    let expected_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let code_verifier = jar.get(PKCE_COOKIE).map(|c| c.value().to_string());
    let code_verifier = match (expected_state, code_verifier) {
        (Some(expected), Some(verifier))
            if bool::from(expected.as_bytes().ct_eq(returned_state.as_bytes())) =>
        {
            verifier
        }
        _ => return Err(LoginError::StateMismatch),
    };

    let tokens = oidc.exchange_code(&code, &code_verifier).await?;
    let userinfo = oidc.fetch_userinfo(&tokens.access_token).await?;
    let groups = resolve_groups(&userinfo, tokens.id_token.as_deref());

    if !oidc.is_member(&groups) {
        tracing::warn!(
            email = %userinfo.email,
            ?groups,
            required = oidc.required_group(),
            "Principal lacks required group"
        );
        return Err(LoginError::NotAuthorized {
            email: userinfo.email,
        });
    }

    let user = find_or_provision_admin(
        state.users.as_ref(),
        &userinfo.email,
        userinfo.name.as_deref(),
    )
    .await
    .map_err(LoginError::Provisioning)?;

    // The account stays if this fails; nothing reaches the browser.
    let token = state.sessions.issue(&user).map_err(LoginError::Session)?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin signed in via identity provider");
    Ok(token)
}

/// `GET /api/auth/logout`
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = jar.add(state.sessions.removal_cookie());
    (jar, found("/")).into_response()
}

fn flow_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    // Lax, not Strict: the callback is a cross-site navigation from the provider.
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::minutes(FLOW_COOKIE_MINUTES))
        .build()
}

// A SameSite=Strict cookie set during a cross-site navigation is not sent on
// an immediate redirect, so the browser is handed a page that navigates
// same-site to /admin instead of a 302.
#[derive(Template)]
#[template(path = "signed_in.html")]
pub struct SignedInTemplate {}
