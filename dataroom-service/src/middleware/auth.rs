//! Session gate for admin routes and optional identity for dataroom routes.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::convert::Infallible;

use crate::handlers::{auth::LOGIN_ENTRY, found};
use crate::models::User;
use crate::services::SESSION_COOKIE;
use crate::AppState;

/// Resolves the account behind the `payload-token` cookie, if any.
pub async fn resolve_user(state: &AppState, jar: &CookieJar) -> Option<User> {
    let token = jar.get(SESSION_COOKIE)?.value();

    let claims = match state.sessions.verify(token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session token");
            return None;
        }
    };

    match state.users.find_by_id(&claims.sub).await {
        Ok(Some(user)) => Some(user),
        Ok(None) => {
            tracing::warn!(user_id = %claims.sub, "Session refers to a missing account");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load account for session");
            None
        }
    }
}

/// Admin routes: without a valid session the browser is sent into the
/// identity-provider login. The resolved [`User`] is placed in request
/// extensions for handlers.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    match resolve_user(&state, &jar).await {
        Some(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        None => {
            tracing::debug!(path = %request.uri().path(), "No session; redirecting to login");
            found(LOGIN_ENTRY)
        }
    }
}

/// The signed-in user when there is one; anonymous visitors get `None`.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<User>() {
            return Ok(MaybeUser(Some(user.clone())));
        }

        let jar = CookieJar::from_headers(&parts.headers);
        Ok(MaybeUser(resolve_user(state, &jar).await))
    }
}
