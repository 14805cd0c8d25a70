//! Minimal admin pages: the login landing and the signed-in dashboard.

use askama::Template;
use axum::{extract::Query, response::IntoResponse, Extension};
use serde::Deserialize;

use crate::models::User;
use crate::services::access::accessible_categories;

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
}

fn login_error_message(marker: &str) -> &'static str {
    match marker {
        "missing_params" => "The sign-in response was incomplete. Please try again.",
        "invalid_state" => "The sign-in request expired or did not match. Please try again.",
        "unauthorized" => "Your account is not permitted to administer the dataroom.",
        _ => "Sign-in failed. Please try again.",
    }
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub name: String,
    pub email: String,
    pub role: &'static str,
    pub categories: String,
}

/// `GET /admin/login`
pub async fn login_page(Query(query): Query<LoginPageQuery>) -> impl IntoResponse {
    // Only fixed messages are rendered; the raw marker is never echoed.
    LoginTemplate {
        error: query.error.as_deref().map(login_error_message),
    }
}

/// `GET /admin`
pub async fn dashboard(Extension(user): Extension<User>) -> impl IntoResponse {
    let categories = accessible_categories(Some(&user))
        .into_iter()
        .collect::<Vec<_>>()
        .join(", ");

    DashboardTemplate {
        name: user.name,
        email: user.email,
        role: user.dataroom_role.as_str(),
        categories,
    }
}
