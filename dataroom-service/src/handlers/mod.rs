pub mod admin;
pub mod auth;
pub mod dataroom;
pub mod health;
pub mod metrics;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Plain `302 Found`. axum's `Redirect` only offers 303/307/308.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}
