pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use service_core::middleware::{
    metrics::metrics_middleware, security_headers::security_headers_middleware,
    tracing::request_id_middleware,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::DataroomConfig;
use crate::services::{DocumentStore, OidcClient, SessionIssuer, UserStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<DataroomConfig>,
    /// `None` when no identity provider is configured; logins then fail
    /// with `auth_failed`.
    pub oidc: Option<Arc<OidcClient>>,
    pub sessions: SessionIssuer,
    pub users: Arc<dyn UserStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub metrics: Option<PrometheusHandle>,
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/admin", get(handlers::admin::dashboard))
        .layer(from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::metrics::metrics))
        .route("/api/auth/okta", get(handlers::auth::okta_login))
        .route("/api/auth/callback", get(handlers::auth::okta_callback))
        .route("/api/auth/logout", get(handlers::auth::logout))
        .route("/admin/login", get(handlers::admin::login_page))
        .route(
            "/dataroom/documents",
            get(handlers::dataroom::list_documents),
        )
        .route(
            "/dataroom/documents/:id",
            get(handlers::dataroom::get_document),
        )
        .merge(admin_routes)
        .with_state(state)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                // Path only: callback query strings carry authorization codes.
                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    path = %request.uri().path(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
}
