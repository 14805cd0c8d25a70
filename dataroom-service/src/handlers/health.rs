use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.users.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Account store health check failed");
        AppError::ServiceUnavailable
    })?;

    let identity_provider = if state.oidc.is_some() {
        "configured"
    } else {
        "not_configured"
    };

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "version": state.config.service_version,
        "environment": format!("{:?}", state.config.environment),
        "checks": {
            "account_store": "up",
            "identity_provider": identity_provider,
        }
    })))
}
