//! Document listing and detail, filtered by the caller's dataroom role.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use service_core::error::AppError;

use crate::middleware::auth::MaybeUser;
use crate::models::DocumentResponse;
use crate::services::access::{accessible_categories, check_access};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    pub categories: Vec<&'static str>,
    pub documents: Vec<DocumentResponse>,
}

/// `GET /dataroom/documents`
pub async fn list_documents(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<Json<DocumentListResponse>, AppError> {
    let categories: Vec<&'static str> = accessible_categories(user.as_ref()).into_iter().collect();

    let documents = state
        .documents
        .list_by_access_levels(&categories)
        .await?
        .into_iter()
        .map(DocumentResponse::from)
        .collect();

    Ok(Json(DocumentListResponse {
        categories,
        documents,
    }))
}

/// `GET /dataroom/documents/:id`
pub async fn get_document(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, AppError> {
    let document = state
        .documents
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))?;

    if !check_access(user.as_ref(), &document.access_level) {
        tracing::info!(
            document_id = %document.id,
            access_level = %document.access_level,
            user_id = ?user.as_ref().map(|u| u.id.as_str()),
            "Document access denied"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Insufficient access level"
        )));
    }

    Ok(Json(document.into()))
}
