use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Account is not managed by the external identity provider")]
    NotExternallyManaged,
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::from(e),
            ServiceError::Token(e) => AppError::InvalidToken(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::NotExternallyManaged => AppError::Forbidden(anyhow::anyhow!(
                "Account is not managed by the external identity provider"
            )),
        }
    }
}
