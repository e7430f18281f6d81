use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced to callers of the attendance core.
///
/// Credential validation failures and partial batch failures are not errors;
/// they are reported as values (`CredentialValidation`, `BulkMarkOutcome`).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    SessionNotEligible(String),

    #[error("No active QR code found for this session")]
    NoActiveCredential,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
