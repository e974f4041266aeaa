//! Error types for the circulation desk

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Rule violations raised by circulation operations.
///
/// Every variant is a local validation failure: it is returned before any
/// state is mutated, so the operation can be retried safely.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CirculationError {
    #[error("Reader {0} is staff and cannot borrow or reserve titles")]
    RoleNotEligible(String),

    #[error("Title {0} not found")]
    TitleNotFound(i32),

    #[error("Reader {0} not found")]
    ReaderNotFound(String),

    #[error("No copies of title {0} are available; reserve it instead")]
    NoCopiesAvailable(i32),

    #[error("Reader already holds {open} unfinished loans (limit {max})")]
    LoanLimitReached { open: usize, max: usize },

    #[error("Reader owes {owed}; debt must stay below {max}")]
    DebtLimitExceeded { owed: Decimal, max: Decimal },

    #[error("Reader already holds a copy of title {0}")]
    DuplicateLoan(i32),

    #[error("Copies of title {0} are available; borrow it instead of reserving")]
    CopiesAvailableUseBorrow(i32),

    #[error("Reader is already queued for title {0}")]
    AlreadyReserved(i32),

    #[error("Reader already holds a copy of title {0}")]
    AlreadyBorrowed(i32),

    #[error("Reader has no reservation for title {0}")]
    ReservationNotFound(i32),

    #[error("Reader has no unfinished loan for title {0}")]
    ActiveLoanNotFound(i32),

    #[error("Reader has no pending fee for title {0}")]
    NoPendingFeeFound(i32),

    #[error("{days_remaining} days remain until the due date; renewal opens {window} days before it")]
    RenewalTooEarly { days_remaining: i64, window: i64 },

    #[error("Operation not permitted for this caller")]
    Forbidden,
}

impl CirculationError {
    /// Stable kind name exposed to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            CirculationError::RoleNotEligible(_) => "RoleNotEligible",
            CirculationError::TitleNotFound(_) => "TitleNotFound",
            CirculationError::ReaderNotFound(_) => "ReaderNotFound",
            CirculationError::NoCopiesAvailable(_) => "NoCopiesAvailable",
            CirculationError::LoanLimitReached { .. } => "LoanLimitReached",
            CirculationError::DebtLimitExceeded { .. } => "DebtLimitExceeded",
            CirculationError::DuplicateLoan(_) => "DuplicateLoan",
            CirculationError::CopiesAvailableUseBorrow(_) => "CopiesAvailableUseBorrow",
            CirculationError::AlreadyReserved(_) => "AlreadyReserved",
            CirculationError::AlreadyBorrowed(_) => "AlreadyBorrowed",
            CirculationError::ReservationNotFound(_) => "ReservationNotFound",
            CirculationError::ActiveLoanNotFound(_) => "ActiveLoanNotFound",
            CirculationError::NoPendingFeeFound(_) => "NoPendingFeeFound",
            CirculationError::RenewalTooEarly { .. } => "RenewalTooEarly",
            CirculationError::Forbidden => "Forbidden",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CirculationError::TitleNotFound(_)
            | CirculationError::ReaderNotFound(_)
            | CirculationError::ReservationNotFound(_)
            | CirculationError::ActiveLoanNotFound(_)
            | CirculationError::NoPendingFeeFound(_) => StatusCode::NOT_FOUND,
            CirculationError::Forbidden => StatusCode::FORBIDDEN,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

/// Persistence failures
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Circulation(#[from] CirculationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Stable error kind, e.g. `NoCopiesAvailable`
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, "Unauthenticated", msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "Validation", msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "Conflict", msg.clone()),
            AppError::Circulation(e) => (e.status(), e.kind(), e.to_string()),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Storage",
                    "Storage error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            error: kind.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
