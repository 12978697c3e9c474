use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Payment notification failed signature verification. Never processed,
    /// never retried.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// No units left on the requested ticket template. The buyer can retry
    /// with another template.
    #[error("Ticket template is sold out")]
    InventoryExhausted,

    /// Ticket exists but is not eligible for the requested operation.
    /// Deliberately low-detail towards callers.
    #[error("Ticket is not valid for this operation")]
    TicketInvalid,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error")]
    DatabaseError(StoreError),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::InventoryExhausted => AppError::InventoryExhausted,
            StoreError::Conflict(msg) => AppError::Conflict(msg),
            other => AppError::DatabaseError(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InventoryExhausted | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::TicketInvalid => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::InventoryExhausted => "INVENTORY_EXHAUSTED",
            AppError::TicketInvalid => "TICKET_INVALID",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::ValidationError(msg)
            | AppError::AuthenticationFailed(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::InventoryExhausted | AppError::TicketInvalid => {
                error!(error = ?self, "Application error");
            }
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Store error");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthenticationFailed(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::InventoryExhausted | AppError::TicketInvalid => self.to_string(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}
