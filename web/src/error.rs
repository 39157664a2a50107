//! Error types for web handlers.
//!
//! Sold-out and capacity-exceeded results are not errors: they are returned
//! as `200 OK` outcome bodies. Only [`ReservationError`]s and malformed
//! requests become an [`AppError`].

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use seat_inventory_core::ReservationError;
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
///
/// Carries the HTTP status, a machine-readable code and a user-facing
/// message. The optional source is logged but never sent to the client.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    code: &'static str,
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, code: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            code,
            source: None,
        }
    }

    /// Attach an internal error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// 400 Bad Request.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "BAD_REQUEST")
    }

    /// 404 Not Found.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("{resource} with id {id} not found"),
            "NOT_FOUND",
        )
    }

    /// 409 Conflict.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, "CONFLICT")
    }

    /// 422 Unprocessable Entity.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message, "VALIDATION_ERROR")
    }

    /// 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "INTERNAL_SERVER_ERROR")
    }

    /// 503 Service Unavailable.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message, "SERVICE_UNAVAILABLE")
    }

    /// HTTP status of this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: &'static str,
    message: String,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            match &self.source {
                Some(source) => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    error = %source,
                    "Request failed"
                ),
                None => tracing::error!(
                    status = %self.status,
                    code = self.code,
                    message = %self.message,
                    "Request failed"
                ),
            }
        }

        let body = ErrorResponse {
            code: self.code,
            retryable: self.status == StatusCode::SERVICE_UNAVAILABLE,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(error: ReservationError) -> Self {
        match error {
            ReservationError::InvalidRequest(reason) => Self::validation(reason),
            ReservationError::UnknownUnit(unit_id) => Self::not_found("Sellable unit", unit_id),
            error @ ReservationError::PersistenceFailure(_) => {
                Self::unavailable("Storage is temporarily unavailable, please retry")
                    .with_source(error.into())
            },
            error @ ReservationError::RollbackFailed { .. } => {
                Self::internal("The purchase could not be completed").with_source(error.into())
            },
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seat_inventory_core::{EventId, UnitId};

    #[test]
    fn test_error_display() {
        let err = AppError::bad_request("Missing holder");
        assert_eq!(err.to_string(), "[BAD_REQUEST] Missing holder");
    }

    #[test]
    fn test_reservation_errors_map_to_status_codes() {
        let unit = UnitId::event(EventId::new());
        let cases = [
            (
                ReservationError::InvalidRequest("zero".to_string()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ReservationError::UnknownUnit(unit), StatusCode::NOT_FOUND),
            (
                ReservationError::PersistenceFailure("timeout".to_string()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ReservationError::RollbackFailed {
                    unit_id: unit,
                    quantity: 2,
                    reason: "down".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).status(), status);
        }
    }

    #[test]
    fn test_persistence_failure_keeps_source() {
        let err = AppError::from(ReservationError::PersistenceFailure("timeout".to_string()));
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
        assert!(std::error::Error::source(&err).is_some());
    }
}
