// Shared service error type with the HTTP mapping used by every handler.
// Body shape is always {"error": message, "status": code}.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use diesel::result::DatabaseErrorKind;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Page limit reached for your plan")]
    PlanLimitExceeded(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Too many requests")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Upstream service error: {0}")]
    Upstream(String),

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServiceError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ServiceError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::NotFound => (StatusCode::NOT_FOUND, "Resource not found".to_string()),
            ServiceError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ServiceError::PlanLimitExceeded(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            ServiceError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ServiceError::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".to_string()),
            ServiceError::RateLimited {
                retry_after_seconds,
            } => {
                let body = Json(json!({
                    "error": "Too many requests",
                    "status": StatusCode::TOO_MANY_REQUESTS.as_u16()
                }));
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [("Retry-After", retry_after_seconds.to_string())],
                    body,
                )
                    .into_response();
            },
            ServiceError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ServiceError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Database errors map onto HTTP semantics: a unique violation is a
// conflicting write (duplicate slug, replayed order), a missing row or a
// broken FK reference is a 404.
impl From<diesel::result::Error> for ServiceError {
    fn from(error: diesel::result::Error) -> Self {
        match &error {
            diesel::result::Error::NotFound => ServiceError::NotFound,
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                ServiceError::Conflict(info.message().to_string())
            },
            diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                ServiceError::NotFound
            },
            _ => ServiceError::DatabaseError(error.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

impl From<crate::models::user::UserError> for ServiceError {
    fn from(error: crate::models::user::UserError) -> Self {
        use crate::models::user::UserError;
        match error {
            UserError::NotFound => ServiceError::NotFound,
            UserError::InvalidId => ServiceError::ValidationError("Invalid id".to_string()),
            UserError::Database(e) => e.into(),
            UserError::Pool(msg) => ServiceError::DatabaseError(msg),
        }
    }
}

impl From<crate::services::analytics::AnalyticsError> for ServiceError {
    fn from(error: crate::services::analytics::AnalyticsError) -> Self {
        use crate::services::analytics::AnalyticsError;
        match error {
            AnalyticsError::Database(e) => e.into(),
            AnalyticsError::UnknownEventType(t) => {
                ServiceError::ValidationError(format!("Unknown event type: {}", t))
            },
        }
    }
}

impl From<crate::services::payment::PaymentError> for ServiceError {
    fn from(error: crate::services::payment::PaymentError) -> Self {
        use crate::services::payment::PaymentError;
        match error {
            PaymentError::OrderNotFound => ServiceError::NotFound,
            PaymentError::WrongOwner => ServiceError::Forbidden,
            PaymentError::AlreadyCompleted => {
                ServiceError::Conflict("Order already completed".to_string())
            },
            PaymentError::SignatureMismatch => {
                ServiceError::ValidationError("Signature verification failed".to_string())
            },
            PaymentError::Gateway(msg) => ServiceError::Upstream(msg),
            PaymentError::Http(e) => ServiceError::Upstream(e.to_string()),
            PaymentError::Database(e) => e.into(),
            PaymentError::User(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_database_error_mapping() {
        assert!(matches!(
            ServiceError::from(diesel::result::Error::NotFound),
            ServiceError::NotFound
        ));
    }

    #[tokio::test]
    async fn test_payment_error_mapping() {
        use crate::models::user::UserError;
        use crate::services::payment::PaymentError;

        assert!(matches!(
            ServiceError::from(PaymentError::AlreadyCompleted),
            ServiceError::Conflict(_)
        ));
        assert!(matches!(
            ServiceError::from(PaymentError::SignatureMismatch),
            ServiceError::ValidationError(_)
        ));
        assert!(matches!(
            ServiceError::from(PaymentError::User(UserError::NotFound)),
            ServiceError::NotFound
        ));
    }
}
