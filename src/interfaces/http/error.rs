use crate::error::PaymentError;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// An error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    public_code: &'static str,
    public_message: Option<String>,
}

impl ApiError {
    fn new(status: StatusCode, public_code: &'static str, public_message: Option<String>) -> Self {
        Self {
            status,
            public_code,
            public_message,
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", Some(msg))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Unauthorized: {}", msg);
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", Some(msg))
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Not found: {}", msg);
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", Some(msg))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Conflict: {}", msg);
        Self::new(StatusCode::CONFLICT, "CONFLICT", Some(msg))
    }

    pub fn gone(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Gone: {}", msg);
        Self::new(StatusCode::GONE, "EXPIRED", Some(msg))
    }

    /// Internal failures only carry their message when `expose` is set.
    pub fn internal(msg: impl Into<String>, expose: bool) -> Self {
        let msg = msg.into();
        tracing::error!("Internal error: {}", msg);
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            expose.then_some(msg),
        )
    }

    pub fn from_payment_error(err: PaymentError, expose_internal: bool) -> Self {
        match err {
            PaymentError::ValidationError(msg) => Self::bad_request(msg),
            PaymentError::NotFound(msg) => Self::not_found(msg),
            PaymentError::Unauthorized(msg) => Self::unauthorized(msg),
            PaymentError::Conflict(msg) => Self::conflict(msg),
            PaymentError::Expired(msg) => Self::gone(msg),
            other => Self::internal(other.to_string(), expose_internal),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_code,
            message: self.public_message,
        };
        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PaymentError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (PaymentError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (PaymentError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (PaymentError::Conflict("x".into()), StatusCode::CONFLICT),
            (PaymentError::Expired("x".into()), StatusCode::GONE),
            (PaymentError::internal("db down"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from_payment_error(err, false).status(), status);
        }
    }

    #[test]
    fn test_internal_message_hidden_outside_dev() {
        let hidden = ApiError::from_payment_error(PaymentError::internal("db down"), false);
        assert!(hidden.public_message.is_none());

        let shown = ApiError::from_payment_error(PaymentError::internal("db down"), true);
        assert!(shown.public_message.unwrap().contains("db down"));
    }
}
