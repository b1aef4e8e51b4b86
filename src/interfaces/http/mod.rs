//! JSON-over-HTTP surface of the payment tracker.

mod admin;
mod auth;
mod error;
mod payments;

use crate::application::engine::PaymentEngine;
use crate::auth::AdminTokenVerifier;
use crate::error::PaymentError;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use auth::AdminUser;
pub use error::ApiError;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<PaymentEngine>,
    pub admin_auth: Arc<AdminTokenVerifier>,
    /// Include internal error details in responses (development only).
    pub expose_internal_errors: bool,
}

impl AppState {
    pub fn new(engine: Arc<PaymentEngine>, admin_auth: AdminTokenVerifier) -> Self {
        Self {
            engine,
            admin_auth: Arc::new(admin_auth),
            expose_internal_errors: false,
        }
    }

    pub fn with_internal_errors_exposed(mut self, expose: bool) -> Self {
        self.expose_internal_errors = expose;
        self
    }

    pub(crate) fn error(&self, err: PaymentError) -> ApiError {
        ApiError::from_payment_error(err, self.expose_internal_errors)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/create-payment", post(payments::create_payment))
        .route(
            "/api/payment-status",
            get(payments::payment_status).post(payments::report_progress),
        )
        .route("/api/signup", post(payments::signup_free))
        .route("/api/admin/payments", get(admin::list_payments))
        .route("/api/admin/payment-action", post(admin::payment_action))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
