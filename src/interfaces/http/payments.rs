//! Public payment endpoints used by the signup flow.

use super::{ApiError, AppState};
use crate::application::engine::NewPayment;
use crate::domain::payment::{Payer, PaymentId, PaymentInstructions, PaymentView};
use crate::domain::pricing::{Cryptocurrency, Tier};
use crate::domain::user::AccountSummary;
use crate::error::{PaymentError, Result};
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

pub(super) fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| PaymentError::ValidationError(format!("{} is required", field)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub tier: Option<String>,
    pub cryptocurrency: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl CreatePaymentRequest {
    fn into_new_payment(self) -> Result<NewPayment> {
        let tier: Tier = required(self.tier, "tier")?.parse()?;
        let cryptocurrency: Cryptocurrency =
            required(self.cryptocurrency, "cryptocurrency")?.parse()?;
        let payer = Payer::new(
            required(self.email, "email")?,
            required(self.first_name, "firstName")?,
            required(self.last_name, "lastName")?,
        )?;
        Ok(NewPayment {
            tier,
            cryptocurrency,
            payer,
        })
    }
}

/// POST /api/create-payment
#[tracing::instrument(name = "POST /api/create-payment", skip(state, body))]
pub async fn create_payment(
    State(state): State<AppState>,
    body: std::result::Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<PaymentInstructions>), ApiError> {
    let Json(body) = body?;
    let request = body.into_new_payment().map_err(|e| state.error(e))?;
    let instructions = state
        .engine
        .create_payment(request)
        .await
        .map_err(|e| state.error(e))?;
    Ok((StatusCode::CREATED, Json(instructions)))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub id: Option<String>,
}

/// GET /api/payment-status?id=
#[tracing::instrument(name = "GET /api/payment-status", skip(state, query))]
pub async fn payment_status(
    State(state): State<AppState>,
    query: std::result::Result<Query<StatusQuery>, QueryRejection>,
) -> std::result::Result<Json<PaymentView>, ApiError> {
    let Query(query) = query?;
    let id: PaymentId = required(query.id, "id")
        .and_then(|id| id.parse())
        .map_err(|e| state.error(e))?;
    let view = state.engine.query(id).await.map_err(|e| state.error(e))?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProgressRequest {
    pub payment_id: Option<String>,
    pub transaction_hash: Option<String>,
    pub confirmations: Option<u32>,
}

/// POST /api/payment-status
#[tracing::instrument(name = "POST /api/payment-status", skip(state, body))]
pub async fn report_progress(
    State(state): State<AppState>,
    body: std::result::Result<Json<ReportProgressRequest>, JsonRejection>,
) -> std::result::Result<Json<PaymentView>, ApiError> {
    let Json(body) = body?;
    let id: PaymentId = required(body.payment_id, "paymentId")
        .and_then(|id| id.parse())
        .map_err(|e| state.error(e))?;
    let view = state
        .engine
        .report_progress(id, body.confirmations, body.transaction_hash)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl SignupRequest {
    fn into_payer(self) -> Result<Payer> {
        Payer::new(
            required(self.email, "email")?,
            required(self.first_name, "firstName")?,
            required(self.last_name, "lastName")?,
        )
    }
}

/// POST /api/signup (free tier)
#[tracing::instrument(name = "POST /api/signup", skip(state, body))]
pub async fn signup_free(
    State(state): State<AppState>,
    body: std::result::Result<Json<SignupRequest>, JsonRejection>,
) -> std::result::Result<(StatusCode, Json<AccountSummary>), ApiError> {
    let Json(body) = body?;
    let payer = body.into_payer().map_err(|e| state.error(e))?;
    let summary = state
        .engine
        .signup_free(payer)
        .await
        .map_err(|e| state.error(e))?;
    Ok((StatusCode::CREATED, Json(summary)))
}
