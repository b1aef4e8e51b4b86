//! Admin-only endpoints. Every handler takes an [`AdminUser`].

use super::payments::required;
use super::{AdminUser, ApiError, AppState};
use crate::application::admin::{AdminAction, PaymentFilter, PaymentPage};
use crate::domain::payment::{PaymentId, PaymentStatus, PaymentView};
use crate::error::Result;
use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListQuery {
    fn into_filter(self) -> Result<PaymentFilter> {
        let status = self
            .status
            .filter(|s| !s.trim().is_empty() && s != "all")
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()?;
        PaymentFilter::new(status, self.page, self.limit)
    }
}

/// GET /api/admin/payments
#[tracing::instrument(
    name = "GET /api/admin/payments",
    skip(state, admin, query),
    fields(admin = %admin.0.sub)
)]
pub async fn list_payments(
    admin: AdminUser,
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> std::result::Result<Json<PaymentPage>, ApiError> {
    let Query(query) = query?;
    let filter = query.into_filter().map_err(|e| state.error(e))?;
    let page = state
        .engine
        .list_payments(&filter)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentActionRequest {
    pub payment_id: Option<String>,
    pub action: Option<String>,
    pub transaction_hash: Option<String>,
    pub notes: Option<String>,
}

impl PaymentActionRequest {
    fn target(&self) -> Result<(PaymentId, AdminAction)> {
        let id: PaymentId = required(self.payment_id.clone(), "paymentId")?.parse()?;
        let action: AdminAction = required(self.action.clone(), "action")?.parse()?;
        Ok((id, action))
    }
}

/// POST /api/admin/payment-action
#[tracing::instrument(
    name = "POST /api/admin/payment-action",
    skip(state, admin, body),
    fields(admin = %admin.0.sub)
)]
pub async fn payment_action(
    admin: AdminUser,
    State(state): State<AppState>,
    body: std::result::Result<Json<PaymentActionRequest>, JsonRejection>,
) -> std::result::Result<Json<PaymentView>, ApiError> {
    let Json(body) = body?;
    let (id, action) = body.target().map_err(|e| state.error(e))?;

    tracing::info!(payment_id = %id, %action, "Admin payment action");
    let view = state
        .engine
        .admin_action(id, action, body.transaction_hash, body.notes)
        .await
        .map_err(|e| state.error(e))?;
    Ok(Json(view))
}
