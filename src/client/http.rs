use super::poller::StatusSource;
use crate::domain::payment::{PaymentId, PaymentView};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Reads payment status from a running tracker over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn status_url(&self) -> String {
        format!("{}/api/payment-status", self.base_url)
    }
}

#[async_trait]
impl StatusSource for HttpStatusSource {
    async fn fetch(&self, id: PaymentId) -> Result<PaymentView> {
        let response = self
            .client
            .get(self.status_url())
            .query(&[("id", id.to_string())])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<PaymentView>().await?);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());

        Err(match status {
            StatusCode::NOT_FOUND => PaymentError::NotFound(message),
            StatusCode::BAD_REQUEST => PaymentError::ValidationError(message),
            StatusCode::UNAUTHORIZED => PaymentError::Unauthorized(message),
            StatusCode::CONFLICT => PaymentError::Conflict(message),
            StatusCode::GONE => PaymentError::Expired(message),
            _ => PaymentError::internal(format!("Status request failed: {}", message)),
        })
    }
}
