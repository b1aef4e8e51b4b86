use super::payment::{Payer, Payment, PaymentId};
use super::pricing::{Cryptocurrency, Tier};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
}

/// Membership details embedded in a user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub payment_id: Option<PaymentId>,
    pub cryptocurrency: Option<Cryptocurrency>,
    pub amount: Option<Decimal>,
    pub activated_at: DateTime<Utc>,
}

impl Subscription {
    pub fn from_payment(payment: &Payment, now: DateTime<Utc>) -> Self {
        Self {
            tier: payment.tier,
            status: SubscriptionStatus::Active,
            payment_id: Some(payment.id),
            cryptocurrency: Some(payment.cryptocurrency),
            amount: Some(payment.amount),
            activated_at: now,
        }
    }

    pub fn free(now: DateTime<Utc>) -> Self {
        Self {
            tier: Tier::Sapphire,
            status: SubscriptionStatus::Active,
            payment_id: None,
            cryptocurrency: None,
            amount: None,
            activated_at: now,
        }
    }
}

/// A member account, keyed by email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    /// Argon2 PHC string of the temporary password.
    pub password_hash: String,
    pub subscription: Subscription,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        payer: &Payer,
        password_hash: String,
        subscription: Subscription,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: payer.email.clone(),
            first_name: payer.first_name.clone(),
            last_name: payer.last_name.clone(),
            password_hash,
            subscription,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replaces the subscription with a newly paid one.
    pub fn merge_subscription(&mut self, subscription: Subscription, now: DateTime<Utc>) {
        self.subscription = subscription;
        self.updated_at = now;
    }
}

/// Account summary safe to return to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub user_id: Uuid,
    pub email: String,
    pub tier: Tier,
    pub status: SubscriptionStatus,
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            tier: user.subscription.tier,
            status: user.subscription.status,
        }
    }
}
