use super::notification::WelcomeMessage;
use super::payment::{Payment, PaymentId};
use super::user::User;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    /// Writes `payment` only if the stored record is still at `expected_version`.
    /// Returns `false` when another writer got there first.
    async fn compare_and_swap(&self, payment: Payment, expected_version: u64) -> Result<bool>;
    async fn all_payments(&self) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Inserts `user` unless an account with the same email exists.
    async fn insert(&self, user: User) -> Result<bool>;
    async fn update(&self, user: User) -> Result<()>;
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
pub type UserStoreBox = Box<dyn UserStore>;
pub type NotifierBox = Box<dyn Notifier>;
pub type ClockBox = Box<dyn Clock>;
