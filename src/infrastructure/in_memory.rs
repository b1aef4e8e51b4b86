use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{PaymentStore, UserStore};
use crate::domain::user::User;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payments.
///
/// Uses `Arc<RwLock<HashMap<PaymentId, Payment>>>` to allow shared concurrent access.
/// Clones share the same map, so tests can keep a handle while the engine owns another.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentStore {
    /// Creates a new, empty in-memory payment store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        match payments.entry(payment.id) {
            Entry::Occupied(_) => Err(PaymentError::Conflict(format!(
                "Payment {} already exists",
                payment.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(payment);
                Ok(())
            }
        }
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&id).cloned())
    }

    async fn compare_and_swap(&self, payment: Payment, expected_version: u64) -> Result<bool> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment.id) {
            Some(current) if current.version == expected_version => {
                *current = payment;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::NotFound(format!("Payment {}", payment.id))),
        }
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.values().cloned().collect())
    }
}

/// A thread-safe in-memory store for member accounts, keyed by email.
#[derive(Default, Clone)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<String, User>>>,
}

impl InMemoryUserStore {
    /// Creates a new, empty in-memory user store.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.users.read().await;
        Ok(users.get(&email.to_ascii_lowercase()).cloned())
    }

    async fn insert(&self, user: User) -> Result<bool> {
        let mut users = self.users.write().await;
        match users.entry(user.email.to_ascii_lowercase()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(user);
                Ok(true)
            }
        }
    }

    async fn update(&self, user: User) -> Result<()> {
        let mut users = self.users.write().await;
        users.insert(user.email.to_ascii_lowercase(), user);
        Ok(())
    }
}
