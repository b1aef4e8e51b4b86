#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{EncodingKey, Header};
use payment_tracker::application::engine::{NewPayment, PaymentEngine};
use payment_tracker::auth::Claims;
use payment_tracker::domain::notification::WelcomeMessage;
use payment_tracker::domain::payment::{Payer, Payment, PaymentId};
use payment_tracker::domain::ports::{Notifier, PaymentStore, PaymentStoreBox, UserStore};
use payment_tracker::domain::pricing::{Cryptocurrency, Tier};
use payment_tracker::domain::user::User;
use payment_tracker::error::{PaymentError, Result};
use payment_tracker::infrastructure::clock::ManualClock;
use payment_tracker::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryUserStore};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;

pub const JWT_SECRET: &[u8] = b"integration-test-secret";

/// Collects every welcome message it is asked to send.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<WelcomeMessage>>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<WelcomeMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Fails every delivery, counting attempts.
#[derive(Clone, Default)]
pub struct FailingNotifier {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send_welcome(&self, _message: &WelcomeMessage) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PaymentError::NotificationError(
            "SMTP relay unreachable".to_string(),
        ))
    }
}

/// Once armed, holds the next `gated` reads at a barrier so that concurrent
/// callers all observe the same version before any of them writes.
#[derive(Clone)]
pub struct GatedPaymentStore {
    inner: InMemoryPaymentStore,
    barrier: Arc<Barrier>,
    gated: usize,
    armed: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl GatedPaymentStore {
    pub fn new(inner: InMemoryPaymentStore, gated: usize) -> Self {
        Self {
            inner,
            barrier: Arc::new(Barrier::new(gated)),
            gated,
            armed: Arc::new(AtomicBool::new(false)),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn arm(&self) {
        self.reads.store(0, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentStore for GatedPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        self.inner.insert(payment).await
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let payment = self.inner.get(id).await?;
        if self.armed.load(Ordering::SeqCst)
            && self.reads.fetch_add(1, Ordering::SeqCst) < self.gated
        {
            self.barrier.wait().await;
        }
        Ok(payment)
    }

    async fn compare_and_swap(&self, payment: Payment, expected_version: u64) -> Result<bool> {
        self.inner.compare_and_swap(payment, expected_version).await
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        self.inner.all_payments().await
    }
}

/// User store whose next write fails once `fail_next` is set.
#[derive(Clone, Default)]
pub struct FlakyUserStore {
    pub inner: InMemoryUserStore,
    pub fail_next: Arc<AtomicBool>,
}

impl FlakyUserStore {
    fn check(&self) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PaymentError::internal("user store unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserStore for FlakyUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn insert(&self, user: User) -> Result<bool> {
        self.check()?;
        self.inner.insert(user).await
    }

    async fn update(&self, user: User) -> Result<()> {
        self.check()?;
        self.inner.update(user).await
    }
}

pub struct TestContext {
    pub engine: PaymentEngine,
    pub payments: InMemoryPaymentStore,
    pub users: InMemoryUserStore,
    pub notifier: RecordingNotifier,
    pub clock: ManualClock,
}

pub fn start_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 12, 0, 0).unwrap()
}

pub fn setup() -> TestContext {
    let payments = InMemoryPaymentStore::new();
    setup_with_store(payments.clone(), Box::new(payments))
}

/// Builds an engine over `store`, keeping `payments` for direct inspection.
pub fn setup_with_store(payments: InMemoryPaymentStore, store: PaymentStoreBox) -> TestContext {
    let users = InMemoryUserStore::new();
    let notifier = RecordingNotifier::default();
    let clock = ManualClock::new(start_time());
    let engine = PaymentEngine::new(store, Box::new(users.clone()), Box::new(notifier.clone()))
        .with_clock(Box::new(clock.clone()));
    TestContext {
        engine,
        payments,
        users,
        notifier,
        clock,
    }
}

pub fn new_payment(tier: Tier, cryptocurrency: Cryptocurrency, email: &str) -> NewPayment {
    NewPayment {
        tier,
        cryptocurrency,
        payer: Payer::new(email, "Test", "Member").unwrap(),
    }
}

pub fn admin_token(role: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: "ops-1".to_string(),
        role: role.to_string(),
        exp: now + 3600,
        iat: now,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET))
        .unwrap()
}
