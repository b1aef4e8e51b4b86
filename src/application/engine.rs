use super::admin::{AdminAction, PaymentFilter, PaymentPage};
use super::provisioning;
use crate::domain::notification::WelcomeMessage;
use crate::domain::payment::{
    Payer, Payment, PaymentId, PaymentInstructions, PaymentView, Transition, TransitionOutcome,
};
use crate::domain::ports::{ClockBox, NotifierBox, PaymentStoreBox, UserStoreBox};
use crate::domain::pricing::{Cryptocurrency, Tier};
use crate::domain::user::{AccountSummary, Subscription};
use crate::error::{PaymentError, Result};
use crate::infrastructure::clock::SystemClock;
use chrono::{DateTime, Utc};

/// Attempts before a transition losing every compare-and-swap race gives up.
const MAX_TRANSITION_ATTEMPTS: usize = 8;

/// A request to open a membership payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub tier: Tier,
    pub cryptocurrency: Cryptocurrency,
    pub payer: Payer,
}

/// The main entry point for the payment lifecycle.
///
/// `PaymentEngine` owns the storage backends, the notifier and the clock it
/// was constructed with. Every state change goes through a read, apply,
/// compare-and-swap cycle keyed on the record version, so the completion
/// side effect runs once per entry into `completed` even under concurrent
/// callers.
pub struct PaymentEngine {
    payments: PaymentStoreBox,
    users: UserStoreBox,
    notifier: NotifierBox,
    clock: ClockBox,
}

impl PaymentEngine {
    /// Creates a new `PaymentEngine` using the system clock.
    ///
    /// # Arguments
    ///
    /// * `payments` - The store for payment records.
    /// * `users` - The store for member accounts.
    /// * `notifier` - Delivery for welcome messages.
    pub fn new(payments: PaymentStoreBox, users: UserStoreBox, notifier: NotifierBox) -> Self {
        Self {
            payments,
            users,
            notifier,
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: ClockBox) -> Self {
        self.clock = clock;
        self
    }

    /// Prices and stores a new pending payment.
    #[tracing::instrument(
        skip(self, request),
        fields(tier = %request.tier, cryptocurrency = %request.cryptocurrency)
    )]
    pub async fn create_payment(&self, request: NewPayment) -> Result<PaymentInstructions> {
        let payment = Payment::open(
            request.payer,
            request.tier,
            request.cryptocurrency,
            self.clock.now(),
        )?;
        let instructions = payment.instructions();
        self.payments.insert(payment).await?;

        tracing::info!(
            payment_id = %instructions.payment_id,
            amount = %instructions.amount,
            "Payment created"
        );
        Ok(instructions)
    }

    /// Current state of a payment, with expiry computed against now.
    pub async fn query(&self, id: PaymentId) -> Result<PaymentView> {
        let payment = self.load(id).await?;
        Ok(payment.view(self.clock.now()))
    }

    #[tracing::instrument(skip(self, transaction_hash))]
    pub async fn report_progress(
        &self,
        id: PaymentId,
        confirmations: Option<u32>,
        transaction_hash: Option<String>,
    ) -> Result<PaymentView> {
        self.transition(
            id,
            Transition::ReportProgress {
                confirmations,
                transaction_hash,
            },
        )
        .await
    }

    #[tracing::instrument(skip(self, transaction_hash, notes))]
    pub async fn admin_action(
        &self,
        id: PaymentId,
        action: AdminAction,
        transaction_hash: Option<String>,
        notes: Option<String>,
    ) -> Result<PaymentView> {
        self.transition(id, action.into_transition(transaction_hash, notes))
            .await
    }

    pub async fn list_payments(&self, filter: &PaymentFilter) -> Result<PaymentPage> {
        let payments = self.payments.all_payments().await?;
        Ok(PaymentPage::build(payments, filter, self.clock.now()))
    }

    /// Every stored payment, unordered.
    pub async fn all_payments(&self) -> Result<Vec<Payment>> {
        self.payments.all_payments().await
    }

    /// Creates a free sapphire-tier account.
    #[tracing::instrument(skip(self, payer), fields(email = %payer.email))]
    pub async fn signup_free(&self, payer: Payer) -> Result<AccountSummary> {
        let now = self.clock.now();
        if self.users.find_by_email(&payer.email).await?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "An account already exists for {}",
                payer.email
            )));
        }

        let (user, credentials) =
            provisioning::create_account(&*self.users, &payer, Subscription::free(now), now)
                .await?
                .ok_or_else(|| {
                    PaymentError::Conflict(format!("An account already exists for {}", payer.email))
                })?;

        let message = WelcomeMessage {
            recipient: user.email.clone(),
            name: user.first_name.clone(),
            tier: Tier::Sapphire,
            payment: None,
            credentials: Some(credentials),
        };
        provisioning::deliver(&*self.notifier, &message).await;

        tracing::info!(user_id = %user.id, "Free membership created");
        Ok(AccountSummary::from(&user))
    }

    async fn load(&self, id: PaymentId) -> Result<Payment> {
        self.payments
            .get(id)
            .await?
            .ok_or_else(|| PaymentError::NotFound(format!("Payment {}", id)))
    }

    async fn transition(&self, id: PaymentId, transition: Transition) -> Result<PaymentView> {
        for attempt in 1..=MAX_TRANSITION_ATTEMPTS {
            let mut payment = self.load(id).await?;
            let expected_version = payment.version;
            let now = self.clock.now();

            let provision = match payment.apply(&transition, now)? {
                TransitionOutcome::Completed => true,
                TransitionOutcome::Updated => false,
                TransitionOutcome::Unchanged => {
                    // Completed earlier, but that provisioning was given back.
                    if !payment.reclaim_provisioning(now) {
                        return Ok(payment.view(now));
                    }
                    true
                }
            };

            if !self
                .payments
                .compare_and_swap(payment.clone(), expected_version)
                .await?
            {
                tracing::debug!(payment_id = %id, attempt, "Version conflict, retrying");
                continue;
            }

            tracing::info!(
                payment_id = %id,
                status = %payment.status,
                confirmations = payment.confirmations,
                "Payment updated"
            );

            if provision {
                self.provision(&payment, now).await?;
            }

            return Ok(payment.view(now));
        }

        Err(PaymentError::Conflict(format!(
            "Payment {} is being updated concurrently, try again",
            id
        )))
    }

    /// Runs the completion side effect for a payment whose claim this call
    /// committed. On failure the claim is given back so a later report retries.
    async fn provision(&self, payment: &Payment, now: DateTime<Utc>) -> Result<()> {
        match provisioning::provision_member(&*self.users, &*self.notifier, payment, now).await {
            Ok(provisioned) => {
                tracing::debug!(
                    payment_id = %payment.id,
                    user_id = %provisioned.user().id,
                    "Completion side effect done"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(payment_id = %payment.id, error = %e, "Provisioning failed");
                if let Err(release_err) = self.release_provisioning(payment).await {
                    tracing::error!(
                        payment_id = %payment.id,
                        error = %release_err,
                        "Could not release provisioning claim"
                    );
                }
                Err(e)
            }
        }
    }

    async fn release_provisioning(&self, claimed: &Payment) -> Result<()> {
        for _ in 0..MAX_TRANSITION_ATTEMPTS {
            let mut payment = self.load(claimed.id).await?;
            let expected_version = payment.version;
            if !payment.release_provisioning(claimed.completed_at, self.clock.now()) {
                return Ok(());
            }
            if self
                .payments
                .compare_and_swap(payment, expected_version)
                .await?
            {
                return Ok(());
            }
        }
        Err(PaymentError::Conflict(format!(
            "Payment {} is being updated concurrently",
            claimed.id
        )))
    }
}
