use super::pricing::{self, Cryptocurrency, Tier};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How long a payer has to send funds after a payment is opened.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for PaymentId {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| PaymentError::ValidationError(format!("Malformed payment id '{}'", s)))
    }
}

/// The person paying for a membership. Not authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payer {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl Payer {
    pub fn new(
        email: impl AsRef<str>,
        first_name: impl AsRef<str>,
        last_name: impl AsRef<str>,
    ) -> Result<Self> {
        let email = email.as_ref().trim().to_ascii_lowercase();
        let first_name = first_name.as_ref().trim();
        let last_name = last_name.as_ref().trim();

        let well_formed = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !well_formed {
            return Err(PaymentError::ValidationError(format!(
                "Invalid email address '{}'",
                email
            )));
        }
        if first_name.is_empty() || last_name.is_empty() {
            return Err(PaymentError::ValidationError(
                "First and last name are required".to_string(),
            ));
        }

        Ok(Self {
            email,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Confirming,
    Completed,
    Cancelled,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        PaymentStatus::Pending,
        PaymentStatus::Confirming,
        PaymentStatus::Completed,
        PaymentStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirming => "confirming",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "confirming" => Ok(PaymentStatus::Confirming),
            "completed" => Ok(PaymentStatus::Completed),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown payment status '{}'",
                other
            ))),
        }
    }
}

/// A command that moves a payment through its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Observed on-chain progress reported by a watcher or the payer.
    ReportProgress {
        confirmations: Option<u32>,
        transaction_hash: Option<String>,
    },
    /// Admin marks the payment as paid regardless of observed progress.
    Verify {
        transaction_hash: Option<String>,
        notes: Option<String>,
    },
    Cancel {
        notes: Option<String>,
    },
    /// Admin clears all progress and returns the payment to `pending`.
    Reset {
        notes: Option<String>,
    },
}

/// Result of applying a [`Transition`] to a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Nothing changed; the record must not be rewritten.
    Unchanged,
    Updated,
    /// The payment entered `completed` with this transition.
    Completed,
}

/// A single membership payment attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    #[serde(flatten)]
    pub payer: Payer,
    pub tier: Tier,
    pub cryptocurrency: Cryptocurrency,
    pub amount: Decimal,
    pub payment_address: String,
    pub status: PaymentStatus,
    pub confirmations: u32,
    pub required_confirmations: u32,
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub manually_verified: bool,
    pub admin_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// Set with the write that claims the completion side effect, cleared if
    /// provisioning fails so the next report retries it.
    #[serde(default)]
    pub provisioned: bool,
    /// Incremented on every persisted change; used for compare-and-swap writes.
    #[serde(default)]
    pub version: u64,
}

impl Payment {
    /// Opens a new pending payment, pricing it from the static tables.
    pub fn open(
        payer: Payer,
        tier: Tier,
        cryptocurrency: Cryptocurrency,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let amount = pricing::quote(tier, cryptocurrency)?;

        Ok(Self {
            id: PaymentId::new(),
            payer,
            tier,
            cryptocurrency,
            amount,
            payment_address: cryptocurrency.payment_address().to_string(),
            status: PaymentStatus::Pending,
            confirmations: 0,
            required_confirmations: cryptocurrency.required_confirmations(),
            transaction_hash: None,
            manually_verified: false,
            admin_notes: None,
            created_at: now,
            expires_at: now + TimeDelta::hours(PAYMENT_WINDOW_HOURS),
            completed_at: None,
            cancelled_at: None,
            updated_at: now,
            provisioned: false,
            version: 0,
        })
    }

    /// A payment reads as expired while it is still `pending` past its window.
    /// Expiry is never persisted.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status == PaymentStatus::Pending && now > self.expires_at
    }

    /// Applies `transition` in place.
    ///
    /// Automatic progress is refused on cancelled payments and on payments that
    /// currently read as expired. Admin overrides always apply.
    pub fn apply(
        &mut self,
        transition: &Transition,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome> {
        let outcome = match transition {
            Transition::ReportProgress {
                confirmations,
                transaction_hash,
            } => {
                match self.status {
                    PaymentStatus::Completed => return Ok(TransitionOutcome::Unchanged),
                    PaymentStatus::Cancelled => {
                        return Err(PaymentError::Conflict(format!(
                            "Payment {} has been cancelled",
                            self.id
                        )));
                    }
                    PaymentStatus::Pending | PaymentStatus::Confirming => {}
                }
                if self.is_expired(now) {
                    return Err(PaymentError::Expired(format!(
                        "Payment {} expired at {}",
                        self.id, self.expires_at
                    )));
                }

                if let Some(confirmations) = confirmations {
                    self.confirmations = *confirmations;
                }
                if let Some(hash) = non_blank(transaction_hash) {
                    self.transaction_hash = Some(hash);
                }

                if self.confirmations >= self.required_confirmations {
                    self.status = PaymentStatus::Completed;
                    self.completed_at = Some(now);
                    self.provisioned = true;
                    TransitionOutcome::Completed
                } else {
                    self.status = PaymentStatus::Confirming;
                    TransitionOutcome::Updated
                }
            }
            Transition::Verify {
                transaction_hash,
                notes,
            } => {
                if self.status == PaymentStatus::Completed {
                    return Ok(TransitionOutcome::Unchanged);
                }
                self.status = PaymentStatus::Completed;
                self.confirmations = self.required_confirmations;
                self.manually_verified = true;
                self.completed_at = Some(now);
                self.cancelled_at = None;
                self.provisioned = true;
                if let Some(hash) = non_blank(transaction_hash) {
                    self.transaction_hash = Some(hash);
                }
                self.record_notes(notes);
                TransitionOutcome::Completed
            }
            Transition::Cancel { notes } => {
                if self.status == PaymentStatus::Cancelled {
                    return Ok(TransitionOutcome::Unchanged);
                }
                self.status = PaymentStatus::Cancelled;
                self.cancelled_at = Some(now);
                self.record_notes(notes);
                TransitionOutcome::Updated
            }
            Transition::Reset { notes } => {
                self.status = PaymentStatus::Pending;
                self.confirmations = 0;
                self.transaction_hash = None;
                self.completed_at = None;
                self.cancelled_at = None;
                self.manually_verified = false;
                self.provisioned = false;
                self.record_notes(notes);
                TransitionOutcome::Updated
            }
        };

        self.updated_at = now;
        self.version += 1;
        Ok(outcome)
    }

    /// Claims a completion side effect that an earlier attempt gave back.
    /// Returns `false` unless the payment is completed and unclaimed.
    pub fn reclaim_provisioning(&mut self, now: DateTime<Utc>) -> bool {
        if self.status != PaymentStatus::Completed || self.provisioned {
            return false;
        }
        self.provisioned = true;
        self.updated_at = now;
        self.version += 1;
        true
    }

    /// Gives back the claim taken by the completion stamped `completed_at`.
    /// Returns `false` if the payment has moved on since.
    pub fn release_provisioning(
        &mut self,
        completed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        if self.status != PaymentStatus::Completed
            || !self.provisioned
            || self.completed_at != completed_at
        {
            return false;
        }
        self.provisioned = false;
        self.updated_at = now;
        self.version += 1;
        true
    }

    fn record_notes(&mut self, notes: &Option<String>) {
        if let Some(notes) = non_blank(notes) {
            self.admin_notes = Some(notes);
        }
    }

    /// Public status view as returned to pollers.
    pub fn view(&self, now: DateTime<Utc>) -> PaymentView {
        PaymentView {
            payment_id: self.id,
            status: self.status,
            tier: self.tier,
            cryptocurrency: self.cryptocurrency,
            amount: self.amount,
            payment_address: self.payment_address.clone(),
            confirmations: self.confirmations,
            required_confirmations: self.required_confirmations,
            transaction_hash: self.transaction_hash.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            completed_at: self.completed_at,
            expired: self.is_expired(now),
        }
    }

    /// What the payer needs to send funds.
    pub fn instructions(&self) -> PaymentInstructions {
        PaymentInstructions {
            payment_id: self.id,
            cryptocurrency: self.cryptocurrency,
            symbol: self.cryptocurrency.symbol().to_string(),
            network: self.cryptocurrency.network().to_string(),
            amount: self.amount,
            payment_address: self.payment_address.clone(),
            qr_payload: self.cryptocurrency.payment_uri(self.amount),
            expires_at: self.expires_at,
            required_confirmations: self.required_confirmations,
        }
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub tier: Tier,
    pub cryptocurrency: Cryptocurrency,
    pub amount: Decimal,
    pub payment_address: String,
    pub confirmations: u32,
    pub required_confirmations: u32,
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstructions {
    pub payment_id: PaymentId,
    pub cryptocurrency: Cryptocurrency,
    pub symbol: String,
    pub network: String,
    pub amount: Decimal,
    pub payment_address: String,
    pub qr_payload: String,
    pub expires_at: DateTime<Utc>,
    pub required_confirmations: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
    }

    fn payer() -> Payer {
        Payer::new("Jane@Example.com", "Jane", "Doe").unwrap()
    }

    fn open(crypto: Cryptocurrency) -> Payment {
        Payment::open(payer(), Tier::Ruby, crypto, t0()).unwrap()
    }

    fn report(confirmations: u32) -> Transition {
        Transition::ReportProgress {
            confirmations: Some(confirmations),
            transaction_hash: Some("0xabc".to_string()),
        }
    }

    #[test]
    fn test_open_payment() {
        let payment = open(Cryptocurrency::Bitcoin);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.amount, dec!(0.00015385));
        assert_eq!(payment.payment_address, Cryptocurrency::Bitcoin.payment_address());
        assert_eq!(payment.required_confirmations, 1);
        assert_eq!(payment.expires_at, t0() + TimeDelta::hours(24));
        assert_eq!(payment.payer.email, "jane@example.com");
    }

    #[test]
    fn test_open_rejects_free_tier() {
        let result = Payment::open(payer(), Tier::Sapphire, Cryptocurrency::Bitcoin, t0());
        assert!(matches!(result, Err(PaymentError::ValidationError(_))));
    }

    #[test]
    fn test_payer_validation() {
        assert!(Payer::new("not-an-email", "A", "B").is_err());
        assert!(Payer::new("a@b.co", " ", "B").is_err());
        assert!(Payer::new("@b.co", "A", "B").is_err());
    }

    #[test]
    fn test_progress_below_threshold_is_confirming() {
        let mut payment = open(Cryptocurrency::Ethereum);
        let outcome = payment.apply(&report(3), t0()).unwrap();
        assert_eq!(outcome, TransitionOutcome::Updated);
        assert_eq!(payment.status, PaymentStatus::Confirming);
        assert_eq!(payment.confirmations, 3);
        assert_eq!(payment.transaction_hash.as_deref(), Some("0xabc"));
        assert!(payment.completed_at.is_none());
        assert_eq!(payment.version, 1);
    }

    #[test]
    fn test_progress_at_threshold_completes_once() {
        let mut payment = open(Cryptocurrency::Ethereum);
        let done_at = t0() + TimeDelta::minutes(5);
        assert_eq!(
            payment.apply(&report(12), done_at).unwrap(),
            TransitionOutcome::Completed
        );
        assert_eq!(payment.completed_at, Some(done_at));

        let later = done_at + TimeDelta::minutes(5);
        assert_eq!(
            payment.apply(&report(20), later).unwrap(),
            TransitionOutcome::Unchanged
        );
        assert_eq!(payment.completed_at, Some(done_at));
        assert_eq!(payment.confirmations, 12);
        assert_eq!(payment.version, 1);
    }

    #[test]
    fn test_progress_keeps_count_when_absent() {
        let mut payment = open(Cryptocurrency::Litecoin);
        payment.apply(&report(2), t0()).unwrap();
        payment
            .apply(
                &Transition::ReportProgress {
                    confirmations: None,
                    transaction_hash: None,
                },
                t0(),
            )
            .unwrap();
        assert_eq!(payment.confirmations, 2);
        assert_eq!(payment.transaction_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_expired_is_derived_not_persisted() {
        let payment = open(Cryptocurrency::Bitcoin);
        let after = t0() + TimeDelta::hours(24) + TimeDelta::seconds(1);
        assert!(!payment.is_expired(payment.expires_at));
        assert!(payment.is_expired(after));
        let view = payment.view(after);
        assert!(view.expired);
        assert_eq!(view.status, PaymentStatus::Pending);
    }

    #[test]
    fn test_progress_rejected_once_expired() {
        let mut payment = open(Cryptocurrency::Bitcoin);
        let after = t0() + TimeDelta::hours(25);
        assert!(matches!(
            payment.apply(&report(1), after),
            Err(PaymentError::Expired(_))
        ));
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.version, 0);
    }

    #[test]
    fn test_confirming_payment_is_never_expired() {
        let mut payment = open(Cryptocurrency::Ethereum);
        payment.apply(&report(1), t0()).unwrap();
        let after = t0() + TimeDelta::hours(30);
        assert!(!payment.is_expired(after));
        assert_eq!(
            payment.apply(&report(12), after).unwrap(),
            TransitionOutcome::Completed
        );
    }

    #[test]
    fn test_progress_rejected_when_cancelled() {
        let mut payment = open(Cryptocurrency::Bitcoin);
        payment.apply(&Transition::Cancel { notes: None }, t0()).unwrap();
        assert!(matches!(
            payment.apply(&report(1), t0()),
            Err(PaymentError::Conflict(_))
        ));
    }

    #[test]
    fn test_verify_forces_completion() {
        let mut payment = open(Cryptocurrency::Ethereum);
        let outcome = payment
            .apply(
                &Transition::Verify {
                    transaction_hash: Some("0xdef".to_string()),
                    notes: Some("checked on explorer".to_string()),
                },
                t0() + TimeDelta::hours(48),
            )
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Completed);
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.confirmations, 12);
        assert!(payment.manually_verified);
        assert_eq!(payment.admin_notes.as_deref(), Some("checked on explorer"));
    }

    #[test]
    fn test_verify_on_completed_is_noop() {
        let mut payment = open(Cryptocurrency::Bitcoin);
        payment.apply(&report(1), t0()).unwrap();
        let outcome = payment
            .apply(
                &Transition::Verify {
                    transaction_hash: None,
                    notes: None,
                },
                t0(),
            )
            .unwrap();
        assert_eq!(outcome, TransitionOutcome::Unchanged);
        assert!(!payment.manually_verified);
    }

    #[test]
    fn test_reset_clears_progress_from_any_state() {
        let setups: Vec<Transition> = vec![
            report(1),
            Transition::Cancel { notes: None },
            Transition::Verify {
                transaction_hash: Some("0x1".to_string()),
                notes: None,
            },
        ];
        for setup in setups {
            let mut payment = open(Cryptocurrency::Bitcoin);
            payment.apply(&setup, t0()).unwrap();
            payment
                .apply(&Transition::Reset { notes: None }, t0())
                .unwrap();
            assert_eq!(payment.status, PaymentStatus::Pending);
            assert_eq!(payment.confirmations, 0);
            assert!(payment.transaction_hash.is_none());
            assert!(payment.completed_at.is_none());
            assert!(payment.cancelled_at.is_none());
            assert!(!payment.manually_verified);
            assert!(!payment.provisioned);
        }
    }

    #[test]
    fn test_released_claim_can_be_reclaimed_once() {
        let mut payment = open(Cryptocurrency::Bitcoin);
        payment.apply(&report(1), t0()).unwrap();
        assert!(payment.provisioned);
        assert!(!payment.reclaim_provisioning(t0()));

        let completed_at = payment.completed_at;
        assert!(!payment.release_provisioning(Some(t0() - TimeDelta::hours(1)), t0()));
        assert!(payment.release_provisioning(completed_at, t0()));
        assert!(!payment.provisioned);
        assert_eq!(payment.version, 2);

        assert!(payment.reclaim_provisioning(t0()));
        assert!(!payment.reclaim_provisioning(t0()));
        assert_eq!(payment.version, 3);
    }

    #[test]
    fn test_instructions() {
        let payment = open(Cryptocurrency::Bitcoin);
        let instructions = payment.instructions();
        assert_eq!(instructions.symbol, "BTC");
        assert_eq!(
            instructions.qr_payload,
            format!("bitcoin:{}?amount=0.00015385", payment.payment_address)
        );
    }

    #[test]
    fn test_payment_json_round_trip() {
        let payment = open(Cryptocurrency::Litecoin);
        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["email"], "jane@example.com");
        assert_eq!(json["requiredConfirmations"], 6);
        let back: Payment = serde_json::from_value(json).unwrap();
        assert_eq!(back, payment);
    }

    #[test]
    fn test_malformed_id() {
        assert!(matches!(
            "nope".parse::<PaymentId>(),
            Err(PaymentError::ValidationError(_))
        ));
    }
}
