use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::pricing::{Cryptocurrency, Tier};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

/// One flat CSV row per payment. Admin notes are left out of exports.
#[derive(Debug, Serialize)]
struct PaymentRecord<'a> {
    id: String,
    email: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    tier: Tier,
    cryptocurrency: Cryptocurrency,
    amount: Decimal,
    status: PaymentStatus,
    expired: bool,
    confirmations: u32,
    required_confirmations: u32,
    transaction_hash: &'a str,
    manually_verified: bool,
    created_at: String,
    expires_at: String,
    completed_at: String,
}

fn timestamp(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.to_rfc3339()).unwrap_or_default()
}

/// Writes payments as CSV, oldest first.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    /// Sorts by creation time and writes every row, flushing at the end.
    pub fn write_payments(&mut self, mut payments: Vec<Payment>, now: DateTime<Utc>) -> Result<()> {
        payments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        for payment in &payments {
            self.writer.serialize(PaymentRecord {
                id: payment.id.to_string(),
                email: &payment.payer.email,
                first_name: &payment.payer.first_name,
                last_name: &payment.payer.last_name,
                tier: payment.tier,
                cryptocurrency: payment.cryptocurrency,
                amount: payment.amount,
                status: payment.status,
                expired: payment.is_expired(now),
                confirmations: payment.confirmations,
                required_confirmations: payment.required_confirmations,
                transaction_hash: payment.transaction_hash.as_deref().unwrap_or_default(),
                manually_verified: payment.manually_verified,
                created_at: timestamp(Some(payment.created_at)),
                expires_at: timestamp(Some(payment.expires_at)),
                completed_at: timestamp(payment.completed_at),
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
