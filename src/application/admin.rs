use crate::domain::payment::{Payment, PaymentStatus, Transition};
use crate::domain::pricing::Cryptocurrency;
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Manual overrides available to administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminAction {
    Verify,
    Cancel,
    Reset,
}

impl AdminAction {
    pub fn into_transition(
        self,
        transaction_hash: Option<String>,
        notes: Option<String>,
    ) -> Transition {
        match self {
            AdminAction::Verify => Transition::Verify {
                transaction_hash,
                notes,
            },
            AdminAction::Cancel => Transition::Cancel { notes },
            AdminAction::Reset => Transition::Reset { notes },
        }
    }
}

impl fmt::Display for AdminAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AdminAction::Verify => "verify",
            AdminAction::Cancel => "cancel",
            AdminAction::Reset => "reset",
        })
    }
}

impl FromStr for AdminAction {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "verify" => Ok(AdminAction::Verify),
            "cancel" => Ok(AdminAction::Cancel),
            "reset" => Ok(AdminAction::Reset),
            other => Err(PaymentError::ValidationError(format!(
                "Unknown admin action '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentFilter {
    pub status: Option<PaymentStatus>,
    pub page: u32,
    pub limit: u32,
}

impl PaymentFilter {
    pub fn new(
        status: Option<PaymentStatus>,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
        if page == 0 {
            return Err(PaymentError::ValidationError(
                "page must be at least 1".to_string(),
            ));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(PaymentError::ValidationError(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self {
            status,
            page,
            limit,
        })
    }
}

impl Default for PaymentFilter {
    fn default() -> Self {
        Self {
            status: None,
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A payment as shown to administrators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminPaymentRow {
    #[serde(flatten)]
    pub payment: Payment,
    pub expired: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: usize,
    pub pages: usize,
}

/// Aggregates over every stored payment, independent of the page filter.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub total: usize,
    pub by_status: BTreeMap<PaymentStatus, usize>,
    /// Pending payments past their window.
    pub expired: usize,
    /// Sum of completed payment amounts per currency.
    pub revenue: BTreeMap<Cryptocurrency, Decimal>,
}

impl PaymentStats {
    pub fn collect<'a>(
        payments: impl IntoIterator<Item = &'a Payment>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stats = PaymentStats {
            by_status: PaymentStatus::ALL.iter().map(|s| (*s, 0)).collect(),
            ..Default::default()
        };
        for payment in payments {
            stats.total += 1;
            *stats.by_status.entry(payment.status).or_default() += 1;
            if payment.is_expired(now) {
                stats.expired += 1;
            }
            if payment.status == PaymentStatus::Completed {
                *stats.revenue.entry(payment.cryptocurrency).or_default() += payment.amount;
            }
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    pub payments: Vec<AdminPaymentRow>,
    pub pagination: Pagination,
    pub stats: PaymentStats,
}

impl PaymentPage {
    /// Filters, orders newest first, and slices `payments` according to `filter`.
    pub fn build(mut payments: Vec<Payment>, filter: &PaymentFilter, now: DateTime<Utc>) -> Self {
        let stats = PaymentStats::collect(&payments, now);

        if let Some(status) = filter.status {
            payments.retain(|p| p.status == status);
        }
        payments.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = payments.len();
        let limit = filter.limit as usize;
        let pages = total.div_ceil(limit);
        let offset = (filter.page as usize - 1) * limit;

        let rows = payments
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|payment| AdminPaymentRow {
                expired: payment.is_expired(now),
                payment,
            })
            .collect();

        Self {
            payments: rows,
            pagination: Pagination {
                page: filter.page,
                limit: filter.limit,
                total,
                pages,
            },
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payment::Payer;
    use crate::domain::pricing::Tier;
    use chrono::{TimeDelta, TimeZone};
    use rust_decimal_macros::dec;

    fn payments(n: i64) -> Vec<Payment> {
        let t0 = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let payer = Payer::new(format!("p{}@example.com", i), "P", "Q").unwrap();
                Payment::open(payer, Tier::Ruby, Cryptocurrency::Usdt, t0 + TimeDelta::minutes(i))
                    .unwrap()
            })
            .collect()
    }

    #[test]
    fn test_filter_validation() {
        assert!(PaymentFilter::new(None, Some(0), None).is_err());
        assert!(PaymentFilter::new(None, None, Some(0)).is_err());
        assert!(PaymentFilter::new(None, None, Some(101)).is_err());
        let filter = PaymentFilter::new(None, None, None).unwrap();
        assert_eq!(filter, PaymentFilter::default());
    }

    #[test]
    fn test_page_orders_newest_first_and_slices() {
        let all = payments(5);
        let newest = all[4].id;
        let filter = PaymentFilter::new(None, Some(1), Some(2)).unwrap();
        let page = PaymentPage::build(all, &filter, Utc::now());

        assert_eq!(page.payments.len(), 2);
        assert_eq!(page.payments[0].payment.id, newest);
        assert_eq!(page.pagination.total, 5);
        assert_eq!(page.pagination.pages, 3);

        let last = PaymentFilter::new(None, Some(3), Some(2)).unwrap();
        let page = PaymentPage::build(payments(5), &last, Utc::now());
        assert_eq!(page.payments.len(), 1);
    }

    #[test]
    fn test_stats_ignore_status_filter() {
        let mut all = payments(3);
        let t = all[0].created_at;
        all[0]
            .apply(
                &Transition::Verify {
                    transaction_hash: None,
                    notes: None,
                },
                t,
            )
            .unwrap();
        let filter = PaymentFilter::new(Some(PaymentStatus::Completed), None, None).unwrap();
        let page = PaymentPage::build(all, &filter, t);

        assert_eq!(page.payments.len(), 1);
        assert_eq!(page.stats.total, 3);
        assert_eq!(page.stats.by_status[&PaymentStatus::Pending], 2);
        assert_eq!(page.stats.by_status[&PaymentStatus::Completed], 1);
        assert_eq!(page.stats.by_status[&PaymentStatus::Cancelled], 0);
        assert_eq!(page.stats.revenue[&Cryptocurrency::Usdt], dec!(10));
    }

    #[test]
    fn test_admin_action_parse() {
        assert_eq!("Verify".parse::<AdminAction>().unwrap(), AdminAction::Verify);
        assert!("refund".parse::<AdminAction>().is_err());
    }
}
