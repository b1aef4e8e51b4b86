use super::payment::{Payment, PaymentId};
use super::pricing::{Cryptocurrency, Tier};
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub amount: Decimal,
    pub cryptocurrency: Cryptocurrency,
    pub transaction_hash: Option<String>,
}

impl From<&Payment> for PaymentReceipt {
    fn from(payment: &Payment) -> Self {
        Self {
            payment_id: payment.id,
            amount: payment.amount,
            cryptocurrency: payment.cryptocurrency,
            transaction_hash: payment.transaction_hash.clone(),
        }
    }
}

#[derive(Clone, PartialEq)]
pub struct TemporaryCredentials {
    pub email: String,
    pub temporary_password: String,
}

impl std::fmt::Debug for TemporaryCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemporaryCredentials")
            .field("email", &self.email)
            .field("temporary_password", &"<redacted>")
            .finish()
    }
}

/// Membership confirmation sent once an account is provisioned.
#[derive(Debug, Clone, PartialEq)]
pub struct WelcomeMessage {
    pub recipient: String,
    pub name: String,
    pub tier: Tier,
    pub payment: Option<PaymentReceipt>,
    /// Present only when a new account was created.
    pub credentials: Option<TemporaryCredentials>,
}

impl WelcomeMessage {
    pub fn subject(&self) -> String {
        format!("Welcome to your {} membership", self.tier.display_name())
    }

    pub fn body_text(&self) -> String {
        let mut body = format!(
            "Hi {},\n\nYour {} membership is now active.\n",
            self.name,
            self.tier.display_name()
        );

        if let Some(payment) = &self.payment {
            body.push_str(&format!(
                "\nPayment {} of {} {} has been confirmed.\n",
                payment.payment_id,
                payment.amount,
                payment.cryptocurrency.symbol()
            ));
            if let Some(hash) = &payment.transaction_hash {
                body.push_str(&format!("Transaction: {}\n", hash));
            }
        }

        if let Some(credentials) = &self.credentials {
            body.push_str(&format!(
                "\nSign in with {} and the temporary password {}\nPlease change it after your first login.\n",
                credentials.email, credentials.temporary_password
            ));
        }

        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_body_includes_credentials_and_receipt() {
        let message = WelcomeMessage {
            recipient: "kim@example.com".to_string(),
            name: "Kim".to_string(),
            tier: Tier::Ruby,
            payment: Some(PaymentReceipt {
                payment_id: PaymentId::new(),
                amount: dec!(0.00015385),
                cryptocurrency: Cryptocurrency::Bitcoin,
                transaction_hash: Some("abc123".to_string()),
            }),
            credentials: Some(TemporaryCredentials {
                email: "kim@example.com".to_string(),
                temporary_password: "s3cret".to_string(),
            }),
        };

        let body = message.body_text();
        assert!(body.contains("Ruby membership"));
        assert!(body.contains("0.00015385 BTC"));
        assert!(body.contains("abc123"));
        assert!(body.contains("s3cret"));
        assert!(!format!("{:?}", message).contains("s3cret"));
    }
}
