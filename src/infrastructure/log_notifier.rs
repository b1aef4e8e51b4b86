use crate::domain::notification::WelcomeMessage;
use crate::domain::ports::Notifier;
use crate::error::Result;
use async_trait::async_trait;

/// Writes welcome messages to the log instead of delivering them.
///
/// Used when no mail transport is configured. Temporary passwords are never logged.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        tracing::info!(
            recipient = %message.recipient,
            tier = %message.tier,
            subject = %message.subject(),
            new_account = message.credentials.is_some(),
            payment_id = ?message.payment.as_ref().map(|p| p.payment_id),
            "Welcome message (log delivery)"
        );
        Ok(())
    }
}
