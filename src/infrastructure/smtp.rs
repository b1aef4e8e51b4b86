use crate::domain::notification::WelcomeMessage;
use crate::domain::ports::Notifier;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::header::ContentType, transport::smtp::authentication::Credentials,
};

#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

/// Delivers welcome messages over authenticated SMTP.
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_email: String,
    from_name: String,
}

impl SmtpNotifier {
    pub fn new(settings: SmtpSettings) -> Result<Self> {
        let creds = Credentials::new(settings.username, settings.password);

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
            .map_err(|e| {
                PaymentError::NotificationError(format!("Failed to create SMTP transport: {}", e))
            })?
            .port(settings.port)
            .credentials(creds)
            .build();

        Ok(Self {
            transport,
            from_email: settings.from_email,
            from_name: settings.from_name,
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send_welcome(&self, message: &WelcomeMessage) -> Result<()> {
        let from_address = format!("{} <{}>", self.from_name, self.from_email);

        let email = Message::builder()
            .from(from_address.parse().map_err(|e| {
                PaymentError::NotificationError(format!("Invalid from address: {}", e))
            })?)
            .to(message.recipient.parse().map_err(|e| {
                PaymentError::NotificationError(format!("Invalid to address: {}", e))
            })?)
            .subject(message.subject())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body_text())
            .map_err(|e| PaymentError::NotificationError(format!("Failed to build email: {}", e)))?;

        self.transport.send(email).await.map_err(|e| {
            PaymentError::NotificationError(format!("Failed to send email via SMTP: {}", e))
        })?;

        tracing::info!(recipient = %message.recipient, "Welcome email sent");
        Ok(())
    }
}
