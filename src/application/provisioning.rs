use crate::auth::{generate_temporary_password, hash_password};
use crate::domain::notification::{PaymentReceipt, TemporaryCredentials, WelcomeMessage};
use crate::domain::payment::{Payer, Payment};
use crate::domain::ports::{Notifier, UserStore};
use crate::domain::user::{Subscription, User};
use crate::error::{PaymentError, Result};
use chrono::{DateTime, Utc};

/// What provisioning did to the payer's account.
#[derive(Debug, Clone, PartialEq)]
pub enum Provisioned {
    Created(User),
    Merged(User),
}

impl Provisioned {
    pub fn user(&self) -> &User {
        match self {
            Provisioned::Created(user) | Provisioned::Merged(user) => user,
        }
    }
}

/// Creates or upgrades the account for a payment that just completed, then
/// sends the welcome message. Delivery failures are logged and swallowed.
pub(crate) async fn provision_member(
    users: &dyn UserStore,
    notifier: &dyn Notifier,
    payment: &Payment,
    now: DateTime<Utc>,
) -> Result<Provisioned> {
    let subscription = Subscription::from_payment(payment, now);

    let (provisioned, credentials) = match users.find_by_email(&payment.payer.email).await? {
        Some(mut user) => {
            user.merge_subscription(subscription, now);
            users.update(user.clone()).await?;
            (Provisioned::Merged(user), None)
        }
        None => match create_account(users, &payment.payer, subscription.clone(), now).await? {
            Some((user, credentials)) => (Provisioned::Created(user), Some(credentials)),
            // Lost an insert race for the same email: fall back to upgrading.
            None => {
                let mut user = users
                    .find_by_email(&payment.payer.email)
                    .await?
                    .ok_or_else(|| {
                        PaymentError::internal(format!(
                            "Account for {} vanished during provisioning",
                            payment.payer.email
                        ))
                    })?;
                user.merge_subscription(subscription, now);
                users.update(user.clone()).await?;
                (Provisioned::Merged(user), None)
            }
        },
    };

    let message = WelcomeMessage {
        recipient: payment.payer.email.clone(),
        name: payment.payer.first_name.clone(),
        tier: payment.tier,
        payment: Some(PaymentReceipt::from(payment)),
        credentials,
    };
    deliver(notifier, &message).await;

    tracing::info!(
        payment_id = %payment.id,
        email = %payment.payer.email,
        tier = %payment.tier,
        created = matches!(provisioned, Provisioned::Created(_)),
        "Member provisioned"
    );
    Ok(provisioned)
}

/// Inserts a new account with a fresh temporary password.
/// Returns `None` if the email is already taken.
pub(crate) async fn create_account(
    users: &dyn UserStore,
    payer: &Payer,
    subscription: Subscription,
    now: DateTime<Utc>,
) -> Result<Option<(User, TemporaryCredentials)>> {
    let temporary_password = generate_temporary_password();
    let user = User::new(payer, hash_password(&temporary_password)?, subscription, now);

    if !users.insert(user.clone()).await? {
        return Ok(None);
    }

    let credentials = TemporaryCredentials {
        email: user.email.clone(),
        temporary_password,
    };
    Ok(Some((user, credentials)))
}

pub(crate) async fn deliver(notifier: &dyn Notifier, message: &WelcomeMessage) {
    if let Err(e) = notifier.send_welcome(message).await {
        tracing::warn!(
            recipient = %message.recipient,
            error = %e,
            "Failed to send welcome message"
        );
    }
}
