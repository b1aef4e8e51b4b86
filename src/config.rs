//! Command-line and environment configuration.

use crate::domain::ports::{NotifierBox, PaymentStoreBox, UserStoreBox};
use crate::error::Result;
use crate::infrastructure::in_memory::{InMemoryPaymentStore, InMemoryUserStore};
use crate::infrastructure::log_notifier::LogNotifier;
use clap::Args;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Args)]
pub struct StorageArgs {
    /// Path to a persistent database. In-memory storage is used when omitted.
    #[arg(long, env = "PAYMENTS_DB_PATH")]
    pub db_path: Option<PathBuf>,
}

impl StorageArgs {
    /// Opens the configured payment and user stores.
    pub fn open_stores(&self) -> Result<(PaymentStoreBox, UserStoreBox)> {
        match &self.db_path {
            #[cfg(feature = "storage-rocksdb")]
            Some(path) => {
                let store = crate::infrastructure::rocksdb::RocksDBStore::open(path)?;
                tracing::info!(path = %path.display(), "Using RocksDB storage");
                Ok((Box::new(store.clone()), Box::new(store)))
            }
            #[cfg(not(feature = "storage-rocksdb"))]
            Some(_) => Err(crate::error::PaymentError::ValidationError(
                "--db-path requires a build with the storage-rocksdb feature".to_string(),
            )),
            None => {
                tracing::debug!("Using in-memory storage");
                Ok((
                    Box::new(InMemoryPaymentStore::new()),
                    Box::new(InMemoryUserStore::new()),
                ))
            }
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServerArgs {
    #[arg(long, env = "PAYMENTS_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// HS256 secret used to verify admin bearer tokens.
    #[arg(long, env = "ADMIN_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Include internal error details in HTTP responses.
    #[arg(long, env = "PAYMENTS_DEV_MODE")]
    pub dev_mode: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct MailArgs {
    /// SMTP relay. Welcome messages are only logged when unset.
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    #[arg(long, env = "MAIL_FROM")]
    pub mail_from: Option<String>,

    #[arg(long, env = "MAIL_FROM_NAME", default_value = "Membership Team")]
    pub mail_from_name: String,
}

impl MailArgs {
    #[cfg(feature = "smtp")]
    fn smtp_settings(&self) -> Option<crate::infrastructure::smtp::SmtpSettings> {
        let host = self.smtp_host.clone()?;
        Some(crate::infrastructure::smtp::SmtpSettings {
            host,
            port: self.smtp_port,
            username: self.smtp_username.clone().unwrap_or_default(),
            password: self.smtp_password.clone().unwrap_or_default(),
            from_email: self
                .mail_from
                .clone()
                .or_else(|| self.smtp_username.clone())
                .unwrap_or_default(),
            from_name: self.mail_from_name.clone(),
        })
    }

    pub fn notifier(&self) -> Result<NotifierBox> {
        #[cfg(feature = "smtp")]
        if let Some(settings) = self.smtp_settings() {
            tracing::info!(host = %settings.host, port = settings.port, "Using SMTP notifier");
            return Ok(Box::new(crate::infrastructure::smtp::SmtpNotifier::new(settings)?));
        }

        if self.smtp_host.is_some() && cfg!(not(feature = "smtp")) {
            tracing::warn!(
                "SMTP_HOST is set but this build has no smtp feature; logging welcome messages instead"
            );
        }
        Ok(Box::new(LogNotifier))
    }
}
