use crate::domain::payment::{Payment, PaymentId};
use crate::domain::ports::{PaymentStore, UserStore};
use crate::domain::user::User;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payment records.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for storing member accounts.
pub const CF_USERS: &str = "users";

/// A persistent store implementation using RocksDB.
///
/// Handles storage for both `Payment` and `User` entities using separate
/// Column Families. Values are JSON documents; payments are keyed by the raw
/// UUID bytes and users by lower-cased email.
///
/// Read-modify-write operations are serialized through a process-wide write
/// lock. This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("payments" and "users") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_users = ColumnFamilyDescriptor::new(CF_USERS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_users])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes).map_err(|e| {
                PaymentError::internal(format!("Deserialization error: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| PaymentError::internal(format!("Serialization error: {}", e)))?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| PaymentError::internal(format!("{} column family not found", name)))
    }
}

fn user_key(email: &str) -> Vec<u8> {
    email.to_ascii_lowercase().into_bytes()
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let key = payment.id.as_uuid().as_bytes().to_vec();
        if self.read::<Payment>(CF_PAYMENTS, &key)?.is_some() {
            return Err(PaymentError::Conflict(format!(
                "Payment {} already exists",
                payment.id
            )));
        }
        self.write(CF_PAYMENTS, &key, &payment)
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, id.as_uuid().as_bytes())
    }

    async fn compare_and_swap(&self, payment: Payment, expected_version: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = payment.id.as_uuid().as_bytes().to_vec();
        match self.read::<Payment>(CF_PAYMENTS, &key)? {
            Some(current) if current.version == expected_version => {
                self.write(CF_PAYMENTS, &key, &payment)?;
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(PaymentError::NotFound(format!("Payment {}", payment.id))),
        }
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut payments = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let payment: Payment = serde_json::from_slice(&value).map_err(|e| {
                PaymentError::internal(format!("Failed to deserialize payment: {}", e))
            })?;
            payments.push(payment);
        }
        Ok(payments)
    }
}

#[async_trait]
impl UserStore for RocksDBStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.read(CF_USERS, &user_key(email))
    }

    async fn insert(&self, user: User) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let key = user_key(&user.email);
        if self.read::<User>(CF_USERS, &key)?.is_some() {
            return Ok(false);
        }
        self.write(CF_USERS, &key, &user)?;
        Ok(true)
    }

    async fn update(&self, user: User) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write(CF_USERS, &user_key(&user.email), &user)
    }
}
