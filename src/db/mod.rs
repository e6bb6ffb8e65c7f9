//! Credential storage for SASL and REGISTER.
//!
//! Three narrow tables: PLAIN bcrypt hashes, SCRAM-SHA-256 keys and
//! certificate fingerprints for EXTERNAL. Account names are looked up
//! case-insensitively.
//!
//! Two backends implement [`CredentialStore`]:
//! - [`SqliteStore`]: SQLx pool with embedded migrations
//! - [`MemoryStore`]: process-local maps, used when no `[database]` is set

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::sasl::{PlainCredential, ScramCredential};

/// Credential store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Insert and lookup of credential rows.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Store a PLAIN credential. Fails with `AccountExists` if the name is taken.
    async fn insert_plain(&self, cred: &PlainCredential) -> Result<(), StoreError>;

    async fn plain(&self, username: &str) -> Result<Option<PlainCredential>, StoreError>;

    /// Store a SCRAM credential. Fails with `AccountExists` if the name is taken.
    async fn insert_scram(&self, cred: &ScramCredential) -> Result<(), StoreError>;

    async fn scram(&self, username: &str) -> Result<Option<ScramCredential>, StoreError>;

    /// Bind a certificate fingerprint to `username`, replacing any previous one.
    async fn insert_external(&self, username: &str, cert_fp: &str) -> Result<(), StoreError>;

    async fn external(&self, username: &str) -> Result<Option<String>, StoreError>;
}

/// Open the configured store, or an in-memory one.
pub async fn open(config: Option<&DatabaseConfig>) -> Result<Arc<dyn CredentialStore>, StoreError> {
    match config {
        Some(db) => Ok(Arc::new(SqliteStore::connect(&db.url).await?)),
        None => {
            info!("No [database] configured, credentials are kept in memory");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}
