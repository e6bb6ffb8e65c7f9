//! SQLite credential store.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::info;

use super::{CredentialStore, StoreError};
use crate::sasl::{PlainCredential, ScramCredential};

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Credential store backed by an SQLx pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connect, creating the database and running migrations if needed.
    ///
    /// `:memory:` opens a private in-memory database.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let path = url.strip_prefix("sqlite://").unwrap_or(url);
        let pool = if path == ":memory:" {
            // Uniquely named shared-cache database so parallel tests never collide.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:gossipd-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }
}

/// Map a UNIQUE violation to `AccountExists`.
fn insert_error(e: sqlx::Error, username: &str) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return StoreError::AccountExists(username.to_string());
    }
    StoreError::from(e)
}

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_plain(&self, cred: &PlainCredential) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO sasl_plain (username, pass) VALUES (?, ?)")
            .bind(&cred.username)
            .bind(&cred.hash)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(e, &cred.username))?;
        Ok(())
    }

    async fn plain(&self, username: &str) -> Result<Option<PlainCredential>, StoreError> {
        let row = sqlx::query_as::<_, (String, String)>(
            "SELECT username, pass FROM sasl_plain WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(username, hash)| PlainCredential { username, hash }))
    }

    async fn insert_scram(&self, cred: &ScramCredential) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sasl_scram (username, server_key, stored_key, salt, iterations)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&cred.username)
        .bind(&cred.server_key)
        .bind(&cred.stored_key)
        .bind(&cred.salt)
        .bind(i64::from(cred.iterations))
        .execute(&self.pool)
        .await
        .map_err(|e| insert_error(e, &cred.username))?;
        Ok(())
    }

    async fn scram(&self, username: &str) -> Result<Option<ScramCredential>, StoreError> {
        let row = sqlx::query_as::<_, (String, Vec<u8>, Vec<u8>, Vec<u8>, i64)>(
            r#"
            SELECT username, server_key, stored_key, salt, iterations
            FROM sasl_scram WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(username, server_key, stored_key, salt, iterations)| {
            let iterations = u32::try_from(iterations).map_err(|_| {
                StoreError::Internal(format!("bad iteration count {iterations} for {username}"))
            })?;
            Ok(ScramCredential {
                username,
                server_key,
                stored_key,
                salt,
                iterations,
            })
        })
        .transpose()
    }

    async fn insert_external(&self, username: &str, cert_fp: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO sasl_external (username, cert_fp) VALUES (?, ?)")
            .bind(username)
            .bind(cert_fp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn external(&self, username: &str) -> Result<Option<String>, StoreError> {
        let fp = sqlx::query_scalar::<_, String>(
            "SELECT cert_fp FROM sasl_external WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(fp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_and_scram_round_trip() {
        let store = SqliteStore::connect(":memory:").await.unwrap();

        let plain = PlainCredential {
            username: "Alice".into(),
            hash: "$2b$04$abc".into(),
        };
        store.insert_plain(&plain).await.unwrap();
        assert_eq!(store.plain("alice").await.unwrap(), Some(plain.clone()));
        assert!(matches!(
            store.insert_plain(&plain).await,
            Err(StoreError::AccountExists(_))
        ));

        let scram = ScramCredential::derive("Alice", "pencil", b"salty", 16);
        store.insert_scram(&scram).await.unwrap();
        assert_eq!(store.scram("ALICE").await.unwrap(), Some(scram));
        assert!(store.scram("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn external_replaces_fingerprint() {
        let store = SqliteStore::connect(":memory:").await.unwrap();
        store.insert_external("bob", "aa").await.unwrap();
        store.insert_external("bob", "bb").await.unwrap();
        assert_eq!(store.external("BOB").await.unwrap().as_deref(), Some("bb"));
    }

    #[tokio::test]
    async fn file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("creds.db");
        let url = format!("sqlite://{}", path.display());
        {
            let store = SqliteStore::connect(&url).await.unwrap();
            store.insert_external("carol", "cc").await.unwrap();
        }
        let store = SqliteStore::connect(&url).await.unwrap();
        assert_eq!(store.external("carol").await.unwrap().as_deref(), Some("cc"));
    }
}
