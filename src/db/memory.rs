//! In-memory credential store.

use std::collections::HashMap;

use async_trait::async_trait;
use gossip_proto::casemap;
use parking_lot::Mutex;

use super::{CredentialStore, StoreError};
use crate::sasl::{PlainCredential, ScramCredential};

/// Credentials keyed by folded account name. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    plain: Mutex<HashMap<String, PlainCredential>>,
    scram: Mutex<HashMap<String, ScramCredential>>,
    external: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn insert_plain(&self, cred: &PlainCredential) -> Result<(), StoreError> {
        let mut plain = self.plain.lock();
        let key = casemap::fold(&cred.username);
        if plain.contains_key(&key) {
            return Err(StoreError::AccountExists(cred.username.clone()));
        }
        plain.insert(key, cred.clone());
        Ok(())
    }

    async fn plain(&self, username: &str) -> Result<Option<PlainCredential>, StoreError> {
        Ok(self.plain.lock().get(&casemap::fold(username)).cloned())
    }

    async fn insert_scram(&self, cred: &ScramCredential) -> Result<(), StoreError> {
        let mut scram = self.scram.lock();
        let key = casemap::fold(&cred.username);
        if scram.contains_key(&key) {
            return Err(StoreError::AccountExists(cred.username.clone()));
        }
        scram.insert(key, cred.clone());
        Ok(())
    }

    async fn scram(&self, username: &str) -> Result<Option<ScramCredential>, StoreError> {
        Ok(self.scram.lock().get(&casemap::fold(username)).cloned())
    }

    async fn insert_external(&self, username: &str, cert_fp: &str) -> Result<(), StoreError> {
        self.external
            .lock()
            .insert(casemap::fold(username), cert_fp.to_owned());
        Ok(())
    }

    async fn external(&self, username: &str) -> Result<Option<String>, StoreError> {
        Ok(self.external.lock().get(&casemap::fold(username)).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_plain_is_rejected_case_insensitively() {
        let store = MemoryStore::default();
        let cred = PlainCredential {
            username: "Alice".into(),
            hash: "x".into(),
        };
        store.insert_plain(&cred).await.unwrap();

        let again = PlainCredential {
            username: "alice".into(),
            hash: "y".into(),
        };
        assert!(matches!(
            store.insert_plain(&again).await,
            Err(StoreError::AccountExists(name)) if name == "alice"
        ));
        assert_eq!(store.plain("ALICE").await.unwrap().unwrap().hash, "x");
    }

    #[tokio::test]
    async fn external_is_replaced() {
        let store = MemoryStore::default();
        store.insert_external("bob", "aa").await.unwrap();
        store.insert_external("Bob", "bb").await.unwrap();
        assert_eq!(store.external("bob").await.unwrap().as_deref(), Some("bb"));
        assert!(store.external("carol").await.unwrap().is_none());
    }
}
