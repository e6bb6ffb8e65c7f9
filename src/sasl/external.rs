//! SASL EXTERNAL: authenticate with the client certificate fingerprint
//! the connection layer recorded.

use subtle::ConstantTimeEq;

use super::{SaslError, Step};
use crate::db::CredentialStore;

#[derive(Debug)]
pub struct External {
    nick: String,
    cert_fp: Option<String>,
    authn: Option<String>,
}

impl External {
    pub fn new(nick: &str, cert_fp: Option<&str>) -> Self {
        Self {
            nick: nick.to_owned(),
            cert_fp: cert_fp.map(str::to_owned),
            authn: None,
        }
    }

    pub fn authn(&self) -> Option<&str> {
        self.authn.as_deref()
    }

    /// The response is an optional authzid; without one the current nick
    /// names the account.
    pub async fn next(
        &mut self,
        store: &dyn CredentialStore,
        response: &[u8],
    ) -> Result<Step, SaslError> {
        if self.authn.is_some() {
            return Err(SaslError::Finished);
        }
        let presented = self.cert_fp.as_deref().ok_or(SaslError::NoCertificate)?;
        let authzid = std::str::from_utf8(response).map_err(|_| SaslError::Malformed)?;
        let username = if authzid.is_empty() {
            self.nick.as_str()
        } else {
            authzid
        };

        let stored = store
            .external(username)
            .await?
            .ok_or(SaslError::UnknownUser)?;
        if !bool::from(stored.as_bytes().ct_eq(presented.as_bytes())) {
            return Err(SaslError::InvalidCredentials);
        }

        self.authn = Some(username.to_owned());
        Ok(Step::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn matching_fingerprint_succeeds() {
        let store = MemoryStore::default();
        store.insert_external("alice", "abcd").await.unwrap();

        let mut ext = External::new("alice", Some("abcd"));
        assert_eq!(ext.next(&store, b"").await.unwrap(), Step::Done);
        assert_eq!(ext.authn(), Some("alice"));
    }

    #[tokio::test]
    async fn mismatch_and_missing_cert_fail() {
        let store = MemoryStore::default();
        store.insert_external("alice", "abcd").await.unwrap();

        let mut ext = External::new("alice", Some("ffff"));
        assert!(matches!(
            ext.next(&store, b"").await,
            Err(SaslError::InvalidCredentials)
        ));

        let mut ext = External::new("alice", None);
        assert!(matches!(
            ext.next(&store, b"").await,
            Err(SaslError::NoCertificate)
        ));
    }
}
