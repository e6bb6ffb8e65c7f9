//! SASL PLAIN (RFC 4616).
//!
//! Credentials are bcrypt hashes of the hex SHA-256 of the password, which
//! keeps arbitrarily long passwords inside bcrypt's input limit.

use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::{SaslError, Step};
use crate::db::CredentialStore;

/// Stored PLAIN credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainCredential {
    pub username: String,
    pub hash: String,
}

fn prehash(password: &[u8]) -> Zeroizing<String> {
    let digest = Sha256::digest(password);
    let mut hex = String::with_capacity(digest.len() * 2);
    for b in digest.iter() {
        hex.push_str(&format!("{b:02x}"));
    }
    Zeroizing::new(hex)
}

impl PlainCredential {
    /// Hash `password` for `username` with the given bcrypt cost.
    pub fn new(username: &str, password: &str, cost: u32) -> Result<Self, SaslError> {
        let hash = bcrypt::hash(prehash(password.as_bytes()).as_str(), cost)?;
        Ok(Self {
            username: username.to_owned(),
            hash,
        })
    }

    /// Check a password attempt.
    pub fn check(&self, password: &[u8]) -> bool {
        bcrypt::verify(prehash(password).as_str(), &self.hash).unwrap_or(false)
    }
}

/// PLAIN exchange state.
#[derive(Debug, Default)]
pub struct Plain {
    authcid: Option<String>,
    done: bool,
}

impl Plain {
    pub fn authn(&self) -> Option<&str> {
        self.authcid.as_deref().filter(|_| self.done)
    }

    pub async fn next(
        &mut self,
        store: &dyn CredentialStore,
        response: &[u8],
    ) -> Result<Step, SaslError> {
        if self.done {
            return Err(SaslError::Finished);
        }
        // [authzid] NUL authcid NUL passwd
        let parts: Vec<&[u8]> = response.split(|b| *b == 0).collect();
        let (authcid, password) = match parts.as_slice() {
            [authcid, password] | [_, authcid, password] => (*authcid, *password),
            _ => return Err(SaslError::Malformed),
        };
        let password = Zeroizing::new(password.to_vec());
        let authcid = std::str::from_utf8(authcid).map_err(|_| SaslError::Malformed)?;

        let cred = store
            .plain(authcid)
            .await?
            .ok_or(SaslError::UnknownUser)?;
        if !cred.check(&password) {
            return Err(SaslError::InvalidCredentials);
        }

        self.authcid = Some(cred.username);
        self.done = true;
        Ok(Step::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn accepts_registered_password() {
        let store = MemoryStore::default();
        store
            .insert_plain(&PlainCredential::new("Alice", "correct horse", 4).unwrap())
            .await
            .unwrap();

        let mut plain = Plain::default();
        let step = plain.next(&store, b"\0alice\0correct horse").await.unwrap();
        assert_eq!(step, Step::Done);
        assert_eq!(plain.authn(), Some("Alice"));
    }

    #[tokio::test]
    async fn authzid_form_is_accepted() {
        let store = MemoryStore::default();
        store
            .insert_plain(&PlainCredential::new("bob", "pw", 4).unwrap())
            .await
            .unwrap();
        let mut plain = Plain::default();
        assert_eq!(plain.next(&store, b"bob\0bob\0pw").await.unwrap(), Step::Done);
    }

    #[tokio::test]
    async fn rejects_bad_password_and_unknown_user() {
        let store = MemoryStore::default();
        store
            .insert_plain(&PlainCredential::new("bob", "pw", 4).unwrap())
            .await
            .unwrap();

        let mut plain = Plain::default();
        assert!(matches!(
            plain.next(&store, b"\0bob\0nope").await,
            Err(SaslError::InvalidCredentials)
        ));
        assert_eq!(plain.authn(), None);

        let mut plain = Plain::default();
        assert!(matches!(
            plain.next(&store, b"\0carol\0pw").await,
            Err(SaslError::UnknownUser)
        ));

        let mut plain = Plain::default();
        assert!(matches!(
            plain.next(&store, b"no separators").await,
            Err(SaslError::Malformed)
        ));
    }

    #[test]
    fn long_passwords_are_distinguished() {
        let long = "x".repeat(100);
        let cred = PlainCredential::new("u", &long, 4).unwrap();
        assert!(cred.check(long.as_bytes()));
        assert!(!cred.check(format!("{long}y").as_bytes()));
    }
}
