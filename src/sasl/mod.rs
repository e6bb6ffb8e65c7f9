//! SASL mechanisms.
//!
//! The AUTHENTICATE handler owns one [`SaslSession`] per client while a
//! negotiation is running. Each mechanism consumes decoded client
//! responses and either produces the next challenge or finishes.

pub mod external;
pub mod plain;
pub mod scram;

use thiserror::Error;

use crate::db::{CredentialStore, StoreError};

pub use external::External;
pub use plain::{Plain, PlainCredential};
pub use scram::{Scram, ScramCredential};

/// Mechanism names accepted by AUTHENTICATE, as advertised in `sasl=`.
pub const MECHANISMS: &str = "PLAIN,EXTERNAL,SCRAM-SHA-256";

/// Result of feeding one client response to a mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Send this challenge and wait for another response.
    Challenge(Vec<u8>),
    /// Authentication succeeded.
    Done,
}

/// Why a mechanism rejected the exchange.
#[derive(Debug, Error)]
pub enum SaslError {
    #[error("malformed client response")]
    Malformed,
    #[error("unknown user")]
    UnknownUser,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("nonce mismatch")]
    NonceMismatch,
    #[error("invalid base64 in client response")]
    InvalidEncoding,
    #[error("channel binding is not supported")]
    ChannelBinding,
    #[error("no client certificate")]
    NoCertificate,
    #[error("exchange already finished")]
    Finished,
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An in-progress negotiation.
#[derive(Debug)]
pub enum SaslSession {
    Plain(Plain),
    External(External),
    Scram(Scram),
}

impl SaslSession {
    /// Start the mechanism named `mechanism`, or `None` if unsupported.
    ///
    /// `nick` and `cert_fp` are what EXTERNAL authenticates against.
    pub fn start(mechanism: &str, nick: &str, cert_fp: Option<&str>) -> Option<Self> {
        match mechanism.to_ascii_uppercase().as_str() {
            "PLAIN" => Some(Self::Plain(Plain::default())),
            "EXTERNAL" => Some(Self::External(External::new(nick, cert_fp))),
            "SCRAM-SHA-256" => Some(Self::Scram(Scram::default())),
            _ => None,
        }
    }

    /// Mechanism name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain(_) => "PLAIN",
            Self::External(_) => "EXTERNAL",
            Self::Scram(_) => "SCRAM-SHA-256",
        }
    }

    /// Feed one decoded client response.
    pub async fn next(
        &mut self,
        store: &dyn CredentialStore,
        response: &[u8],
    ) -> Result<Step, SaslError> {
        match self {
            Self::Plain(m) => m.next(store, response).await,
            Self::External(m) => m.next(store, response).await,
            Self::Scram(m) => m.next(store, response).await,
        }
    }

    /// The authenticated identity, once known.
    pub fn authn(&self) -> Option<&str> {
        match self {
            Self::Plain(m) => m.authn(),
            Self::External(m) => m.authn(),
            Self::Scram(m) => m.authn(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_by_name() {
        assert_eq!(SaslSession::start("plain", "a", None).unwrap().name(), "PLAIN");
        assert_eq!(
            SaslSession::start("SCRAM-SHA-256", "a", None).unwrap().name(),
            "SCRAM-SHA-256"
        );
        assert_eq!(
            SaslSession::start("EXTERNAL", "a", Some("ab")).unwrap().name(),
            "EXTERNAL"
        );
        assert!(SaslSession::start("SCRAM", "a", None).is_none());
        assert!(SaslSession::start("GSSAPI", "a", None).is_none());
    }
}
