//! SASL SCRAM-SHA-256 (RFC 5802, RFC 7677).
//!
//! Server side of the exchange:
//!
//! ```text
//! C: n,,n=user,r=cnonce                 -> S: r=cnonce+snonce,s=salt,i=4096
//! C: c=biws,r=cnonce+snonce,p=proof     -> S: v=signature
//! C: (empty)                            -> done
//! ```

use std::num::NonZeroU32;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::RngCore;
use ring::{digest, hmac, pbkdf2};
use subtle::ConstantTimeEq;

use super::{SaslError, Step};
use crate::db::CredentialStore;

/// Iteration count for new credentials.
pub const DEFAULT_ITERATIONS: u32 = 4096;

/// Salt length for new credentials.
pub const SALT_LEN: usize = 16;

/// Random bytes appended to the client nonce.
const SERVER_NONCE_LEN: usize = 24;

/// Stored SCRAM credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScramCredential {
    pub username: String,
    pub server_key: Vec<u8>,
    pub stored_key: Vec<u8>,
    pub salt: Vec<u8>,
    pub iterations: u32,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> hmac::Tag {
    hmac::sign(&hmac::Key::new(hmac::HMAC_SHA256, key), data)
}

impl ScramCredential {
    /// Derive keys for `password` with an explicit salt.
    pub fn derive(username: &str, password: &str, salt: &[u8], iterations: u32) -> Self {
        let mut salted = [0u8; digest::SHA256_OUTPUT_LEN];
        pbkdf2::derive(
            pbkdf2::PBKDF2_HMAC_SHA256,
            NonZeroU32::new(iterations).unwrap_or(NonZeroU32::MIN),
            salt,
            password.as_bytes(),
            &mut salted,
        );
        let client_key = hmac_sha256(&salted, b"Client Key");
        let stored_key = digest::digest(&digest::SHA256, client_key.as_ref());
        let server_key = hmac_sha256(&salted, b"Server Key");

        Self {
            username: username.to_owned(),
            server_key: server_key.as_ref().to_vec(),
            stored_key: stored_key.as_ref().to_vec(),
            salt: salt.to_vec(),
            iterations,
        }
    }

    /// Derive keys with a fresh random salt and the default iteration count.
    pub fn generate(username: &str, password: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        rand::rngs::OsRng.fill_bytes(&mut salt);
        Self::derive(username, password, &salt, DEFAULT_ITERATIONS)
    }
}

#[derive(Debug, Default)]
enum State {
    #[default]
    ClientFirst,
    ClientFinal {
        cred: ScramCredential,
        nonce: String,
        auth_prefix: String,
    },
    Verified {
        username: String,
    },
    Done {
        username: String,
    },
}

/// SCRAM exchange state.
#[derive(Debug, Default)]
pub struct Scram {
    state: State,
}

/// Value of the `key=` attribute in a comma-separated SCRAM message.
fn attr<'a>(attrs: &[&'a str], key: char) -> Option<&'a str> {
    attrs.iter().find_map(|a| {
        let mut chars = a.chars();
        (chars.next() == Some(key) && chars.next() == Some('=')).then(|| &a[2..])
    })
}

/// Reverse the `=2C` / `=3D` escaping of SCRAM usernames.
fn unescape_username(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    while let Some(idx) = rest.find('=') {
        out.push_str(&rest[..idx]);
        match rest.get(idx..idx + 3) {
            Some("=2C") => out.push(','),
            Some("=3D") => out.push('='),
            _ => return None,
        }
        rest = &rest[idx + 3..];
    }
    out.push_str(rest);
    Some(out)
}

fn generate_server_nonce() -> String {
    let mut nonce = [0u8; SERVER_NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    BASE64.encode(nonce)
}

impl Scram {
    pub fn authn(&self) -> Option<&str> {
        match &self.state {
            State::Done { username } => Some(username),
            _ => None,
        }
    }

    pub async fn next(
        &mut self,
        store: &dyn CredentialStore,
        response: &[u8],
    ) -> Result<Step, SaslError> {
        let text = std::str::from_utf8(response).map_err(|_| SaslError::Malformed)?;
        match &self.state {
            State::ClientFirst => {
                let username = parse_client_first(text)?.0;
                let cred = store
                    .scram(&username)
                    .await?
                    .ok_or(SaslError::UnknownUser)?;
                self.client_first(text, cred, &generate_server_nonce())
                    .map(Step::Challenge)
            }
            State::ClientFinal { .. } => self.client_final(text).map(Step::Challenge),
            State::Verified { username } => {
                self.state = State::Done {
                    username: username.clone(),
                };
                Ok(Step::Done)
            }
            State::Done { .. } => Err(SaslError::Finished),
        }
    }

    /// Handle client-first with a known credential, returning server-first.
    fn client_first(
        &mut self,
        text: &str,
        cred: ScramCredential,
        server_nonce: &str,
    ) -> Result<Vec<u8>, SaslError> {
        let (_, client_nonce, bare) = parse_client_first(text)?;
        let nonce = format!("{client_nonce}{server_nonce}");
        let server_first = format!(
            "r={nonce},s={},i={}",
            BASE64.encode(&cred.salt),
            cred.iterations
        );
        let auth_prefix = format!("{bare},{server_first}");
        self.state = State::ClientFinal {
            cred,
            nonce,
            auth_prefix,
        };
        Ok(server_first.into_bytes())
    }

    /// Verify client-final, returning server-final.
    fn client_final(&mut self, text: &str) -> Result<Vec<u8>, SaslError> {
        let State::ClientFinal {
            cred,
            nonce,
            auth_prefix,
        } = &self.state
        else {
            return Err(SaslError::Malformed);
        };

        let (without_proof, proof) = text.rsplit_once(",p=").ok_or(SaslError::Malformed)?;
        let attrs: Vec<&str> = without_proof.split(',').collect();
        if attr(&attrs, 'r') != Some(nonce.as_str()) {
            return Err(SaslError::NonceMismatch);
        }
        let proof = BASE64
            .decode(proof)
            .map_err(|_| SaslError::InvalidEncoding)?;
        if proof.len() != cred.stored_key.len() {
            return Err(SaslError::InvalidCredentials);
        }

        let auth_message = format!("{auth_prefix},{without_proof}");
        let client_signature = hmac_sha256(&cred.stored_key, auth_message.as_bytes());
        let client_key: Vec<u8> = client_signature
            .as_ref()
            .iter()
            .zip(&proof)
            .map(|(s, p)| s ^ p)
            .collect();
        let computed = digest::digest(&digest::SHA256, &client_key);
        if !bool::from(computed.as_ref().ct_eq(&cred.stored_key)) {
            return Err(SaslError::InvalidCredentials);
        }

        let server_signature = hmac_sha256(&cred.server_key, auth_message.as_bytes());
        let server_final = format!("v={}", BASE64.encode(server_signature.as_ref()));
        self.state = State::Verified {
            username: cred.username.clone(),
        };
        Ok(server_final.into_bytes())
    }
}

/// Split client-first into (username, client nonce, client-first-bare).
fn parse_client_first(text: &str) -> Result<(String, &str, &str), SaslError> {
    // gs2-cbind-flag "," [authzid] "," client-first-bare
    let mut gs2 = text.splitn(3, ',');
    let cbind = gs2.next().ok_or(SaslError::Malformed)?;
    let _authzid = gs2.next().ok_or(SaslError::Malformed)?;
    let bare = gs2.next().ok_or(SaslError::Malformed)?;
    match cbind {
        "n" | "y" => {}
        c if c.starts_with("p=") => return Err(SaslError::ChannelBinding),
        _ => return Err(SaslError::Malformed),
    }

    let attrs: Vec<&str> = bare.split(',').collect();
    let username = attr(&attrs, 'n')
        .and_then(unescape_username)
        .ok_or(SaslError::Malformed)?;
    let client_nonce = attr(&attrs, 'r')
        .filter(|n| !n.is_empty())
        .ok_or(SaslError::Malformed)?;
    Ok((username, client_nonce, bare))
}
