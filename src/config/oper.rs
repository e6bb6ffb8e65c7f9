//! Operator block configuration.

use serde::Deserialize;
use subtle::ConstantTimeEq;

/// Operator block configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OperBlock {
    /// Operator name (used in OPER command).
    pub name: String,
    /// Password (plaintext or bcrypt hash).
    pub password: String,
}

impl OperBlock {
    /// Verify the provided password against the stored password (plaintext or bcrypt).
    pub fn verify_password(&self, password: &str) -> bool {
        verify_secret(&self.password, password)
    }
}

/// Compare `attempt` against a stored bcrypt hash, or a plaintext value
/// when the stored string is not a bcrypt hash.
pub(crate) fn verify_secret(stored: &str, attempt: &str) -> bool {
    if stored.starts_with("$2") {
        bcrypt::verify(attempt, stored).unwrap_or(false)
    } else {
        stored.as_bytes().ct_eq(attempt.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcrypt_and_plaintext() {
        let hashed = OperBlock {
            name: "root".into(),
            password: bcrypt::hash("sekrit", 4).unwrap(),
        };
        assert!(hashed.verify_password("sekrit"));
        assert!(!hashed.verify_password("sekrit2"));

        let plain = OperBlock {
            name: "root".into(),
            password: "sekrit".into(),
        };
        assert!(plain.verify_password("sekrit"));
        assert!(!plain.verify_password("Sekrit"));
        assert!(!plain.verify_password(""));
    }
}
