//! Case folding for nicknames and channel names.
//!
//! The server advertises `CASEMAPPING=ascii`: only `A-Z` fold.

/// Fold a name for use as a registry key.
pub fn fold(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Case-insensitive comparison under the server casemapping.
pub fn eq(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// The `CASEMAPPING` token value.
pub const CASEMAPPING: &str = "ascii";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_ascii_only() {
        assert_eq!(fold("Alice[]"), "alice[]");
        assert_eq!(fold("ÄBC"), "Äbc");
        assert!(eq("#Rust", "#rUST"));
        assert!(!eq("a[", "a{"));
    }
}
