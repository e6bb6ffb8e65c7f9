//! Glob matching for ban, exception and invite masks.
//!
//! `?` matches one character, `*` any run (including none) and `\`
//! escapes the next character. A `*` skips ahead to the first occurrence
//! of the literal that follows it; there is no further backtracking, so
//! `a*b*c` against `abbc` fails where a full glob engine would succeed.
//! Consecutive stars are collapsed first.

/// Test `candidate` against `pattern`.
///
/// Both sides are compared as given; casefold them first for IRC masks.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    let pat = normalize(pattern);
    let text: Vec<char> = candidate.chars().collect();
    let (mut p, mut t) = (0, 0);

    while p < pat.len() {
        match pat[p] {
            Pat::Star => {
                let Some(next) = pat.get(p + 1) else {
                    return true;
                };
                if let Pat::Lit(c) = next {
                    match text[t..].iter().position(|x| x == c) {
                        Some(skip) => t += skip,
                        None => return false,
                    }
                }
                p += 1;
            }
            Pat::Any => {
                if t >= text.len() {
                    return false;
                }
                p += 1;
                t += 1;
            }
            Pat::Lit(c) => {
                if text.get(t) != Some(&c) {
                    return false;
                }
                p += 1;
                t += 1;
            }
        }
    }
    t == text.len()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pat {
    Star,
    Any,
    Lit(char),
}

fn normalize(pattern: &str) -> Vec<Pat> {
    let mut out = Vec::with_capacity(pattern.len());
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        let item = match c {
            '*' if out.last() == Some(&Pat::Star) => continue,
            '*' => Pat::Star,
            '?' => Pat::Any,
            // A trailing backslash matches itself.
            '\\' => Pat::Lit(chars.next().unwrap_or('\\')),
            c => Pat::Lit(c),
        };
        out.push(item);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::matches;

    #[test]
    fn known_vectors() {
        let cases = [
            ("a*c", "abc", true),
            ("a*c", "a never got there", false),
            ("bob!*@*", "bob!Bob@127.0.0.1", true),
            ("*", "", true),
            ("*", "?", true),
            ("100.*.*.*", "100.9.1.9", true),
            ("*@127.0.0.1", "@127.0.0.1", true),
            ("abc\\*", "abc*", true),
            ("lucky\\*lucky", "luckySTARlucky", false),
            ("a?c", "ac", false),
            ("a?c", "abc", true),
        ];
        for (pattern, candidate, expected) in cases {
            assert_eq!(
                matches(pattern, candidate),
                expected,
                "{pattern:?} vs {candidate:?}"
            );
        }
    }

    #[test]
    fn stars_collapse() {
        assert!(matches("a**c", "abbbc"));
        assert!(matches("***", "anything"));
    }

    #[test]
    fn whole_candidate_must_be_consumed() {
        assert!(!matches("abc", "abcd"));
        assert!(!matches("ab", "a"));
        assert!(matches("", ""));
        assert!(!matches("", "x"));
    }

    #[test]
    fn star_then_any() {
        assert!(matches("*?", "x"));
        assert!(!matches("*?", ""));
    }

    #[test]
    fn no_backtracking_past_first_literal() {
        assert!(!matches("*.com", "mail.example.com"));
        assert!(matches("*@*.example.com", "bob@host.example.com"));
    }
}
