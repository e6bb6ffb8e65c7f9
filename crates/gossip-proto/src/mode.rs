//! Mode string parsing.
//!
//! Mode strings have their own tiny grammar, shared by user and channel
//! modes:
//!
//! ```text
//! modestring = 1*modeset
//! modeset    = ( "+" / "-" ) *letter
//! ```
//!
//! The parser only records which letters were added or removed, in order.
//! What a letter means, and whether it consumes an argument, is up to the
//! caller.

use std::fmt;

use crate::error::LexError;

/// Mode lexeme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeToken {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// An ASCII letter.
    Letter(char),
}

/// Lex a mode string.
///
/// Anything other than `+`, `-` or an ASCII letter stops the lexer; the
/// tokens read so far are returned with the error.
pub fn lex_modes(input: &str) -> (Vec<ModeToken>, Option<LexError>) {
    let mut out = Vec::with_capacity(input.len());
    for (offset, c) in input.char_indices() {
        let tok = match c {
            '+' => ModeToken::Plus,
            '-' => ModeToken::Minus,
            c if c.is_ascii_alphabetic() => ModeToken::Letter(c),
            found => return (out, Some(LexError::UnexpectedModeChar { found, offset })),
        };
        out.push(tok);
    }
    (out, None)
}

/// Direction of a mode change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeOp {
    /// `+`
    Add,
    /// `-`
    Remove,
}

impl ModeOp {
    /// The sign character.
    pub fn sign(self) -> char {
        match self {
            ModeOp::Add => '+',
            ModeOp::Remove => '-',
        }
    }
}

/// A single letter with its direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeChange {
    /// Add or remove.
    pub op: ModeOp,
    /// The mode letter.
    pub letter: char,
}

/// A parsed mode string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeString {
    changes: Vec<ModeChange>,
}

impl ModeString {
    /// Parse `input`.
    ///
    /// Input that does not start with `+` or `-` yields an empty result, as
    /// does a lexer error before the first modeset. Letters lexed before an
    /// error are kept.
    pub fn parse(input: &str) -> Self {
        let (tokens, _err) = lex_modes(input);
        let mut changes = Vec::new();
        let mut op = match tokens.first() {
            Some(ModeToken::Plus) => ModeOp::Add,
            Some(ModeToken::Minus) => ModeOp::Remove,
            _ => return Self::default(),
        };
        for tok in &tokens[1..] {
            match *tok {
                ModeToken::Plus => op = ModeOp::Add,
                ModeToken::Minus => op = ModeOp::Remove,
                ModeToken::Letter(letter) => changes.push(ModeChange { op, letter }),
            }
        }
        Self { changes }
    }

    /// Every change in input order.
    pub fn changes(&self) -> &[ModeChange] {
        &self.changes
    }

    /// Added letters in input order.
    pub fn added(&self) -> Vec<char> {
        self.letters(ModeOp::Add)
    }

    /// Removed letters in input order.
    pub fn removed(&self) -> Vec<char> {
        self.letters(ModeOp::Remove)
    }

    /// True when no letter was parsed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    fn letters(&self, op: ModeOp) -> Vec<char> {
        self.changes
            .iter()
            .filter(|c| c.op == op)
            .map(|c| c.letter)
            .collect()
    }
}

/// Collapse applied changes back into a compact `+ab-c` string.
pub fn render_changes(changes: &[ModeChange]) -> String {
    let mut out = String::new();
    let mut current = None;
    for change in changes {
        if current != Some(change.op) {
            out.push(change.op.sign());
            current = Some(change.op);
        }
        out.push(change.letter);
    }
    out
}

impl fmt::Display for ModeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_changes(&self.changes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_remove() {
        let m = ModeString::parse("+a-i");
        assert_eq!(m.added(), ['a']);
        assert_eq!(m.removed(), ['i']);
    }

    #[test]
    fn several_modesets_concatenate() {
        let m = ModeString::parse("+a+b+c-de+f-g");
        assert_eq!(m.added(), ['a', 'b', 'c', 'f']);
        assert_eq!(m.removed(), ['d', 'e', 'g']);
    }

    #[test]
    fn missing_sign_is_empty() {
        assert!(ModeString::parse("abc").is_empty());
        assert!(ModeString::parse("").is_empty());
    }

    #[test]
    fn lexer_stops_at_bad_char() {
        let (tokens, err) = lex_modes("+ab1c");
        assert_eq!(tokens.len(), 3);
        assert_eq!(err, Some(LexError::UnexpectedModeChar { found: '1', offset: 3 }));
        assert_eq!(ModeString::parse("+ab1c").added(), ['a', 'b']);
    }

    #[test]
    fn order_is_preserved() {
        let m = ModeString::parse("-o+v-b");
        let ops: Vec<_> = m.changes().iter().map(|c| (c.op.sign(), c.letter)).collect();
        assert_eq!(ops, [('-', 'o'), ('+', 'v'), ('-', 'b')]);
        assert_eq!(m.to_string(), "-o+v-b");
    }

    #[test]
    fn render_merges_runs() {
        let m = ModeString::parse("+i+w-x");
        assert_eq!(render_changes(m.changes()), "+iw-x");
    }
}
