//! Message lexer.
//!
//! Splits one raw protocol line into a small set of lexemes. The grammar
//! only cares about a handful of delimiters, so everything else is folded
//! into maximal runs of [`TokenKind::Text`]:
//!
//! ```text
//! @time=x :nick!user@host PRIVMSG #chan :hi there\r\n
//! ^ ^^^^^^ ^^^^^^ ^^^^^^^^^^ ...
//! At Text  Colon Text Exclam Text At Text Space ...
//! ```
//!
//! CRLF is only recognised as the final two bytes of the line. A NUL, a
//! lone CR/LF or malformed UTF-8 stops the lexer; the tokens produced so
//! far are kept and the error is reported alongside them.

use std::collections::VecDeque;

use crate::error::LexError;

/// Lexeme categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `@`, the tag marker and host separator.
    At,
    /// `:`, the source/trailing marker.
    Colon,
    /// `!`, the user separator.
    Exclam,
    /// One or more spaces, collapsed.
    Space,
    /// The terminating `\r\n`.
    Crlf,
    /// A maximal run of anything else.
    Text,
}

/// A single lexeme borrowed from the input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// What kind of lexeme this is.
    pub kind: TokenKind,
    /// The exact source text.
    pub value: &'a str,
    /// Width of the lexeme in source bytes.
    pub width: usize,
}

/// Streaming lexer over one line.
///
/// Yields tokens until the input is exhausted or an illegal byte is met;
/// in the latter case iteration stops and [`Lexer::error`] is set.
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    error: Option<LexError>,
    pending_utf8: Option<LexError>,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over raw bytes.
    pub fn new(input: &'a [u8]) -> Self {
        let (input, pending_utf8) = match std::str::from_utf8(input) {
            Ok(s) => (s, None),
            Err(e) => {
                let valid = e.valid_up_to();
                let prefix = std::str::from_utf8(&input[..valid]).unwrap_or_default();
                (prefix, Some(LexError::InvalidUtf8 { offset: valid }))
            }
        };
        Self {
            input,
            pos: 0,
            error: None,
            pending_utf8,
        }
    }

    /// The error that stopped lexing, if any.
    pub fn error(&self) -> Option<&LexError> {
        self.error.as_ref()
    }

    fn emit(&mut self, kind: TokenKind, end: usize) -> Token<'a> {
        let value = &self.input[self.pos..end];
        self.pos = end;
        Token {
            kind,
            value,
            width: value.len(),
        }
    }

    fn fail(&mut self, byte: u8) -> Option<Token<'a>> {
        self.error = Some(LexError::IllegalByte {
            byte,
            offset: self.pos,
        });
        self.pos = self.input.len();
        None
    }
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'@' | b':' | b'!' | b' ' | b'\r' | b'\n' | 0)
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let bytes = self.input.as_bytes();
        let Some(&b) = bytes.get(self.pos) else {
            // Only surface a UTF-8 problem once the valid prefix is consumed.
            if self.error.is_none() {
                self.error = self.pending_utf8.take();
            }
            return None;
        };

        match b {
            b'@' => Some(self.emit(TokenKind::At, self.pos + 1)),
            b':' => Some(self.emit(TokenKind::Colon, self.pos + 1)),
            b'!' => Some(self.emit(TokenKind::Exclam, self.pos + 1)),
            b' ' => {
                let end = bytes[self.pos..]
                    .iter()
                    .position(|&c| c != b' ')
                    .map_or(bytes.len(), |n| self.pos + n);
                Some(self.emit(TokenKind::Space, end))
            }
            b'\r' if self.pos + 2 == bytes.len() && bytes[self.pos + 1] == b'\n' => {
                Some(self.emit(TokenKind::Crlf, self.pos + 2))
            }
            b'\r' | b'\n' | 0 => self.fail(b),
            _ => {
                let end = bytes[self.pos..]
                    .iter()
                    .position(|&c| is_delimiter(c))
                    .map_or(bytes.len(), |n| self.pos + n);
                Some(self.emit(TokenKind::Text, end))
            }
        }
    }
}

/// FIFO of tokens with single-token lookahead.
///
/// `peek` never advances; repeated peeks return the same token until
/// `next` is called.
#[derive(Debug, Default, Clone)]
pub struct TokenQueue<'a> {
    tokens: VecDeque<Token<'a>>,
    consumed: usize,
}

impl<'a> TokenQueue<'a> {
    /// Look at the front token without consuming it.
    pub fn peek(&self) -> Option<Token<'a>> {
        self.tokens.front().copied()
    }

    /// Kind of the front token, if any.
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.tokens.front().map(|t| t.kind)
    }

    /// Consume the front token.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<Token<'a>> {
        let tok = self.tokens.pop_front()?;
        self.consumed += tok.width;
        Some(tok)
    }

    /// Consume the front token if it has the given kind.
    pub fn expect(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.next();
            true
        } else {
            false
        }
    }

    /// Number of source bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Number of tokens left.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True when every token has been consumed.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl<'a> FromIterator<Token<'a>> for TokenQueue<'a> {
    fn from_iter<I: IntoIterator<Item = Token<'a>>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
            consumed: 0,
        }
    }
}

/// Lex a whole line, returning the tokens and the error that stopped the
/// lexer (if any).
pub fn lex(input: &[u8]) -> (TokenQueue<'_>, Option<LexError>) {
    let mut lexer = Lexer::new(input);
    let queue: TokenQueue<'_> = lexer.by_ref().collect();
    (queue, lexer.error)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        let (mut q, err) = lex(input.as_bytes());
        assert!(err.is_none(), "unexpected lex error: {err:?}");
        let mut out = Vec::new();
        while let Some(t) = q.next() {
            out.push(t.kind);
        }
        out
    }

    #[test]
    fn source_is_split_on_delimiters() {
        use TokenKind::*;
        assert_eq!(
            kinds(":nick!user@host PING\r\n"),
            vec![Colon, Text, Exclam, Text, At, Text, Space, Text, Crlf]
        );
    }

    #[test]
    fn spaces_collapse() {
        let (mut q, _) = lex(b"A    B\r\n");
        q.next();
        let sp = q.next().unwrap();
        assert_eq!(sp.kind, TokenKind::Space);
        assert_eq!(sp.width, 4);
    }

    #[test]
    fn peek_is_idempotent() {
        let (mut q, _) = lex(b"PING x\r\n");
        assert_eq!(q.peek().unwrap().value, "PING");
        assert_eq!(q.peek().unwrap().value, "PING");
        assert_eq!(q.next().unwrap().value, "PING");
        assert_eq!(q.peek_kind(), Some(TokenKind::Space));
        assert_eq!(q.consumed(), 4);
    }

    #[test]
    fn crlf_only_at_end() {
        let (q, err) = lex(b"PING\r\nx");
        assert_eq!(
            err,
            Some(LexError::IllegalByte {
                byte: b'\r',
                offset: 4
            })
        );
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn nul_aborts() {
        let (q, err) = lex(b"PRIV\0MSG\r\n");
        assert!(matches!(err, Some(LexError::IllegalByte { byte: 0, .. })));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn invalid_utf8_keeps_prefix() {
        let (q, err) = lex(b"PING \xff\xfe\r\n");
        assert_eq!(err, Some(LexError::InvalidUtf8 { offset: 5 }));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn multibyte_text_is_one_run() {
        let (mut q, err) = lex("héllo wörld\r\n".as_bytes());
        assert!(err.is_none());
        assert_eq!(q.next().unwrap().value, "héllo");
        q.next();
        let t = q.next().unwrap();
        assert_eq!(t.value, "wörld");
        assert_eq!(t.width, 6);
    }
}
