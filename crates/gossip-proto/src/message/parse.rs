//! Recursive-descent message parser.
//!
//! ```text
//! message = [ "@" tags SP ] [ ":" source SP ] command [ params ] CRLF
//! tags    = tag *( ";" tag )
//! tag     = [ "+" ] [ vendor "/" ] key [ "=" escaped-value ]
//! source  = nickname [ "!" user ] [ "@" host ]
//! command = 1*letter / 3digit
//! params  = *( SP middle ) [ SP ":" trailing ]
//! ```

use std::str::FromStr;

use tracing::debug;

use super::types::{Message, Source, Tag};
use crate::error::{ParseError, Result};
use crate::lexer::{lex, TokenKind, TokenQueue};

/// Maximum size of the tag section, `@` and trailing space included.
pub const MAX_TAGS_LEN: usize = 8191;

/// Maximum size of everything after the tags, CRLF included.
pub const MAX_BODY_LEN: usize = 512;

/// What to do with a tag that does not fit the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPolicy {
    /// Drop the offending tag and keep the message.
    #[default]
    Lenient,
    /// Drop the whole message.
    Strict,
}

/// Parser configuration.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Ill-formed tag handling.
    pub tag_policy: TagPolicy,
    /// Limit for the tag section.
    pub max_tags_len: usize,
    /// Limit for the rest of the message.
    pub max_body_len: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            tag_policy: TagPolicy::Lenient,
            max_tags_len: MAX_TAGS_LEN,
            max_body_len: MAX_BODY_LEN,
        }
    }
}

/// A parsed message plus the raw text of any tags that were rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    /// The message.
    pub message: Message,
    /// Tags dropped under [`TagPolicy::Lenient`].
    pub rejected_tags: Vec<String>,
}

impl Message {
    /// Parse one CRLF-terminated line with default options.
    pub fn parse(line: &[u8]) -> Result<Message> {
        Self::parse_with(line, &ParseOptions::default()).map(|p| p.message)
    }

    /// Parse one CRLF-terminated line.
    pub fn parse_with(line: &[u8], opts: &ParseOptions) -> Result<Parsed> {
        if line.is_empty() {
            return Err(ParseError::Empty);
        }
        let (tokens, lex_error) = lex(line);
        let mut parser = Parser {
            tokens,
            opts,
            rejected: Vec::new(),
        };
        match parser.message() {
            Ok(message) => Ok(Parsed {
                message,
                rejected_tags: parser.rejected,
            }),
            // A lexer abort always surfaces as the more specific error.
            Err(e) => Err(lex_error.map(ParseError::from).unwrap_or(e)),
        }
    }
}

impl FromStr for Message {
    type Err = ParseError;

    /// Parse a line, appending CRLF when it is missing.
    fn from_str(s: &str) -> Result<Message> {
        if s.ends_with("\r\n") {
            Message::parse(s.as_bytes())
        } else {
            let mut line = String::with_capacity(s.len() + 2);
            line.push_str(s);
            line.push_str("\r\n");
            Message::parse(line.as_bytes())
        }
    }
}

struct Parser<'a, 'o> {
    tokens: TokenQueue<'a>,
    opts: &'o ParseOptions,
    rejected: Vec<String>,
}

impl<'a> Parser<'a, '_> {
    fn message(&mut self) -> Result<Message> {
        let mut msg = Message::default();

        if self.tokens.expect(TokenKind::At) {
            msg.tags = self.tags()?;
            if !self.tokens.expect(TokenKind::Space) {
                return Err(ParseError::ExpectedSpace { after: "tags" });
            }
        }
        let tag_bytes = self.tokens.consumed();
        if tag_bytes > self.opts.max_tags_len {
            return Err(ParseError::TagsTooLong {
                actual: tag_bytes,
                limit: self.opts.max_tags_len,
            });
        }

        if self.tokens.expect(TokenKind::Colon) {
            msg.source = Some(self.source());
            if !self.tokens.expect(TokenKind::Space) {
                return Err(ParseError::ExpectedSpace { after: "source" });
            }
        }

        msg.command = self.command()?;
        let (params, trailing_set) = self.params();
        msg.params = params;
        msg.trailing_set = trailing_set;

        if !self.tokens.expect(TokenKind::Crlf) {
            return Err(ParseError::MissingCrlf);
        }
        if !self.tokens.is_empty() {
            return Err(ParseError::TrailingData);
        }

        let body = self.tokens.consumed() - tag_bytes;
        if body > self.opts.max_body_len {
            return Err(ParseError::MessageTooLong {
                actual: body,
                limit: self.opts.max_body_len,
            });
        }
        Ok(msg)
    }

    /// Gather the raw tag section (everything up to the next space) and
    /// split it on `;`.
    fn tags(&mut self) -> Result<Vec<Tag>> {
        let mut section = String::new();
        while let Some(tok) = self.tokens.peek() {
            if matches!(tok.kind, TokenKind::Space | TokenKind::Crlf) {
                break;
            }
            section.push_str(tok.value);
            self.tokens.next();
        }

        let mut tags = Vec::new();
        for raw in section.split(';') {
            match parse_tag(raw) {
                Some(tag) => tags.push(tag),
                None if self.opts.tag_policy == TagPolicy::Strict => {
                    return Err(ParseError::IllFormedTag(raw.to_owned()));
                }
                None => {
                    debug!(tag = %raw, "dropping ill-formed tag");
                    self.rejected.push(raw.to_owned());
                }
            }
        }
        Ok(tags)
    }

    fn source(&mut self) -> Source {
        let mut source = Source {
            nick: self.collect_until(&[TokenKind::Space, TokenKind::Exclam, TokenKind::At]),
            ..Source::default()
        };
        if self.tokens.expect(TokenKind::Exclam) {
            source.user = Some(self.collect_until(&[TokenKind::Space, TokenKind::At]));
        }
        if self.tokens.expect(TokenKind::At) {
            source.host = Some(self.collect_until(&[TokenKind::Space]));
        }
        source
    }

    fn command(&mut self) -> Result<String> {
        let Some(tok) = self.tokens.peek() else {
            return Err(ParseError::InvalidCommand(String::new()));
        };
        let word = tok.value;
        let letters = tok.kind == TokenKind::Text && word.bytes().all(|b| b.is_ascii_alphabetic());
        let numeric =
            tok.kind == TokenKind::Text && word.len() == 3 && word.bytes().all(|b| b.is_ascii_digit());
        if !(letters || numeric) {
            return Err(ParseError::InvalidCommand(word.to_owned()));
        }
        self.tokens.next();
        Ok(word.to_ascii_uppercase())
    }

    fn params(&mut self) -> (Vec<String>, bool) {
        let mut params = Vec::new();
        loop {
            if !self.tokens.expect(TokenKind::Space) {
                return (params, false);
            }
            match self.tokens.peek_kind() {
                // Trailing whitespace before CRLF carries no parameter.
                Some(TokenKind::Crlf) | None => return (params, false),
                Some(TokenKind::Colon) => {
                    self.tokens.next();
                    params.push(self.collect_until(&[TokenKind::Crlf]));
                    return (params, true);
                }
                Some(_) => params.push(self.collect_until(&[TokenKind::Space, TokenKind::Crlf])),
            }
        }
    }

    /// Concatenate lexemes until one of `stop` (or the end) is reached.
    fn collect_until(&mut self, stop: &[TokenKind]) -> String {
        let mut out = String::new();
        while let Some(tok) = self.tokens.peek() {
            if stop.contains(&tok.kind) {
                break;
            }
            out.push_str(tok.value);
            self.tokens.next();
        }
        out
    }
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-'
}

/// Parse one `[+][vendor/]key[=value]` tag.
///
/// The vendor can only be recognised once a `/` is seen, so the leading
/// run is scanned first. A `.` is only legal inside a vendor; a dotted run
/// with no following `/` rejects the tag.
fn parse_tag(raw: &str) -> Option<Tag> {
    let (client_prefix, rest) = match raw.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, raw),
    };
    let (name, value) = match rest.split_once('=') {
        Some((name, value)) => (name, Some(value)),
        None => (rest, None),
    };

    let (vendor, key) = match name.split_once('/') {
        Some((vendor, key)) => {
            let vendor_ok = !vendor.is_empty()
                && vendor.chars().all(|c| is_key_char(c) || c == '.');
            if !vendor_ok {
                return None;
            }
            (Some(vendor.to_owned()), key)
        }
        None => (None, name),
    };

    if key.is_empty() || !key.chars().all(is_key_char) {
        return None;
    }
    if let Some(v) = value {
        if v.contains(['\0', '\r', '\n', ' ', ';']) {
            return None;
        }
    }

    Some(Tag {
        client_prefix,
        vendor,
        key: key.to_owned(),
        value: value.map(str::to_owned),
    })
}
