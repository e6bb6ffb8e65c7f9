//! Error types for the wire layer.
//!
//! Nothing in here is fatal to a connection: the server treats every
//! [`ParseError`] as "drop this line" and keeps reading.

use thiserror::Error;

/// Convenience alias for parser results.
pub type Result<T, E = ParseError> = std::result::Result<T, E>;

/// The lexer stopped before the end of its input.
///
/// Tokens produced before the offending byte are still handed to the
/// parser, which will then fail to find a terminating CRLF.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// The line is not valid UTF-8 from `offset` onwards.
    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 {
        /// Byte offset of the first invalid sequence.
        offset: usize,
    },

    /// A byte that can never appear in a message (NUL, lone CR or LF).
    #[error("illegal byte {byte:#04x} at offset {offset}")]
    IllegalByte {
        /// The offending byte.
        byte: u8,
        /// Byte offset in the line.
        offset: usize,
    },

    /// A mode string contained something other than `+`, `-` or a letter.
    #[error("unexpected {found:?} in mode string at offset {offset}")]
    UnexpectedModeChar {
        /// The offending character.
        found: char,
        /// Byte offset in the mode string.
        offset: usize,
    },
}

/// Reasons the parser abandoned a line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Nothing to parse.
    #[error("empty message")]
    Empty,

    /// The lexer gave up before reaching CRLF.
    #[error("lex error: {0}")]
    Lex(#[from] LexError),

    /// A space was required after the tags or the source.
    #[error("expected space after {after}")]
    ExpectedSpace {
        /// Which section was just read.
        after: &'static str,
    },

    /// The command was missing or not `1*letter / 3digit`.
    #[error("invalid command {0:?}")]
    InvalidCommand(String),

    /// The line did not end with CRLF.
    #[error("message not terminated by CRLF")]
    MissingCrlf,

    /// Input continued after the terminating CRLF.
    #[error("trailing data after CRLF")]
    TrailingData,

    /// A tag was ill-formed and the parser is running in strict mode.
    #[error("ill-formed tag {0:?}")]
    IllFormedTag(String),

    /// The tag section exceeded its limit.
    #[error("tags too long: {actual} bytes (limit: {limit})")]
    TagsTooLong {
        /// Observed size.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },

    /// The message body (everything after the tags) exceeded its limit.
    #[error("message too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Observed size.
        actual: usize,
        /// Configured limit.
        limit: usize,
    },
}

/// Errors raised by the line codec.
#[cfg(feature = "tokio")]
#[derive(Debug, Error)]
pub enum CodecError {
    /// Underlying transport failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_converts_into_parse_error() {
        let err: ParseError = LexError::IllegalByte { byte: 0, offset: 3 }.into();
        assert!(matches!(err, ParseError::Lex(LexError::IllegalByte { byte: 0, offset: 3 })));
        assert_eq!(err.to_string(), "lex error: illegal byte 0x00 at offset 3");
    }
}
