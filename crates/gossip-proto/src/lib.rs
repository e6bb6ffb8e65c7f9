//! # gossip-proto
//!
//! Wire layer for the gossipd IRC server.
//!
//! - [`lexer`]: splits a raw line into lexemes
//! - [`Message`]: the owned message model, its parser and serializer
//! - [`mode`]: `+/-letters` mode string grammar
//! - [`wild`]: ban/invite mask matching
//! - [`Response`]: numeric reply templates
//! - [`Capability`]: IRCv3 capabilities
//! - [`line`]: tokio line framing (feature `tokio`)
//!
//! ```rust
//! use gossip_proto::{Message, Response};
//!
//! let msg = Message::parse(b"PING [::]:6667\r\n").unwrap();
//! assert_eq!(msg.params, ["[::]:6667"]);
//! assert!(!msg.trailing_set);
//!
//! let reply = Response::ERR_NOSUCHNICK.reply("irc.example.com", "alice", &[&"bob"]);
//! assert_eq!(reply.to_string(), ":irc.example.com 401 alice bob :No such nick/channel\r\n");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod caps;
pub mod casemap;
pub mod error;
pub mod lexer;
#[cfg(feature = "tokio")]
pub mod line;
pub mod message;
pub mod mode;
pub mod response;
pub mod wild;

pub use self::caps::Capability;
#[cfg(feature = "tokio")]
pub use self::error::CodecError;
pub use self::error::{LexError, ParseError};
#[cfg(feature = "tokio")]
pub use self::line::{Frame, LineCodec};
pub use self::message::{Message, ParseOptions, Parsed, Source, Tag, TagPolicy};
pub use self::mode::{ModeChange, ModeOp, ModeString};
pub use self::response::Response;
