//! The owned message model, its parser and serializer.

mod format;
mod parse;
mod serialize;
/// Tag escaping helpers.
pub mod tags;
mod types;

pub use self::parse::{ParseOptions, Parsed, TagPolicy, MAX_BODY_LEN, MAX_TAGS_LEN};
pub use self::types::{Message, Source, Tag};
