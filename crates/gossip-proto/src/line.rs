//! Line framing for tokio.
//!
//! The decoder splits the byte stream on `\n` and hands back raw lines,
//! terminator included, so the parser sees exactly what the client sent.
//! A line longer than the limit is discarded up to its newline and
//! reported once as [`Frame::Overflow`] instead of an error: a `FramedRead`
//! stops yielding after its decoder fails, and an overlong line must not
//! end the connection.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;
use crate::message::{Message, MAX_BODY_LEN, MAX_TAGS_LEN};

/// Default limit: full tag section plus a full body.
pub const DEFAULT_MAX_LINE: usize = MAX_TAGS_LEN + MAX_BODY_LEN;

/// One decoded unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line including its `\n`.
    Line(BytesMut),
    /// A line exceeded the limit and was dropped.
    Overflow,
}

/// Newline-delimited codec with a length cap.
#[derive(Debug)]
pub struct LineCodec {
    /// Index of the next byte to scan for a newline.
    next_index: usize,
    max_len: usize,
    discarding: bool,
}

impl LineCodec {
    /// Codec with [`DEFAULT_MAX_LINE`].
    pub fn new() -> Self {
        Self::with_max_len(DEFAULT_MAX_LINE)
    }

    /// Codec with a custom cap, terminator included.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
            discarding: false,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            if self.discarding {
                match newline {
                    Some(offset) => {
                        let _ = src.split_to(self.next_index + offset + 1);
                        self.next_index = 0;
                        self.discarding = false;
                        return Ok(Some(Frame::Overflow));
                    }
                    None => {
                        src.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                }
            }

            match newline {
                Some(offset) => {
                    let end = self.next_index + offset + 1;
                    self.next_index = 0;
                    if end > self.max_len {
                        let _ = src.split_to(end);
                        return Ok(Some(Frame::Overflow));
                    }
                    return Ok(Some(Frame::Line(src.split_to(end))));
                }
                None if src.len() > self.max_len => {
                    self.discarding = true;
                    self.next_index = 0;
                    src.clear();
                    // Keep scanning whatever arrives next.
                    continue;
                }
                None => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // An unterminated tail can never form a message.
                src.clear();
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<Message> for LineCodec {
    type Error = CodecError;

    fn encode(&mut self, msg: Message, dst: &mut BytesMut) -> Result<(), CodecError> {
        dst.reserve(msg.estimate_size());
        dst.extend_from_slice(msg.to_string().as_bytes());
        Ok(())
    }
}
