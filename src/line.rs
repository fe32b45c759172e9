//! Line-based codec for tokio.
//!
//! Frames the raw byte stream into `\r\n`-terminated IRC lines, carrying a
//! partial remainder across reads. Only bytes actually received are ever
//! decoded; the codec never reparses stale buffer contents, so a short read
//! cannot inject spurious trailing garbage into a line.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{self, ProtocolError};

/// Maximum IRC line length in bytes (modern IRC ceiling).
pub const MAX_LINE_LEN: usize = 8191;

/// Codec that yields terminator-stripped line strings.
///
/// A lone `\n` from servers that skip the `\r` is tolerated. Lines that fail
/// UTF-8 validation are consumed from the buffer and reported as
/// [`ProtocolError::InvalidUtf8`], so the next line decodes cleanly.
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    /// Maximum line length.
    max_len: usize,
}

impl LineCodec {
    /// Create a new codec with the default [`MAX_LINE_LEN`] limit.
    pub fn new() -> Self {
        Self {
            next_index: 0,
            max_len: MAX_LINE_LEN,
        }
    }

    /// Create a new codec with a custom max line length.
    pub fn with_max_len(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> error::Result<Option<String>> {
        // Look for a newline starting from where the previous call left off.
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            // Strip the terminator before validation.
            let mut end = line.len() - 1;
            if end > 0 && line[end - 1] == b'\r' {
                end -= 1;
            }

            match std::str::from_utf8(&line[..end]) {
                Ok(s) => Ok(Some(s.to_owned())),
                Err(e) => Err(ProtocolError::InvalidUtf8 {
                    byte_pos: e.valid_up_to(),
                    details: e.to_string(),
                    raw_line: line[..end].to_vec(),
                }),
            }
        } else {
            // No complete line yet; remember where we stopped.
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(ProtocolError::MessageTooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }

            Ok(None)
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> error::Result<()> {
        dst.extend_from_slice(line.as_bytes());
        Ok(())
    }
}
