//! Buffered line reader over the transport's read half.
//!
//! `FramedRead` terminates its stream after the first decode error, which
//! would turn one undecodable line into a disconnect. This reader owns the
//! buffer and calls the codec directly, so a recoverable error leaves the
//! already-consumed bad line behind and the next call yields the line after
//! it.

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::error::Result;
use crate::line::LineCodec;

use super::READ_BUFFER_CAPACITY;

/// Reads terminator-stripped lines from an async byte stream.
pub struct LineReader<S> {
    stream: S,
    codec: LineCodec,
    buffer: BytesMut,
}

impl<S: AsyncRead + Unpin> LineReader<S> {
    /// Wrap a stream with the default buffer capacity.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            codec: LineCodec::new(),
            buffer: BytesMut::with_capacity(READ_BUFFER_CAPACITY),
        }
    }

    /// Read the next line. Returns `None` on EOF.
    ///
    /// An `Err` does not end the stream; whether it is survivable is the
    /// caller's call. After [`ProtocolError::InvalidUtf8`] the offending
    /// line has been consumed and the next call continues cleanly.
    ///
    /// Cancel-safe: bytes received before cancellation stay buffered and
    /// are decoded by the next call.
    ///
    /// [`ProtocolError::InvalidUtf8`]: crate::error::ProtocolError::InvalidUtf8
    pub async fn next_line(&mut self) -> Option<Result<String>> {
        loop {
            match self.codec.decode(&mut self.buffer) {
                Ok(Some(line)) => return Some(Ok(line)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }

            match self.stream.read_buf(&mut self.buffer).await {
                Ok(0) => {
                    if !self.buffer.is_empty() {
                        trace!(
                            len = self.buffer.len(),
                            "discarding unterminated fragment at EOF"
                        );
                    }
                    return None;
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProtocolError;

    #[tokio::test]
    async fn test_reads_lines_across_chunk_boundaries() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(client);

        tokio::io::AsyncWriteExt::write_all(&mut server, b"PING :te")
            .await
            .unwrap();
        tokio::io::AsyncWriteExt::write_all(&mut server, b"st\r\nNEXT x\r\n")
            .await
            .unwrap();

        assert_eq!(reader.next_line().await.unwrap().unwrap(), "PING :test");
        assert_eq!(reader.next_line().await.unwrap().unwrap(), "NEXT x");
    }

    #[tokio::test]
    async fn test_survives_invalid_utf8() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(client);

        tokio::io::AsyncWriteExt::write_all(&mut server, b"PING \xff\xfe\r\nPING :ok\r\n")
            .await
            .unwrap();

        let err = reader.next_line().await.unwrap().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidUtf8 { .. }));

        // The stream did not terminate; the next line is intact.
        assert_eq!(reader.next_line().await.unwrap().unwrap(), "PING :ok");
    }

    #[tokio::test]
    async fn test_eof_drops_unterminated_fragment() {
        let (client, mut server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(client);

        tokio::io::AsyncWriteExt::write_all(&mut server, b"FULL line\r\npartial")
            .await
            .unwrap();
        drop(server);

        assert_eq!(reader.next_line().await.unwrap().unwrap(), "FULL line");
        assert!(reader.next_line().await.is_none());
    }
}
