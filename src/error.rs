//! Error types for the transport library.
//!
//! Only transport-level failures are surfaced as errors. Malformed protocol
//! traffic is recovered locally: an undecodable line is dropped by the read
//! cycle and a line matching no known grammar is discarded without a handler
//! being invoked.

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Top-level transport and protocol errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during connecting, reading, or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A framed line contained invalid UTF-8.
    ///
    /// The read cycle treats this as protocol noise: the offending line is
    /// dropped and the connection stays open.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// The raw line bytes (terminator stripped) that failed validation.
        raw_line: Vec<u8>,
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },

    /// A line exceeded the maximum allowed length.
    #[error("line too long: {actual} bytes (limit: {limit})")]
    MessageTooLong {
        /// Actual line length.
        actual: usize,
        /// Maximum allowed length.
        limit: usize,
    },

    /// The endpoint host is not usable as a TLS server name.
    #[error("invalid TLS server name: {0}")]
    InvalidServerName(String),

    /// An operation required an open connection.
    #[error("not connected")]
    NotConnected,

    /// `connect` was called on a connection that is already open.
    #[error("already connected")]
    AlreadyConnected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MessageTooLong {
            actual: 9000,
            limit: 8191,
        };
        assert_eq!(format!("{}", err), "line too long: 9000 bytes (limit: 8191)");

        assert_eq!(format!("{}", ProtocolError::NotConnected), "not connected");
    }

    #[test]
    fn test_io_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let err: ProtocolError = io_err.into();
        assert!(matches!(err, ProtocolError::Io(_)));
    }
}
