//! Client transport over TCP and TLS.
//!
//! [`Transport::connect`] resolves an [`Endpoint`], opens the TCP stream
//! (with keepalive), and negotiates client TLS when requested, with
//! certificate validation against the platform's native roots and no pinning.
//! [`Transport::split`] then produces the buffered [`LineReader`] and the
//! framed writer the connection's read cycle runs on.

mod parts;
mod reader;

pub use parts::{TransportReadHalf, TransportWriteHalf};
pub use reader::LineReader;

use std::sync::Arc;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::pki_types::ServerName;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};
use tokio_rustls::TlsConnector;
use tokio_util::codec::FramedWrite;
use tracing::warn;

use crate::error::{ProtocolError, Result};
use crate::line::LineCodec;

/// Initial capacity of the read buffer.
pub const READ_BUFFER_CAPACITY: usize = 64 * 1024;

/// Immutable identity of the remote server. Set at construction, never
/// mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Server hostname or address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Whether to negotiate TLS after connecting.
    pub use_tls: bool,
}

/// A connected client stream, plain or TLS-wrapped.
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plain TCP transport.
    Tcp(TcpStream),
    /// Client-side TLS transport (boxed for size).
    Tls(Box<TlsStream<TcpStream>>),
}

impl Transport {
    /// Open a duplex byte stream to the endpoint.
    ///
    /// # Errors
    ///
    /// Fails on connection refusal, resolution failure, an unusable TLS
    /// server name, or TLS negotiation failure (certificate validation
    /// rejections included). Retry policy belongs to the application.
    pub async fn connect(endpoint: &Endpoint) -> Result<Self> {
        let stream = TcpStream::connect((endpoint.host.as_str(), endpoint.port)).await?;

        if let Err(e) = enable_keepalive(&stream) {
            warn!(error = %e, "failed to enable TCP keepalive");
        }

        if !endpoint.use_tls {
            return Ok(Self::Tcp(stream));
        }

        let server_name = ServerName::try_from(endpoint.host.clone())
            .map_err(|_| ProtocolError::InvalidServerName(endpoint.host.clone()))?;
        let tls = tls_connector().connect(server_name, stream).await?;
        Ok(Self::Tls(Box::new(tls)))
    }

    /// Check whether this transport is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Split into the line reader and framed writer the read cycle runs on.
    pub fn split(
        self,
    ) -> (
        LineReader<TransportReadHalf>,
        FramedWrite<TransportWriteHalf, LineCodec>,
    ) {
        let (read, write) = match self {
            Self::Tcp(stream) => {
                let (r, w) = stream.into_split();
                (TransportReadHalf::Tcp(r), TransportWriteHalf::Tcp(w))
            }
            Self::Tls(stream) => {
                let (r, w) = tokio::io::split(*stream);
                (TransportReadHalf::Tls(r), TransportWriteHalf::Tls(w))
            }
        };

        (LineReader::new(read), FramedWrite::new(write, LineCodec::new()))
    }
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}

/// Build a TLS connector validating against the native root store.
fn tls_connector() -> TlsConnector {
    let mut roots = RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for cert in native.certs {
        if let Err(e) = roots.add(cert) {
            warn!(error = %e, "failed to add native root certificate");
        }
    }
    for e in &native.errors {
        warn!(error = %e, "error loading native root certificates");
    }

    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tcp_connect_and_split() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let endpoint = Endpoint {
            host: addr.ip().to_string(),
            port: addr.port(),
            use_tls: false,
        };

        let server = async {
            let (mut peer, _) = listener.accept().await.unwrap();
            peer.write_all(b"PING :server\r\n").await.unwrap();

            let mut buf = [0u8; 64];
            let n = peer.read(&mut buf).await.unwrap();
            assert_eq!(&buf[..n], b"PONG :server\r\n");
        };

        let client = async {
            let transport = Transport::connect(&endpoint).await.unwrap();
            assert!(!transport.is_tls());

            let (mut reader, mut writer) = transport.split();
            let line = reader.next_line().await.unwrap().unwrap();
            assert_eq!(line, "PING :server");

            writer.send("PONG :server\r\n".to_string()).await.unwrap();
        };

        tokio::join!(server, client);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let endpoint = Endpoint {
            host: addr.ip().to_string(),
            port: addr.port(),
            use_tls: false,
        };

        let result = Transport::connect(&endpoint).await;
        assert!(matches!(result, Err(ProtocolError::Io(_))));
    }
}
