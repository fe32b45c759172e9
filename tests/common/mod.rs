//! Shared loopback server used by the integration tests.

use std::net::SocketAddr;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

/// A plain TCP listener standing in for an IRC server.
pub struct TestServer {
    listener: TcpListener,
}

impl TestServer {
    pub async fn bind() -> std::io::Result<Self> {
        Ok(Self {
            listener: TcpListener::bind("127.0.0.1:0").await?,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.listener.local_addr().expect("listener has local addr")
    }

    pub async fn accept(&self) -> std::io::Result<TcpStream> {
        let (stream, _peer) = self.listener.accept().await?;
        Ok(stream)
    }
}

/// Read one `\n`-terminated line from the peer, terminator included.
pub async fn read_line(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        let n = stream.read(&mut byte).await.expect("read from peer");
        if n == 0 {
            break;
        }
        line.push(byte[0]);
        if byte[0] == b'\n' {
            break;
        }
    }
    String::from_utf8(line).expect("peer sent valid UTF-8")
}
