//! Connection lifecycle and the per-connection read and write cycles.
//!
//! Each open [`Connection`] runs one dedicated reader task and one writer
//! task:
//!
//! ```text
//!    ┌───────────────┐                      ┌───────────────┐
//!    │  reader task  │                      │  writer task  │
//!    │               │                      │               │
//!    │  LineReader   │                      │  FramedWrite  │
//!    │     │ parse   │                      │       ▲       │
//!    │     ▼         │    ┌──────────┐      │       │       │
//!    │  [dispatch] ──┼──▶ │ outgoing │ ─────┼───────┘       │
//!    └───────────────┘    │  queue   │      └───────────────┘
//!                         └────▲─────┘
//!                              └──── Sender::send (any context)
//! ```
//!
//! Lines are parsed and dispatched inline on the reader task, in wire
//! order. All writes flow through the outgoing queue; its single consumer,
//! the writer task, serializes them onto the stream. Because the consumer
//! is not the dispatching task, a handler may queue any number of replies
//! without stalling the reads that drain them.

use std::sync::Arc;

use futures_util::SinkExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, trace, warn};

use crate::error::{ProtocolError, Result};
use crate::handler::{Handler, Registry};
use crate::line::LineCodec;
use crate::message::Message;
use crate::transport::{
    Endpoint, LineReader, Transport, TransportReadHalf, TransportWriteHalf,
};

/// Outbound queue depth per connection.
const OUTGOING_QUEUE_DEPTH: usize = 64;

/// Farewell sent by [`Connection::close`].
const QUIT_MESSAGE: &str = "Closing connection";

/// Lifecycle state of a [`Connection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket held. The initial and terminal state; reconnectable.
    Disconnected,
    /// `connect` is resolving the endpoint and negotiating the stream.
    Connecting,
    /// The read and write cycles are live.
    Open,
}

/// Cloneable outbound handle for a connection.
///
/// Usable from any context (a UI action, a handler); the write cycle's
/// single queue consumer provides the mutual exclusion the stream requires.
#[derive(Clone)]
pub struct Sender {
    tx: mpsc::Sender<Message>,
}

impl Sender {
    pub(crate) fn new(tx: mpsc::Sender<Message>) -> Self {
        Self { tx }
    }

    /// Queue an outbound line built as
    /// `command [destination] [:trailing]\r\n`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] once the connection has been
    /// torn down.
    pub async fn send(
        &self,
        command: &str,
        destination: Option<&str>,
        trailing: Option<&str>,
    ) -> Result<()> {
        let mut msg = Message::new(command);
        if let Some(destination) = destination {
            msg = msg.with_destination(destination);
        }
        if let Some(trailing) = trailing {
            msg = msg.with_trailing(trailing);
        }
        self.send_message(msg).await
    }

    /// Queue a prebuilt outbound message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] once the connection has been
    /// torn down.
    pub async fn send_message(&self, msg: Message) -> Result<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| ProtocolError::NotConnected)
    }
}

/// Handles for the reader and writer tasks while a connection is up.
struct Active {
    sender: Sender,
    cancel: CancellationToken,
    reader_task: JoinHandle<()>,
    writer_task: JoinHandle<()>,
}

/// A client connection to one IRC server.
///
/// Owns the socket lifecycle: connect, optional TLS negotiation, the read
/// cycle, and disconnect. See the [crate docs](crate) for a usage example.
pub struct Connection {
    endpoint: Endpoint,
    registry: Arc<Registry>,
    state: Arc<Mutex<ConnectionState>>,
    active: Option<Active>,
}

impl Connection {
    /// Create a disconnected connection for the given endpoint.
    pub fn new(host: impl Into<String>, port: u16, use_tls: bool) -> Self {
        Self {
            endpoint: Endpoint {
                host: host.into(),
                port,
                use_tls,
            },
            registry: Arc::new(Registry::new()),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            active: None,
        }
    }

    /// The endpoint this connection targets.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.lock()
    }

    /// Install or replace the handler for `command`; see
    /// [`Registry::register`].
    pub fn register_handler(&self, command: impl Into<String>, handler: Arc<dyn Handler>) {
        self.registry.register(command, handler);
    }

    /// Open the connection and start the read and write cycles.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::AlreadyConnected`] if the connection is
    /// already up, and any transport error from [`Transport::connect`]. On
    /// failure the state returns to `Disconnected` and the caller may retry
    /// whenever it likes.
    pub async fn connect(&mut self) -> Result<()> {
        if self.state() != ConnectionState::Disconnected {
            return Err(ProtocolError::AlreadyConnected);
        }
        // Reap a read cycle that ended on its own (EOF or fatal error).
        self.disconnect().await;

        *self.state.lock() = ConnectionState::Connecting;

        let transport = match Transport::connect(&self.endpoint).await {
            Ok(transport) => transport,
            Err(e) => {
                *self.state.lock() = ConnectionState::Disconnected;
                return Err(e);
            }
        };
        let (reader, writer) = transport.split();

        let (tx, rx) = mpsc::channel(OUTGOING_QUEUE_DEPTH);
        let sender = Sender::new(tx);
        let cancel = CancellationToken::new();

        // Open is stored before the tasks spawn so an instantly-exiting
        // read cycle cannot have its Disconnected write overwritten.
        *self.state.lock() = ConnectionState::Open;

        let reader_task = tokio::spawn(read_cycle(
            reader,
            Arc::clone(&self.registry),
            sender.clone(),
            cancel.clone(),
            Arc::clone(&self.state),
            self.endpoint.host.clone(),
            self.endpoint.port,
        ));
        let writer_task = tokio::spawn(write_cycle(
            writer,
            rx,
            cancel.clone(),
            self.endpoint.host.clone(),
            self.endpoint.port,
        ));

        self.active = Some(Active {
            sender,
            cancel,
            reader_task,
            writer_task,
        });
        info!(
            host = %self.endpoint.host,
            port = self.endpoint.port,
            tls = self.endpoint.use_tls,
            "connected"
        );
        Ok(())
    }

    /// An outbound handle usable from other contexts.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] when no connection is up.
    pub fn sender(&self) -> Result<Sender> {
        self.active
            .as_ref()
            .map(|active| active.sender.clone())
            .ok_or(ProtocolError::NotConnected)
    }

    /// Queue an outbound line; see [`Sender::send`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotConnected`] when no connection is up.
    pub async fn send(
        &self,
        command: &str,
        destination: Option<&str>,
        trailing: Option<&str>,
    ) -> Result<()> {
        self.sender()?.send(command, destination, trailing).await
    }

    /// Tear the connection down. Idempotent; calling it when already
    /// disconnected is a no-op.
    pub async fn disconnect(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            if let Err(e) = active.reader_task.await {
                warn!(error = %e, "read cycle task failed");
            }
            if let Err(e) = active.writer_task.await {
                warn!(error = %e, "write cycle task failed");
            }
        }
        *self.state.lock() = ConnectionState::Disconnected;
    }

    /// Send a best-effort QUIT farewell, then disconnect.
    ///
    /// The QUIT may fail if the stream is already unusable; that failure is
    /// swallowed. Explicit `close` replaces relying on drop timing for the
    /// farewell.
    pub async fn close(&mut self) {
        if let Some(active) = &self.active {
            let _ = active.sender.send_message(Message::quit(QUIT_MESSAGE)).await;
        }
        self.disconnect().await;
    }
}

/// The per-connection read cycle.
///
/// Runs until cancellation, EOF, or a fatal transport error. Invalid UTF-8
/// lines and unparseable lines are dropped without ending the cycle. On exit
/// the token is cancelled (so the writer task winds down too) and the state
/// set to `Disconnected`.
#[instrument(name = "connection", skip_all, fields(host = %host, port = port))]
async fn read_cycle(
    mut reader: LineReader<TransportReadHalf>,
    registry: Arc<Registry>,
    sender: Sender,
    cancel: CancellationToken,
    state: Arc<Mutex<ConnectionState>>,
    host: String,
    port: u16,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            result = reader.next_line() => {
                match result {
                    Some(Ok(line)) => match Message::parse(&line) {
                        Some(msg) => {
                            debug!(raw = %line, "received message");
                            registry.dispatch(&sender, &msg).await;
                        }
                        None => trace!(raw = %line, "unrecognized line, dropping"),
                    },
                    Some(Err(ProtocolError::InvalidUtf8 { byte_pos, .. })) => {
                        // One undecodable line is protocol noise; the
                        // connection stays open.
                        warn!(byte_pos, "dropping line with invalid UTF-8");
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "read error");
                        break;
                    }
                    None => {
                        info!("server closed connection");
                        break;
                    }
                }
            }
        }
    }

    cancel.cancel();
    *state.lock() = ConnectionState::Disconnected;
}

/// The per-connection write cycle.
///
/// Sole consumer of the outgoing queue; serializes all writes onto the
/// stream. On cancellation it flushes whatever is still queued, the QUIT
/// from `close()` included, then shuts the write half down. A write error
/// cancels the token so the reader winds down too.
#[instrument(name = "writer", skip_all, fields(host = %host, port = port))]
async fn write_cycle(
    mut writer: FramedWrite<TransportWriteHalf, LineCodec>,
    mut outgoing_rx: mpsc::Receiver<Message>,
    cancel: CancellationToken,
    host: String,
    port: u16,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                // Failures here are swallowed; the stream may already be
                // unusable.
                while let Ok(msg) = outgoing_rx.try_recv() {
                    if writer.send(msg.to_string()).await.is_err() {
                        break;
                    }
                }
                break;
            }

            msg = outgoing_rx.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = writer.send(msg.to_string()).await {
                        warn!(error = %e, "write error");
                        cancel.cancel();
                        break;
                    }
                }
                None => break,
            }
        }
    }

    if let Err(e) = writer.close().await {
        debug!(error = %e, "error shutting down write half");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let conn = Connection::new("irc.example.net", 6667, false);
        assert_eq!(conn.state(), ConnectionState::Disconnected);
        assert_eq!(conn.endpoint().host, "irc.example.net");
        assert_eq!(conn.endpoint().port, 6667);
        assert!(!conn.endpoint().use_tls);
    }

    #[tokio::test]
    async fn test_send_while_disconnected() {
        let conn = Connection::new("irc.example.net", 6667, false);
        let result = conn.send("PRIVMSG", Some("#chan"), Some("hi")).await;
        assert!(matches!(result, Err(ProtocolError::NotConnected)));
        assert!(matches!(conn.sender(), Err(ProtocolError::NotConnected)));
    }

    #[tokio::test]
    async fn test_disconnect_without_connect_is_noop() {
        let mut conn = Connection::new("irc.example.net", 6667, false);
        conn.disconnect().await;
        conn.disconnect().await;
        assert_eq!(conn.state(), ConnectionState::Disconnected);
    }
}
