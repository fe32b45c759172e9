//! # irclink
//!
//! A minimal async IRC client transport. The crate owns a TCP (optionally
//! TLS-wrapped) connection to an IRC server, frames the byte stream into
//! `\r\n`-terminated protocol lines, parses each line into the IRC message
//! grammar (optional prefix, command, destination, trailing text), and
//! dispatches parsed messages to handlers registered per command name.
//!
//! It deliberately stops there: no channel or user state tracking, no flood
//! control, no reconnection policy. Those belong to the application built on
//! top, expressed as [`Handler`] implementations that may reply through the
//! connection's [`Sender`].
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use irclink::{Connection, Context, Handler};
//!
//! struct PingPong;
//!
//! #[async_trait]
//! impl Handler for PingPong {
//!     async fn handle(&self, ctx: Context<'_>) {
//!         // The transport only parses PING; answering it is up to us.
//!         let _ = ctx.sender.send("PONG", None, ctx.trailing).await;
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> irclink::Result<()> {
//!     let mut conn = Connection::new("irc.libera.chat", 6697, true);
//!     conn.register_handler("PING", Arc::new(PingPong));
//!     conn.connect().await?;
//!     conn.send("NICK", Some("ferris"), None).await?;
//!     // ... drive the application ...
//!     conn.close().await;
//!     Ok(())
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod connection;
pub mod error;
pub mod handler;
pub mod line;
pub mod message;
pub mod transport;

pub use self::connection::{Connection, ConnectionState, Sender};
pub use self::error::{ProtocolError, Result};
pub use self::handler::{Context, Handler, Registry};
pub use self::line::{LineCodec, MAX_LINE_LEN};
pub use self::message::Message;
pub use self::transport::{Endpoint, LineReader, Transport, READ_BUFFER_CAPACITY};
