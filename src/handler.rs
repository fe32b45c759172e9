//! Command handler registry and dispatch.
//!
//! Incoming messages are routed by exact command name (`"PRIVMSG"`,
//! `"PING"`, `"001"`, ...) to boxed [`Handler`] trait objects. An
//! unregistered command is normal traffic; most numeric replies have no
//! handler and are legitimately ignored.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::trace;

use crate::connection::Sender;
use crate::message::Message;

/// Context passed to a handler for one dispatched message.
pub struct Context<'a> {
    /// Outbound handle for the connection the message arrived on; handlers
    /// may reply through it.
    pub sender: &'a Sender,
    /// Sender identity from the line's prefix, if present.
    pub prefix: Option<&'a str>,
    /// Channel or nickname the message was directed to.
    pub destination: Option<&'a str>,
    /// Free-text payload.
    pub trailing: Option<&'a str>,
}

/// Trait implemented by all command handlers.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Handle one incoming message.
    async fn handle(&self, ctx: Context<'_>);
}

/// Registry mapping command names to handlers.
///
/// Keys are case-sensitive and unique; the last registration for a command
/// wins. Registration may happen while the connection is live; dispatch
/// takes a read lock only long enough to clone the handler out.
#[derive(Default)]
pub struct Registry {
    handlers: RwLock<HashMap<String, Arc<dyn Handler>>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Install or replace the handler for `command`.
    pub fn register(&self, command: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.write().insert(command.into(), handler);
    }

    /// Route a parsed message to its handler, if one is registered.
    pub async fn dispatch(&self, sender: &Sender, msg: &Message) {
        let handler = self.handlers.read().get(&msg.command).cloned();

        match handler {
            Some(handler) => {
                handler
                    .handle(Context {
                        sender,
                        prefix: msg.prefix.as_deref(),
                        destination: msg.destination.as_deref(),
                        trailing: msg.trailing.as_deref(),
                    })
                    .await;
            }
            None => trace!(command = %msg.command, "no handler registered, dropping"),
        }
    }
}
