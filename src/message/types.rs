//! The owned message type.

/// A parsed IRC message.
///
/// Produced by [`Message::parse`] from one terminator-stripped protocol line
/// and consumed immediately by dispatch; outbound, built via the constructors
/// and serialized with `Display`.
///
/// # Example
///
/// ```
/// use irclink::Message;
///
/// let msg = Message::parse(":nick!u@host PRIVMSG #chan :Hello!").unwrap();
/// assert_eq!(msg.command, "PRIVMSG");
///
/// let out = Message::privmsg("#chan", "Hello!");
/// assert_eq!(out.to_string(), "PRIVMSG #chan :Hello!\r\n");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Sender identity from the line's leading prefix, if present.
    pub prefix: Option<String>,
    /// The command name; never empty on a successfully parsed message.
    pub command: String,
    /// Channel or nickname the message is directed to.
    pub destination: Option<String>,
    /// Free-text payload.
    pub trailing: Option<String>,
}

impl Message {
    /// Create a bare outbound message for `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            prefix: None,
            command: command.into(),
            destination: None,
            trailing: None,
        }
    }

    /// Set the destination (channel or nickname).
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Set the trailing free-text payload.
    #[must_use]
    pub fn with_trailing(mut self, trailing: impl Into<String>) -> Self {
        self.trailing = Some(trailing.into());
        self
    }

    /// Create a PRIVMSG to a target with text.
    #[must_use]
    pub fn privmsg(target: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new("PRIVMSG")
            .with_destination(target)
            .with_trailing(text)
    }

    /// Create a PONG answering a PING, echoing its token if there was one.
    #[must_use]
    pub fn pong(token: Option<&str>) -> Self {
        match token {
            Some(token) => Self::new("PONG").with_trailing(token),
            None => Self::new("PONG"),
        }
    }

    /// Create a QUIT with a farewell reason.
    #[must_use]
    pub fn quit(reason: impl Into<String>) -> Self {
        Self::new("QUIT").with_trailing(reason)
    }
}
