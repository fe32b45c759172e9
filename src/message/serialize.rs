//! Wire serialization for outbound messages.

use std::fmt::{self, Display, Formatter};

use super::types::Message;

/// Serializes to `command [destination] [:trailing]\r\n`.
///
/// Client-originated lines carry no prefix, so `prefix` is never written.
impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;

        if let Some(ref destination) = self.destination {
            write!(f, " {}", destination)?;
        }

        if let Some(ref trailing) = self.trailing {
            write!(f, " :{}", trailing)?;
        }

        write!(f, "\r\n")
    }
}
