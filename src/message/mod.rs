//! IRC message types, parsing, and wire serialization.

mod parse;
mod serialize;
mod types;

pub use self::types::Message;
