//! nom-based parser for the client line grammar.
//!
//! Grammar, in order: `[:prefix] command destination [:trailing]`.
//!
//! - prefix: optional leading `:`, then one or more of `[a-z0-9.@!_]`,
//!   followed by a space
//! - command: alphanumeric token (covers 3-digit numeric replies)
//! - destination: alphanumeric token, optionally `#`-prefixed
//! - trailing: everything after ` :`, or after the separating space when the
//!   colon is absent
//!
//! Lines failing the grammar get one more chance as a PING keep-alive; any
//! other line is protocol noise and parses to `None`.

use nom::{
    bytes::complete::take_while1,
    character::complete::char,
    combinator::{opt, recognize},
    sequence::{pair, preceded, terminated},
    IResult,
};

use super::types::Message;

/// Borrowed view of one parsed line, before conversion to an owned [`Message`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ParsedLine<'a> {
    pub prefix: Option<&'a str>,
    pub command: &'a str,
    pub destination: &'a str,
    pub trailing: Option<&'a str>,
}

fn is_prefix_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '@' | '!' | '_')
}

/// Parse the prefix token and its terminating space.
fn parse_prefix(input: &str) -> IResult<&str, &str> {
    terminated(
        preceded(opt(char(':')), take_while1(is_prefix_char)),
        char(' '),
    )(input)
}

fn parse_command(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric())(input)
}

fn parse_destination(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        opt(char('#')),
        take_while1(|c: char| c.is_ascii_alphanumeric()),
    ))(input)
}

/// Parse `command destination [:trailing]` from the given point.
fn parse_body(input: &str) -> Option<(&str, &str, Option<&str>)> {
    let (input, command) = parse_command(input).ok()?;
    let (input, _) = char::<_, nom::error::Error<&str>>(' ')(input).ok()?;
    let (rest, destination) = parse_destination(input).ok()?;

    let trailing = if let Some(t) = rest.strip_prefix(" :") {
        Some(t)
    } else if let Some(t) = rest.strip_prefix(' ') {
        Some(t)
    } else if rest.is_empty() {
        None
    } else {
        // Junk glued to the destination token; not a well-formed line.
        return None;
    };

    Some((command, destination, trailing))
}

/// Match one line against the full grammar.
///
/// The prefixed interpretation is tried first; if the body fails to parse
/// after a candidate prefix, the whole line is retried without one. This
/// keeps prefixless lines whose command happens to fit the prefix charset
/// (e.g. a bare numeric reply) parseable.
pub(crate) fn parse_line(input: &str) -> Option<ParsedLine<'_>> {
    if let Ok((rest, prefix)) = parse_prefix(input) {
        if let Some((command, destination, trailing)) = parse_body(rest) {
            return Some(ParsedLine {
                prefix: Some(prefix),
                command,
                destination,
                trailing,
            });
        }
    }

    parse_body(input).map(|(command, destination, trailing)| ParsedLine {
        prefix: None,
        command,
        destination,
        trailing,
    })
}

impl Message {
    /// Parse one terminator-stripped protocol line.
    ///
    /// Returns `None` for lines matching neither the full grammar nor the
    /// PING fallback; such lines are expected noise, not an error.
    pub fn parse(line: &str) -> Option<Message> {
        if let Some(parsed) = parse_line(line) {
            return Some(Message {
                prefix: parsed.prefix.map(str::to_owned),
                command: parsed.command.to_owned(),
                destination: Some(parsed.destination.to_owned()),
                trailing: parsed.trailing.map(str::to_owned),
            });
        }

        // Fallback: PING carries no destination token, so it fails the
        // general grammar. The token, if any, sits after the first colon.
        if line.starts_with("PING") {
            let trailing = line.find(':').map(|i| line[i + 1..].to_owned());
            return Some(Message {
                prefix: None,
                command: "PING".to_owned(),
                destination: None,
                trailing,
            });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_privmsg_with_prefix() {
        let msg = Message::parse(":nick!user@host PRIVMSG #channel :Hello, world!").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("nick!user@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.destination.as_deref(), Some("#channel"));
        assert_eq!(msg.trailing.as_deref(), Some("Hello, world!"));
    }

    #[test]
    fn test_parse_numeric_reply() {
        let msg = Message::parse(":irc.example.net 001 nick :Welcome").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("irc.example.net"));
        assert_eq!(msg.command, "001");
        assert_eq!(msg.destination.as_deref(), Some("nick"));
        assert_eq!(msg.trailing.as_deref(), Some("Welcome"));
    }

    #[test]
    fn test_parse_prefixless_numeric() {
        // The command digits fit the prefix charset; the retry without a
        // prefix must still parse this.
        let msg = Message::parse("001 nick :Welcome").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "001");
        assert_eq!(msg.destination.as_deref(), Some("nick"));
    }

    #[test]
    fn test_parse_without_prefix() {
        let msg = Message::parse("PRIVMSG #chan :hello world").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.destination.as_deref(), Some("#chan"));
        assert_eq!(msg.trailing.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_parse_no_trailing() {
        let msg = Message::parse(":nick!u@h JOIN #channel").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.destination.as_deref(), Some("#channel"));
        assert_eq!(msg.trailing, None);
    }

    #[test]
    fn test_parse_trailing_without_colon() {
        let msg = Message::parse(":srv MODE nick +i").unwrap();
        assert_eq!(msg.command, "MODE");
        assert_eq!(msg.destination.as_deref(), Some("nick"));
        assert_eq!(msg.trailing.as_deref(), Some("+i"));
    }

    #[test]
    fn test_parse_empty_trailing() {
        let msg = Message::parse("PRIVMSG #chan :").unwrap();
        assert_eq!(msg.trailing.as_deref(), Some(""));
    }

    #[test]
    fn test_ping_fallback() {
        let msg = Message::parse("PING :abc123").unwrap();
        assert_eq!(msg.prefix, None);
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.destination, None);
        assert_eq!(msg.trailing.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_ping_without_token() {
        let msg = Message::parse("PING").unwrap();
        assert_eq!(msg.command, "PING");
        assert_eq!(msg.trailing, None);
    }

    #[test]
    fn test_noise_is_unrecognized() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("   "), None);
        assert_eq!(Message::parse(":srv"), None);
        assert_eq!(Message::parse("ERROR"), None);
        assert_eq!(Message::parse("CMD dest$junk"), None);
    }

    #[test]
    fn test_lowercase_bare_command_is_noise() {
        // "ping" fits the prefix charset, the rest fails the grammar, and
        // the fallback matches the literal "PING" only.
        assert_eq!(Message::parse("ping :x"), None);
    }

    #[test]
    fn test_parsed_line_borrows() {
        let parsed = parse_line(":srv 372 nick :motd line").unwrap();
        assert_eq!(
            parsed,
            ParsedLine {
                prefix: Some("srv"),
                command: "372",
                destination: "nick",
                trailing: Some("motd line"),
            }
        );
    }
}
