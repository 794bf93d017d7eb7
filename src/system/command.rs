//! Inbound command decoding
//!
//! The ground station sends `{"command": "<NAME>"}` on the control topic. Older
//! clients send Spanish names or the `move:<NAME>` form, and some send the bare
//! name without JSON. Everything maps onto an [`ActiveCommand`]; anything that
//! cannot be mapped means STOP.

use serde::Deserialize;

use super::state::ActiveCommand;

/// Accepted spellings, compared case-insensitively
const ALIASES: &[(&str, ActiveCommand)] = &[
    ("forward", ActiveCommand::Forward),
    ("backward", ActiveCommand::Backward),
    ("left", ActiveCommand::Left),
    ("right", ActiveCommand::Right),
    ("stop", ActiveCommand::Stop),
    ("adelante", ActiveCommand::Forward),
    ("atras", ActiveCommand::Backward),
    ("atrás", ActiveCommand::Backward),
    ("izquierda", ActiveCommand::Left),
    ("derecha", ActiveCommand::Right),
    ("parar", ActiveCommand::Stop),
    ("detener", ActiveCommand::Stop),
    ("alto", ActiveCommand::Stop),
];

const MOVE_PREFIX: &str = "move:";

#[derive(Deserialize)]
struct CommandMessage<'a> {
    command: &'a str,
}

/// Resolve one command name, `None` if it is not in the alias table
pub fn parse(name: &str) -> Option<ActiveCommand> {
    let name = name.trim();
    let name = match name.get(..MOVE_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MOVE_PREFIX) => name[MOVE_PREFIX.len()..].trim(),
        _ => name,
    };
    ALIASES
        .iter()
        .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
        .map(|(_, command)| *command)
}

/// Decode a control-topic payload
///
/// JSON first, then the raw payload as a bare name, then STOP.
pub fn decode(payload: &[u8]) -> ActiveCommand {
    let name = match serde_json_core::from_slice::<CommandMessage>(payload) {
        Ok((message, _)) => Some(message.command),
        Err(_) => core::str::from_utf8(payload).ok(),
    };
    match name.and_then(parse) {
        Some(command) => command,
        None => {
            log_debug!("Unrecognized command payload, stopping");
            ActiveCommand::Stop
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_in_any_case() {
        assert_eq!(parse("FORWARD"), Some(ActiveCommand::Forward));
        assert_eq!(parse("backward"), Some(ActiveCommand::Backward));
        assert_eq!(parse("Left"), Some(ActiveCommand::Left));
        assert_eq!(parse(" right "), Some(ActiveCommand::Right));
        assert_eq!(parse("STOP"), Some(ActiveCommand::Stop));
    }

    #[test]
    fn legacy_names() {
        assert_eq!(parse("adelante"), Some(ActiveCommand::Forward));
        assert_eq!(parse("ATRAS"), Some(ActiveCommand::Backward));
        assert_eq!(parse("atrás"), Some(ActiveCommand::Backward));
        assert_eq!(parse("izquierda"), Some(ActiveCommand::Left));
        assert_eq!(parse("derecha"), Some(ActiveCommand::Right));
        assert_eq!(parse("detener"), Some(ActiveCommand::Stop));
        assert_eq!(parse("alto"), Some(ActiveCommand::Stop));
    }

    #[test]
    fn move_prefix() {
        assert_eq!(parse("move:FORWARD"), Some(ActiveCommand::Forward));
        assert_eq!(parse("MOVE:left"), Some(ActiveCommand::Left));
        assert_eq!(parse("move:"), None);
        assert_eq!(parse("mov"), None);
    }

    #[test]
    fn json_payload() {
        assert_eq!(decode(br#"{"command":"FORWARD"}"#), ActiveCommand::Forward);
        assert_eq!(decode(br#"{ "command" : "move:RIGHT" }"#), ActiveCommand::Right);
    }

    #[test]
    fn bare_payload_falls_back_to_name() {
        assert_eq!(decode(b"adelante"), ActiveCommand::Forward);
        assert_eq!(decode(b"move:BACKWARD\n"), ActiveCommand::Backward);
    }

    #[test]
    fn garbage_means_stop() {
        assert_eq!(decode(br#"{"command":"JUMP"}"#), ActiveCommand::Stop);
        assert_eq!(decode(br#"{"command":5}"#), ActiveCommand::Stop);
        assert_eq!(decode(b"\xff\xfe"), ActiveCommand::Stop);
        assert_eq!(decode(b""), ActiveCommand::Stop);
    }
}
