//! WebSocket plumbing for the two device channels.
//!
//! Both channels are inbound-only: a reader thread per socket forwards raw
//! text into the panel's event channel and the panel thread does all the
//! work. Parsing the wire text into tagged messages lives here so it can be
//! tested without a socket.

use std::sync::mpsc::Sender;
use std::thread;

use log::{info, warn};
use tungstenite::Message;

/// Which device channel an event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Status,
    Sound,
}

/// Lifecycle and payload events forwarded by a reader thread.
#[derive(Debug, PartialEq, Eq)]
pub enum SocketEvent {
    Opened(Channel),
    Text(Channel, String),
    Closed(Channel),
}

/// Status-channel wire message.
#[derive(Debug, PartialEq, Eq)]
pub enum StatusMessage {
    Morse(String),
    Translate(String),
    Clear,
    Unknown(String),
}

impl StatusMessage {
    /// Parse a raw text payload. Prefixes are exact and case-sensitive, and
    /// everything after the prefix is kept verbatim; there is no escaping on
    /// this channel.
    pub fn parse(raw: &str) -> StatusMessage {
        if let Some(rest) = raw.strip_prefix("MORSE:") {
            StatusMessage::Morse(rest.to_string())
        } else if let Some(rest) = raw.strip_prefix("TRANSLATE:") {
            StatusMessage::Translate(rest.to_string())
        } else if raw == "CLEAR" {
            StatusMessage::Clear
        } else {
            StatusMessage::Unknown(raw.to_string())
        }
    }
}

/// Sound-channel wire message.
#[derive(Debug, PartialEq, Eq)]
pub enum SoundCommand {
    Start,
    Stop,
    Unknown(String),
}

impl SoundCommand {
    pub fn parse(raw: &str) -> SoundCommand {
        match raw {
            "START" => SoundCommand::Start,
            "STOP" => SoundCommand::Stop,
            _ => SoundCommand::Unknown(raw.to_string()),
        }
    }
}

/// Connection lifecycle for one socket, tracked on the panel thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Lifecycle {
    #[default]
    Idle,
    Connecting,
    Open,
    Closed,
}

impl Lifecycle {
    /// True if the initialize action should launch a new connection now.
    /// Sockets are only (re)opened when never started or already closed.
    pub fn begin_open(&mut self) -> bool {
        match self {
            Lifecycle::Idle | Lifecycle::Closed => {
                *self = Lifecycle::Connecting;
                true
            }
            Lifecycle::Connecting | Lifecycle::Open => false,
        }
    }
}

pub fn status_url(host: &str) -> String {
    format!("ws://{}/ws", host)
}

pub fn sound_url(host: &str) -> String {
    format!("ws://{}/ws-sound", host)
}

/// Spawn the reader thread for one channel.
///
/// The thread forwards lifecycle and text events until the peer closes or
/// the connection errors; it never reconnects on its own. A failed connect
/// surfaces as a `Closed` event so the panel can offer a reconnect.
pub fn spawn_reader(url: String, channel: Channel, events: Sender<SocketEvent>) {
    thread::spawn(move || {
        info!("connecting to {} ...", url);
        let (mut socket, _response) = match tungstenite::connect(url.as_str()) {
            Ok(connected) => connected,
            Err(e) => {
                warn!("{:?} connect failed: {}", channel, e);
                let _ = events.send(SocketEvent::Closed(channel));
                return;
            }
        };
        if events.send(SocketEvent::Opened(channel)).is_err() {
            return;
        }

        loop {
            match socket.read() {
                Ok(Message::Text(text)) => {
                    if events.send(SocketEvent::Text(channel, text)).is_err() {
                        return;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => {
                    let _ = events.send(SocketEvent::Closed(channel));
                    return;
                }
                // binary/ping/pong, nothing for us
                Ok(_) => {}
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_status_variants() {
        assert_eq!(
            StatusMessage::parse("MORSE:.-.-"),
            StatusMessage::Morse(".-.-".to_string())
        );
        assert_eq!(
            StatusMessage::parse("TRANSLATE:HI"),
            StatusMessage::Translate("HI".to_string())
        );
        assert_eq!(StatusMessage::parse("CLEAR"), StatusMessage::Clear);
        assert_eq!(
            StatusMessage::parse("PING"),
            StatusMessage::Unknown("PING".to_string())
        );
    }

    #[test]
    fn parse_status_keeps_payload_verbatim() {
        // no escaping on this channel, even of other command prefixes
        assert_eq!(
            StatusMessage::parse("MORSE:CLEAR"),
            StatusMessage::Morse("CLEAR".to_string())
        );
        assert_eq!(
            StatusMessage::parse("TRANSLATE: spaced : colons "),
            StatusMessage::Translate(" spaced : colons ".to_string())
        );
        assert_eq!(
            StatusMessage::parse("MORSE:"),
            StatusMessage::Morse(String::new())
        );
    }

    #[test]
    fn parse_status_is_case_sensitive() {
        assert_eq!(
            StatusMessage::parse("morse:.-"),
            StatusMessage::Unknown("morse:.-".to_string())
        );
        assert_eq!(
            StatusMessage::parse("clear"),
            StatusMessage::Unknown("clear".to_string())
        );
    }

    #[test]
    fn parse_sound_is_exact_match() {
        assert_eq!(SoundCommand::parse("START"), SoundCommand::Start);
        assert_eq!(SoundCommand::parse("STOP"), SoundCommand::Stop);
        assert_eq!(
            SoundCommand::parse("START "),
            SoundCommand::Unknown("START ".to_string())
        );
        assert_eq!(
            SoundCommand::parse("stop"),
            SoundCommand::Unknown("stop".to_string())
        );
    }

    #[test]
    fn lifecycle_opens_once() {
        let mut lifecycle = Lifecycle::default();

        assert!(lifecycle.begin_open());
        // a second initialize while connecting or open is a no-op
        assert!(!lifecycle.begin_open());
        lifecycle = Lifecycle::Open;
        assert!(!lifecycle.begin_open());

        // only a remote close allows a reopen
        lifecycle = Lifecycle::Closed;
        assert!(lifecycle.begin_open());
        assert_eq!(lifecycle, Lifecycle::Connecting);
    }

    #[test]
    fn endpoint_urls() {
        assert_eq!(status_url("192.168.1.7"), "ws://192.168.1.7/ws");
        assert_eq!(sound_url("192.168.1.7"), "ws://192.168.1.7/ws-sound");
    }
}
