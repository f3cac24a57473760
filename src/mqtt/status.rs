//! Connection state and the status tokens delivered to observers.
//!
//! The state machine itself lives in the connection worker; observers
//! never see [`ConnectionState`] directly. They receive [`StatusEvent`]
//! values through a channel, one per state transition, carrying exactly
//! the four literal tokens the host understands.

use std::fmt;

/// Lifecycle of a broker connection. Owned and mutated exclusively by the
/// connection worker task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Error,
}

/// Human-readable connection status delivered to the host.
///
/// The string forms are a wire contract; the host dispatches on the
/// literal tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    Connecting,
    Connected,
    Disconnected,
    Error,
}

impl StatusEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusEvent::Connecting => "CONNECTING",
            StatusEvent::Connected => "CONNECTED",
            StatusEvent::Disconnected => "DISCONNECTED",
            StatusEvent::Error => "ERROR",
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tokens_are_the_literal_contract() {
        assert_eq!(StatusEvent::Connecting.as_str(), "CONNECTING");
        assert_eq!(StatusEvent::Connected.as_str(), "CONNECTED");
        assert_eq!(StatusEvent::Disconnected.as_str(), "DISCONNECTED");
        assert_eq!(StatusEvent::Error.as_str(), "ERROR");
    }

    #[test]
    fn display_matches_token() {
        assert_eq!(StatusEvent::Connected.to_string(), "CONNECTED");
    }

    #[test]
    fn initial_state_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }
}
