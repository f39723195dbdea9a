//! Connection state of a primary store

use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Outcome of the most recent attempt to reach the primary store
///
/// This is a snapshot for diagnostics. Operations never consult it; they
/// always try the primary store first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No attempt made yet
    Unknown,
    Connected,
    Disconnected,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connected,
            2 => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Unknown => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Disconnected => 2,
        }
    }
}

/// Lock-free holder for a [`ConnectionState`]
#[derive(Debug, Default)]
pub struct StoreHealth {
    state: AtomicU8,
}

impl StoreHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Record a successful call, returning the previous state
    pub fn record_success(&self) -> ConnectionState {
        self.set(ConnectionState::Connected)
    }

    /// Record a failed call, returning the previous state
    pub fn record_failure(&self) -> ConnectionState {
        self.set(ConnectionState::Disconnected)
    }

    fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.state.swap(state.as_u8(), Ordering::AcqRel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions() {
        let health = StoreHealth::new();
        assert_eq!(health.state(), ConnectionState::Unknown);

        assert_eq!(health.record_success(), ConnectionState::Unknown);
        assert_eq!(health.state(), ConnectionState::Connected);

        assert_eq!(health.record_failure(), ConnectionState::Connected);
        assert_eq!(health.state(), ConnectionState::Disconnected);

        // A fresh success reconnects
        assert_eq!(health.record_success(), ConnectionState::Disconnected);
        assert_eq!(health.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ConnectionState::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }
}
