//! Core type definitions for the realtime client.

use std::{
    fmt,
    sync::atomic::{AtomicU8, Ordering},
};

/// Public connection status, as exposed by [`RealtimeClient::status`].
///
/// [`RealtimeClient::status`]: crate::client::RealtimeClient::status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No connection, and none in progress.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Connected and registered, ready for traffic.
    Connected,
    /// Waiting to retry after an unexpected drop.
    Reconnecting,
}

impl ConnectionStatus {
    /// Check if the connection is ready for traffic.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Reconnecting => 3,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Reconnecting,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        write!(f, "{s}")
    }
}

/// Shared, lock-free status cell.
///
/// Written by whichever side currently drives the lifecycle (the client
/// handle for manual transitions, the connection actor for everything
/// else); read by [`RealtimeClient::status`].
///
/// [`RealtimeClient::status`]: crate::client::RealtimeClient::status
pub(crate) struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConnectionStatus::Disconnected.as_u8()))
    }

    pub(crate) fn set(&self, status: ConnectionStatus) {
        self.0.store(status.as_u8(), Ordering::Release);
    }

    pub(crate) fn get(&self) -> ConnectionStatus {
        ConnectionStatus::from_u8(self.0.load(Ordering::Acquire))
    }
}
