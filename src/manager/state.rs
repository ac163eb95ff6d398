//! Connection lifecycle state.

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of the rosbridge session.
///
/// ```text
/// Disconnected ──connect──► Connecting ──open──► Connected
///      ▲                        │                   │
///      │                      fail               close/fail
///      │                        ▼                   ▼
///      └──────disconnect─────  Error ◄───── Disconnected / Error
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No session and none requested.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Session open; commands are written.
    Connected,
    /// Last session failed.
    Error,
}

impl ConnectionState {
    /// Returns `true` when commands will be written.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_only_connected_is_connected() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(!ConnectionState::Error.is_connected());
        assert_eq!(ConnectionState::Error.to_string(), "error");
    }
}
