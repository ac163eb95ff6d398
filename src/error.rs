//! Error types for the rosbridge client.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use rosbridge_client::{ConnectionManager, Result};
//!
//! fn example(manager: &ConnectionManager) -> Result<()> {
//!     let goal = manager.send_navigate_to_pose(1.0, 2.0, 0.0)?;
//!     println!("goal sent: {goal}");
//!     Ok(())
//! }
//! ```
//!
//! Transport failures are never returned from the command API. They reach
//! callers through [`ConnectionListener::on_error`](crate::ConnectionListener::on_error)
//! and drive the reconnect policy.
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidUrl`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::IdleTimeout`] |
//! | Protocol | [`Error::MalformedFrame`] |
//! | State | [`Error::NotConnected`], [`Error::GoalInFlight`] |
//! | Storage | [`Error::WaypointNotFound`], [`Error::EmptyPatrol`] |
//! | Execution | [`Error::Timeout`] |
//! | External | [`Error::Json`], [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::GoalId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by the builder when options are inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// The rosbridge endpoint URL could not be used.
    #[error("Invalid rosbridge URL '{url}': {message}")]
    InvalidUrl {
        /// URL as given by the caller.
        url: String,
        /// Why it was rejected.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// WebSocket connection closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// No inbound frame arrived within the configured idle window.
    #[error("No traffic from rosbridge for {idle_ms}ms")]
    IdleTimeout {
        /// Idle window in milliseconds.
        idle_ms: u64,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// An inbound frame could not be classified.
    #[error("Malformed frame: {message}")]
    MalformedFrame {
        /// What was wrong with the frame.
        message: String,
    },

    // ========================================================================
    // State Errors
    // ========================================================================
    /// Command issued while the session is not connected.
    #[error("Not connected to rosbridge")]
    NotConnected,

    /// A navigation goal is already executing.
    #[error("Navigation goal {active} is still in flight")]
    GoalInFlight {
        /// The goal that is currently executing.
        active: GoalId,
    },

    // ========================================================================
    // Storage Errors
    // ========================================================================
    /// Waypoint id is unknown to the store.
    #[error("Waypoint not found: {id}")]
    WaypointNotFound {
        /// The missing waypoint id.
        id: u64,
    },

    /// Patrol requested without any waypoints.
    #[error("Patrol has no waypoints")]
    EmptyPatrol,

    // ========================================================================
    // Execution Errors
    // ========================================================================
    /// Operation timeout.
    #[error("Timeout after {timeout_ms}ms: {operation}")]
    Timeout {
        /// Description of the operation that timed out.
        operation: String,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Watch channel closed.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid URL error.
    #[inline]
    pub fn invalid_url(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates an idle timeout error.
    #[inline]
    pub fn idle_timeout(idle_ms: u64) -> Self {
        Self::IdleTimeout { idle_ms }
    }

    /// Creates a malformed frame error.
    #[inline]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedFrame {
            message: message.into(),
        }
    }

    /// Creates a goal in flight error.
    #[inline]
    pub fn goal_in_flight(active: GoalId) -> Self {
        Self::GoalInFlight { active }
    }

    /// Creates a waypoint not found error.
    #[inline]
    pub fn waypoint_not_found(id: u64) -> Self {
        Self::WaypointNotFound { id }
    }

    /// Creates a timeout error.
    #[inline]
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::IdleTimeout { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if this is a transport-level error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::IdleTimeout { .. }
                | Self::InvalidUrl { .. }
                | Self::WebSocket(_)
        )
    }
}

// ============================================================================
// Durations
// ============================================================================

/// Whole milliseconds of `duration`, saturating at `u64::MAX`.
#[inline]
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::connection("refused");
        assert_eq!(err.to_string(), "Connection failed: refused");
    }

    #[test]
    fn test_goal_in_flight_display() {
        let err = Error::goal_in_flight(GoalId::new("abc"));
        assert_eq!(err.to_string(), "Navigation goal abc is still in flight");
    }

    #[test]
    fn test_invalid_url_display() {
        let err = Error::invalid_url("http://x", "scheme must be ws or wss");
        assert!(err.to_string().contains("http://x"));
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn test_is_timeout() {
        assert!(Error::idle_timeout(5000).is_timeout());
        assert!(Error::timeout("goal", 10).is_timeout());
        assert!(!Error::connection("test").is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        assert!(Error::connection("test").is_connection_error());
        assert!(Error::ConnectionClosed.is_connection_error());
        assert!(Error::idle_timeout(1).is_connection_error());
        assert!(!Error::NotConnected.is_connection_error());
        assert!(!Error::config("test").is_connection_error());
    }

    #[test]
    fn test_duration_ms() {
        assert_eq!(duration_ms(Duration::from_millis(2500)), 2500);
        assert_eq!(duration_ms(Duration::from_micros(1999)), 1);
    }

    #[test]
    fn test_duration_ms_saturates() {
        assert_eq!(duration_ms(Duration::MAX), u64::MAX);
        let err = Error::timeout("leg", duration_ms(Duration::MAX));
        assert!(err.to_string().contains(&u64::MAX.to_string()));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
