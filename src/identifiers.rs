//! Type-safe identifiers.
//!
//! Newtype wrappers keep navigation goal ids and transport session ids
//! from being mixed up with plain strings and integers.
//!
//! | Type | Wraps | Source |
//! |------|-------|--------|
//! | [`GoalId`] | `String` | Client-generated UUID or server-reported goal UUID |
//! | [`SessionId`] | `u64` | Monotonic counter, one per transport session |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// GoalId
// ============================================================================

/// Identifier of a navigation goal.
///
/// rosbridge reports ROS2 goal ids as 16-element byte arrays
/// (`unique_identifier_msgs/UUID`); those are rendered in hyphenated UUID
/// form so they compare equal to ids this client generated itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GoalId(String);

impl GoalId {
    /// Wraps an existing id string.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random (v4) goal id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an id from raw UUID bytes.
    #[inline]
    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes).to_string())
    }

    /// Returns the id as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the UUID bytes if the id is a valid UUID.
    #[inline]
    #[must_use]
    pub fn uuid_bytes(&self) -> Option<[u8; 16]> {
        Uuid::parse_str(&self.0).ok().map(|uuid| *uuid.as_bytes())
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GoalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for GoalId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Process-wide counter backing [`SessionId::next`].
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// Identifier of one transport session.
///
/// Every connect or reconnect opens a new session. Events carrying an
/// outdated session id are discarded by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocates the next session id.
    #[inline]
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goal_id_generate_is_uuid() {
        let id = GoalId::generate();
        assert!(id.uuid_bytes().is_some());
        assert_ne!(id, GoalId::generate());
    }

    #[test]
    fn test_goal_id_from_bytes_round_trip() {
        let bytes = [7u8; 16];
        let id = GoalId::from_bytes(bytes);
        assert_eq!(id.uuid_bytes(), Some(bytes));
    }

    #[test]
    fn test_goal_id_opaque_string() {
        let id = GoalId::new("A");
        assert_eq!(id.as_str(), "A");
        assert_eq!(id.uuid_bytes(), None);
        assert_eq!(id.to_string(), "A");
    }

    #[test]
    fn test_session_ids_increase() {
        let a = SessionId::next();
        let b = SessionId::next();
        assert!(b > a);
    }
}
