//! Navigation goal state machine.
//!
//! Tracks the one outstanding navigation goal from the status arrays the
//! navigation stack publishes.
//!
//! # Transitions
//!
//! | Code | From | To | Id rule |
//! |------|------|----|---------|
//! | 1 | Unknown | Accepted | adopts the reported id |
//! | 2 | any | Executing | always replaces the active id |
//! | 3 | Executing | Canceling | must match |
//! | 4 | Executing, Canceling | Succeeded | must match, then cleared |
//! | 5 | Executing, Canceling | CanceledByUser | must match, then cleared |
//! | 6 | Executing | Failed | must match, then cleared |
//!
//! Any other combination leaves the state unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::identifiers::GoalId;
use crate::protocol::GoalStatusEntry;

// ============================================================================
// GoalStatus
// ============================================================================

/// Lifecycle status of a navigation goal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GoalStatus {
    /// Nothing reported yet.
    #[default]
    Unknown,
    /// Accepted by the action server (code 1).
    Accepted,
    /// Running (code 2).
    Executing,
    /// Cancel requested (code 3).
    Canceling,
    /// Reached the target (code 4).
    Succeeded,
    /// Canceled (code 5).
    CanceledByUser,
    /// Aborted (code 6).
    Failed,
}

impl GoalStatus {
    /// Maps an `action_msgs/GoalStatus` code.
    ///
    /// Code 0 (unknown) and out-of-range codes map to `None`.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Accepted),
            2 => Some(Self::Executing),
            3 => Some(Self::Canceling),
            4 => Some(Self::Succeeded),
            5 => Some(Self::CanceledByUser),
            6 => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns `true` for Executing and Canceling.
    #[inline]
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Executing | Self::Canceling)
    }

    /// Returns `true` for Succeeded, CanceledByUser and Failed.
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::CanceledByUser | Self::Failed)
    }
}

impl fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Accepted => "accepted",
            Self::Executing => "executing",
            Self::Canceling => "canceling",
            Self::Succeeded => "succeeded",
            Self::CanceledByUser => "canceled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// GoalSnapshot
// ============================================================================

/// Consistent view of the tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalSnapshot {
    /// Active goal id; `None` when idle or after a terminal status.
    pub id: Option<GoalId>,
    /// Current status.
    pub status: GoalStatus,
    /// Incremented on every change.
    pub revision: u64,
}

impl GoalSnapshot {
    /// Returns `true` while a goal is executing or being canceled.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.status.is_busy()
    }

    /// Returns `true` while an id is tracked.
    #[inline]
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.id.is_some()
    }
}

// ============================================================================
// GoalTracker
// ============================================================================

/// State machine over the active navigation goal.
///
/// Readers on any task see whole snapshots; the state lives in a watch
/// channel so waiters can also be woken on change.
#[derive(Debug)]
pub struct GoalTracker {
    state: watch::Sender<GoalSnapshot>,
}

impl Default for GoalTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalTracker {
    /// Creates an idle tracker.
    #[must_use]
    pub fn new() -> Self {
        let (state, _) = watch::channel(GoalSnapshot::default());
        Self { state }
    }

    /// Returns a copy of the current state.
    #[inline]
    #[must_use]
    pub fn snapshot(&self) -> GoalSnapshot {
        self.state.borrow().clone()
    }

    /// Returns `true` while a goal is executing or being canceled.
    #[inline]
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Returns `true` while an id is tracked.
    #[inline]
    #[must_use]
    pub fn is_tracking(&self) -> bool {
        self.state.borrow().is_tracking()
    }

    /// Returns the active goal id.
    #[inline]
    #[must_use]
    pub fn active_id(&self) -> Option<GoalId> {
        self.state.borrow().id.clone()
    }

    /// Returns the active goal id once the server has reported it.
    ///
    /// A goal recorded by [`Self::begin`] is only known to this client until
    /// a status entry for it arrives.
    #[must_use]
    pub fn reported_id(&self) -> Option<GoalId> {
        let state = self.state.borrow();
        match state.status {
            GoalStatus::Unknown => None,
            _ => state.id.clone(),
        }
    }

    /// Returns the current status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> GoalStatus {
        self.state.borrow().status
    }

    /// Subscribes to state changes.
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<GoalSnapshot> {
        self.state.subscribe()
    }

    /// Records a goal this client is about to send.
    ///
    /// The goal starts in [`GoalStatus::Unknown`] and is not busy until the
    /// server reports it executing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GoalInFlight`] without changing anything if a goal
    /// is executing or being canceled.
    pub fn begin(&self, id: GoalId) -> Result<GoalSnapshot> {
        let mut rejected = None;
        self.state.send_if_modified(|state| {
            if state.is_busy() {
                rejected = state.id.clone();
                return false;
            }
            state.id = Some(id.clone());
            state.status = GoalStatus::Unknown;
            state.revision += 1;
            true
        });

        match rejected {
            Some(active) => Err(Error::goal_in_flight(active)),
            None => {
                debug!(goal = %id, "Goal pending");
                Ok(self.snapshot())
            }
        }
    }

    /// Applies one status entry.
    ///
    /// Returns the new snapshot if the state changed.
    pub fn apply(&self, entry: &GoalStatusEntry) -> Option<GoalSnapshot> {
        let Some(reported) = GoalStatus::from_code(entry.code) else {
            trace!(goal = %entry.goal_id, code = entry.code, "Ignoring status code");
            return None;
        };

        let changed = self
            .state
            .send_if_modified(|state| transition(state, &entry.goal_id, reported));

        if changed {
            let snapshot = self.snapshot();
            debug!(goal = %entry.goal_id, status = %snapshot.status, "Goal status changed");
            Some(snapshot)
        } else {
            None
        }
    }

    /// Applies a status array in order.
    ///
    /// Returns every intermediate snapshot that differed from its
    /// predecessor.
    pub fn apply_all(&self, entries: &[GoalStatusEntry]) -> Vec<GoalSnapshot> {
        entries.iter().filter_map(|entry| self.apply(entry)).collect()
    }

    /// Drops a goal recorded by [`Self::begin`] that was never sent.
    ///
    /// Does nothing once a status for any goal has been applied after
    /// `begin`. Returns `true` if the goal was dropped.
    pub fn abandon(&self, id: &GoalId) -> bool {
        let dropped = self.state.send_if_modified(|state| {
            if state.status != GoalStatus::Unknown || state.id.as_ref() != Some(id) {
                return false;
            }
            state.id = None;
            state.revision += 1;
            true
        });
        if dropped {
            debug!(goal = %id, "Pending goal abandoned");
        }
        dropped
    }

    /// Forgets the tracked goal.
    pub fn reset(&self) {
        self.state.send_if_modified(|state| {
            if state.id.is_none() && state.status == GoalStatus::Unknown {
                return false;
            }
            state.id = None;
            state.status = GoalStatus::Unknown;
            state.revision += 1;
            true
        });
    }
}

/// Applies one reported status. Returns `true` if `state` changed.
fn transition(state: &mut GoalSnapshot, id: &GoalId, reported: GoalStatus) -> bool {
    let matches = state.id.as_ref() == Some(id);

    let next = match (state.status, reported) {
        (GoalStatus::Unknown, GoalStatus::Accepted) => {
            state.id = Some(id.clone());
            GoalStatus::Accepted
        }

        (current, GoalStatus::Executing) => {
            if matches && current == GoalStatus::Executing {
                return false;
            }
            if !matches {
                // Replaces whatever goal was tracked, even an unrelated one.
                trace!(goal = %id, previous = ?state.id, "Executing goal takes over");
            }
            state.id = Some(id.clone());
            GoalStatus::Executing
        }

        (GoalStatus::Executing, GoalStatus::Canceling) if matches => GoalStatus::Canceling,

        (GoalStatus::Executing | GoalStatus::Canceling, GoalStatus::Succeeded | GoalStatus::CanceledByUser)
            if matches =>
        {
            state.id = None;
            reported
        }

        (GoalStatus::Executing, GoalStatus::Failed) if matches => {
            state.id = None;
            GoalStatus::Failed
        }

        _ => {
            if !matches {
                trace!(goal = %id, status = %reported, "Status for untracked goal");
            }
            return false;
        }
    };

    state.status = next;
    state.revision += 1;
    true
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(tracker: &GoalTracker, events: &[(&str, u8)]) {
        for (id, code) in events {
            tracker.apply(&GoalStatusEntry::new(*id, *code));
        }
    }

    #[test]
    fn test_accept_execute_succeed() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 1), ("A", 2), ("A", 4)]);

        assert_eq!(tracker.status(), GoalStatus::Succeeded);
        assert_eq!(tracker.active_id(), None);
        assert!(!tracker.is_busy());
    }

    #[test]
    fn test_executing_overwrites_active_id() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2), ("B", 2), ("A", 4)]);

        assert_eq!(tracker.status(), GoalStatus::Executing);
        assert_eq!(tracker.active_id(), Some(GoalId::new("B")));
        assert!(tracker.is_busy());
    }

    #[test]
    fn test_busy_only_between_execute_and_terminal() {
        let tracker = GoalTracker::new();
        assert!(!tracker.is_busy());

        feed(&tracker, &[("A", 1)]);
        assert!(!tracker.is_busy());

        feed(&tracker, &[("A", 2)]);
        assert!(tracker.is_busy());

        feed(&tracker, &[("A", 6)]);
        assert!(!tracker.is_busy());
        assert_eq!(tracker.status(), GoalStatus::Failed);
    }

    #[test]
    fn test_cancel_sequence() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2), ("A", 3)]);
        assert_eq!(tracker.status(), GoalStatus::Canceling);
        assert!(tracker.is_busy());

        feed(&tracker, &[("A", 5)]);
        assert_eq!(tracker.status(), GoalStatus::CanceledByUser);
        assert!(!tracker.is_tracking());
    }

    #[test]
    fn test_non_matching_ids_are_ignored() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2), ("B", 3), ("B", 4), ("B", 6)]);

        assert_eq!(tracker.status(), GoalStatus::Executing);
        assert_eq!(tracker.active_id(), Some(GoalId::new("A")));
    }

    #[test]
    fn test_failed_not_reachable_from_canceling() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2), ("A", 3), ("A", 6)]);
        assert_eq!(tracker.status(), GoalStatus::Canceling);
    }

    #[test]
    fn test_unknown_codes_ignored() {
        let tracker = GoalTracker::new();
        assert!(tracker.apply(&GoalStatusEntry::new("A", 0)).is_none());
        assert!(tracker.apply(&GoalStatusEntry::new("A", 9)).is_none());
        assert_eq!(tracker.snapshot(), GoalSnapshot::default());
    }

    #[test]
    fn test_repeated_status_is_not_a_change() {
        let tracker = GoalTracker::new();
        assert!(tracker.apply(&GoalStatusEntry::new("A", 2)).is_some());
        assert!(tracker.apply(&GoalStatusEntry::new("A", 2)).is_none());
        assert_eq!(tracker.snapshot().revision, 1);
    }

    #[test]
    fn test_begin_rejects_while_busy() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2)]);

        let err = tracker.begin(GoalId::new("B")).unwrap_err();
        assert!(matches!(err, Error::GoalInFlight { ref active } if active.as_str() == "A"));
        assert_eq!(tracker.active_id(), Some(GoalId::new("A")));
    }

    #[test]
    fn test_begin_then_server_uuid_adopted() {
        let tracker = GoalTracker::new();
        let snapshot = tracker.begin(GoalId::new("client")).expect("idle");
        assert_eq!(snapshot.status, GoalStatus::Unknown);
        assert!(!snapshot.is_busy());
        assert!(snapshot.is_tracking());

        feed(&tracker, &[("server", 1), ("server", 2)]);
        assert_eq!(tracker.active_id(), Some(GoalId::new("server")));
        assert!(tracker.is_busy());
    }

    #[test]
    fn test_apply_all_reports_changes() {
        let tracker = GoalTracker::new();
        let changes = tracker.apply_all(&[
            GoalStatusEntry::new("A", 1),
            GoalStatusEntry::new("X", 4),
            GoalStatusEntry::new("A", 2),
        ]);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[1].status, GoalStatus::Executing);
    }

    #[tokio::test]
    async fn test_subscribe_sees_terminal_status() {
        let tracker = GoalTracker::new();
        let mut rx = tracker.subscribe();
        feed(&tracker, &[("A", 2), ("A", 4)]);

        let snapshot = rx
            .wait_for(|s| s.status.is_terminal())
            .await
            .expect("sender alive")
            .clone();
        assert_eq!(snapshot.status, GoalStatus::Succeeded);
    }

    #[test]
    fn test_abandon_drops_unsent_goal() {
        let tracker = GoalTracker::new();
        let id = GoalId::new("client-1");
        tracker.begin(id.clone()).expect("idle");
        assert!(tracker.is_tracking());

        assert!(tracker.abandon(&id));
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.status(), GoalStatus::Unknown);
        assert!(!tracker.abandon(&id));
    }

    #[test]
    fn test_abandon_keeps_reported_goal() {
        let tracker = GoalTracker::new();
        let id = GoalId::new("client-1");
        tracker.begin(id.clone()).expect("idle");
        feed(&tracker, &[("server-1", 1)]);

        assert!(!tracker.abandon(&id));
        assert!(!tracker.abandon(&GoalId::new("server-1")));
        assert_eq!(tracker.active_id(), Some(GoalId::new("server-1")));
    }

    #[test]
    fn test_reported_id_requires_server_status() {
        let tracker = GoalTracker::new();
        tracker.begin(GoalId::new("client-1")).expect("idle");
        assert_eq!(tracker.active_id(), Some(GoalId::new("client-1")));
        assert!(tracker.reported_id().is_none());

        feed(&tracker, &[("server-1", 2)]);
        assert_eq!(tracker.reported_id(), Some(GoalId::new("server-1")));

        feed(&tracker, &[("server-1", 4)]);
        assert!(tracker.reported_id().is_none());
    }

    #[test]
    fn test_reset() {
        let tracker = GoalTracker::new();
        feed(&tracker, &[("A", 2)]);
        tracker.reset();
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.status(), GoalStatus::Unknown);
    }
}
