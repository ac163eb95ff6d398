//! Waypoint patrol.
//!
//! Drives the robot through stored waypoints in `sequence` order, one
//! navigation goal at a time.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use rosbridge_client::{ConnectionManager, InMemoryPositionStore, Patrol, PatrolOptions};
//!
//! # async fn example(manager: ConnectionManager) -> rosbridge_client::Result<()> {
//! let store = InMemoryPositionStore::new();
//! let patrol = Patrol::new(manager, PatrolOptions::new().with_return_to_start());
//! let report = patrol.run(&store).await?;
//! println!("{} of {} legs reached", report.reached(), report.legs.len());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use crate::error::{Error, Result, duration_ms};
use crate::identifiers::GoalId;
use crate::manager::ConnectionManager;
use crate::store::{PositionStore, Waypoint};
use crate::tracking::GoalStatus;

// ============================================================================
// Constants
// ============================================================================

/// Default limit for reaching one waypoint.
pub const DEFAULT_LEG_TIMEOUT: Duration = Duration::from_secs(120);

// ============================================================================
// PatrolOptions
// ============================================================================

/// Patrol settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatrolOptions {
    /// Limit for reaching each waypoint.
    pub leg_timeout: Duration,
    /// Drive back to the first waypoint after the last one.
    pub return_to_start: bool,
    /// Publish the first waypoint as the initial pose before starting.
    pub initialize_pose: bool,
    /// Stop at the first leg that does not succeed.
    pub stop_on_failure: bool,
}

impl Default for PatrolOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl PatrolOptions {
    /// Default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            leg_timeout: DEFAULT_LEG_TIMEOUT,
            return_to_start: false,
            initialize_pose: false,
            stop_on_failure: true,
        }
    }

    /// Sets the per-waypoint limit.
    #[inline]
    #[must_use]
    pub const fn with_leg_timeout(mut self, leg_timeout: Duration) -> Self {
        self.leg_timeout = leg_timeout;
        self
    }

    /// Returns to the first waypoint at the end.
    #[inline]
    #[must_use]
    pub const fn with_return_to_start(mut self) -> Self {
        self.return_to_start = true;
        self
    }

    /// Publishes the first waypoint as the initial pose.
    #[inline]
    #[must_use]
    pub const fn with_initial_pose(mut self) -> Self {
        self.initialize_pose = true;
        self
    }

    /// Keeps going after a failed or canceled leg.
    #[inline]
    #[must_use]
    pub const fn continue_on_failure(mut self) -> Self {
        self.stop_on_failure = false;
        self
    }
}

// ============================================================================
// PatrolReport
// ============================================================================

/// How a leg ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegResult {
    /// The goal succeeded.
    Reached,
    /// The goal was canceled.
    Canceled,
    /// The goal was aborted.
    Failed,
    /// No terminal status within the leg timeout; a cancel was sent.
    TimedOut,
}

impl LegResult {
    fn from_status(status: GoalStatus) -> Self {
        match status {
            GoalStatus::Succeeded => Self::Reached,
            GoalStatus::CanceledByUser => Self::Canceled,
            _ => Self::Failed,
        }
    }
}

/// Outcome of one leg.
#[derive(Debug, Clone, PartialEq)]
pub struct LegOutcome {
    /// Target waypoint.
    pub waypoint: Waypoint,
    /// Goal id returned when the goal was sent.
    pub goal: GoalId,
    /// How the leg ended.
    pub result: LegResult,
}

/// Outcome of a patrol run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatrolReport {
    /// Legs in the order they were driven.
    pub legs: Vec<LegOutcome>,
}

impl PatrolReport {
    /// Number of legs that reached their waypoint.
    #[must_use]
    pub fn reached(&self) -> usize {
        self.legs.iter().filter(|l| l.result == LegResult::Reached).count()
    }

    /// Returns `true` if every leg reached its waypoint.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.legs.iter().all(|l| l.result == LegResult::Reached)
    }
}

// ============================================================================
// Patrol
// ============================================================================

/// Runs waypoint patrols over a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct Patrol {
    manager: ConnectionManager,
    options: PatrolOptions,
}

impl Patrol {
    /// Creates a patrol runner.
    #[inline]
    #[must_use]
    pub fn new(manager: ConnectionManager, options: PatrolOptions) -> Self {
        Self { manager, options }
    }

    /// Patrols every waypoint in `store`, ordered by `sequence`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptyPatrol`] if the store has no waypoints
    /// - Goal refusals from [`ConnectionManager::send_navigate_to_pose`]
    /// - Store errors
    pub async fn run(&self, store: &dyn PositionStore) -> Result<PatrolReport> {
        let waypoints = store.get_all().await?;
        self.run_waypoints(waypoints).await
    }

    /// Patrols the given waypoints, ordered by `sequence`.
    ///
    /// # Errors
    ///
    /// See [`Self::run`].
    pub async fn run_waypoints(&self, mut waypoints: Vec<Waypoint>) -> Result<PatrolReport> {
        if waypoints.is_empty() {
            return Err(Error::EmptyPatrol);
        }
        waypoints.sort_by_key(|w| w.sequence);

        if self.options.return_to_start {
            let home = waypoints[0].clone();
            waypoints.push(home);
        }

        if self.options.initialize_pose {
            let home = &waypoints[0];
            self.manager.set_initial_pose(home.x, home.y, home.yaw);
        }

        info!(legs = waypoints.len(), "Patrol started");
        let mut report = PatrolReport::default();

        for waypoint in waypoints {
            let outcome = self.drive_to(waypoint).await?;
            let result = outcome.result;
            report.legs.push(outcome);

            if result == LegResult::TimedOut || (result != LegResult::Reached && self.options.stop_on_failure) {
                warn!(?result, "Patrol stopped");
                return Ok(report);
            }
        }

        info!(reached = report.reached(), "Patrol finished");
        Ok(report)
    }

    /// Sends one goal and waits for its terminal status.
    async fn drive_to(&self, waypoint: Waypoint) -> Result<LegOutcome> {
        let mut updates = self.manager.goal_updates();
        let start = updates.borrow_and_update().revision;

        let goal = self
            .manager
            .send_navigate_to_pose(waypoint.x, waypoint.y, waypoint.yaw)?;
        info!(name = %waypoint.name, goal = %goal, "Driving to waypoint");

        let finished = timeout(self.options.leg_timeout, async {
            updates
                .wait_for(|s| s.revision > start && s.status.is_terminal())
                .await
                .map(|snapshot| snapshot.status)
        })
        .await;

        let result = match finished {
            Ok(Ok(status)) => LegResult::from_status(status),
            Ok(Err(e)) => return Err(Error::from(e)),
            Err(_) => {
                warn!(
                    name = %waypoint.name,
                    timeout_ms = duration_ms(self.options.leg_timeout),
                    "Waypoint not reached in time"
                );
                self.manager.cancel_goal();
                LegResult::TimedOut
            }
        };

        Ok(LegOutcome {
            waypoint,
            goal,
            result,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::InMemoryPositionStore;

    fn patrol() -> Patrol {
        let manager = ConnectionManager::builder().build().expect("valid defaults");
        Patrol::new(manager, PatrolOptions::new())
    }

    #[tokio::test]
    async fn test_empty_store_is_rejected() {
        let store = InMemoryPositionStore::new();
        let err = patrol().run(&store).await.unwrap_err();
        assert!(matches!(err, Error::EmptyPatrol));
    }

    #[tokio::test]
    async fn test_disconnected_patrol_fails_first_leg() {
        let err = patrol()
            .run_waypoints(vec![Waypoint::new("a", 1.0, 0.0, 0.0, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn test_options_builders() {
        let options = PatrolOptions::new()
            .with_leg_timeout(Duration::from_secs(5))
            .with_return_to_start()
            .with_initial_pose()
            .continue_on_failure();
        assert_eq!(options.leg_timeout, Duration::from_secs(5));
        assert!(options.return_to_start);
        assert!(options.initialize_pose);
        assert!(!options.stop_on_failure);
    }

    #[test]
    fn test_report_counts() {
        let leg = |result| LegOutcome {
            waypoint: Waypoint::new("w", 0.0, 0.0, 0.0, 0),
            goal: GoalId::new("g"),
            result,
        };
        let report = PatrolReport {
            legs: vec![leg(LegResult::Reached), leg(LegResult::Failed)],
        };
        assert_eq!(report.reached(), 1);
        assert!(!report.is_complete());
    }
}
