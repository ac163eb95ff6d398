//! Robot command surface.
//!
//! Typed operations built on [`ConnectionManager::send`]. Motion and pose
//! commands are fire-and-forget: while disconnected they are logged and
//! dropped. Goal-sending commands return a [`Result`] so a refused goal is
//! visible to the caller.
//!
//! | Method | Wire operation |
//! |--------|----------------|
//! | [`move_command`](ConnectionManager::move_command) | publish `/cmd_vel` |
//! | [`set_initial_pose`](ConnectionManager::set_initial_pose) | publish `/initialpose` |
//! | [`send_goal_pose`](ConnectionManager::send_goal_pose) | publish `/goal_pose` |
//! | [`send_navigate_to_pose`](ConnectionManager::send_navigate_to_pose) | `send_action_goal` |
//! | [`cancel_goal`](ConnectionManager::cancel_goal) | `call_service` cancel |
//! | [`cancel_action_goal`](ConnectionManager::cancel_action_goal) | `cancel_action_goal` |
//! | [`subscribe`](ConnectionManager::subscribe) / [`unsubscribe`](ConnectionManager::unsubscribe) | `subscribe` / `unsubscribe` |

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::identifiers::GoalId;
use crate::protocol::messages::{CancelGoalRequest, Point, Pose, Quaternion};
use crate::protocol::{OutgoingOperation, known_topic_type};

use super::core::ConnectionManager;

// ============================================================================
// Motion and Localization
// ============================================================================

impl ConnectionManager {
    /// Publishes a velocity command on `/cmd_vel`.
    ///
    /// # Arguments
    ///
    /// * `linear_x` - Forward speed (m/s)
    /// * `angular_z` - Turn rate (rad/s)
    pub fn move_command(&self, linear_x: f64, angular_z: f64) {
        self.send(OutgoingOperation::move_command(linear_x, angular_z));
    }

    /// Publishes an initial pose estimate at `(x, y)` facing `yaw`.
    pub fn set_initial_pose(&self, x: f64, y: f64, yaw: f64) {
        let options = self.options();
        self.send(OutgoingOperation::initial_pose(
            &options.frame_id,
            Pose::planar(x, y, 0.0, yaw),
            &options.covariance,
        ));
    }

    /// Publishes an initial pose estimate from raw quaternion components.
    pub fn send_initial_pose_quaternion(&self, x: f64, y: f64, z: f64, qz: f64, qw: f64) {
        let options = self.options();
        let pose = Pose {
            position: Point { x, y, z },
            orientation: Quaternion {
                x: 0.0,
                y: 0.0,
                z: qz,
                w: qw,
            },
        };
        self.send(OutgoingOperation::initial_pose(
            &options.frame_id,
            pose,
            &options.covariance,
        ));
    }

    /// Publishes a message on an arbitrary topic.
    pub fn publish(&self, topic: &str, msg_type: &str, msg: Value) {
        self.send(OutgoingOperation::publish_typed(topic, msg_type, msg));
    }
}

// ============================================================================
// Navigation Goals
// ============================================================================

impl ConnectionManager {
    /// Publishes a goal on `/goal_pose`.
    ///
    /// Returns the locally generated goal id. The tracker adopts the id the
    /// navigation stack reports once the goal is accepted.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not connected
    /// - [`Error::GoalInFlight`] if a goal is executing or being canceled
    ///
    /// Nothing is written in either case.
    pub fn send_goal_pose(&self, x: f64, y: f64, yaw: f64) -> Result<GoalId> {
        let frame_id = &self.options().frame_id;
        self.submit_goal(|_| OutgoingOperation::goal_pose(frame_id, x, y, 0.0, yaw))
    }

    /// Sends a `NavigateToPose` action goal.
    ///
    /// The returned id is the `id` field of the `send_action_goal`
    /// operation and is what [`Self::cancel_action_goal`] cancels.
    ///
    /// # Errors
    ///
    /// - [`Error::NotConnected`] if the session is not connected
    /// - [`Error::GoalInFlight`] if a goal is executing or being canceled
    ///
    /// Nothing is written in either case.
    pub fn send_navigate_to_pose(&self, x: f64, y: f64, yaw: f64) -> Result<GoalId> {
        let options = self.options();
        let id = self.submit_goal(|id| {
            OutgoingOperation::navigate_to_pose(
                &options.navigate_action,
                &options.navigate_action_type,
                &options.frame_id,
                id,
                x,
                y,
                yaw,
            )
        })?;

        *self.inner.last_sent_goal.lock() = Some(id.clone());
        Ok(id)
    }

    /// Checks state, records the goal, then writes the operation.
    fn submit_goal(&self, build: impl FnOnce(GoalId) -> OutgoingOperation) -> Result<GoalId> {
        if !self.is_connected() {
            warn!("Goal refused: not connected");
            return Err(Error::NotConnected);
        }

        let id = GoalId::generate();
        if let Err(e) = self.inner.goals.begin(id.clone()) {
            warn!(error = %e, "Goal refused");
            return Err(e);
        }

        if let Err(e) = self.try_send(&build(id.clone())) {
            self.inner.goals.abandon(&id);
            warn!(goal = %id, error = %e, "Goal not sent");
            return Err(e);
        }
        info!(goal = %id, "Navigation goal sent");
        Ok(id)
    }

    /// Cancels the active goal through the cancel service.
    ///
    /// Sends the goal's UUID once the server has reported it, otherwise the
    /// all-zero UUID, which cancels every goal on the server. A goal that
    /// was sent but not yet reported carries a client id the server does
    /// not know, so it is covered by the all-zero form.
    pub fn cancel_goal(&self) {
        let request = match self.goals().reported_id().and_then(|id| id.uuid_bytes()) {
            Some(uuid) => CancelGoalRequest::for_goal(uuid),
            None => CancelGoalRequest::all(),
        };
        self.send(OutgoingOperation::cancel_goal_service(
            &self.options().cancel_service,
            request,
        ));
    }

    /// Cancels the last goal sent with [`Self::send_navigate_to_pose`].
    ///
    /// Returns `false` if no such goal exists.
    pub fn cancel_action_goal(&self) -> bool {
        let Some(id) = self.inner.last_sent_goal.lock().clone() else {
            debug!("No action goal to cancel");
            return false;
        };
        self.send(OutgoingOperation::cancel_action_goal(
            self.options().navigate_action.clone(),
            id,
        ));
        true
    }
}

// ============================================================================
// Subscriptions
// ============================================================================

impl ConnectionManager {
    /// Subscribes to `topic`.
    ///
    /// The subscription is kept and issued again on every reconnect. When
    /// disconnected it is only recorded.
    pub fn subscribe(&self, topic: &str, msg_type: &str) {
        if !self.inner.register_subscription(topic, msg_type) {
            debug!(%topic, "Already subscribed");
            return;
        }
        if self.is_connected() {
            self.send(OutgoingOperation::subscribe(topic, msg_type));
        } else {
            debug!(%topic, "Subscription recorded for next session");
        }
    }

    /// Subscribes to a well-known topic using its standard type.
    ///
    /// Returns `false` for topics without a known type.
    pub fn subscribe_known(&self, topic: &str) -> bool {
        match known_topic_type(topic) {
            Some(msg_type) => {
                self.subscribe(topic, msg_type);
                true
            }
            None => false,
        }
    }

    /// Stops a subscription.
    pub fn unsubscribe(&self, topic: &str) {
        if !self.inner.remove_subscription(topic) {
            debug!(%topic, "Not subscribed");
            return;
        }
        if self.is_connected() {
            self.send(OutgoingOperation::unsubscribe(topic));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
