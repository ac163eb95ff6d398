//! Connection manager settings.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use rosbridge_client::ManagerOptions;
//!
//! let options = ManagerOptions::new()
//!     .with_frame_id("map")
//!     .with_idle_timeout(Duration::from_secs(15))
//!     .with_subscription("/scan", "sensor_msgs/LaserScan");
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::protocol::{CovarianceConfig, msg_types, topics};
use crate::transport::{ReconnectPolicy, SessionConfig};
use crate::transport::connection::DEFAULT_CONNECT_TIMEOUT;

// ============================================================================
// Constants
// ============================================================================

/// Default map frame.
pub const DEFAULT_FRAME_ID: &str = "map";

/// Default navigation action.
pub const DEFAULT_NAVIGATE_ACTION: &str = "/navigate_to_pose";

/// Default goal cancel service.
pub const DEFAULT_CANCEL_SERVICE: &str = "/cancel_goal";

// ============================================================================
// ManagerOptions
// ============================================================================

/// Settings for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerOptions {
    /// Reconnect backoff.
    pub reconnect: ReconnectPolicy,

    /// Initial pose covariance.
    pub covariance: CovarianceConfig,

    /// Frame id stamped on outgoing poses.
    pub frame_id: String,

    /// Navigation action name.
    pub navigate_action: String,

    /// Navigation action type.
    pub navigate_action_type: String,

    /// `action_msgs/CancelGoal` service name.
    pub cancel_service: String,

    /// WebSocket handshake limit.
    pub connect_timeout: Duration,

    /// Idle watchdog; disabled when `None`.
    pub idle_timeout: Option<Duration>,

    /// Subscriptions registered at build time, as `(topic, type)`.
    pub subscriptions: Vec<(String, String)>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl ManagerOptions {
    /// Default settings.
    ///
    /// Robot pose and navigation status are subscribed by default; goal
    /// tracking and the position cache depend on them.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            covariance: CovarianceConfig::default(),
            frame_id: DEFAULT_FRAME_ID.to_string(),
            navigate_action: DEFAULT_NAVIGATE_ACTION.to_string(),
            navigate_action_type: msg_types::NAVIGATE_TO_POSE.to_string(),
            cancel_service: DEFAULT_CANCEL_SERVICE.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: None,
            subscriptions: vec![
                (topics::ROBOT_POSE.to_string(), msg_types::POSE_STAMPED.to_string()),
                (
                    topics::NAVIGATE_TO_POSE_STATUS.to_string(),
                    msg_types::GOAL_STATUS_ARRAY.to_string(),
                ),
            ],
        }
    }

    /// Transport settings derived from these options.
    #[inline]
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            connect_timeout: self.connect_timeout,
            idle_timeout: self.idle_timeout,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl ManagerOptions {
    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn with_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.reconnect = policy;
        self
    }

    /// Sets the initial pose covariance.
    #[inline]
    #[must_use]
    pub fn with_covariance(mut self, covariance: CovarianceConfig) -> Self {
        self.covariance = covariance;
        self
    }

    /// Sets the frame id for outgoing poses.
    #[inline]
    #[must_use]
    pub fn with_frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.frame_id = frame_id.into();
        self
    }

    /// Sets the navigation action name and type.
    #[inline]
    #[must_use]
    pub fn with_navigate_action(
        mut self,
        action: impl Into<String>,
        action_type: impl Into<String>,
    ) -> Self {
        self.navigate_action = action.into();
        self.navigate_action_type = action_type.into();
        self
    }

    /// Sets the cancel service name.
    #[inline]
    #[must_use]
    pub fn with_cancel_service(mut self, service: impl Into<String>) -> Self {
        self.cancel_service = service.into();
        self
    }

    /// Sets the WebSocket handshake limit.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Enables the idle watchdog.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Adds a subscription registered at build time.
    #[inline]
    #[must_use]
    pub fn with_subscription(mut self, topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        self.subscriptions.push((topic.into(), msg_type.into()));
        self
    }

    /// Drops all build-time subscriptions, including the defaults.
    #[inline]
    #[must_use]
    pub fn without_subscriptions(mut self) -> Self {
        self.subscriptions.clear();
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ManagerOptions::new();
        assert_eq!(options.frame_id, "map");
        assert_eq!(options.navigate_action, "/navigate_to_pose");
        assert_eq!(options.navigate_action_type, "nav2_msgs/action/NavigateToPose");
        assert_eq!(options.cancel_service, "/cancel_goal");
        assert_eq!(options.reconnect, ReconnectPolicy::default());
        assert!(options.idle_timeout.is_none());
        assert_eq!(options.subscriptions.len(), 2);
    }

    #[test]
    fn test_builder_methods() {
        let options = ManagerOptions::new()
            .without_subscriptions()
            .with_subscription("/scan", "sensor_msgs/LaserScan")
            .with_frame_id("odom")
            .with_idle_timeout(Duration::from_secs(3));

        assert_eq!(
            options.subscriptions,
            vec![("/scan".to_string(), "sensor_msgs/LaserScan".to_string())]
        );
        assert_eq!(options.frame_id, "odom");
        assert_eq!(
            options.session_config().idle_timeout,
            Some(Duration::from_secs(3))
        );
    }
}
