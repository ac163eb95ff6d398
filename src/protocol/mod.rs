//! rosbridge v2 JSON protocol.
//!
//! Pure encoding and decoding between typed operations and the text frames
//! exchanged with a rosbridge server. Nothing in this module touches the
//! network.
//!
//! # Protocol Overview
//!
//! | Direction | Type | Purpose |
//! |-----------|------|---------|
//! | Client → Server | [`OutgoingOperation`] | publish, subscribe, service call, action goal |
//! | Server → Client | [`IncomingFrame`] | topic telemetry, service and action replies |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `frame` | Inbound frame classification |
//! | `messages` | Typed ROS2 message payloads |
//! | `operation` | Outbound operations and builders |

// ============================================================================
// Submodules
// ============================================================================

/// Inbound frame classification.
pub mod frame;

/// Typed ROS2 message payloads.
pub mod messages;

/// Outbound operations.
pub mod operation;

// ============================================================================
// Re-exports
// ============================================================================

pub use frame::{
    CellState, GoalStatusEntry, IncomingFrame, LaserScan, MapInfo, OCCUPIED_THRESHOLD,
    OccupancyGrid, RobotPose,
};
pub use messages::{CovarianceConfig, Pose, Quaternion, Twist, yaw_from_zw};
pub use operation::OutgoingOperation;

use crate::error::Result;

// ============================================================================
// Topic Names
// ============================================================================

/// Well-known topic names.
pub mod topics {
    /// Velocity commands.
    pub const CMD_VEL: &str = "/cmd_vel";
    /// Simple goal publication.
    pub const GOAL_POSE: &str = "/goal_pose";
    /// Initial pose estimate for localization.
    pub const INITIAL_POSE: &str = "/initialpose";
    /// Robot pose telemetry.
    pub const ROBOT_POSE: &str = "/robot_pose";
    /// Navigation action status.
    pub const NAVIGATE_TO_POSE_STATUS: &str = "/navigate_to_pose/_action/status";
    /// Occupancy grid.
    pub const MAP: &str = "/map";
    /// Laser scan.
    pub const SCAN: &str = "/scan";
}

// ============================================================================
// Message Types
// ============================================================================

/// ROS2 interface type names.
pub mod msg_types {
    pub const POSE: &str = "geometry_msgs/Pose";
    pub const POSE_STAMPED: &str = "geometry_msgs/PoseStamped";
    pub const POSE_WITH_COVARIANCE_STAMPED: &str = "geometry_msgs/PoseWithCovarianceStamped";
    pub const TWIST: &str = "geometry_msgs/Twist";
    pub const GOAL_STATUS_ARRAY: &str = "action_msgs/GoalStatusArray";
    pub const CANCEL_GOAL: &str = "action_msgs/CancelGoal";
    pub const OCCUPANCY_GRID: &str = "nav_msgs/OccupancyGrid";
    pub const LASER_SCAN: &str = "sensor_msgs/LaserScan";
    pub const NAVIGATE_TO_POSE: &str = "nav2_msgs/action/NavigateToPose";
}

// ============================================================================
// Codec
// ============================================================================

/// Encodes an operation as rosbridge JSON text.
#[inline]
#[must_use]
pub fn encode(op: &OutgoingOperation) -> String {
    op.encode()
}

/// Decodes rosbridge JSON text.
///
/// # Errors
///
/// Returns [`Error::MalformedFrame`](crate::Error::MalformedFrame) for text
/// that is not a JSON object or carries no `topic`.
#[inline]
pub fn decode(text: &str) -> Result<IncomingFrame> {
    IncomingFrame::decode(text)
}

/// Subscription type for a well-known topic.
#[must_use]
pub fn known_topic_type(topic: &str) -> Option<&'static str> {
    match topic {
        topics::ROBOT_POSE => Some(msg_types::POSE_STAMPED),
        topics::NAVIGATE_TO_POSE_STATUS => Some(msg_types::GOAL_STATUS_ARRAY),
        topics::MAP => Some(msg_types::OCCUPANCY_GRID),
        topics::SCAN => Some(msg_types::LASER_SCAN),
        topics::CMD_VEL => Some(msg_types::TWIST),
        topics::GOAL_POSE => Some(msg_types::POSE_STAMPED),
        topics::INITIAL_POSE => Some(msg_types::POSE_WITH_COVARIANCE_STAMPED),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
