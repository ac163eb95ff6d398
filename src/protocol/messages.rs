//! Typed ROS2 message payloads.
//!
//! Only the messages this client produces or consumes are modelled. Field
//! names follow the ROS2 interface definitions so the structures serialize
//! straight into rosbridge `msg` / `args` objects.

// ============================================================================
// Imports
// ============================================================================

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Number of entries in a 6x6 pose covariance matrix.
pub const COVARIANCE_LEN: usize = 36;

/// Default x/y variance of the initial pose estimate (m^2).
pub const DEFAULT_POSITIONAL_VARIANCE: f64 = 0.25;

/// Default yaw variance of the initial pose estimate (rad^2).
pub const DEFAULT_ORIENTATION_VARIANCE: f64 = 0.068_538_919_452_009_42;

/// Roll and pitch variance of the initial pose estimate.
const PLANAR_AXIS_VARIANCE: f64 = 0.0001;

// ============================================================================
// builtin_interfaces / std_msgs
// ============================================================================

/// `builtin_interfaces/Time`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Time {
    /// Seconds since the Unix epoch.
    pub sec: i64,
    /// Nanoseconds within the second.
    pub nanosec: u32,
}

impl Time {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        Self {
            sec: elapsed.as_secs() as i64,
            nanosec: elapsed.subsec_nanos(),
        }
    }
}

/// `std_msgs/Header`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Acquisition time.
    pub stamp: Time,
    /// Coordinate frame the data is expressed in.
    pub frame_id: String,
}

impl Header {
    /// Header stamped with the current time.
    #[must_use]
    pub fn now(frame_id: impl Into<String>) -> Self {
        Self {
            stamp: Time::now(),
            frame_id: frame_id.into(),
        }
    }
}

// ============================================================================
// geometry_msgs
// ============================================================================

/// `geometry_msgs/Point`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// `geometry_msgs/Vector3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// `geometry_msgs/Quaternion`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::from_yaw(0.0)
    }
}

impl Quaternion {
    /// Planar rotation about the vertical axis.
    ///
    /// Only `z` and `w` are non-zero: `z = sin(yaw/2)`, `w = cos(yaw/2)`.
    #[inline]
    #[must_use]
    pub fn from_yaw(yaw: f64) -> Self {
        let half = yaw / 2.0;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }

    /// Yaw of a planar quaternion.
    ///
    /// `(z, w)` is normalized first; a zero-length pair yields `0.0`.
    #[inline]
    #[must_use]
    pub fn yaw(&self) -> f64 {
        yaw_from_zw(self.z, self.w)
    }
}

/// Yaw from the `z`/`w` components of a planar quaternion.
#[must_use]
pub fn yaw_from_zw(z: f64, w: f64) -> f64 {
    let norm = z.hypot(w);
    if norm == 0.0 || !norm.is_finite() {
        return 0.0;
    }
    2.0 * (z / norm).atan2(w / norm)
}

/// `geometry_msgs/Pose`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

impl Pose {
    /// Planar pose at `(x, y, z)` facing `yaw`.
    #[inline]
    #[must_use]
    pub fn planar(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            position: Point { x, y, z },
            orientation: Quaternion::from_yaw(yaw),
        }
    }
}

/// `geometry_msgs/PoseStamped`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
}

/// `geometry_msgs/PoseWithCovariance`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseWithCovariance {
    pub pose: Pose,
    /// Row-major 6x6 matrix over (x, y, z, roll, pitch, yaw).
    pub covariance: Vec<f64>,
}

/// `geometry_msgs/PoseWithCovarianceStamped`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseWithCovarianceStamped {
    pub header: Header,
    pub pose: PoseWithCovariance,
}

/// `geometry_msgs/Twist`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    pub linear: Vector3,
    pub angular: Vector3,
}

impl Twist {
    /// Velocity command for a differential-drive base.
    #[inline]
    #[must_use]
    pub fn planar(linear_x: f64, angular_z: f64) -> Self {
        Self {
            linear: Vector3 {
                x: linear_x,
                ..Vector3::default()
            },
            angular: Vector3 {
                z: angular_z,
                ..Vector3::default()
            },
        }
    }
}

// ============================================================================
// Covariance
// ============================================================================

/// Variances used for the fixed initial-pose covariance matrix.
///
/// The matrix is a constant. It does not reflect live localization
/// confidence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CovarianceConfig {
    /// Variance on the x and y diagonal entries.
    pub positional_variance: f64,
    /// Variance on the yaw diagonal entry.
    pub orientation_variance: f64,
}

impl Default for CovarianceConfig {
    fn default() -> Self {
        Self {
            positional_variance: DEFAULT_POSITIONAL_VARIANCE,
            orientation_variance: DEFAULT_ORIENTATION_VARIANCE,
        }
    }
}

impl CovarianceConfig {
    /// Builds the row-major 6x6 matrix.
    ///
    /// Off-diagonal entries are zero; z carries no variance.
    #[must_use]
    pub fn matrix(&self) -> [f64; COVARIANCE_LEN] {
        let mut matrix = [0.0; COVARIANCE_LEN];
        matrix[0] = self.positional_variance;
        matrix[7] = self.positional_variance;
        matrix[21] = PLANAR_AXIS_VARIANCE;
        matrix[28] = PLANAR_AXIS_VARIANCE;
        matrix[35] = self.orientation_variance;
        matrix
    }
}

// ============================================================================
// nav2_msgs / action_msgs
// ============================================================================

/// Goal payload of `nav2_msgs/action/NavigateToPose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigateToPoseGoal {
    pub pose: PoseStamped,
}

/// `unique_identifier_msgs/UUID`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidMsg {
    pub uuid: [u8; 16],
}

/// `action_msgs/GoalInfo`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GoalInfo {
    pub goal_id: UuidMsg,
    pub stamp: Time,
}

/// Request of the `action_msgs/CancelGoal` service.
///
/// An all-zero uuid with a zero stamp cancels every goal on the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelGoalRequest {
    pub goal_info: GoalInfo,
}

impl CancelGoalRequest {
    /// Cancels the goal with the given UUID bytes.
    #[inline]
    #[must_use]
    pub fn for_goal(uuid: [u8; 16]) -> Self {
        Self {
            goal_info: GoalInfo {
                goal_id: UuidMsg { uuid },
                stamp: Time::default(),
            },
        }
    }

    /// Cancels all goals.
    #[inline]
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_quaternion_from_yaw_is_planar() {
        let q = Quaternion::from_yaw(FRAC_PI_2);
        assert_eq!(q.x, 0.0);
        assert_eq!(q.y, 0.0);
        assert!((q.z - (FRAC_PI_2 / 2.0).sin()).abs() < 1e-12);
        assert!((q.w - (FRAC_PI_2 / 2.0).cos()).abs() < 1e-12);
    }

    #[test]
    fn test_yaw_from_unnormalized_quaternion() {
        // Scaled (z, w) must give the same angle.
        let q = Quaternion::from_yaw(1.2);
        assert!((yaw_from_zw(q.z * 3.0, q.w * 3.0) - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_yaw_from_zero_quaternion() {
        assert_eq!(yaw_from_zw(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_yaw_at_pi() {
        let q = Quaternion::from_yaw(PI);
        assert!((q.yaw().abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_default_covariance_matrix() {
        let matrix = CovarianceConfig::default().matrix();
        assert_eq!(matrix.len(), 36);
        assert_eq!(matrix[0], 0.25);
        assert_eq!(matrix[7], 0.25);
        assert_eq!(matrix[35], 0.06853891945200942);

        for (i, value) in matrix.iter().enumerate() {
            let (row, col) = (i / 6, i % 6);
            if row != col {
                assert_eq!(*value, 0.0, "off-diagonal ({row},{col}) must be zero");
            }
        }
    }

    #[test]
    fn test_custom_covariance() {
        let config = CovarianceConfig {
            positional_variance: 1.0,
            orientation_variance: 0.5,
        };
        let matrix = config.matrix();
        assert_eq!(matrix[0], 1.0);
        assert_eq!(matrix[35], 0.5);
    }

    #[test]
    fn test_twist_planar_serialization() {
        let json = serde_json::to_value(Twist::planar(0.5, -0.2)).expect("serialize");
        assert_eq!(json["linear"]["x"], 0.5);
        assert_eq!(json["linear"]["y"], 0.0);
        assert_eq!(json["angular"]["z"], -0.2);
    }

    #[test]
    fn test_cancel_all_is_zero_uuid() {
        let json = serde_json::to_value(CancelGoalRequest::all()).expect("serialize");
        let uuid = json["goal_info"]["goal_id"]["uuid"]
            .as_array()
            .expect("uuid array");
        assert_eq!(uuid.len(), 16);
        assert!(uuid.iter().all(|b| b == 0));
    }

    #[test]
    fn test_time_now_is_after_epoch() {
        let now = Time::now();
        assert!(now.sec > 0);
        assert!(now.nanosec < 1_000_000_000);
    }
}
