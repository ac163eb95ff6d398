//! Incoming rosbridge frames.
//!
//! Inbound text is classified by its `op` and `topic` fields into an
//! [`IncomingFrame`]. Topics this client understands are parsed into typed
//! telemetry; anything else is kept as [`IncomingFrame::Generic`] so no
//! message is dropped, only left unclassified.
//!
//! # Recognized Frames
//!
//! | Discriminator | Variant |
//! |---------------|---------|
//! | topic `/robot_pose` | [`IncomingFrame::PoseUpdate`] |
//! | topic `/navigate_to_pose/_action/status` | [`IncomingFrame::GoalStatusUpdate`] |
//! | topic `/map` | [`IncomingFrame::MapUpdate`] |
//! | topic `/scan` | [`IncomingFrame::ScanUpdate`] |
//! | op `service_response` | [`IncomingFrame::ServiceResponse`] |
//! | op `action_feedback` | [`IncomingFrame::ActionFeedback`] |
//! | op `action_result` | [`IncomingFrame::ActionResult`] |
//! | any other topic | [`IncomingFrame::Generic`] |

// ============================================================================
// Imports
// ============================================================================

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map, Value};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::GoalId;

use super::messages::yaw_from_zw;
use super::topics;

// ============================================================================
// Constants
// ============================================================================

/// Occupancy values above this are treated as obstacles.
pub const OCCUPIED_THRESHOLD: i8 = 65;

/// Maximum depth of nested `pose` objects followed when locating a pose.
const MAX_POSE_NESTING: usize = 3;

// ============================================================================
// IncomingFrame
// ============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingFrame {
    /// Robot pose telemetry.
    PoseUpdate(RobotPose),

    /// Navigation action status array, in the order reported.
    GoalStatusUpdate(Vec<GoalStatusEntry>),

    /// Occupancy grid.
    MapUpdate(OccupancyGrid),

    /// Laser scan.
    ScanUpdate(LaserScan),

    /// Reply to a `call_service` operation.
    ServiceResponse {
        /// Service name.
        service: String,
        /// Request id, if the call carried one.
        id: Option<String>,
        /// Whether the service call succeeded.
        result: bool,
        /// Response payload.
        values: Value,
    },

    /// Feedback for a running action goal.
    ActionFeedback {
        /// Action name.
        action: String,
        /// Goal id given in `send_action_goal`.
        id: Option<String>,
        /// Feedback payload.
        values: Value,
    },

    /// Final result of an action goal.
    ActionResult {
        /// Action name.
        action: String,
        /// Goal id given in `send_action_goal`.
        id: Option<String>,
        /// Terminal goal status code, if reported.
        status: Option<u8>,
        /// Whether rosbridge reports success.
        result: bool,
        /// Result payload.
        values: Value,
    },

    /// Any other topic, unclassified.
    Generic {
        /// Topic name.
        topic: String,
        /// Raw `msg` payload.
        msg: Value,
    },
}

impl IncomingFrame {
    /// Decodes rosbridge JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedFrame`] if the text is not a JSON object or
    /// has no usable `topic`. A recognized topic with an unusable payload
    /// decodes to [`IncomingFrame::Generic`].
    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;

        let Value::Object(mut object) = value else {
            return Err(Error::malformed("frame is not a JSON object"));
        };

        match object.get("op").and_then(Value::as_str) {
            Some("service_response") => return Ok(Self::service_response(&mut object)),
            Some("action_feedback") => return Ok(Self::action_feedback(&mut object)),
            Some("action_result") => return Ok(Self::action_result(&mut object)),
            _ => {}
        }

        let topic = match object.remove("topic") {
            Some(Value::String(topic)) if !topic.is_empty() => topic,
            _ => return Err(Error::malformed("missing topic")),
        };
        let msg = object.remove("msg").unwrap_or(Value::Null);

        trace!(topic = %topic, "Decoding frame");

        let parsed = match topic.as_str() {
            topics::ROBOT_POSE => RobotPose::from_msg(&msg).map(Self::PoseUpdate),
            topics::NAVIGATE_TO_POSE_STATUS => {
                GoalStatusEntry::list_from_msg(&msg).map(Self::GoalStatusUpdate)
            }
            topics::MAP => OccupancyGrid::from_msg(&msg).map(Self::MapUpdate),
            topics::SCAN => LaserScan::from_msg(&msg).map(Self::ScanUpdate),
            _ => return Ok(Self::Generic { topic, msg }),
        };

        // A known topic with an unusable payload stays unclassified.
        Ok(parsed.unwrap_or_else(|e| {
            warn!(topic = %topic, error = %e, "Unusable payload, frame left unclassified");
            Self::Generic { topic, msg }
        }))
    }

    /// Short name of the frame kind, for logging.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PoseUpdate(_) => "pose",
            Self::GoalStatusUpdate(_) => "goal_status",
            Self::MapUpdate(_) => "map",
            Self::ScanUpdate(_) => "scan",
            Self::ServiceResponse { .. } => "service_response",
            Self::ActionFeedback { .. } => "action_feedback",
            Self::ActionResult { .. } => "action_result",
            Self::Generic { .. } => "generic",
        }
    }

    fn service_response(object: &mut Map<String, Value>) -> Self {
        Self::ServiceResponse {
            service: take_string(object, "service"),
            id: take_optional_string(object, "id"),
            result: object.get("result").and_then(Value::as_bool).unwrap_or(false),
            values: object.remove("values").unwrap_or(Value::Null),
        }
    }

    fn action_feedback(object: &mut Map<String, Value>) -> Self {
        Self::ActionFeedback {
            action: take_string(object, "action"),
            id: take_optional_string(object, "id"),
            values: object.remove("values").unwrap_or(Value::Null),
        }
    }

    fn action_result(object: &mut Map<String, Value>) -> Self {
        Self::ActionResult {
            action: take_string(object, "action"),
            id: take_optional_string(object, "id"),
            status: object
                .get("status")
                .and_then(Value::as_u64)
                .and_then(|s| u8::try_from(s).ok()),
            result: object.get("result").and_then(Value::as_bool).unwrap_or(false),
            values: object.remove("values").unwrap_or(Value::Null),
        }
    }
}

// ============================================================================
// RobotPose
// ============================================================================

/// Planar robot pose.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RobotPose {
    /// X position in the map frame (m).
    pub x: f64,
    /// Y position in the map frame (m).
    pub y: f64,
    /// Heading (rad).
    pub yaw: f64,
}

impl RobotPose {
    /// Creates a pose.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, yaw: f64) -> Self {
        Self { x, y, yaw }
    }

    /// Parses a pose from a `Pose`, `PoseStamped` or
    /// `PoseWithCovarianceStamped` payload.
    fn from_msg(msg: &Value) -> Result<Self> {
        let pose = find_pose(msg).ok_or_else(|| Error::malformed("pose frame without position"))?;
        let position = &pose["position"];

        let x = position
            .get("x")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::malformed("pose position.x missing"))?;
        let y = position
            .get("y")
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::malformed("pose position.y missing"))?;

        let orientation = pose.get("orientation");
        let z = orientation
            .and_then(|o| o.get("z"))
            .and_then(Value::as_f64)
            .unwrap_or(0.0);
        let w = orientation
            .and_then(|o| o.get("w"))
            .and_then(Value::as_f64)
            .unwrap_or(1.0);

        Ok(Self::new(x, y, yaw_from_zw(z, w)))
    }
}

/// Follows nested `pose` objects until one holding a `position` is found.
fn find_pose(msg: &Value) -> Option<&Value> {
    let mut node = msg;
    for _ in 0..=MAX_POSE_NESTING {
        if node.get("position").is_some() {
            return Some(node);
        }
        node = node.get("pose")?;
    }
    None
}

// ============================================================================
// GoalStatusEntry
// ============================================================================

/// One entry of an `action_msgs/GoalStatusArray`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalStatusEntry {
    /// Goal identifier.
    pub goal_id: GoalId,
    /// Raw status code (0-6).
    pub code: u8,
}

impl GoalStatusEntry {
    /// Creates an entry.
    #[inline]
    #[must_use]
    pub fn new(goal_id: impl Into<GoalId>, code: u8) -> Self {
        Self {
            goal_id: goal_id.into(),
            code,
        }
    }

    /// Parses `msg.status_list[]`.
    ///
    /// Entries without a usable id or status code are skipped.
    fn list_from_msg(msg: &Value) -> Result<Vec<Self>> {
        let list = msg
            .get("status_list")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("status frame without status_list"))?;

        Ok(list.iter().filter_map(Self::from_value).collect())
    }

    fn from_value(entry: &Value) -> Option<Self> {
        let code = entry
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|c| u8::try_from(c).ok())?;
        let uuid = entry.pointer("/goal_info/goal_id/uuid")?;
        let goal_id = parse_goal_uuid(uuid)?;
        Some(Self { goal_id, code })
    }
}

/// Accepts either a 16-element byte array or a string id.
fn parse_goal_uuid(uuid: &Value) -> Option<GoalId> {
    match uuid {
        Value::String(id) => Some(GoalId::new(id.as_str())),
        Value::Array(items) => {
            let mut bytes = [0u8; 16];
            if items.len() != bytes.len() {
                return None;
            }
            for (slot, item) in bytes.iter_mut().zip(items) {
                *slot = u8::try_from(item.as_u64()?).ok()?;
            }
            Some(GoalId::from_bytes(bytes))
        }
        _ => None,
    }
}

// ============================================================================
// OccupancyGrid
// ============================================================================

/// Classification of one occupancy grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    /// Never observed (-1).
    Unknown,
    /// Occupancy at or below the threshold.
    Free,
    /// Occupancy above [`OCCUPIED_THRESHOLD`].
    Occupied,
}

impl CellState {
    /// Classifies a raw occupancy value.
    #[inline]
    #[must_use]
    pub fn from_value(value: i8) -> Self {
        if value < 0 {
            Self::Unknown
        } else if value > OCCUPIED_THRESHOLD {
            Self::Occupied
        } else {
            Self::Free
        }
    }
}

/// Grid metadata from `msg.info`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapInfo {
    /// Cell edge length (m).
    pub resolution: f64,
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// World X of cell (0, 0).
    pub origin_x: f64,
    /// World Y of cell (0, 0).
    pub origin_y: f64,
}

/// `nav_msgs/OccupancyGrid`, row-major from cell (0, 0).
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyGrid {
    /// Grid metadata.
    pub info: MapInfo,
    /// Occupancy values: -1 unknown, 0-100 probability.
    pub data: Vec<i8>,
}

impl OccupancyGrid {
    /// Returns the state of cell `(col, row)`.
    #[must_use]
    pub fn cell(&self, col: u32, row: u32) -> Option<CellState> {
        if col >= self.info.width || row >= self.info.height {
            return None;
        }
        let index = row as usize * self.info.width as usize + col as usize;
        self.data.get(index).copied().map(CellState::from_value)
    }

    /// Converts a world coordinate to the containing cell.
    #[must_use]
    pub fn world_to_cell(&self, x: f64, y: f64) -> Option<(u32, u32)> {
        if self.info.resolution <= 0.0 {
            return None;
        }
        let col = ((x - self.info.origin_x) / self.info.resolution).floor();
        let row = ((y - self.info.origin_y) / self.info.resolution).floor();
        if col < 0.0 || row < 0.0 || col >= f64::from(self.info.width) || row >= f64::from(self.info.height) {
            return None;
        }
        Some((col as u32, row as u32))
    }

    /// Returns the state of the cell containing world point `(x, y)`.
    #[inline]
    #[must_use]
    pub fn cell_at(&self, x: f64, y: f64) -> Option<CellState> {
        let (col, row) = self.world_to_cell(x, y)?;
        self.cell(col, row)
    }

    fn from_msg(msg: &Value) -> Result<Self> {
        let info = msg
            .get("info")
            .ok_or_else(|| Error::malformed("map frame without info"))?;

        let dimension = |key: &str| -> Result<u32> {
            info.get(key)
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .ok_or_else(|| Error::malformed(format!("map info.{key} missing")))
        };

        let info = MapInfo {
            resolution: info
                .get("resolution")
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::malformed("map info.resolution missing"))?,
            width: dimension("width")?,
            height: dimension("height")?,
            origin_x: info
                .pointer("/origin/position/x")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            origin_y: info
                .pointer("/origin/position/y")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        };

        let data = match msg.get("data") {
            Some(Value::Array(cells)) => cells
                .iter()
                .map(|cell| {
                    cell.as_i64()
                        .map(|v| v as i8)
                        .ok_or_else(|| Error::malformed("map data holds a non-integer"))
                })
                .collect::<Result<Vec<i8>>>()?,
            Some(Value::String(encoded)) => BASE64
                .decode(encoded)
                .map_err(|e| Error::malformed(format!("map data is not base64: {e}")))?
                .into_iter()
                .map(|b| b as i8)
                .collect(),
            _ => return Err(Error::malformed("map frame without data")),
        };

        let expected = info.width as usize * info.height as usize;
        if data.len() != expected {
            return Err(Error::malformed(format!(
                "map data has {} cells, expected {expected}",
                data.len()
            )));
        }

        Ok(Self { info, data })
    }
}

// ============================================================================
// LaserScan
// ============================================================================

/// `sensor_msgs/LaserScan`.
#[derive(Debug, Clone, PartialEq)]
pub struct LaserScan {
    /// Start angle of the scan (rad).
    pub angle_min: f64,
    /// End angle of the scan (rad).
    pub angle_max: f64,
    /// Angular distance between measurements (rad).
    pub angle_increment: f64,
    /// Minimum valid range (m).
    pub range_min: f64,
    /// Maximum valid range (m).
    pub range_max: f64,
    /// Measured ranges (m); non-finite readings are `+inf`.
    pub ranges: Vec<f64>,
}

impl LaserScan {
    fn from_msg(msg: &Value) -> Result<Self> {
        let angle = |key: &str| -> Result<f64> {
            msg.get(key)
                .and_then(Value::as_f64)
                .ok_or_else(|| Error::malformed(format!("scan {key} missing")))
        };

        let ranges = msg
            .get("ranges")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::malformed("scan frame without ranges"))?
            .iter()
            .map(|r| r.as_f64().unwrap_or(f64::INFINITY))
            .collect();

        Ok(Self {
            angle_min: angle("angle_min")?,
            angle_max: angle("angle_max")?,
            angle_increment: angle("angle_increment")?,
            range_min: msg.get("range_min").and_then(Value::as_f64).unwrap_or(0.0),
            range_max: msg
                .get("range_max")
                .and_then(Value::as_f64)
                .unwrap_or(f64::INFINITY),
            ranges,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Removes a string field, defaulting to empty.
#[inline]
fn take_string(object: &mut Map<String, Value>, key: &str) -> String {
    take_optional_string(object, key).unwrap_or_default()
}

/// Removes an optional string field.
#[inline]
fn take_optional_string(object: &mut Map<String, Value>, key: &str) -> Option<String> {
    match object.remove(key) {
        Some(Value::String(s)) => Some(s),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
