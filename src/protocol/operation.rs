//! Outgoing rosbridge operations.
//!
//! Each variant of [`OutgoingOperation`] maps to one rosbridge v2 `op`.
//! Typed builders produce the payloads so callers never assemble JSON trees
//! by hand.
//!
//! # Wire Format
//!
//! | Variant | `op` | Fields |
//! |---------|------|--------|
//! | `Publish` | `publish` | `topic`, `type`?, `msg` |
//! | `Subscribe` | `subscribe` | `topic`, `type` |
//! | `Unsubscribe` | `unsubscribe` | `topic` |
//! | `CallService` | `call_service` | `service`, `type`, `args` |
//! | `SendActionGoal` | `send_action_goal` | `action`, `action_type`, `args`, `id`, `feedback` |
//! | `CancelActionGoal` | `cancel_action_goal` | `action`, `id` |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Map, Value, json};

use crate::identifiers::GoalId;

use super::messages::{
    CancelGoalRequest, CovarianceConfig, Header, NavigateToPoseGoal, Pose, PoseStamped,
    PoseWithCovariance, PoseWithCovarianceStamped, Twist,
};
use super::{msg_types, topics};

// ============================================================================
// OutgoingOperation
// ============================================================================

/// A single operation sent to the rosbridge server.
///
/// Constructed, encoded and discarded per call.
#[derive(Debug, Clone, PartialEq)]
pub enum OutgoingOperation {
    /// Publish a message on a topic.
    Publish {
        /// Topic name.
        topic: String,
        /// Optional message type hint.
        msg_type: Option<String>,
        /// Message payload.
        msg: Value,
    },

    /// Subscribe to a topic.
    Subscribe {
        /// Topic name.
        topic: String,
        /// Message type.
        msg_type: String,
    },

    /// Stop a subscription.
    Unsubscribe {
        /// Topic name.
        topic: String,
    },

    /// Call a service.
    CallService {
        /// Service name.
        service: String,
        /// Service type.
        service_type: String,
        /// Request arguments.
        args: Value,
    },

    /// Submit an action goal.
    SendActionGoal {
        /// Action name.
        action: String,
        /// Action type.
        action_type: String,
        /// Goal payload.
        goal: Value,
        /// Client-generated goal id.
        id: GoalId,
    },

    /// Cancel a previously submitted action goal.
    CancelActionGoal {
        /// Action name.
        action: String,
        /// Goal id used when the goal was sent.
        id: GoalId,
    },
}

// ============================================================================
// Encoding
// ============================================================================

impl OutgoingOperation {
    /// Returns the rosbridge `op` name.
    #[inline]
    #[must_use]
    pub fn op(&self) -> &'static str {
        match self {
            Self::Publish { .. } => "publish",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::CallService { .. } => "call_service",
            Self::SendActionGoal { .. } => "send_action_goal",
            Self::CancelActionGoal { .. } => "cancel_action_goal",
        }
    }

    /// Encodes the operation as rosbridge JSON text.
    ///
    /// Equal operations always encode to identical text.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_value().to_string()
    }

    /// Builds the JSON object for this operation.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        object.insert("op".into(), Value::from(self.op()));

        match self {
            Self::Publish {
                topic,
                msg_type,
                msg,
            } => {
                object.insert("topic".into(), Value::from(topic.as_str()));
                if let Some(msg_type) = msg_type {
                    object.insert("type".into(), Value::from(msg_type.as_str()));
                }
                object.insert("msg".into(), msg.clone());
            }

            Self::Subscribe { topic, msg_type } => {
                object.insert("topic".into(), Value::from(topic.as_str()));
                object.insert("type".into(), Value::from(msg_type.as_str()));
            }

            Self::Unsubscribe { topic } => {
                object.insert("topic".into(), Value::from(topic.as_str()));
            }

            Self::CallService {
                service,
                service_type,
                args,
            } => {
                object.insert("service".into(), Value::from(service.as_str()));
                object.insert("type".into(), Value::from(service_type.as_str()));
                object.insert("args".into(), args.clone());
            }

            Self::SendActionGoal {
                action,
                action_type,
                goal,
                id,
            } => {
                object.insert("action".into(), Value::from(action.as_str()));
                object.insert("action_type".into(), Value::from(action_type.as_str()));
                object.insert("args".into(), goal.clone());
                object.insert("id".into(), Value::from(id.as_str()));
                object.insert("feedback".into(), Value::Bool(true));
            }

            Self::CancelActionGoal { action, id } => {
                object.insert("action".into(), Value::from(action.as_str()));
                object.insert("id".into(), Value::from(id.as_str()));
            }
        }

        Value::Object(object)
    }
}

// ============================================================================
// Generic Builders
// ============================================================================

impl OutgoingOperation {
    /// Publish without a type hint.
    #[inline]
    #[must_use]
    pub fn publish(topic: impl Into<String>, msg: Value) -> Self {
        Self::Publish {
            topic: topic.into(),
            msg_type: None,
            msg,
        }
    }

    /// Publish with an explicit message type.
    #[inline]
    #[must_use]
    pub fn publish_typed(topic: impl Into<String>, msg_type: impl Into<String>, msg: Value) -> Self {
        Self::Publish {
            topic: topic.into(),
            msg_type: Some(msg_type.into()),
            msg,
        }
    }

    /// Subscribe to `topic` with message type `msg_type`.
    #[inline]
    #[must_use]
    pub fn subscribe(topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        Self::Subscribe {
            topic: topic.into(),
            msg_type: msg_type.into(),
        }
    }

    /// Unsubscribe from `topic`.
    #[inline]
    #[must_use]
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        Self::Unsubscribe {
            topic: topic.into(),
        }
    }
}

// ============================================================================
// Typed Builders
// ============================================================================

impl OutgoingOperation {
    /// `/cmd_vel` velocity command.
    #[must_use]
    pub fn move_command(linear_x: f64, angular_z: f64) -> Self {
        Self::publish(topics::CMD_VEL, json!(Twist::planar(linear_x, angular_z)))
    }

    /// `/goal_pose` publish for a planar target.
    #[must_use]
    pub fn goal_pose(frame_id: &str, x: f64, y: f64, z: f64, yaw: f64) -> Self {
        let msg = PoseStamped {
            header: Header::now(frame_id),
            pose: Pose::planar(x, y, z, yaw),
        };
        Self::publish(topics::GOAL_POSE, json!(msg))
    }

    /// `/initialpose` publish with the fixed covariance matrix.
    #[must_use]
    pub fn initial_pose(frame_id: &str, pose: Pose, covariance: &CovarianceConfig) -> Self {
        let msg = PoseWithCovarianceStamped {
            header: Header::now(frame_id),
            pose: PoseWithCovariance {
                pose,
                covariance: covariance.matrix().to_vec(),
            },
        };
        Self::publish_typed(
            topics::INITIAL_POSE,
            msg_types::POSE_WITH_COVARIANCE_STAMPED,
            json!(msg),
        )
    }

    /// `send_action_goal` for a navigate-to-pose target.
    #[must_use]
    pub fn navigate_to_pose(
        action: &str,
        action_type: &str,
        frame_id: &str,
        id: GoalId,
        x: f64,
        y: f64,
        yaw: f64,
    ) -> Self {
        let goal = NavigateToPoseGoal {
            pose: PoseStamped {
                header: Header::now(frame_id),
                pose: Pose::planar(x, y, 0.0, yaw),
            },
        };
        Self::SendActionGoal {
            action: action.to_string(),
            action_type: action_type.to_string(),
            goal: json!(goal),
            id,
        }
    }

    /// `action_msgs/CancelGoal` service call.
    #[must_use]
    pub fn cancel_goal_service(service: &str, request: CancelGoalRequest) -> Self {
        Self::CallService {
            service: service.to_string(),
            service_type: msg_types::CANCEL_GOAL.to_string(),
            args: json!(request),
        }
    }

    /// rosbridge-native cancel of a goal this client sent.
    #[inline]
    #[must_use]
    pub fn cancel_action_goal(action: impl Into<String>, id: GoalId) -> Self {
        Self::CancelActionGoal {
            action: action.into(),
            id,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
