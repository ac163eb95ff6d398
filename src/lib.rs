//! rosbridge client - Resilient session manager for ROS2 robots.
//!
//! This library keeps a single rosbridge v2 WebSocket session alive and
//! exposes a typed command surface for driving, localizing and navigating
//! a robot, plus live tracking of its pose and navigation goal.
//!
//! # Architecture
//!
//! The client follows a single-writer model:
//!
//! - **Session task**: one Tokio task per connection owns the WebSocket,
//!   serializes every write and reports lifecycle events
//! - **Manager**: shared [`ConnectionManager`] handle owning state,
//!   subscriptions, reconnect scheduling and listener fan-out
//!
//! Key design principles:
//!
//! - At most one live session; events from superseded sessions are ignored
//! - Subscriptions survive reconnects and are replayed on every open
//! - Exponential reconnect backoff with a bounded attempt count
//! - At most one navigation goal in flight, tracked from status frames
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use rosbridge_client::{ConnectionManager, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Build a manager with default reconnect policy and subscriptions
//!     let manager = ConnectionManager::builder()
//!         .reconnect_base_delay(Duration::from_secs(1))
//!         .build()?;
//!
//!     // Open the session
//!     manager.connect("ws://192.168.0.10:9090")?;
//!     manager.wait_connected(Duration::from_secs(5)).await?;
//!
//!     // Drive to a pose
//!     let goal = manager.send_navigate_to_pose(2.0, 1.0, 0.0)?;
//!     println!("Goal sent: {}", goal);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`manager`] | [`ConnectionManager`] and its builder |
//! | [`listener`] | [`ConnectionListener`] callbacks and fan-out |
//! | [`tracking`] | Goal status and robot pose tracking |
//! | [`store`] | Saved waypoints |
//! | [`patrol`] | Waypoint patrols |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | rosbridge wire format |
//! | [`transport`] | WebSocket session and reconnect policy |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for sessions and goals.
pub mod identifiers;

/// Connection listeners.
///
/// Implement [`ConnectionListener`] and register it with
/// [`ConnectionManager::add_listener`].
pub mod listener;

/// Connection manager.
///
/// Use [`ConnectionManager::builder()`] to create a configured manager.
pub mod manager;

/// Waypoint patrols.
pub mod patrol;

/// rosbridge v2 wire format.
///
/// Outgoing operations, incoming frames and ROS message shapes.
pub mod protocol;

/// Saved waypoints and their storage.
pub mod store;

/// Goal status and robot pose tracking.
pub mod tracking;

/// WebSocket transport layer.
///
/// Internal module owning the socket task and the reconnect schedule.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Manager types
pub use manager::{ConnectionManager, ConnectionManagerBuilder, ConnectionState, ManagerOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{GoalId, SessionId};

// Listener types
pub use listener::{ConnectionListener, ListenerEvent, ListenerRegistry};

// Protocol types
pub use protocol::{CovarianceConfig, IncomingFrame, OutgoingOperation, RobotPose};

// Tracking types
pub use tracking::{GoalSnapshot, GoalStatus, GoalTracker, PositionCache};

// Transport types
pub use transport::ReconnectPolicy;

// Waypoint types
pub use patrol::{LegOutcome, LegResult, Patrol, PatrolOptions, PatrolReport};
pub use store::{InMemoryPositionStore, PositionStore, Waypoint};
