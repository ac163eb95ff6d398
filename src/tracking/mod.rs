//! Session-derived robot state.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `goal` | Navigation goal state machine |
//! | `position` | Latest robot pose |

// ============================================================================
// Submodules
// ============================================================================

/// Navigation goal state machine.
pub mod goal;

/// Latest robot pose.
pub mod position;

// ============================================================================
// Re-exports
// ============================================================================

pub use goal::{GoalSnapshot, GoalStatus, GoalTracker};
pub use position::PositionCache;
