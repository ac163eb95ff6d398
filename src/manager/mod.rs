//! rosbridge connection manager.
//!
//! This module provides the main entry point of the crate.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConnectionManager`] | Session owner and command surface |
//! | [`ConnectionManagerBuilder`] | Fluent configuration builder |
//! | [`ManagerOptions`] | Manager settings |
//! | [`ConnectionState`] | Session lifecycle state |
//!
//! # Example
//!
//! ```no_run
//! use rosbridge_client::{ConnectionManager, Result};
//!
//! # async fn example() -> Result<()> {
//! let manager = ConnectionManager::builder().build()?;
//! manager.connect("ws://192.168.0.10:9090")?;
//! manager.wait_connected(std::time::Duration::from_secs(5)).await?;
//!
//! let goal = manager.send_navigate_to_pose(2.0, 1.0, 0.0)?;
//! println!("navigating, goal {goal}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for manager configuration.
pub mod builder;

/// Robot command surface.
pub mod commands;

/// Core manager implementation.
pub mod core;

/// Manager settings.
pub mod options;

/// Session lifecycle state.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ConnectionManagerBuilder;
pub use core::ConnectionManager;
pub use options::ManagerOptions;
pub use state::ConnectionState;
