//! WebSocket transport layer.
//!
//! This module owns the socket to the rosbridge server and the backoff
//! policy used to re-establish it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐                          ┌─────────────────┐
//! │  ConnectionManager  │                          │  rosbridge      │
//! │                     │        WebSocket         │  server         │
//! │  → Connection       │◄────────────────────────►│                 │
//! │    (session task)   │      ws://host:9090      │                 │
//! └─────────────────────┘                          └─────────────────┘
//! ```
//!
//! # Session Lifecycle
//!
//! 1. `Connection::open` - Spawn the session task and dial
//! 2. `TransportEvent::Opened` - Handshake done, frames flow
//! 3. `TransportEvent::Closed` / `Failed` - Session over
//! 4. `ReconnectPolicy` - Decide whether and when to open the next one
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket session and event loop |
//! | `reconnect` | Exponential backoff policy |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket session and event loop.
pub mod connection;

/// Exponential backoff policy.
pub mod reconnect;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, EventHandler, SessionConfig, TransportEvent};
pub use reconnect::ReconnectPolicy;
