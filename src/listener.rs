//! Connection event fan-out.
//!
//! Observers implement [`ConnectionListener`] and are registered with the
//! manager. Every listener gets its own queue and delivery task, so a slow
//! listener delays only itself and never the inbound frame path.
//!
//! # Delivery
//!
//! | Event | Callback |
//! |-------|----------|
//! | Session opened | [`ConnectionListener::on_connected`] |
//! | Session closed | [`ConnectionListener::on_disconnected`] |
//! | Text frame | [`ConnectionListener::on_message_received`] |
//! | Transport failure | [`ConnectionListener::on_error`] |
//! | Goal state change | [`ConnectionListener::on_goal_status`] |
//!
//! Events reach each listener in the order they were dispatched.

// ============================================================================
// Imports
// ============================================================================

use std::ptr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::Error;
use crate::tracking::GoalSnapshot;

// ============================================================================
// ConnectionListener
// ============================================================================

/// Observer of connection events.
///
/// All methods default to no-ops. Callbacks run on a delivery task owned by
/// the registry, never on the caller's task.
pub trait ConnectionListener: Send + Sync + 'static {
    /// The WebSocket session opened.
    fn on_connected(&self) {}

    /// The WebSocket session closed or was closed.
    fn on_disconnected(&self) {}

    /// A raw text frame arrived, classified or not.
    fn on_message_received(&self, text: &str) {
        let _ = text;
    }

    /// A transport error occurred.
    fn on_error(&self, error: &Error) {
        let _ = error;
    }

    /// The tracked navigation goal changed.
    fn on_goal_status(&self, snapshot: &GoalSnapshot) {
        let _ = snapshot;
    }
}

// ============================================================================
// ListenerEvent
// ============================================================================

/// Event queued for delivery.
#[derive(Debug, Clone)]
pub enum ListenerEvent {
    /// Session opened.
    Connected,
    /// Session closed.
    Disconnected,
    /// Raw inbound text.
    Message(Arc<str>),
    /// Transport error.
    Error(Arc<Error>),
    /// Goal state changed.
    GoalStatus(GoalSnapshot),
}

impl ListenerEvent {
    fn deliver(&self, listener: &dyn ConnectionListener) {
        match self {
            Self::Connected => listener.on_connected(),
            Self::Disconnected => listener.on_disconnected(),
            Self::Message(text) => listener.on_message_received(text),
            Self::Error(error) => listener.on_error(error),
            Self::GoalStatus(snapshot) => listener.on_goal_status(snapshot),
        }
    }
}

// ============================================================================
// ListenerRegistry
// ============================================================================

/// One registered listener and its queue.
struct Entry {
    listener: Arc<dyn ConnectionListener>,
    queue: mpsc::UnboundedSender<ListenerEvent>,
}

/// Registry of connection listeners.
///
/// Add and remove are idempotent. Identity is the `Arc` allocation, so the
/// same listener registered through two clones of its `Arc` counts once.
#[derive(Default)]
pub struct ListenerRegistry {
    entries: Mutex<Vec<Entry>>,
}

impl ListenerRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    ///
    /// Returns `false` if it was already registered. Must be called from
    /// within a Tokio runtime; the delivery task is spawned here.
    pub fn add(&self, listener: Arc<dyn ConnectionListener>) -> bool {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| same_listener(&e.listener, &listener)) {
            trace!("Listener already registered");
            return false;
        }

        let (queue, mut rx) = mpsc::unbounded_channel::<ListenerEvent>();
        let target = Arc::clone(&listener);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                event.deliver(target.as_ref());
            }
        });

        entries.push(Entry { listener, queue });
        debug!(count = entries.len(), "Listener added");
        true
    }

    /// Unregisters a listener.
    ///
    /// Events already queued for it are still delivered. Returns `false` if
    /// it was not registered.
    pub fn remove(&self, listener: &Arc<dyn ConnectionListener>) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| !same_listener(&e.listener, listener));
        let removed = entries.len() != before;
        if removed {
            debug!(count = entries.len(), "Listener removed");
        }
        removed
    }

    /// Number of registered listeners.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Returns `true` if no listener is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Queues an event for every listener. Never blocks.
    pub fn dispatch(&self, event: ListenerEvent) {
        let entries = self.entries.lock();
        for entry in entries.iter() {
            let _ = entry.queue.send(event.clone());
        }
    }

    /// Unregisters every listener.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Compares listeners by allocation, ignoring vtable pointers.
#[inline]
fn same_listener(a: &Arc<dyn ConnectionListener>, b: &Arc<dyn ConnectionListener>) -> bool {
    ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

// ============================================================================
// Tests
// ============================================================================
