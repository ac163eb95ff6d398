//! rosbridge session coordinator.
//!
//! The [`ConnectionManager`] owns the single WebSocket session, reconnects
//! it with backoff, routes inbound frames and fans events out to listeners.
//!
//! # Example
//!
//! ```no_run
//! use rosbridge_client::ConnectionManager;
//!
//! # async fn example() -> rosbridge_client::Result<()> {
//! let manager = ConnectionManager::builder().build()?;
//! manager.connect("ws://192.168.0.10:9090")?;
//!
//! manager.wait_connected(std::time::Duration::from_secs(5)).await?;
//! manager.move_command(0.2, 0.0);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::error::{Error, Result, duration_ms};
use crate::identifiers::{GoalId, SessionId};
use crate::listener::{ConnectionListener, ListenerEvent, ListenerRegistry};
use crate::protocol::{IncomingFrame, OutgoingOperation, RobotPose};
use crate::tracking::{GoalSnapshot, GoalTracker, PositionCache};
use crate::transport::{Connection, EventHandler, TransportEvent};

use super::builder::ConnectionManagerBuilder;
use super::options::ManagerOptions;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// Session bookkeeping, guarded by one lock.
#[derive(Default)]
struct SessionSlot {
    /// Endpoint of the current connect request; `None` after disconnect.
    url: Option<Url>,
    /// Live or opening session.
    connection: Option<Connection>,
    /// Pending reconnect timer.
    reconnect: Option<JoinHandle<()>>,
    /// Reconnect attempts made in the current outage.
    attempt: u32,
}

impl SessionSlot {
    #[inline]
    fn is_current(&self, session: SessionId) -> bool {
        self.connection
            .as_ref()
            .is_some_and(|c| c.session() == session)
    }
}

/// Internal shared state for the manager.
pub(crate) struct ManagerInner {
    /// Validated settings.
    pub(crate) options: ManagerOptions,

    /// Connection lifecycle state.
    state: watch::Sender<ConnectionState>,

    /// Current session and reconnect bookkeeping.
    session: Mutex<SessionSlot>,

    /// Topic to message type, replayed on every open.
    subscriptions: Mutex<FxHashMap<String, String>>,

    /// Navigation goal state.
    pub(crate) goals: GoalTracker,

    /// Latest robot pose.
    pub(crate) positions: PositionCache,

    /// Event observers.
    listeners: ListenerRegistry,

    /// Last goal id this client sent with `send_action_goal`.
    pub(crate) last_sent_goal: Mutex<Option<GoalId>>,
}

// ============================================================================
// ConnectionManager
// ============================================================================

/// Handle to the rosbridge session.
///
/// The manager is built once by the host application and shared by
/// cloning; every clone drives the same session.
///
/// # Thread Safety
///
/// `ConnectionManager` is `Send + Sync`. Commands may be issued from any
/// task while inbound frames are being processed.
#[derive(Clone)]
pub struct ConnectionManager {
    pub(crate) inner: Arc<ManagerInner>,
}

impl fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("state", &self.state())
            .field("goal", &self.inner.goals.snapshot())
            .field("listeners", &self.inner.listeners.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionManager - Construction
// ============================================================================

impl ConnectionManager {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ConnectionManagerBuilder {
        ConnectionManagerBuilder::new()
    }

    /// Creates a manager from validated options.
    pub(crate) fn new(options: ManagerOptions) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let subscriptions = options.subscriptions.iter().cloned().collect();

        Self {
            inner: Arc::new(ManagerInner {
                options,
                state,
                session: Mutex::new(SessionSlot::default()),
                subscriptions: Mutex::new(subscriptions),
                goals: GoalTracker::new(),
                positions: PositionCache::new(),
                listeners: ListenerRegistry::new(),
                last_sent_goal: Mutex::new(None),
            }),
        }
    }

    /// Returns the settings this manager was built with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ManagerOptions {
        &self.inner.options
    }
}

// ============================================================================
// ConnectionManager - Lifecycle
// ============================================================================

impl ConnectionManager {
    /// Opens a session to `url`.
    ///
    /// Returns at once; progress is reported through [`Self::state`] and
    /// the listeners. A call while a session is open or opening does
    /// nothing. A pending reconnect is replaced by an immediate attempt and
    /// the attempt counter restarts. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` is not a `ws://` or `wss://`
    /// URL. The state becomes [`ConnectionState::Error`], listeners get
    /// `on_error`, and no retry is scheduled.
    pub fn connect(&self, url: &str) -> Result<()> {
        let endpoint = match parse_endpoint(url) {
            Ok(endpoint) => endpoint,
            Err(message) => {
                warn!(%url, %message, "Rejected rosbridge URL");
                self.inner.set_state(ConnectionState::Error);
                self.inner
                    .listeners
                    .dispatch(ListenerEvent::Error(Arc::new(Error::invalid_url(url, message.clone()))));
                return Err(Error::invalid_url(url, message));
            }
        };

        let mut slot = self.inner.session.lock();
        if slot.connection.is_some() {
            debug!(%url, "Session already open or opening");
            return Ok(());
        }

        if let Some(pending) = slot.reconnect.take() {
            pending.abort();
        }
        slot.url = Some(endpoint);
        slot.attempt = 0;
        ManagerInner::open_session(&self.inner, &mut slot);

        Ok(())
    }

    /// Closes the session and cancels any pending reconnect.
    ///
    /// Listeners get `on_disconnected` if a session was open or opening.
    pub fn disconnect(&self) {
        let previous = {
            let mut slot = self.inner.session.lock();
            if let Some(pending) = slot.reconnect.take() {
                pending.abort();
            }
            slot.url = None;
            slot.attempt = 0;
            if let Some(connection) = slot.connection.take() {
                connection.shutdown();
            }
            self.inner.set_state(ConnectionState::Disconnected)
        };

        if matches!(previous, ConnectionState::Connected | ConnectionState::Connecting) {
            info!("Disconnected from rosbridge");
            self.inner.listeners.dispatch(ListenerEvent::Disconnected);
        }
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    /// Returns `true` when commands will be written.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Subscribes to connection state changes.
    #[inline]
    #[must_use]
    pub fn state_updates(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Waits until the session is connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if not connected within `limit`.
    pub async fn wait_connected(&self, limit: Duration) -> Result<()> {
        let mut updates = self.state_updates();
        match timeout(limit, updates.wait_for(|s| s.is_connected())).await {
            Ok(result) => result.map(|_| ()).map_err(Error::from),
            Err(_) => Err(Error::timeout("wait for connection", duration_ms(limit))),
        }
    }

    /// Reconnect attempts made in the current outage.
    #[inline]
    #[must_use]
    pub fn reconnect_attempt(&self) -> u32 {
        self.inner.session.lock().attempt
    }
}

// ============================================================================
// ConnectionManager - Sending
// ============================================================================

impl ConnectionManager {
    /// Writes an operation if connected; otherwise logs and drops it.
    pub fn send(&self, op: OutgoingOperation) {
        if let Err(e) = self.try_send(&op) {
            warn!(op = op.op(), error = %e, "Dropping operation");
        }
    }

    /// Writes an operation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotConnected`] unless the state is
    /// [`ConnectionState::Connected`], or [`Error::ConnectionClosed`] if
    /// the session ended concurrently.
    pub fn try_send(&self, op: &OutgoingOperation) -> Result<()> {
        let connection = {
            let slot = self.inner.session.lock();
            match &slot.connection {
                Some(connection) if self.is_connected() => connection.clone(),
                _ => return Err(Error::NotConnected),
            }
        };

        connection.send(op.encode())?;
        debug!(op = op.op(), "Operation sent");
        Ok(())
    }
}

// ============================================================================
// ConnectionManager - Observation
// ============================================================================

impl ConnectionManager {
    /// Registers a listener. Returns `false` if already registered.
    ///
    /// Must be called from within a Tokio runtime.
    #[inline]
    pub fn add_listener(&self, listener: Arc<dyn ConnectionListener>) -> bool {
        self.inner.listeners.add(listener)
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    #[inline]
    pub fn remove_listener(&self, listener: &Arc<dyn ConnectionListener>) -> bool {
        self.inner.listeners.remove(listener)
    }

    /// Navigation goal tracker.
    #[inline]
    #[must_use]
    pub fn goals(&self) -> &GoalTracker {
        &self.inner.goals
    }

    /// Subscribes to goal state changes.
    #[inline]
    #[must_use]
    pub fn goal_updates(&self) -> watch::Receiver<GoalSnapshot> {
        self.inner.goals.subscribe()
    }

    /// Robot pose cache.
    #[inline]
    #[must_use]
    pub fn positions(&self) -> &PositionCache {
        &self.inner.positions
    }

    /// Latest robot pose, if any has arrived.
    #[inline]
    #[must_use]
    pub fn latest_pose(&self) -> Option<RobotPose> {
        self.inner.positions.latest()
    }

    /// Registered subscriptions as `(topic, type)`, sorted by topic.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(String, String)> {
        self.inner.subscription_list()
    }
}

// ============================================================================
// ManagerInner - Session Handling
// ============================================================================

impl ManagerInner {
    /// Sets the state and returns the previous one.
    pub(crate) fn set_state(&self, next: ConnectionState) -> ConnectionState {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "Connection state changed");
        }
        previous
    }

    /// Opens a session to the stored URL.
    fn open_session(inner: &Arc<Self>, slot: &mut SessionSlot) {
        let Some(url) = slot.url.clone() else {
            return;
        };

        let weak = Arc::downgrade(inner);
        let handler: EventHandler = Arc::new(move |session, event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_transport_event(session, event);
            }
        });

        inner.set_state(ConnectionState::Connecting);
        info!(%url, attempt = slot.attempt, "Connecting to rosbridge");

        slot.connection = Some(Connection::open(url, inner.options.session_config(), handler));
    }

    /// Entry point for transport events.
    fn on_transport_event(self: &Arc<Self>, session: SessionId, event: TransportEvent) {
        match event {
            TransportEvent::Opened => self.on_opened(session),
            TransportEvent::Text(text) => self.on_text(session, text),
            TransportEvent::Closed { code, reason } => {
                debug!(%session, ?code, %reason, "Session closed");
                self.on_session_end(session, None);
            }
            TransportEvent::Failed(error) => self.on_session_end(session, Some(error)),
        }
    }

    fn on_opened(&self, session: SessionId) {
        let connection = {
            let mut slot = self.session.lock();
            if !slot.is_current(session) {
                trace!(%session, "Ignoring open of stale session");
                return;
            }
            slot.attempt = 0;
            slot.connection.clone()
        };

        self.set_state(ConnectionState::Connected);
        info!(%session, "Connected to rosbridge");
        self.listeners.dispatch(ListenerEvent::Connected);

        let Some(connection) = connection else {
            return;
        };
        for (topic, msg_type) in self.subscription_list() {
            debug!(%topic, "Subscribing");
            let op = OutgoingOperation::subscribe(topic, msg_type);
            if connection.send(op.encode()).is_err() {
                break;
            }
        }
    }

    fn on_text(&self, session: SessionId, text: String) {
        if !self.session.lock().is_current(session) {
            trace!(%session, "Ignoring frame of stale session");
            return;
        }

        let text: Arc<str> = Arc::from(text);
        let frame = IncomingFrame::decode(&text);
        self.listeners.dispatch(ListenerEvent::Message(Arc::clone(&text)));

        match frame {
            Ok(frame) => self.route(frame),
            Err(e) => warn!(%session, error = %e, "Dropping unclassified frame"),
        }
    }

    /// Applies a decoded frame to the session state.
    fn route(&self, frame: IncomingFrame) {
        match frame {
            IncomingFrame::PoseUpdate(pose) => {
                trace!(x = pose.x, y = pose.y, yaw = pose.yaw, "Pose update");
                self.positions.update(pose);
            }

            IncomingFrame::GoalStatusUpdate(entries) => {
                for snapshot in self.goals.apply_all(&entries) {
                    self.listeners.dispatch(ListenerEvent::GoalStatus(snapshot));
                }
            }

            IncomingFrame::ActionResult { action, id, status, result, .. } => {
                debug!(%action, ?id, ?status, result, "Action result");
            }

            IncomingFrame::ServiceResponse { service, result, .. } => {
                debug!(%service, result, "Service response");
            }

            other => trace!(kind = other.kind(), "Frame received"),
        }
    }

    /// Handles a close (`error == None`) or failure of a session.
    fn on_session_end(self: &Arc<Self>, session: SessionId, error: Option<Error>) {
        {
            let mut slot = self.session.lock();
            if !slot.is_current(session) {
                trace!(%session, "Ignoring end of stale session");
                return;
            }
            slot.connection = None;
            self.set_state(if error.is_some() {
                ConnectionState::Error
            } else {
                ConnectionState::Disconnected
            });
            self.schedule_reconnect(&mut slot);
        }

        match error {
            Some(error) => {
                warn!(%session, error = %error, "rosbridge session failed");
                self.listeners.dispatch(ListenerEvent::Error(Arc::new(error)));
            }
            None => {
                info!(%session, "Disconnected from rosbridge");
                self.listeners.dispatch(ListenerEvent::Disconnected);
            }
        }
    }

    /// Schedules the next attempt, or gives up once the policy says so.
    fn schedule_reconnect(self: &Arc<Self>, slot: &mut SessionSlot) {
        if slot.url.is_none() {
            return;
        }

        let attempt = slot.attempt;
        let Some(delay) = self.options.reconnect.schedule(attempt) else {
            warn!(attempts = attempt, "Reconnect attempts exhausted");
            return;
        };

        slot.attempt += 1;
        info!(
            attempt = slot.attempt,
            max = self.options.reconnect.max_attempts(),
            delay_ms = duration_ms(delay),
            "Scheduling reconnect"
        );

        let weak = Arc::downgrade(self);
        slot.reconnect = Some(tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect_now();
            }
        }));
    }

    /// Runs a scheduled attempt unless the session changed meanwhile.
    fn reconnect_now(self: &Arc<Self>) {
        let mut slot = self.session.lock();
        slot.reconnect = None;
        if slot.connection.is_some() || slot.url.is_none() {
            return;
        }
        Self::open_session(self, &mut slot);
    }
}

// ============================================================================
// ManagerInner - Subscriptions
// ============================================================================

impl ManagerInner {
    /// Adds a subscription. Returns `false` if it was already present with
    /// the same type.
    pub(crate) fn register_subscription(&self, topic: &str, msg_type: &str) -> bool {
        let mut subscriptions = self.subscriptions.lock();
        match subscriptions.get(topic) {
            Some(existing) if existing == msg_type => false,
            _ => {
                subscriptions.insert(topic.to_string(), msg_type.to_string());
                true
            }
        }
    }

    /// Removes a subscription. Returns `false` if it was not present.
    pub(crate) fn remove_subscription(&self, topic: &str) -> bool {
        self.subscriptions.lock().remove(topic).is_some()
    }

    fn subscription_list(&self) -> Vec<(String, String)> {
        let mut list: Vec<(String, String)> = self
            .subscriptions
            .lock()
            .iter()
            .map(|(topic, ty)| (topic.clone(), ty.clone()))
            .collect();
        list.sort_unstable();
        list
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let slot = self.session.get_mut();
        if let Some(pending) = slot.reconnect.take() {
            pending.abort();
        }
        if let Some(connection) = slot.connection.take() {
            connection.shutdown();
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses and checks a rosbridge endpoint.
fn parse_endpoint(raw: &str) -> std::result::Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;

    if !matches!(url.scheme(), "ws" | "wss") {
        return Err(format!("scheme must be ws or wss, got '{}'", url.scheme()));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }

    Ok(url)
}

// ============================================================================
// Tests
// ============================================================================
