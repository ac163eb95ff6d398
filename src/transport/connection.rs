//! WebSocket session and event loop.
//!
//! A [`Connection`] owns one WebSocket session to the rosbridge server.
//! Opening it spawns a tokio task that dials the endpoint and then runs the
//! event loop for the lifetime of the socket.
//!
//! # Event Loop
//!
//! The session task handles:
//!
//! - Incoming text frames, forwarded to the event handler in arrival order
//! - Outgoing frames queued through [`Connection::send`]
//! - Close and error detection
//! - An optional idle watchdog
//!
//! All writes go through the task, so frames from concurrent callers are
//! never interleaved on the socket.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::{Error, Result, duration_ms};
use crate::identifiers::SessionId;

// ============================================================================
// Constants
// ============================================================================

/// Default limit for the WebSocket handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Client WebSocket stream.
type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport event handler.
///
/// Called from the session task, in order, for every event of the session.
pub type EventHandler = Arc<dyn Fn(SessionId, TransportEvent) + Send + Sync>;

// ============================================================================
// TransportEvent
// ============================================================================

/// Lifecycle and traffic events of one session.
#[derive(Debug)]
pub enum TransportEvent {
    /// The WebSocket handshake completed.
    Opened,

    /// A text frame arrived.
    Text(String),

    /// The remote end closed the socket or the stream ended.
    Closed {
        /// Close code, if the peer sent one.
        code: Option<u16>,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// The session failed: dial error, socket error or idle timeout.
    Failed(Error),
}

// ============================================================================
// SessionConfig
// ============================================================================

/// Per-session transport settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Limit for the WebSocket handshake.
    pub connect_timeout: Duration,
    /// Fail the session when nothing arrives for this long.
    pub idle_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: None,
        }
    }
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a text frame.
    Send(String),
    /// Close the socket without reporting an event.
    Shutdown,
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to one WebSocket session.
///
/// Cloning is cheap; all clones feed the same session task. The task stops
/// after [`Connection::shutdown`], on socket close or error, or once every
/// handle has been dropped.
#[derive(Clone)]
pub struct Connection {
    /// Session this handle belongs to.
    session: SessionId,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Opens a session to `url`.
    ///
    /// Returns immediately. The outcome of the dial is reported to
    /// `handler` as [`TransportEvent::Opened`] or [`TransportEvent::Failed`].
    /// Frames queued before the handshake completes are written once it
    /// does.
    pub fn open(url: Url, config: SessionConfig, handler: EventHandler) -> Self {
        let session = SessionId::next();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(Self::run_session(session, url, config, command_rx, handler));

        Self {
            session,
            command_tx,
        }
    }

    /// Returns the session id.
    #[inline]
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Queues a text frame for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session task has stopped.
    pub fn send(&self, text: String) -> Result<()> {
        self.command_tx
            .send(ConnectionCommand::Send(text))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns `true` while the session task is running.
    #[inline]
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.command_tx.is_closed()
    }

    /// Closes the session.
    ///
    /// No [`TransportEvent`] is reported for a requested shutdown.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ConnectionCommand::Shutdown);
    }

    /// Dials the endpoint, then runs the event loop.
    async fn run_session(
        session: SessionId,
        url: Url,
        config: SessionConfig,
        command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        handler: EventHandler,
    ) {
        debug!(%session, %url, "Dialing rosbridge");

        let dial = timeout(config.connect_timeout, connect_async(url.as_str())).await;
        let ws_stream = match dial {
            Ok(Ok((ws_stream, _response))) => ws_stream,
            Ok(Err(e)) => {
                warn!(%session, error = %e, "WebSocket handshake failed");
                handler(session, TransportEvent::Failed(Error::connection(e.to_string())));
                return;
            }
            Err(_) => {
                let ms = duration_ms(config.connect_timeout);
                warn!(%session, timeout_ms = ms, "WebSocket handshake timed out");
                handler(session, TransportEvent::Failed(Error::timeout("connect", ms)));
                return;
            }
        };

        debug!(%session, "WebSocket open");
        handler(session, TransportEvent::Opened);

        Self::run_event_loop(session, ws_stream, command_rx, config.idle_timeout, &handler).await;

        debug!(%session, "Event loop terminated");
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        session: SessionId,
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        idle_timeout: Option<Duration>,
        handler: &EventHandler,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut deadline = idle_timeout.map(|idle| Instant::now() + idle);

        loop {
            let idle = async move {
                match deadline {
                    Some(at) => sleep_until(at).await,
                    None => pending::<()>().await,
                }
            };

            tokio::select! {
                // Incoming frames from rosbridge
                message = ws_read.next() => {
                    if let Some(idle) = idle_timeout {
                        deadline = Some(Instant::now() + idle);
                    }

                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(%session, len = text.len(), "Frame received");
                            handler(session, TransportEvent::Text(text.as_str().to_owned()));
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (Some(u16::from(f.code)), f.reason.as_str().to_owned()))
                                .unwrap_or((None, String::new()));
                            debug!(%session, ?code, %reason, "WebSocket closed by remote");
                            handler(session, TransportEvent::Closed { code, reason });
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(%session, error = %e, "WebSocket error");
                            handler(session, TransportEvent::Failed(Error::WebSocket(e)));
                            break;
                        }

                        None => {
                            debug!(%session, "WebSocket stream ended");
                            handler(session, TransportEvent::Closed { code: None, reason: String::new() });
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the manager
                command = command_rx.recv() => {
                    match command {
                        Some(ConnectionCommand::Send(text)) => {
                            trace!(%session, len = text.len(), "Frame sent");
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(%session, error = %e, "Failed to write frame");
                                handler(session, TransportEvent::Failed(Error::connection(e.to_string())));
                                break;
                            }
                        }

                        Some(ConnectionCommand::Shutdown) => {
                            debug!(%session, "Shutdown command received");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!(%session, "Command channel closed");
                            let _ = ws_write.close().await;
                            break;
                        }
                    }
                }

                // Idle watchdog
                () = idle => {
                    let ms = idle_timeout.map_or(0, duration_ms);
                    warn!(%session, idle_ms = ms, "No traffic from rosbridge");
                    let _ = ws_write.close().await;
                    handler(session, TransportEvent::Failed(Error::idle_timeout(ms)));
                    break;
                }
            }
        }
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session", &self.session)
            .field("open", &self.is_open())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::net::TcpListener;
    use tokio::sync::mpsc::unbounded_channel;
    use tokio_tungstenite::accept_async;

    /// Records transport events as short labels.
    fn recording_handler() -> (EventHandler, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let handler: EventHandler = Arc::new(move |_session, event| {
            let label = match event {
                TransportEvent::Opened => "opened".to_string(),
                TransportEvent::Text(text) => format!("text:{text}"),
                TransportEvent::Closed { .. } => "closed".to_string(),
                TransportEvent::Failed(e) => format!("failed:{e}"),
            };
            let _ = tx.send(label);
        });
        (handler, rx)
    }

    async fn echo_server() -> Url {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");

        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut ws = accept_async(stream).await.expect("handshake");
            while let Some(Ok(message)) = ws.next().await {
                if message.is_text() {
                    let _ = ws.send(message).await;
                }
            }
        });

        Url::parse(&format!("ws://{addr}")).expect("url")
    }

    #[test]
    fn test_default_session_config() {
        let config = SessionConfig::default();
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert!(config.idle_timeout.is_none());
    }

    #[tokio::test]
    async fn test_send_and_receive_in_order() {
        let url = echo_server().await;
        let (handler, mut events) = recording_handler();

        let connection = Connection::open(url, SessionConfig::default(), handler);
        connection.send("one".into()).expect("queued");
        connection.send("two".into()).expect("queued");

        assert_eq!(events.recv().await.as_deref(), Some("opened"));
        assert_eq!(events.recv().await.as_deref(), Some("text:one"));
        assert_eq!(events.recv().await.as_deref(), Some("text:two"));

        connection.shutdown();
    }

    #[tokio::test]
    async fn test_dial_failure_reports_failed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let (handler, mut events) = recording_handler();
        let url = Url::parse(&format!("ws://{addr}")).expect("url");
        let _connection = Connection::open(url, SessionConfig::default(), handler);

        let event = events.recv().await.expect("event");
        assert!(event.starts_with("failed:"), "got {event}");
    }

    #[tokio::test]
    async fn test_idle_timeout_fails_session() {
        let url = echo_server().await;
        let (handler, mut events) = recording_handler();
        let config = SessionConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..SessionConfig::default()
        };

        let _connection = Connection::open(url, config, handler);

        assert_eq!(events.recv().await.as_deref(), Some("opened"));
        let event = events.recv().await.expect("event");
        assert!(event.contains("No traffic"), "got {event}");
    }

    #[tokio::test]
    async fn test_send_after_shutdown_fails() {
        let url = echo_server().await;
        let (handler, mut events) = recording_handler();

        let connection = Connection::open(url, SessionConfig::default(), handler);
        assert_eq!(events.recv().await.as_deref(), Some("opened"));

        connection.shutdown();
        // Wait for the task to drop its receiver.
        while connection.is_open() {
            tokio::task::yield_now().await;
        }
        assert!(matches!(connection.send("x".into()), Err(Error::ConnectionClosed)));
    }
}
