//! Shared fixtures for integration tests.
//!
//! [`MockRosbridge`] is a minimal rosbridge stand-in: it accepts one client
//! at a time, records every frame the client writes and lets the test push
//! frames or drop the socket.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use rosbridge_client::{ConnectionListener, Error, GoalSnapshot};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Default wait for anything a test expects to happen.
pub const WAIT: Duration = Duration::from_secs(5);

// ============================================================================
// MockRosbridge
// ============================================================================

enum ServerCommand {
    Push(String),
    Close,
}

/// In-process rosbridge server.
pub struct MockRosbridge {
    addr: SocketAddr,
    received: mpsc::UnboundedReceiver<Value>,
    commands: mpsc::UnboundedSender<ServerCommand>,
    accepted: Arc<AtomicUsize>,
}

impl MockRosbridge {
    /// Binds to an ephemeral port and starts serving.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let (received_tx, received) = mpsc::unbounded_channel();
        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let accepted = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&accepted);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let Ok(ws) = accept_async(stream).await else {
                    continue;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let (mut write, mut read) = ws.split();

                loop {
                    tokio::select! {
                        message = read.next() => match message {
                            Some(Ok(Message::Text(text))) => {
                                if let Ok(value) = serde_json::from_str::<Value>(text.as_str()) {
                                    let _ = received_tx.send(value);
                                }
                            }
                            Some(Ok(_)) => {}
                            _ => break,
                        },
                        command = command_rx.recv() => match command {
                            Some(ServerCommand::Push(text)) => {
                                if write.send(Message::Text(text.into())).await.is_err() {
                                    break;
                                }
                            }
                            Some(ServerCommand::Close) => {
                                let _ = write.send(Message::Close(None)).await;
                                break;
                            }
                            None => return,
                        },
                    }
                }
            }
        });

        Self {
            addr,
            received,
            commands,
            accepted,
        }
    }

    /// `ws://` URL of the server.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Number of WebSocket sessions accepted so far.
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Sends a frame to the connected client.
    pub fn push(&self, frame: Value) {
        let _ = self.commands.send(ServerCommand::Push(frame.to_string()));
    }

    /// Sends raw text to the connected client.
    pub fn push_text(&self, text: &str) {
        let _ = self.commands.send(ServerCommand::Push(text.to_string()));
    }

    /// Closes the current session from the server side.
    pub fn close(&self) {
        let _ = self.commands.send(ServerCommand::Close);
    }

    /// Next frame written by the client.
    pub async fn next_frame(&mut self) -> Value {
        timeout(WAIT, self.received.recv())
            .await
            .expect("frame within timeout")
            .expect("server running")
    }

    /// Next frame with the given `op`, skipping others.
    pub async fn next_op(&mut self, op: &str) -> Value {
        loop {
            let frame = self.next_frame().await;
            if frame["op"] == op {
                return frame;
            }
        }
    }

    /// Returns `true` if the client writes nothing within `window`.
    pub async fn is_silent_for(&mut self, window: Duration) -> bool {
        timeout(window, self.received.recv()).await.is_err()
    }
}

// ============================================================================
// Frames
// ============================================================================

/// `/robot_pose` frame.
pub fn pose_frame(x: f64, y: f64, qz: f64, qw: f64) -> Value {
    json!({
        "op": "publish",
        "topic": "/robot_pose",
        "msg": {
            "header": { "frame_id": "map" },
            "pose": {
                "position": { "x": x, "y": y, "z": 0.0 },
                "orientation": { "x": 0.0, "y": 0.0, "z": qz, "w": qw }
            }
        }
    })
}

/// Navigation status frame with `(goal id, code)` entries.
pub fn status_frame(entries: &[(&str, u8)]) -> Value {
    let list: Vec<Value> = entries
        .iter()
        .map(|(id, code)| {
            json!({
                "goal_info": { "goal_id": { "uuid": id } },
                "status": code
            })
        })
        .collect();

    json!({
        "op": "publish",
        "topic": "/navigate_to_pose/_action/status",
        "msg": { "status_list": list }
    })
}

// ============================================================================
// Recorder
// ============================================================================

/// Listener that forwards every callback as a short label.
pub struct Recorder {
    events: mpsc::UnboundedSender<String>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }
}

impl ConnectionListener for Recorder {
    fn on_connected(&self) {
        let _ = self.events.send("connected".into());
    }

    fn on_disconnected(&self) {
        let _ = self.events.send("disconnected".into());
    }

    fn on_message_received(&self, _text: &str) {
        let _ = self.events.send("message".into());
    }

    fn on_error(&self, _error: &Error) {
        let _ = self.events.send("error".into());
    }

    fn on_goal_status(&self, snapshot: &GoalSnapshot) {
        let _ = self.events.send(format!("goal:{}", snapshot.status));
    }
}

/// Waits for a label, skipping `message` events.
pub async fn expect_event(rx: &mut mpsc::UnboundedReceiver<String>, expected: &str) {
    loop {
        let event = timeout(WAIT, rx.recv())
            .await
            .expect("event within timeout")
            .expect("recorder alive");
        if event == expected {
            return;
        }
        assert_eq!(event, "message", "unexpected event while waiting for {expected}");
    }
}

/// Returns an address nothing listens on.
pub async fn refused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("ws://{addr}")
}

/// Polls `condition` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let polled = timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(polled.is_ok(), "condition not met within {WAIT:?}");
}
