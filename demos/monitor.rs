//! Live rosbridge monitor.
//!
//! Demonstrates:
//! - Building a ConnectionManager with a custom reconnect policy
//! - Registering a ConnectionListener
//! - Watching robot pose and goal status
//! - Optionally sending one navigation goal
//!
//! Usage:
//!   cargo run --example monitor -- ws://192.168.0.10:9090
//!   cargo run --example monitor -- ws://192.168.0.10:9090 --goal 2.0 1.0
//!   cargo run --example monitor -- ws://192.168.0.10:9090 --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use rosbridge_client::{
    ConnectionListener, ConnectionManager, Error, GoalSnapshot, Result,
};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://127.0.0.1:9090";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    url: String,
    debug: bool,
    goal: Option<(f64, f64)>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let url = args
            .iter()
            .find(|a| a.starts_with("ws://") || a.starts_with("wss://"))
            .cloned()
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        let goal = args.iter().position(|a| a == "--goal").and_then(|i| {
            let x = args.get(i + 1)?.parse().ok()?;
            let y = args.get(i + 2)?.parse().ok()?;
            Some((x, y))
        });

        Self {
            url,
            debug: args.iter().any(|a| a == "--debug"),
            goal,
        }
    }
}

// ============================================================================
// Listener
// ============================================================================

struct Printer;

impl ConnectionListener for Printer {
    fn on_connected(&self) {
        println!("[Session] connected");
    }

    fn on_disconnected(&self) {
        println!("[Session] disconnected");
    }

    fn on_error(&self, error: &Error) {
        println!("[Session] error: {error}");
    }

    fn on_goal_status(&self, snapshot: &GoalSnapshot) {
        match &snapshot.id {
            Some(id) => println!("[Goal] {} ({id})", snapshot.status),
            None => println!("[Goal] {}", snapshot.status),
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== rosbridge monitor: {} ===\n", args.url);

    let manager = ConnectionManager::builder()
        .reconnect_base_delay(Duration::from_secs(1))
        .max_reconnect_attempts(8)
        .build()?;
    manager.add_listener(Arc::new(Printer));

    manager.connect(&args.url)?;
    manager.wait_connected(Duration::from_secs(10)).await?;

    if let Some((x, y)) = args.goal {
        let goal = manager.send_navigate_to_pose(x, y, 0.0)?;
        println!("[Goal] sent {goal} -> ({x:.2}, {y:.2})");
    }

    println!("Press Ctrl+C to exit...");
    let mut ticker = tokio::time::interval(Duration::from_secs(2));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(pose) = manager.latest_pose() {
                    println!(
                        "[Pose] x={:.2} y={:.2} yaw={:.2}",
                        pose.x, pose.y, pose.yaw
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    manager.disconnect();
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "rosbridge_client=debug"
    } else {
        "rosbridge_client=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
