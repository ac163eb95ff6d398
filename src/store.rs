//! Saved waypoints.
//!
//! A [`Waypoint`] is a named pose the robot can be sent back to. Storage is
//! behind the async [`PositionStore`] trait so hosts can plug in their own
//! database; [`InMemoryPositionStore`] covers tests and simple tools.

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result, duration_ms};
use crate::protocol::Quaternion;
use crate::tracking::PositionCache;

// ============================================================================
// Waypoint
// ============================================================================

/// A named pose in the map frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Store-assigned id; `0` until inserted.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// X position (m).
    pub x: f64,
    /// Y position (m).
    pub y: f64,
    /// Z position (m).
    pub z: f64,
    /// Heading (rad).
    pub yaw: f64,
    /// Patrol order, ascending.
    pub sequence: u32,
    /// Creation time, milliseconds since the Unix epoch.
    pub created_ms: u64,
}

impl Waypoint {
    /// Creates an unsaved waypoint.
    #[must_use]
    pub fn new(name: impl Into<String>, x: f64, y: f64, yaw: f64, sequence: u32) -> Self {
        Self {
            id: 0,
            name: name.into(),
            x,
            y,
            z: 0.0,
            yaw,
            sequence,
            created_ms: now_ms(),
        }
    }

    /// Captures the robot's current pose.
    ///
    /// Returns `None` if no pose has arrived yet.
    #[must_use]
    pub fn capture(name: impl Into<String>, sequence: u32, positions: &PositionCache) -> Option<Self> {
        let pose = positions.latest()?;
        Some(Self::new(name, pose.x, pose.y, pose.yaw, sequence))
    }

    /// Orientation as a planar quaternion.
    #[inline]
    #[must_use]
    pub fn orientation(&self) -> Quaternion {
        Quaternion::from_yaw(self.yaw)
    }

    /// `z` component of the heading quaternion.
    #[inline]
    #[must_use]
    pub fn yaw_z(&self) -> f64 {
        self.orientation().z
    }

    /// `w` component of the heading quaternion.
    #[inline]
    #[must_use]
    pub fn yaw_w(&self) -> f64 {
        self.orientation().w
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(duration_ms)
        .unwrap_or_default()
}

// ============================================================================
// PositionStore
// ============================================================================

/// Persistent waypoint storage.
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Returns all waypoints ordered by `sequence`.
    async fn get_all(&self) -> Result<Vec<Waypoint>>;

    /// Returns one waypoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaypointNotFound`] if `id` is unknown.
    async fn get(&self, id: u64) -> Result<Waypoint>;

    /// Stores a new waypoint and returns its id. The `id` field of the
    /// argument is ignored.
    async fn insert(&self, waypoint: Waypoint) -> Result<u64>;

    /// Replaces a stored waypoint, matched by `id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaypointNotFound`] if `id` is unknown.
    async fn update(&self, waypoint: Waypoint) -> Result<()>;

    /// Deletes a waypoint.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WaypointNotFound`] if `id` is unknown.
    async fn delete(&self, id: u64) -> Result<()>;

    /// Highest `sequence` in the store.
    async fn max_sequence(&self) -> Result<Option<u32>> {
        Ok(self.get_all().await?.iter().map(|w| w.sequence).max())
    }
}

// ============================================================================
// InMemoryPositionStore
// ============================================================================

/// [`PositionStore`] held in memory.
#[derive(Debug)]
pub struct InMemoryPositionStore {
    waypoints: RwLock<FxHashMap<u64, Waypoint>>,
    next_id: AtomicU64,
}

impl Default for InMemoryPositionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPositionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            waypoints: RwLock::new(FxHashMap::default()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored waypoints.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.read().is_empty()
    }
}

#[async_trait]
impl PositionStore for InMemoryPositionStore {
    async fn get_all(&self) -> Result<Vec<Waypoint>> {
        let mut all: Vec<Waypoint> = self.waypoints.read().values().cloned().collect();
        all.sort_by_key(|w| (w.sequence, w.id));
        Ok(all)
    }

    async fn get(&self, id: u64) -> Result<Waypoint> {
        self.waypoints
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::waypoint_not_found(id))
    }

    async fn insert(&self, mut waypoint: Waypoint) -> Result<u64> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        waypoint.id = id;
        debug!(id, name = %waypoint.name, "Waypoint stored");
        self.waypoints.write().insert(id, waypoint);
        Ok(id)
    }

    async fn update(&self, waypoint: Waypoint) -> Result<()> {
        let mut waypoints = self.waypoints.write();
        match waypoints.get_mut(&waypoint.id) {
            Some(slot) => {
                *slot = waypoint;
                Ok(())
            }
            None => Err(Error::waypoint_not_found(waypoint.id)),
        }
    }

    async fn delete(&self, id: u64) -> Result<()> {
        self.waypoints
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::waypoint_not_found(id))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::RobotPose;

    #[test]
    fn test_quaternion_components() {
        let waypoint = Waypoint::new("dock", 0.0, 0.0, std::f64::consts::PI, 1);
        assert!(waypoint.yaw_z() > 0.999);
        assert!(waypoint.yaw_w().abs() < 1e-9);
    }

    #[test]
    fn test_capture_requires_pose() {
        let cache = PositionCache::new();
        assert!(Waypoint::capture("here", 1, &cache).is_none());

        cache.update(RobotPose::new(1.5, -0.5, 0.3));
        let waypoint = Waypoint::capture("here", 4, &cache).expect("pose available");
        assert_eq!(waypoint.x, 1.5);
        assert_eq!(waypoint.y, -0.5);
        assert_eq!(waypoint.yaw, 0.3);
        assert_eq!(waypoint.sequence, 4);
        assert_eq!(waypoint.id, 0);
    }

    #[tokio::test]
    async fn test_crud() {
        let store = InMemoryPositionStore::new();
        let a = store.insert(Waypoint::new("a", 1.0, 1.0, 0.0, 2)).await.expect("insert");
        let b = store.insert(Waypoint::new("b", 2.0, 2.0, 0.0, 1)).await.expect("insert");
        assert_ne!(a, b);

        let names: Vec<String> = store
            .get_all()
            .await
            .expect("get_all")
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["b", "a"]);

        let mut first = store.get(a).await.expect("get");
        first.name = "renamed".into();
        store.update(first).await.expect("update");
        assert_eq!(store.get(a).await.expect("get").name, "renamed");

        store.delete(b).await.expect("delete");
        assert_eq!(store.len(), 1);
        assert_eq!(store.max_sequence().await.expect("max"), Some(2));
    }

    #[tokio::test]
    async fn test_missing_ids() {
        let store = InMemoryPositionStore::new();
        assert!(matches!(store.get(9).await, Err(Error::WaypointNotFound { id: 9 })));
        assert!(store.delete(9).await.is_err());

        let mut ghost = Waypoint::new("ghost", 0.0, 0.0, 0.0, 0);
        ghost.id = 9;
        assert!(store.update(ghost).await.is_err());
        assert_eq!(store.max_sequence().await.expect("max"), None);
    }
}
