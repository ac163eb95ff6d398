//! Latest robot pose.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;

use crate::protocol::RobotPose;

// ============================================================================
// PositionCache
// ============================================================================

/// Last-write-wins store for the robot pose.
///
/// Reads copy the whole pose out under a short lock, so a reader never sees
/// a half-updated value.
#[derive(Debug, Default)]
pub struct PositionCache {
    pose: RwLock<Option<RobotPose>>,
}

impl PositionCache {
    /// Creates an empty cache.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the stored pose.
    #[inline]
    pub fn update(&self, pose: RobotPose) {
        *self.pose.write() = Some(pose);
    }

    /// Returns the latest pose, if any has arrived.
    #[inline]
    #[must_use]
    pub fn latest(&self) -> Option<RobotPose> {
        *self.pose.read()
    }

    /// Forgets the stored pose.
    #[inline]
    pub fn clear(&self) {
        *self.pose.write() = None;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    #[test]
    fn test_empty_cache() {
        assert_eq!(PositionCache::new().latest(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let cache = PositionCache::new();
        cache.update(RobotPose::new(1.0, 2.0, 0.1));
        cache.update(RobotPose::new(3.0, 4.0, 0.2));
        assert_eq!(cache.latest(), Some(RobotPose::new(3.0, 4.0, 0.2)));

        cache.clear();
        assert_eq!(cache.latest(), None);
    }

    #[test]
    fn test_concurrent_readers_see_whole_poses() {
        let cache = Arc::new(PositionCache::new());

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    let v = f64::from(i);
                    cache.update(RobotPose::new(v, v, v));
                }
            })
        };

        for _ in 0..1000 {
            if let Some(pose) = cache.latest() {
                assert_eq!(pose.x, pose.y);
                assert_eq!(pose.y, pose.yaw);
            }
        }

        writer.join().expect("writer thread");
    }
}
