//! Builder pattern for manager configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`ConnectionManager`] instances.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use rosbridge_client::ConnectionManager;
//!
//! # fn example() -> rosbridge_client::Result<()> {
//! let manager = ConnectionManager::builder()
//!     .reconnect_base_delay(Duration::from_millis(500))
//!     .max_reconnect_attempts(8)
//!     .subscribe("/scan", "sensor_msgs/LaserScan")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::CovarianceConfig;
use crate::transport::ReconnectPolicy;

use super::core::ConnectionManager;
use super::options::ManagerOptions;

// ============================================================================
// Constants
// ============================================================================

/// Largest accepted attempt count; keeps `base * 2^n` well inside `Duration`.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 16;

// ============================================================================
// ConnectionManagerBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionManager`].
///
/// Use [`ConnectionManager::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct ConnectionManagerBuilder {
    options: ManagerOptions,
}

// ============================================================================
// ConnectionManagerBuilder Implementation
// ============================================================================

impl ConnectionManagerBuilder {
    /// Creates a builder with default options.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ManagerOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the reconnect policy.
    #[inline]
    #[must_use]
    pub fn reconnect_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.options.reconnect = policy;
        self
    }

    /// Sets the delay before the first reconnect attempt.
    #[inline]
    #[must_use]
    pub fn reconnect_base_delay(mut self, delay: Duration) -> Self {
        let max = self.options.reconnect.max_attempts();
        self.options.reconnect = ReconnectPolicy::new(delay, max);
        self
    }

    /// Sets the number of reconnect attempts per outage.
    #[inline]
    #[must_use]
    pub fn max_reconnect_attempts(mut self, attempts: u32) -> Self {
        let base = self.options.reconnect.base_delay();
        self.options.reconnect = ReconnectPolicy::new(base, attempts);
        self
    }

    /// Disables automatic reconnection.
    #[inline]
    #[must_use]
    pub fn no_reconnect(self) -> Self {
        self.max_reconnect_attempts(0)
    }

    /// Sets the initial pose variances.
    ///
    /// # Arguments
    ///
    /// * `positional` - x and y variance (m^2)
    /// * `orientation` - yaw variance (rad^2)
    #[inline]
    #[must_use]
    pub fn covariance(mut self, positional: f64, orientation: f64) -> Self {
        self.options.covariance = CovarianceConfig {
            positional_variance: positional,
            orientation_variance: orientation,
        };
        self
    }

    /// Sets the frame id stamped on outgoing poses.
    #[inline]
    #[must_use]
    pub fn frame_id(mut self, frame_id: impl Into<String>) -> Self {
        self.options.frame_id = frame_id.into();
        self
    }

    /// Sets the navigation action name and type.
    #[inline]
    #[must_use]
    pub fn navigate_action(mut self, action: impl Into<String>, action_type: impl Into<String>) -> Self {
        self.options.navigate_action = action.into();
        self.options.navigate_action_type = action_type.into();
        self
    }

    /// Sets the cancel service name.
    #[inline]
    #[must_use]
    pub fn cancel_service(mut self, service: impl Into<String>) -> Self {
        self.options.cancel_service = service.into();
        self
    }

    /// Sets the WebSocket handshake limit.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Enables the idle watchdog.
    #[inline]
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.options.idle_timeout = Some(timeout);
        self
    }

    /// Adds a subscription that is issued on every (re)connect.
    #[inline]
    #[must_use]
    pub fn subscribe(mut self, topic: impl Into<String>, msg_type: impl Into<String>) -> Self {
        self.options.subscriptions.push((topic.into(), msg_type.into()));
        self
    }

    /// Drops the default robot pose and navigation status subscriptions.
    #[inline]
    #[must_use]
    pub fn without_default_subscriptions(mut self) -> Self {
        self.options.subscriptions.clear();
        self
    }

    /// Builds the manager with validation.
    ///
    /// The manager starts disconnected; call
    /// [`ConnectionManager::connect`] to open a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if any option is out of range.
    pub fn build(self) -> Result<ConnectionManager> {
        self.validate_reconnect()?;
        self.validate_covariance()?;
        self.validate_names()?;
        self.validate_timeouts()?;

        Ok(ConnectionManager::new(self.options))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ConnectionManagerBuilder {
    /// Validates the reconnect policy.
    fn validate_reconnect(&self) -> Result<()> {
        let policy = self.options.reconnect;

        if policy.base_delay().is_zero() {
            return Err(Error::config(
                "Reconnect base delay must be greater than zero.\n\
                 Use .no_reconnect() to disable reconnection instead.",
            ));
        }

        if policy.max_attempts() > MAX_RECONNECT_ATTEMPTS {
            return Err(Error::config(format!(
                "Reconnect attempts must be at most {MAX_RECONNECT_ATTEMPTS}, got {}",
                policy.max_attempts()
            )));
        }

        Ok(())
    }

    /// Validates the covariance variances.
    fn validate_covariance(&self) -> Result<()> {
        let covariance = self.options.covariance;

        for (name, value) in [
            ("positional", covariance.positional_variance),
            ("orientation", covariance.orientation_variance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::config(format!(
                    "The {name} variance must be finite and non-negative, got {value}"
                )));
            }
        }

        Ok(())
    }

    /// Validates topic, action and service names.
    fn validate_names(&self) -> Result<()> {
        let options = &self.options;

        if options.frame_id.is_empty() {
            return Err(Error::config("Frame id must not be empty"));
        }

        let names = [
            ("navigate action", options.navigate_action.as_str()),
            ("cancel service", options.cancel_service.as_str()),
        ];
        let topics = options
            .subscriptions
            .iter()
            .map(|(topic, _)| ("subscription topic", topic.as_str()));

        for (kind, name) in names.into_iter().chain(topics) {
            if !name.starts_with('/') {
                return Err(Error::config(format!(
                    "The {kind} '{name}' must be an absolute name starting with '/'"
                )));
            }
        }

        if let Some((topic, _)) = options.subscriptions.iter().find(|(_, ty)| ty.is_empty()) {
            return Err(Error::config(format!(
                "Subscription to '{topic}' needs a message type"
            )));
        }

        Ok(())
    }

    /// Validates timeouts.
    fn validate_timeouts(&self) -> Result<()> {
        if self.options.connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }

        if self.options.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::config("Idle timeout must be greater than zero"));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_default_builds() {
        assert_ok!(ConnectionManagerBuilder::new().build());
    }

    #[test]
    fn test_reconnect_setters_compose() {
        let builder = ConnectionManagerBuilder::new()
            .reconnect_base_delay(Duration::from_millis(100))
            .max_reconnect_attempts(3);
        assert_eq!(
            builder.options.reconnect,
            ReconnectPolicy::new(Duration::from_millis(100), 3)
        );
    }

    #[test]
    fn test_zero_base_delay_rejected() {
        let err = ConnectionManagerBuilder::new()
            .reconnect_base_delay(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_too_many_attempts_rejected() {
        assert_err!(
            ConnectionManagerBuilder::new()
                .max_reconnect_attempts(MAX_RECONNECT_ATTEMPTS + 1)
                .build()
        );
    }

    #[test]
    fn test_no_reconnect_is_valid() {
        let builder = ConnectionManagerBuilder::new().no_reconnect();
        assert_eq!(builder.options.reconnect.max_attempts(), 0);
        assert_ok!(builder.build());
    }

    #[test]
    fn test_bad_covariance_rejected() {
        assert_err!(ConnectionManagerBuilder::new().covariance(-1.0, 0.1).build());
        assert_err!(ConnectionManagerBuilder::new().covariance(0.1, f64::NAN).build());
        assert_ok!(ConnectionManagerBuilder::new().covariance(0.0, 0.0).build());
    }

    #[test]
    fn test_relative_names_rejected() {
        let err = ConnectionManagerBuilder::new()
            .cancel_service("cancel_goal")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("cancel_goal"));

        assert!(ConnectionManagerBuilder::new().subscribe("scan", "sensor_msgs/LaserScan").build().is_err());
        assert!(ConnectionManagerBuilder::new().subscribe("/scan", "").build().is_err());
    }

    #[test]
    fn test_zero_idle_timeout_rejected() {
        assert!(ConnectionManagerBuilder::new().idle_timeout(Duration::ZERO).build().is_err());
    }

    #[test]
    fn test_without_default_subscriptions() {
        let builder = ConnectionManagerBuilder::new().without_default_subscriptions();
        assert!(builder.options.subscriptions.is_empty());
    }
}
