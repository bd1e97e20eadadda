//! Session cookie and lifetime configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::store::ExpiryPolicy;

/// Session configuration.
///
/// Durations use humantime notation (`"30m"`, `"2h"`, `"1day"`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id.
    pub cookie_name: String,

    /// Mark the cookie `Secure`. Enable when served over HTTPS.
    pub secure_cookies: bool,

    /// A session unused for this long is dropped.
    #[serde(with = "humantime_serde")]
    pub idle_timeout: Duration,

    /// A session older than this is dropped regardless of activity.
    #[serde(with = "humantime_serde")]
    pub absolute_timeout: Duration,

    /// A session without a user (it only carries flash messages) unused for
    /// this long is dropped.
    #[serde(with = "humantime_serde")]
    pub anonymous_timeout: Duration,

    /// How often expired sessions are purged from the store.
    #[serde(with = "humantime_serde")]
    pub sweep_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "ketoan_session".to_string(),
            secure_cookies: false,
            idle_timeout: Duration::from_secs(2 * 3600),
            absolute_timeout: Duration::from_secs(24 * 3600),
            anonymous_timeout: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

impl SessionConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidConfig` if the cookie name is empty or
    /// contains characters not allowed in a cookie name, if any duration is
    /// zero, or if the idle or anonymous timeout exceeds the absolute timeout.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.cookie_name.is_empty() {
            return Err(SessionError::InvalidConfig(
                "cookie_name cannot be empty".to_string(),
            ));
        }
        if !self
            .cookie_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(SessionError::InvalidConfig(format!(
                "cookie_name '{}' may only contain ASCII letters, digits, '_' and '-'",
                self.cookie_name
            )));
        }
        if self.idle_timeout.is_zero()
            || self.absolute_timeout.is_zero()
            || self.anonymous_timeout.is_zero()
        {
            return Err(SessionError::InvalidConfig(
                "session timeouts must be > 0".to_string(),
            ));
        }
        if self.idle_timeout > self.absolute_timeout {
            return Err(SessionError::InvalidConfig(
                "idle_timeout must be <= absolute_timeout".to_string(),
            ));
        }
        if self.anonymous_timeout > self.absolute_timeout {
            return Err(SessionError::InvalidConfig(
                "anonymous_timeout must be <= absolute_timeout".to_string(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(SessionError::InvalidConfig(
                "sweep_interval must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy {
            idle_timeout: self.idle_timeout,
            absolute_timeout: self.absolute_timeout,
            anonymous_timeout: self.anonymous_timeout,
        }
    }
}
