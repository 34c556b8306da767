//! Monitor configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Default interval between steady-state checks (30 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(30);

/// Default probe reply timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of consecutive failures tolerated before declaring the
/// endpoint down.
pub const DEFAULT_RETRIES: u32 = 3;

/// Minimum allowed interval and timeout (1 second).
pub const MIN_DURATION: Duration = Duration::from_secs(1);

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

/// Configuration for a connectivity monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Target host (hostname or IP address).
    pub target: String,
    /// Interval between steady-state checks (default: 30s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Consecutive failures tolerated before the endpoint is declared down
    /// (default: 3).
    #[serde(default = "default_retries")]
    pub retries: u32,
    /// Probe reply timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl MonitorConfig {
    /// Create a configuration for the given target with default thresholds.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            interval: DEFAULT_INTERVAL,
            retries: DEFAULT_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), MonitorError> {
        if self.target.trim().is_empty() {
            return Err(MonitorError::InvalidConfiguration(
                "target must be a non-empty hostname or address".to_string(),
            ));
        }
        validate_duration("interval", self.interval)?;
        validate_duration("timeout", self.timeout)?;
        validate_retries(self.retries)?;
        Ok(())
    }

    /// Set the check interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the failure threshold.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Validate an interval/timeout value (must be at least 1 second).
pub(crate) fn validate_duration(name: &str, value: Duration) -> Result<(), MonitorError> {
    if value < MIN_DURATION {
        return Err(MonitorError::InvalidConfiguration(format!(
            "{name} must be at least 1 second"
        )));
    }
    Ok(())
}

/// Validate a retry threshold (must be at least 1).
pub(crate) fn validate_retries(value: u32) -> Result<(), MonitorError> {
    if value < 1 {
        return Err(MonitorError::InvalidConfiguration(
            "retries must be at least 1".to_string(),
        ));
    }
    Ok(())
}
