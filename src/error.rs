//! Monitor-specific error types.
//!
//! Configuration validation is the only failure a caller ever sees; probe and
//! subscriber faults are absorbed internally so the monitor keeps polling.

use thiserror::Error;

/// Errors that can occur when configuring a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// A user-supplied interval/retries/timeout value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_configuration_display() {
        let err = MonitorError::InvalidConfiguration("interval must be at least 1 second".into());
        assert!(err.to_string().contains("invalid configuration"));
        assert!(err.to_string().contains("interval"));
    }
}
