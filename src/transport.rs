//! Probe transport boundary.
//!
//! The monitor core never talks to the network directly; it issues probes
//! through the [`ProbeTransport`] trait and consumes one asynchronous outcome
//! per probe. The default implementation is ICMP echo via `surge-ping`:
//!
//! - [`IcmpTransport`]: ICMP echo probe with hostname resolution

mod icmp;

use std::time::Duration;

use strum::{AsRefStr, Display};
use thiserror::Error;

pub use icmp::IcmpTransport;

/// Errors that can occur while issuing or completing a probe.
///
/// All variants are treated as a failure outcome by the monitor; none of them
/// propagate to the caller or stall the schedule.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Hostname could not be resolved to an address.
    #[error("failed to resolve target: {0}")]
    Resolve(#[source] std::io::Error),

    /// No reply arrived within the probe deadline.
    #[error("probe timed out")]
    Timeout,

    /// The endpoint or an intermediate hop reported the target unreachable.
    #[error("target unreachable: {0}")]
    Unreachable(String),

    /// The transport itself failed (socket creation, send error, etc.).
    #[error("transport error: {0}")]
    Transport(String),
}

impl ProbeError {
    /// Classification tag for logging and metric fields.
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            Self::Resolve(_) => ProbeErrorKind::Resolve,
            Self::Timeout => ProbeErrorKind::Timeout,
            Self::Unreachable(_) => ProbeErrorKind::Unreachable,
            Self::Transport(_) => ProbeErrorKind::Transport,
        }
    }
}

/// Probe failure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ProbeErrorKind {
    /// Name resolution failure (dispatch failure).
    Resolve,
    /// Deadline elapsed without a reply.
    Timeout,
    /// Destination or network unreachable.
    Unreachable,
    /// Any other transport-level failure.
    Transport,
}

/// Transport used to issue reachability probes.
///
/// Implementations send one echo-style request with the given payload and
/// deadline and report either the measured round-trip time or a classified
/// failure. A synchronous dispatch failure (e.g. resolver error) is simply an
/// `Err` that resolves quickly.
#[async_trait::async_trait]
pub trait ProbeTransport: Send + Sync + 'static {
    /// Send one probe to `target` and wait up to `timeout` for the reply.
    async fn send_probe(
        &self,
        target: &str,
        timeout: Duration,
        payload: &[u8],
    ) -> Result<Duration, ProbeError>;
}
