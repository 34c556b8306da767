//! ICMP echo probe transport.
//!
//! Sends one ICMP echo request per probe and measures the round-trip time.

use std::net::IpAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use surge_ping::{Client, Config, PingIdentifier, PingSequence, SurgeError, ICMP};
use tokio::time::timeout;

use super::{ProbeError, ProbeTransport};

/// ICMP echo probe transport backed by `surge-ping`.
///
/// A fresh ICMP client is created per probe so the socket kind always matches
/// the resolved address family (V4 vs V6). Echo sequence numbers increment
/// per instance so replies from a slow prior probe are not mistaken for the
/// current one.
pub struct IcmpTransport {
    identifier: PingIdentifier,
    sequence: AtomicU16,
}

impl IcmpTransport {
    /// Create a new ICMP transport with a random echo identifier.
    pub fn new() -> Self {
        Self {
            identifier: PingIdentifier(rand::random()),
            sequence: AtomicU16::new(0),
        }
    }
}

impl Default for IcmpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IcmpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IcmpTransport")
            .field("identifier", &self.identifier.0)
            .finish_non_exhaustive()
    }
}

/// Resolve the target to an IP address, skipping DNS for literal addresses.
async fn resolve_host(host: &str) -> Result<IpAddr, std::io::Error> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs = tokio::net::lookup_host(format!("{host}:0")).await?;
    addrs
        .into_iter()
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses found"))
}

#[async_trait::async_trait]
impl ProbeTransport for IcmpTransport {
    async fn send_probe(
        &self,
        target: &str,
        probe_timeout: Duration,
        payload: &[u8],
    ) -> Result<Duration, ProbeError> {
        let ip_addr = resolve_host(target).await.map_err(ProbeError::Resolve)?;

        // Create ICMP client based on IP version
        let client = match ip_addr {
            IpAddr::V4(_) => Client::new(&Config::default()),
            IpAddr::V6(_) => Client::new(&Config::builder().kind(ICMP::V6).build()),
        }
        .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let mut pinger = client.pinger(ip_addr, self.identifier).await;
        pinger.timeout(probe_timeout);

        let sequence = PingSequence(self.sequence.fetch_add(1, Ordering::Relaxed));

        // The pinger enforces its own deadline; the outer timeout is a
        // backstop so a stalled socket cannot hold the schedule open.
        let result = timeout(probe_timeout, pinger.ping(sequence, payload)).await;

        match result {
            Ok(Ok((_, rtt))) => Ok(rtt),
            Ok(Err(SurgeError::Timeout { .. })) => Err(ProbeError::Timeout),
            Ok(Err(SurgeError::IOError(e))) => Err(ProbeError::Transport(e.to_string())),
            Ok(Err(e)) => Err(ProbeError::Unreachable(e.to_string())),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}
