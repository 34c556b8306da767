//! uptrack - Endpoint Reachability Monitoring
//!
//! This crate continuously determines whether a remote endpoint (hostname or
//! address) is network-reachable using active ICMP echo probing on an
//! adaptive schedule, and exposes a debounced accessible/not-accessible
//! signal plus latency samples to observers. It is meant to live inside a
//! long-lived host process that needs to react quickly to connectivity loss
//! and restoration without flooding the network with probes.
//!
//! # Architecture
//!
//! - **Monitor**: probe scheduling, failure hysteresis, and change
//!   notification for exactly one endpoint per instance
//! - **Transport**: the [`ProbeTransport`] boundary with a default ICMP echo
//!   implementation
//! - **Metrics**: the [`MetricsSink`] boundary receiving latency samples and
//!   availability events
//! - **Signal**: an external network-availability feed that shortens
//!   recovery detection and short-circuits the debounce when the local link
//!   is gone
//!
//! # Example
//!
//! ```rust,no_run
//! use uptrack::{Monitor, MonitorConfig, NetworkSignal};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let (signal, watch) = NetworkSignal::new();
//!
//!     let monitor = Monitor::builder(
//!         MonitorConfig::new("gateway.example.com")
//!             .with_interval(Duration::from_secs(30))
//!             .with_retries(3)
//!             .with_timeout(Duration::from_secs(10)),
//!     )
//!     .network_watch(watch)
//!     .build()?;
//!
//!     monitor.on_accessible_changed(|| println!("connectivity changed"));
//!     monitor.start();
//!
//!     // Elsewhere: feed the monitor local link changes.
//!     signal.set_available(true);
//!
//!     // Poll the debounced flag as often as you like; it is lock-free.
//!     let _up = monitor.accessible();
//!     Ok(())
//! }
//! ```

mod error;
pub mod metrics;
pub mod monitor;
pub mod signal;
pub mod transport;

pub use error::MonitorError;
pub use metrics::{MetricsSink, TracingSink};
pub use monitor::{Monitor, MonitorBuilder, MonitorConfig};
pub use signal::{NetworkSignal, NetworkWatch};
pub use transport::{IcmpTransport, ProbeError, ProbeErrorKind, ProbeTransport};
