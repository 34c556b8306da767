//! Connectivity Monitor Core
//!
//! The adaptive probe scheduler, failure-hysteresis state machine, and
//! subscriber notification that turn noisy individual probe results into a
//! stable accessible/not-accessible signal.
//!
//! # Architecture
//!
//! - [`MonitorConfig`]: target plus interval/retries/timeout thresholds
//! - [`Monitor`]: one instance per monitored endpoint
//! - [`MonitorBuilder`]: wires in the probe transport, metrics sink, and
//!   network-availability watch
//!
//! # Example
//!
//! ```rust,no_run
//! use uptrack::{Monitor, MonitorConfig};
//! use std::time::Duration;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let monitor = Monitor::new(
//!     MonitorConfig::new("8.8.8.8").with_interval(Duration::from_secs(15)),
//! )?;
//! monitor.on_accessible_changed(|| println!("status changed"));
//! monitor.start();
//! # Ok(())
//! # }
//! ```

mod config;
mod engine;
mod state;

pub use config::{
    MonitorConfig, DEFAULT_INTERVAL, DEFAULT_RETRIES, DEFAULT_TIMEOUT, MIN_DURATION,
};
pub use engine::{Monitor, MonitorBuilder, PROBE_PAYLOAD};
