//! Monitor engine: adaptive scheduler loop, probe dispatch, and notification.
//!
//! One long-lived task per monitor plays the role of a rearm-able timer: it
//! parks while monitoring is disabled, sleeps for the computed delay while
//! enabled, and dispatches exactly one probe per wakeup. Because dispatch and
//! completion live in the same task, overlapping probes are structurally
//! impossible; everything else (setters, start/stop, the network-signal
//! listener) serializes through one mutex.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::error::MonitorError;
use crate::metrics::{
    MetricsSink, TracingSink, AVAILABILITY_EVENT, LATENCY_METRIC, METRIC_CATEGORY,
};
use crate::signal::NetworkWatch;
use crate::transport::{IcmpTransport, ProbeErrorKind, ProbeTransport};

use super::config::{validate_duration, validate_retries, MonitorConfig};
use super::state::{apply_outcome, next_delay, Transition};

/// Fixed 32-byte payload carried by every probe, in case someone is looking.
pub const PROBE_PAYLOAD: &[u8; 32] = b"uptrack connectivity probe data!";

type Subscriber = Arc<dyn Fn() + Send + Sync>;

/// Mutable state guarded by the single monitor lock.
struct Shared {
    monitoring: bool,
    probe_in_flight: bool,
    failure_count: u32,
    interval: Duration,
    retries: u32,
    timeout: Duration,
    /// Fire the next probe with zero delay regardless of computed state;
    /// set by `start()` so the first check is immediate.
    immediate: bool,
    shutdown: bool,
}

struct Inner {
    target: String,
    /// Written only under the lock; readable lock-free by status pollers.
    accessible: AtomicBool,
    shared: Mutex<Shared>,
    /// Wakes the engine out of a park or a pending wait.
    check_now: Notify,
    subscribers: Mutex<Vec<Subscriber>>,
    transport: Arc<dyn ProbeTransport>,
    metrics: Arc<dyn MetricsSink>,
    network: NetworkWatch,
}

impl Inner {
    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Request an immediate recheck if one can usefully happen right now.
    ///
    /// Ignored while stopped (nothing to arm) or while a probe is in flight
    /// (its completion will re-evaluate the schedule anyway).
    fn request_check(&self) {
        let s = self.shared();
        if s.monitoring && !s.probe_in_flight && !s.shutdown {
            self.check_now.notify_one();
        }
    }

    /// Invoke all subscribers with panic containment.
    fn notify_subscribers(&self) {
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for subscriber in subscribers {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| subscriber())) {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                tracing::error!(
                    host = %self.target,
                    reason = %reason,
                    "accessibility subscriber panicked"
                );
            }
        }
    }
}

/// Monitors one endpoint for reachability.
///
/// Constructed inert; [`start`](Monitor::start) arms an immediate first probe
/// and [`stop`](Monitor::stop) disarms scheduling. The debounced
/// [`accessible`](Monitor::accessible) flag can be polled lock-free at any
/// frequency. Dropping the monitor tears down its scheduling task and
/// unsubscribes from the network signal; an in-flight probe still completes
/// and updates state on its way out.
pub struct Monitor {
    inner: Arc<Inner>,
    signal_listener: JoinHandle<()>,
    // The engine task exits on its own once shutdown is flagged, draining any
    // in-flight probe first, so it is never aborted.
    _engine: JoinHandle<()>,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("target", &self.inner.target)
            .field("accessible", &self.accessible())
            .field("monitoring", &self.monitoring())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Create a monitor with the default ICMP transport and tracing sink.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        Self::builder(config).build()
    }

    /// Create a builder to inject collaborators.
    pub fn builder(config: MonitorConfig) -> MonitorBuilder {
        MonitorBuilder {
            config,
            transport: None,
            metrics: None,
            network: None,
        }
    }

    /// The hostname or address being monitored.
    pub fn target(&self) -> &str {
        &self.inner.target
    }

    /// Whether the endpoint was accessible when last checked (lock-free).
    pub fn accessible(&self) -> bool {
        self.inner.accessible.load(Ordering::Relaxed)
    }

    /// Current consecutive-failure tally.
    pub fn failure_count(&self) -> u32 {
        self.inner.shared().failure_count
    }

    /// Whether the check schedule is active.
    pub fn monitoring(&self) -> bool {
        self.inner.shared().monitoring
    }

    /// Interval between steady-state checks.
    pub fn interval(&self) -> Duration {
        self.inner.shared().interval
    }

    /// Consecutive failures tolerated before the endpoint is declared down.
    pub fn retries(&self) -> u32 {
        self.inner.shared().retries
    }

    /// Probe reply timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.shared().timeout
    }

    /// Set the check interval. Takes effect on the next scheduling decision.
    pub fn set_interval(&self, interval: Duration) -> Result<(), MonitorError> {
        validate_duration("interval", interval)?;
        self.inner.shared().interval = interval;
        Ok(())
    }

    /// Set the failure threshold. Takes effect on the next scheduling decision.
    pub fn set_retries(&self, retries: u32) -> Result<(), MonitorError> {
        validate_retries(retries)?;
        self.inner.shared().retries = retries;
        Ok(())
    }

    /// Set the probe timeout. Does not affect a probe already in flight.
    pub fn set_timeout(&self, timeout: Duration) -> Result<(), MonitorError> {
        validate_duration("timeout", timeout)?;
        self.inner.shared().timeout = timeout;
        Ok(())
    }

    /// Start monitoring, arming an immediate first probe. No-op if already
    /// started.
    pub fn start(&self) {
        {
            let mut s = self.inner.shared();
            if s.shutdown || s.monitoring {
                return;
            }
            s.monitoring = true;
            s.immediate = true;
            tracing::debug!(
                host = %self.inner.target,
                interval = ?s.interval,
                retries = s.retries,
                "starting connectivity monitor"
            );
        }
        self.inner.check_now.notify_one();
    }

    /// Stop monitoring, disarming the schedule. No-op if already stopped.
    ///
    /// An in-flight probe still completes and updates state; it just will not
    /// schedule a successor.
    pub fn stop(&self) {
        {
            let mut s = self.inner.shared();
            if !s.monitoring {
                return;
            }
            s.monitoring = false;
            tracing::debug!(
                host = %self.inner.target,
                interval = ?s.interval,
                retries = s.retries,
                "stopping connectivity monitor"
            );
        }
        // Collapse a pending wait so the engine parks promptly.
        self.inner.check_now.notify_one();
    }

    /// Request an immediate recheck, pre-empting a pending wait.
    ///
    /// Ignored while stopped or while a probe is already in flight.
    pub fn check_now(&self) {
        self.inner.request_check();
    }

    /// Subscribe to accessibility changes.
    ///
    /// The callback carries no payload; read [`accessible`](Monitor::accessible)
    /// from it. Callbacks run synchronously on the engine task with panic
    /// containment, so keep them short.
    pub fn on_accessible_changed(&self, callback: impl Fn() + Send + Sync + 'static) {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        // Route through stop() so teardown emits the same record as an
        // explicit stop.
        self.stop();
        self.inner.shared().shutdown = true;
        self.inner.check_now.notify_one();
        self.signal_listener.abort();
    }
}

/// Builder for wiring a [`Monitor`] to its collaborators.
pub struct MonitorBuilder {
    config: MonitorConfig,
    transport: Option<Arc<dyn ProbeTransport>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    network: Option<NetworkWatch>,
}

impl MonitorBuilder {
    /// Use a custom probe transport instead of ICMP echo.
    pub fn transport(mut self, transport: Arc<dyn ProbeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use a custom metrics sink instead of the tracing sink.
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Subscribe to an external network-availability signal.
    pub fn network_watch(mut self, watch: NetworkWatch) -> Self {
        self.network = Some(watch);
        self
    }

    /// Validate the configuration and spawn the monitor's tasks.
    ///
    /// Must be called within a tokio runtime. The monitor starts inert;
    /// call [`Monitor::start`] to begin probing.
    pub fn build(self) -> Result<Monitor, MonitorError> {
        self.config.validate()?;

        let network = self.network.unwrap_or_else(NetworkWatch::always_available);

        let inner = Arc::new(Inner {
            target: self.config.target,
            accessible: AtomicBool::new(false),
            shared: Mutex::new(Shared {
                monitoring: false,
                probe_in_flight: false,
                failure_count: 0,
                interval: self.config.interval,
                retries: self.config.retries,
                timeout: self.config.timeout,
                immediate: false,
                shutdown: false,
            }),
            check_now: Notify::new(),
            subscribers: Mutex::new(Vec::new()),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(IcmpTransport::new())),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(TracingSink)),
            network: network.clone(),
        });

        let engine = tokio::spawn(run_engine(Arc::clone(&inner)));
        let signal_listener = tokio::spawn(watch_network(Arc::clone(&inner), network));

        Ok(Monitor {
            inner,
            signal_listener,
            _engine: engine,
        })
    }
}

/// What the engine should do next, decided under the lock.
enum Step {
    /// Monitoring is off: wait until someone starts us.
    Park,
    /// Wait out the computed delay (pre-emptible by a check-now trigger).
    Wait(Duration),
    /// Fire a probe immediately.
    Probe,
    /// The monitor was dropped.
    Exit,
}

/// The scheduling loop. One instance per monitor, alive until shutdown.
async fn run_engine(inner: Arc<Inner>) {
    loop {
        let step = {
            let mut s = inner.shared();
            if s.shutdown {
                Step::Exit
            } else if !s.monitoring {
                Step::Park
            } else if s.immediate {
                s.immediate = false;
                Step::Probe
            } else {
                let delay = next_delay(
                    inner.accessible.load(Ordering::Relaxed),
                    s.failure_count,
                    s.retries,
                    s.interval,
                );
                if delay.is_zero() {
                    Step::Probe
                } else {
                    Step::Wait(delay)
                }
            }
        };

        match step {
            Step::Exit => return,
            Step::Park => {
                inner.check_now.notified().await;
                continue;
            }
            Step::Wait(delay) => {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = inner.check_now.notified() => {}
                }
            }
            Step::Probe => {}
        }

        // Arm the probe. Monitoring may have been turned off (or the monitor
        // dropped) while we were waiting.
        let timeout = {
            let mut s = inner.shared();
            if s.shutdown || !s.monitoring {
                continue;
            }
            s.probe_in_flight = true;
            s.timeout
        };

        probe_once(&inner, timeout).await;
    }
}

/// Dispatch one probe and fold its outcome into the state machine.
async fn probe_once(inner: &Arc<Inner>, timeout: Duration) {
    let started = Instant::now();
    let result = inner
        .transport
        .send_probe(&inner.target, timeout, PROBE_PAYLOAD)
        .await;
    let elapsed = started.elapsed();

    let network_available = inner.network.is_available();

    let (latency, error_kind): (Duration, Option<ProbeErrorKind>) = match &result {
        Ok(rtt) => (*rtt, None),
        Err(e) => {
            tracing::info!(
                host = %inner.target,
                error = %e,
                kind = e.kind().as_ref(),
                "probe failed"
            );
            (Duration::ZERO, Some(e.kind()))
        }
    };

    // Transition and clear the in-flight gate in one critical section so the
    // next scheduling decision never reads a half-applied outcome.
    let (transition, prior_failures): (Transition, u32) = {
        let mut s = inner.shared();
        let prior_failures = s.failure_count;
        let t = apply_outcome(
            inner.accessible.load(Ordering::Relaxed),
            s.failure_count,
            s.retries,
            result.is_ok(),
            network_available,
        );
        s.failure_count = t.failure_count;
        inner.accessible.store(t.accessible, Ordering::Relaxed);
        s.probe_in_flight = false;
        (t, prior_failures)
    };

    if transition.changed {
        if transition.accessible {
            // Skip the log record on the very first detection so startup is
            // quiet, same as a restore after zero recorded failures.
            if prior_failures > 0 {
                tracing::info!(
                    host = %inner.target,
                    failed_checks = prior_failures,
                    "connectivity restored"
                );
            }
        } else {
            tracing::info!(
                host = %inner.target,
                failed_checks = transition.failure_count,
                kind = ?error_kind,
                network_available,
                "connectivity lost"
            );
        }

        inner.notify_subscribers();
    }

    record_outcome(inner, &transition, result.is_ok(), latency, elapsed);
}

/// Record a latency sample for the outcome, plus an availability event when
/// the transition was notified.
fn record_outcome(
    inner: &Inner,
    transition: &Transition,
    success: bool,
    latency: Duration,
    elapsed: Duration,
) {
    if success {
        inner.metrics.record_sample(
            METRIC_CATEGORY,
            LATENCY_METRIC,
            latency.as_secs_f64() * 1000.0,
            Utc::now(),
        );
    } else {
        // Zero-value sample credited to when the probe started, so a slow
        // failed probe does not appear to occur in the future.
        let backdated = Utc::now()
            - chrono::Duration::from_std(elapsed).unwrap_or_else(|_| chrono::Duration::zero());
        inner
            .metrics
            .record_sample(METRIC_CATEGORY, LATENCY_METRIC, 0.0, backdated);
    }

    if transition.changed {
        inner.metrics.record_event(
            METRIC_CATEGORY,
            AVAILABILITY_EVENT,
            serde_json::json!({
                "target": inner.target,
                "available": transition.accessible,
            }),
        );
    }
}

/// Listen for the local network coming back and shorten recovery detection.
async fn watch_network(inner: Arc<Inner>, mut watch: NetworkWatch) {
    while let Some(available) = watch.changed().await {
        if available {
            tracing::debug!(host = %inner.target, "local network available, rechecking");
            inner.request_check();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::config::{DEFAULT_INTERVAL, DEFAULT_RETRIES, DEFAULT_TIMEOUT};
    use super::*;
    use crate::transport::ProbeError;
    use std::sync::atomic::AtomicU32;

    struct AlwaysFails;

    #[async_trait::async_trait]
    impl ProbeTransport for AlwaysFails {
        async fn send_probe(
            &self,
            _target: &str,
            _timeout: Duration,
            _payload: &[u8],
        ) -> Result<Duration, ProbeError> {
            Err(ProbeError::Timeout)
        }
    }

    fn test_monitor() -> Monitor {
        Monitor::builder(MonitorConfig::new("192.0.2.1"))
            .transport(Arc::new(AlwaysFails))
            .build()
            .unwrap()
    }

    #[test]
    fn test_probe_payload_is_32_bytes() {
        assert_eq!(PROBE_PAYLOAD.len(), 32);
    }

    #[tokio::test]
    async fn test_monitor_starts_inert() {
        let monitor = test_monitor();
        assert!(!monitor.monitoring());
        assert!(!monitor.accessible());
        assert_eq!(monitor.failure_count(), 0);
        assert_eq!(monitor.target(), "192.0.2.1");
    }

    #[tokio::test]
    async fn test_start_stop_idempotent() {
        let monitor = test_monitor();
        monitor.start();
        monitor.start();
        assert!(monitor.monitoring());
        monitor.stop();
        monitor.stop();
        assert!(!monitor.monitoring());
    }

    #[tokio::test]
    async fn test_setters_validate_and_keep_prior_values() {
        let monitor = test_monitor();

        assert!(monitor.set_interval(Duration::ZERO).is_err());
        assert_eq!(monitor.interval(), DEFAULT_INTERVAL);

        assert!(monitor.set_retries(0).is_err());
        assert_eq!(monitor.retries(), DEFAULT_RETRIES);

        assert!(monitor.set_timeout(Duration::from_millis(10)).is_err());
        assert_eq!(monitor.timeout(), DEFAULT_TIMEOUT);

        monitor.set_interval(Duration::from_secs(5)).unwrap();
        monitor.set_retries(2).unwrap();
        monitor.set_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(monitor.interval(), Duration::from_secs(5));
        assert_eq!(monitor.retries(), 2);
        assert_eq!(monitor.timeout(), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_at_build() {
        let result = Monitor::builder(MonitorConfig::new("")).build();
        assert!(matches!(result, Err(MonitorError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_subscriber_panic_is_contained() {
        let monitor = test_monitor();
        let calls = Arc::new(AtomicU32::new(0));

        monitor.on_accessible_changed(|| panic!("observer bug"));
        let counter = Arc::clone(&calls);
        monitor.on_accessible_changed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        // Both subscribers run; the panicking one does not poison anything.
        monitor.inner.notify_subscribers();
        monitor.inner.notify_subscribers();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_check_now_ignored_while_stopped() {
        let monitor = test_monitor();
        // No permit should be stored while monitoring is off.
        monitor.check_now();
        let woke = tokio::time::timeout(
            Duration::from_millis(10),
            monitor.inner.check_now.notified(),
        )
        .await
        .is_ok();
        assert!(!woke);
    }
}
