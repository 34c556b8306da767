//! External network-availability signal.
//!
//! A host process that learns about local link changes (interface up/down,
//! route changes) publishes them through a [`NetworkSignal`]; the monitor
//! subscribes to the paired [`NetworkWatch`]. A restored-availability edge
//! makes the monitor recheck immediately, and an unavailable reading lets a
//! probe failure short-circuit the debounce threshold.

use tokio::sync::watch;

/// Publisher half of the network-availability signal.
#[derive(Debug)]
pub struct NetworkSignal {
    tx: watch::Sender<bool>,
}

/// Subscriber half of the network-availability signal.
///
/// Clone-able; each monitor holds its own copy.
#[derive(Debug, Clone)]
pub struct NetworkWatch {
    rx: watch::Receiver<bool>,
    // Keeps a detached channel alive for `always_available` watches.
    keeper: Option<std::sync::Arc<watch::Sender<bool>>>,
}

impl NetworkSignal {
    /// Create a signal pair. The network starts out reported as available.
    pub fn new() -> (Self, NetworkWatch) {
        let (tx, rx) = watch::channel(true);
        (Self { tx }, NetworkWatch { rx, keeper: None })
    }

    /// Publish the current local network availability.
    pub fn set_available(&self, available: bool) {
        // send_if_modified so redundant updates don't wake subscribers.
        self.tx.send_if_modified(|state| {
            if *state == available {
                false
            } else {
                *state = available;
                true
            }
        });
    }

    /// The most recently published availability.
    pub fn is_available(&self) -> bool {
        *self.tx.borrow()
    }
}

impl NetworkWatch {
    /// A watch that always reports the network as available.
    ///
    /// Used when the host process has no link-change source to wire up.
    pub fn always_available() -> Self {
        let (tx, rx) = watch::channel(true);
        Self {
            rx,
            keeper: Some(std::sync::Arc::new(tx)),
        }
    }

    /// Current availability reading.
    pub fn is_available(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait for the next availability change and return the new value.
    ///
    /// Returns `None` once the publisher has been dropped.
    pub(crate) async fn changed(&mut self) -> Option<bool> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
