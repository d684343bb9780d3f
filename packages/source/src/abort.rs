//! Run-wide cancellation.
//!
//! One [`AbortSignal`] is shared by every fetch in a run. Firing it stops
//! new requests from being sent and wakes anything waiting on
//! [`AbortSignal::aborted`], such as retry backoff sleeps.

use std::sync::Arc;

use tokio::sync::watch;

/// Cloneable flag that, once fired, stays fired.
#[derive(Clone)]
pub struct AbortSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortSignal {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Fires the signal for every clone.
    pub fn abort(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once the signal has fired.
    pub async fn aborted(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as `self`, so this only returns once fired.
        let _ = rx.wait_for(|aborted| *aborted).await;
    }
}
