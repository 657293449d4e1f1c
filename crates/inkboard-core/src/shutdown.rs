//! Cooperative shutdown signal.
//!
//! Periodic tasks select on [`ShutdownSignal::triggered`] next to their
//! ticker, so they only ever stop between ticks. Work already in progress
//! runs to completion first.

use std::sync::Arc;

use tokio::sync::watch;

/// Fires the signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes the signal. Each task holds its own clone.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx: Arc::new(tx) }, ShutdownSignal { rx })
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

impl ShutdownSignal {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once shutdown was requested or every trigger was dropped.
    pub async fn triggered(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn all_clones_observe_trigger() {
        let (trigger, signal) = shutdown_channel();
        let mut a = signal.clone();
        let mut b = signal;
        assert!(!a.is_triggered());

        trigger.trigger();
        tokio::time::timeout(Duration::from_secs(1), a.triggered())
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), b.triggered())
            .await
            .unwrap();
        assert!(b.is_triggered());
    }

    #[tokio::test]
    async fn dropped_trigger_counts_as_shutdown() {
        let (trigger, mut signal) = shutdown_channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.triggered())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn untriggered_signal_stays_pending() {
        let (_trigger, mut signal) = shutdown_channel();
        let waited = tokio::time::timeout(Duration::from_secs(60), signal.triggered()).await;
        assert!(waited.is_err());
    }
}
