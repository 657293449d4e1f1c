//! Event-proximity notifier.
//!
//! Every poll interval the notifier reads the current snapshot once, scans
//! its timed events and keeps the indicator on while any of them is
//! within the lead time of its start. The actuator is only driven on
//! transitions.

mod state;

pub use state::{NotificationState, NotificationStatus, ScanOutcome};

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::data::EventSnapshot;
use crate::shutdown::ShutdownSignal;
use crate::sources::Indicator;
use crate::store::SharedEventStore;

pub struct Notifier {
    store: Arc<SharedEventStore>,
    indicator: Box<dyn Indicator>,
    state: NotificationState,
    lead: chrono::Duration,
    poll: Duration,
    indicator_on: bool,
}

impl Notifier {
    pub fn new(
        store: Arc<SharedEventStore>,
        indicator: Box<dyn Indicator>,
        lead: chrono::Duration,
        poll: Duration,
    ) -> Self {
        Self {
            store,
            indicator,
            state: NotificationState::new(),
            lead,
            poll,
            indicator_on: false,
        }
    }

    pub fn indicator_on(&self) -> bool {
        self.indicator_on
    }

    pub fn state(&self) -> &NotificationState {
        &self.state
    }

    /// Pure step: evaluate `snapshot` at `now` without touching the indicator.
    pub fn scan(&mut self, snapshot: &EventSnapshot, now: DateTime<Utc>) -> ScanOutcome {
        self.state.scan(snapshot, now, self.lead)
    }

    /// One poll: scan the current snapshot and drive the indicator.
    pub fn tick(&mut self, now: DateTime<Utc>) -> ScanOutcome {
        let snapshot = self.store.current();
        let outcome = self.scan(&snapshot, now);

        for event in &outcome.newly_notified {
            let minutes = (event.start - now).num_minutes();
            info!(id = %event.id, "Event '{}' starts in {minutes} min", event.title);
        }

        if outcome.indicator_on != self.indicator_on {
            self.indicator.set(outcome.indicator_on);
            self.indicator_on = outcome.indicator_on;
            info!(on = outcome.indicator_on, "Indicator switched");
        }
        outcome
    }

    /// Poll until shutdown, then switch the indicator off.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) {
        info!(
            "Notifier started (poll: {}s, lead: {} min)",
            self.poll.as_secs(),
            self.lead.num_minutes()
        );
        let mut ticker = tokio::time::interval(self.poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }
            let outcome = self.tick(Utc::now());
            debug!(indicator_on = outcome.indicator_on, tracked = self.state.len(), "Notifier tick");
        }

        self.indicator.set(false);
        self.indicator_on = false;
        info!("Notifier stopped");
    }
}
