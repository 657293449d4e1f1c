//! Per-event notification bookkeeping.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Event, EventSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Seen, not yet inside its window.
    Pending,
    /// Fired once; holds the indicator while inside the window.
    Notified,
    /// Start time has passed.
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    status: NotificationStatus,
    /// Consecutive refresh cycles the id was missing from the snapshot.
    missed_cycles: u32,
}

/// Result of one notifier scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Some timed event is inside its proximity window.
    pub indicator_on: bool,
    /// Events that fired for the first time on this scan.
    pub newly_notified: Vec<Event>,
}

/// Notification status of every event id the notifier has seen.
#[derive(Debug, Default)]
pub struct NotificationState {
    entries: HashMap<String, Entry>,
    cycle: Option<DateTime<Utc>>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, id: &str) -> Option<NotificationStatus> {
        self.entries.get(id).map(|e| e.status)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Evaluate the snapshot's events at `now` against a lead time of `lead`.
    ///
    /// An event is inside its window when `0 <= start - now <= lead`. All-day
    /// events are ignored. Tomorrow's list is scanned too, because right
    /// after midnight the snapshot still files the new day's first events
    /// there until the next refresh.
    pub fn scan(
        &mut self,
        snapshot: &EventSnapshot,
        now: DateTime<Utc>,
        lead: Duration,
    ) -> ScanOutcome {
        let mut seen = HashSet::new();
        let timed: Vec<&Event> = snapshot
            .today
            .iter()
            .chain(snapshot.tomorrow.iter())
            .filter(|e| !e.all_day && seen.insert(e.id.as_str()))
            .collect();

        if self.cycle != Some(snapshot.captured_at) {
            self.cycle = Some(snapshot.captured_at);
            self.prune(&timed);
        }

        let mut outcome = ScanOutcome::default();
        for event in timed {
            let entry = self.entries.entry(event.id.clone()).or_insert(Entry {
                status: NotificationStatus::Pending,
                missed_cycles: 0,
            });

            let delta = event.start - now;
            if delta < Duration::zero() {
                entry.status = NotificationStatus::Expired;
                continue;
            }
            // Moved to a later start: eligible again.
            if entry.status == NotificationStatus::Expired {
                entry.status = NotificationStatus::Pending;
            }
            if delta <= lead {
                if entry.status == NotificationStatus::Pending {
                    entry.status = NotificationStatus::Notified;
                    outcome.newly_notified.push(event.clone());
                }
                outcome.indicator_on = true;
            }
        }
        outcome
    }

    /// Called once per refresh cycle. Ids missing for more than one cycle
    /// are forgotten; if they come back they are new events.
    fn prune(&mut self, present: &[&Event]) {
        let ids: HashSet<&str> = present.iter().map(|e| e.id.as_str()).collect();
        self.entries.retain(|id, entry| {
            if ids.contains(id.as_str()) {
                entry.missed_cycles = 0;
                true
            } else {
                entry.missed_cycles += 1;
                entry.missed_cycles <= 1
            }
        });
    }
}
