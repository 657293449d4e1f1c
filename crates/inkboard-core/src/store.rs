//! Single-writer stores shared between the flows.
//!
//! Both stores hold an `Arc` behind a `tokio::sync::watch` channel. A
//! publish builds the new value first and then swaps the pointer, so a
//! reader holding the lock only ever waits for a pointer copy, and what it
//! gets back is always one complete published value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::data::{EventSnapshot, SensorSample};

/// Holds the latest [`EventSnapshot`]. Written only by the refresh loop.
#[derive(Debug)]
pub struct SharedEventStore {
    tx: watch::Sender<Arc<EventSnapshot>>,
    publishes: AtomicU64,
}

impl SharedEventStore {
    pub fn new() -> Self {
        Self::with_snapshot(EventSnapshot::empty())
    }

    pub fn with_snapshot(snapshot: EventSnapshot) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(snapshot));
        Self {
            tx,
            publishes: AtomicU64::new(0),
        }
    }

    /// Replace the visible snapshot as a unit.
    pub fn publish(&self, snapshot: EventSnapshot) {
        let next = Arc::new(snapshot);
        self.tx.send_replace(next);
        self.publishes.fetch_add(1, Ordering::Relaxed);
    }

    /// Latest published snapshot, or the empty one before the first refresh.
    pub fn current(&self) -> Arc<EventSnapshot> {
        Arc::clone(&*self.tx.borrow())
    }

    /// Receiver that wakes whenever a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<EventSnapshot>> {
        self.tx.subscribe()
    }

    pub fn publish_count(&self) -> u64 {
        self.publishes.load(Ordering::Relaxed)
    }
}

impl Default for SharedEventStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the latest [`SensorSample`]. Written only by the sensor poller.
#[derive(Debug)]
pub struct SensorCell {
    tx: watch::Sender<Arc<SensorSample>>,
}

impl SensorCell {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SensorSample::Pending));
        Self { tx }
    }

    pub fn publish(&self, sample: SensorSample) {
        self.tx.send_replace(Arc::new(sample));
    }

    pub fn current(&self) -> Arc<SensorSample> {
        Arc::clone(&*self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SensorSample>> {
        self.tx.subscribe()
    }
}

impl Default for SensorCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Event, Task};
    use chrono::{Duration, Utc};
    use std::thread;

    fn tagged_snapshot(tag: usize) -> EventSnapshot {
        let at = Utc::now();
        EventSnapshot::new(
            vec![Event::timed(format!("today-{tag}"), "t", at, None)],
            vec![Event::timed(
                format!("tomorrow-{tag}"),
                "t",
                at + Duration::days(1),
                None,
            )],
            vec![Task::new(format!("task-{tag}"), "t")],
            at,
        )
    }

    fn tag_of(id: &str) -> &str {
        id.rsplit('-').next().unwrap()
    }

    #[test]
    fn current_returns_empty_before_first_publish() {
        let store = SharedEventStore::new();
        assert!(store.current().is_initial());
        assert_eq!(store.publish_count(), 0);
    }

    #[test]
    fn publish_replaces_snapshot_as_a_unit() {
        let store = SharedEventStore::new();
        store.publish(tagged_snapshot(1));
        let snap = store.current();
        assert_eq!(snap.today[0].id, "today-1");
        assert_eq!(snap.tasks[0].id, "task-1");
        assert_eq!(store.publish_count(), 1);
    }

    #[test]
    fn readers_never_see_fields_from_different_publishes() {
        let store = Arc::new(SharedEventStore::new());
        store.publish(tagged_snapshot(0));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..500 {
                        store.publish(tagged_snapshot(w * 1000 + i));
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..2000 {
                        let snap = store.current();
                        let today = tag_of(&snap.today[0].id).to_string();
                        assert_eq!(today, tag_of(&snap.tomorrow[0].id));
                        assert_eq!(today, tag_of(&snap.tasks[0].id));
                    }
                })
            })
            .collect();

        for h in writers.into_iter().chain(readers) {
            h.join().unwrap();
        }
        assert_eq!(store.publish_count(), 2001);
    }

    #[test]
    fn held_snapshot_is_unaffected_by_later_publish() {
        let store = SharedEventStore::new();
        store.publish(tagged_snapshot(1));
        let held = store.current();
        store.publish(tagged_snapshot(2));
        assert_eq!(held.today[0].id, "today-1");
        assert_eq!(store.current().today[0].id, "today-2");
    }

    #[tokio::test]
    async fn subscribers_wake_on_publish() {
        let store = SharedEventStore::new();
        let mut rx = store.subscribe();
        store.publish(tagged_snapshot(7));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().tasks[0].id, "task-7");
    }

    #[test]
    fn sensor_cell_starts_pending() {
        let cell = SensorCell::new();
        assert_eq!(*cell.current(), SensorSample::Pending);
    }
}
