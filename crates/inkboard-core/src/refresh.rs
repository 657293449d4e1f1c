//! Background data refresh.
//!
//! Every refresh interval the loop pulls today's events, tomorrow's events
//! and the task list, and publishes them as one new snapshot. A snapshot is
//! only published when all three fetches succeed; otherwise the previous
//! one stays visible until the next tick.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::data::{normalize_events, DayWindow, DisplayZone, EventSnapshot};
use crate::error::AdapterError;
use crate::shutdown::ShutdownSignal;
use crate::sources::{CalendarSource, TaskSource};
use crate::store::SharedEventStore;

/// Result of a single refresh attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published {
        events_today: usize,
        events_tomorrow: usize,
        tasks: usize,
    },
    /// Nothing was published; `adapter` names the fetch that failed.
    Skipped { adapter: String, error: String },
}

impl RefreshOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, RefreshOutcome::Published { .. })
    }
}

pub struct RefreshLoop {
    calendar: Arc<dyn CalendarSource>,
    tasks: Arc<dyn TaskSource>,
    store: Arc<SharedEventStore>,
    zone: DisplayZone,
    interval: Duration,
}

fn failed(name: &str, what: &str) -> impl FnOnce(AdapterError) -> (String, AdapterError) {
    let label = format!("{name} ({what})");
    move |e| (label, e)
}

fn fetch_all(
    calendar: &dyn CalendarSource,
    tasks: &dyn TaskSource,
    now: DateTime<Utc>,
    zone: DisplayZone,
) -> Result<EventSnapshot, (String, AdapterError)> {
    let today = calendar
        .fetch_today_events(now, zone)
        .map_err(failed(calendar.name(), "today"))?;
    let tomorrow = calendar
        .fetch_tomorrow_events(now, zone)
        .map_err(failed(calendar.name(), "tomorrow"))?;
    let open_tasks = tasks
        .fetch_tasks()
        .map_err(failed(tasks.name(), "tasks"))?;

    Ok(EventSnapshot::new(
        normalize_events(today, &DayWindow::today(now, zone)),
        normalize_events(tomorrow, &DayWindow::tomorrow(now, zone)),
        open_tasks,
        now,
    ))
}

impl RefreshLoop {
    pub fn new(
        calendar: Arc<dyn CalendarSource>,
        tasks: Arc<dyn TaskSource>,
        store: Arc<SharedEventStore>,
        zone: DisplayZone,
        interval: Duration,
    ) -> Self {
        Self {
            calendar,
            tasks,
            store,
            zone,
            interval,
        }
    }

    /// Fetch everything once and publish on full success.
    ///
    /// The fetches run on a blocking worker; this future completes only
    /// after that worker has returned.
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let now = Utc::now();
        let calendar = Arc::clone(&self.calendar);
        let tasks = Arc::clone(&self.tasks);
        let zone = self.zone;

        let fetched =
            tokio::task::spawn_blocking(move || fetch_all(calendar.as_ref(), tasks.as_ref(), now, zone))
                .await;

        match fetched {
            Ok(Ok(snapshot)) => {
                let outcome = RefreshOutcome::Published {
                    events_today: snapshot.today.len(),
                    events_tomorrow: snapshot.tomorrow.len(),
                    tasks: snapshot.tasks.len(),
                };
                self.store.publish(snapshot);
                info!(?outcome, "Snapshot published");
                outcome
            }
            Ok(Err((adapter, e))) => {
                warn!(adapter = %adapter, "Refresh skipped, keeping previous snapshot: {e}");
                RefreshOutcome::Skipped {
                    adapter,
                    error: e.to_string(),
                }
            }
            Err(e) => {
                warn!("Refresh worker failed: {e}");
                RefreshOutcome::Skipped {
                    adapter: "refresh-worker".into(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Refresh immediately, then every interval, until shutdown.
    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!("Refresh loop started (interval: {}s)", self.interval.as_secs());
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }
            let outcome = self.refresh_once().await;
            debug!(published = outcome.is_published(), "Refresh tick done");
        }

        info!("Refresh loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Event, Task};
    use crate::shutdown::shutdown_channel;
    use crate::sources::mock::MockAgenda;

    fn refresh_loop(agenda: &MockAgenda, store: &Arc<SharedEventStore>) -> RefreshLoop {
        RefreshLoop::new(
            Arc::new(agenda.clone()),
            Arc::new(agenda.clone()),
            Arc::clone(store),
            DisplayZone::utc(),
            Duration::from_secs(300),
        )
    }

    fn agenda() -> MockAgenda {
        let now = Utc::now();
        MockAgenda::with_data(
            vec![
                Event::timed("late", "Late", now + chrono::Duration::seconds(2), None),
                Event::timed("early", "Early", now + chrono::Duration::seconds(1), None),
            ],
            vec![Task::new("t1", "Task")],
        )
    }

    #[tokio::test]
    async fn publishes_sorted_snapshot_on_success() {
        let store = Arc::new(SharedEventStore::new());
        let agenda = agenda();
        let outcome = refresh_loop(&agenda, &store).refresh_once().await;

        assert!(outcome.is_published());
        let snapshot = store.current();
        assert!(!snapshot.is_initial());
        // Right before midnight UTC both events may land on tomorrow.
        let ids: Vec<_> = snapshot
            .today
            .iter()
            .chain(snapshot.tomorrow.iter())
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert_eq!(snapshot.tasks.len(), 1);
        assert_eq!(store.publish_count(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_keeps_previous_snapshot() {
        let store = Arc::new(SharedEventStore::new());
        let agenda = agenda();
        let refresh = refresh_loop(&agenda, &store);
        refresh.refresh_once().await;
        let before = store.current();

        agenda.fail_tasks(true);
        let outcome = refresh.refresh_once().await;
        match outcome {
            RefreshOutcome::Skipped { adapter, .. } => assert_eq!(adapter, "mock-tasks (tasks)"),
            other => panic!("expected skip, got {other:?}"),
        }
        assert!(Arc::ptr_eq(&before, &store.current()));
        assert_eq!(store.publish_count(), 1);

        agenda.fail_tasks(false);
        agenda.fail_calendar(true);
        assert!(!refresh.refresh_once().await.is_published());
        assert!(Arc::ptr_eq(&before, &store.current()));
    }

    #[tokio::test]
    async fn initial_failure_leaves_empty_snapshot() {
        let store = Arc::new(SharedEventStore::new());
        let agenda = agenda();
        agenda.fail_calendar(true);
        refresh_loop(&agenda, &store).refresh_once().await;
        assert!(store.current().is_initial());
    }

    #[tokio::test(start_paused = true)]
    async fn run_refreshes_immediately_then_every_interval() {
        let store = Arc::new(SharedEventStore::new());
        let agenda = agenda();
        let (trigger, signal) = shutdown_channel();
        let handle = tokio::spawn(refresh_loop(&agenda, &store).run(signal));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.publish_count(), 1);

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(store.publish_count(), 2);

        trigger.trigger();
        handle.await.unwrap();
        assert_eq!(agenda.task_calls(), 2);
    }
}
