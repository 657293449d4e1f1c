//! Screen state machine.
//!
//! ## State Transitions
//!
//! ```text
//! EventsToday -> EventsTomorrow -> Tasks -> SensorReading -> EventsToday
//! ```
//!
//! The current screen lives in a single atomic, so `advance()` and
//! `render()` can run from different flows: a render reads the id once and
//! therefore shows either the screen before or after a concurrent advance.

mod payload;

pub use payload::{RenderPayload, ScreenBody};

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{DisplayZone, EventSnapshot, SensorSample};
use crate::store::{SensorCell, SharedEventStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenId {
    EventsToday,
    EventsTomorrow,
    Tasks,
    SensorReading,
}

impl ScreenId {
    pub const COUNT: usize = 4;

    pub fn all() -> [ScreenId; Self::COUNT] {
        [
            ScreenId::EventsToday,
            ScreenId::EventsTomorrow,
            ScreenId::Tasks,
            ScreenId::SensorReading,
        ]
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> ScreenId {
        Self::all()[index % Self::COUNT]
    }

    pub fn next(self) -> ScreenId {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(self) -> ScreenId {
        Self::from_index(self.index() + Self::COUNT - 1)
    }

    pub fn title(self) -> &'static str {
        match self {
            ScreenId::EventsToday => "TODAY'S EVENTS",
            ScreenId::EventsTomorrow => "TOMORROW'S EVENTS",
            ScreenId::Tasks => "TASKS",
            ScreenId::SensorReading => "ENVIRONMENT",
        }
    }

    /// Screens whose content comes from the event snapshot.
    pub fn reads_snapshot(self) -> bool {
        !matches!(self, ScreenId::SensorReading)
    }

    /// Extract this screen's content. Each variant only looks at its own part.
    pub fn extract(self, snapshot: &EventSnapshot, sensor: &SensorCell) -> ScreenBody {
        match self {
            ScreenId::EventsToday => ScreenBody::Events {
                events: snapshot.today.clone(),
            },
            ScreenId::EventsTomorrow => ScreenBody::Events {
                events: snapshot.tomorrow.clone(),
            },
            ScreenId::Tasks => ScreenBody::Tasks {
                tasks: snapshot.tasks.clone(),
            },
            ScreenId::SensorReading => ScreenBody::Sensor {
                sample: SensorSample::clone(&sensor.current()),
            },
        }
    }
}

/// Current screen plus read-only handles to the data it renders.
#[derive(Debug)]
pub struct ScreenState {
    current: AtomicU8,
    store: Arc<SharedEventStore>,
    sensor: Arc<SensorCell>,
    zone: DisplayZone,
}

impl ScreenState {
    /// Starts on `EventsToday`.
    pub fn new(store: Arc<SharedEventStore>, sensor: Arc<SensorCell>, zone: DisplayZone) -> Self {
        Self {
            current: AtomicU8::new(ScreenId::EventsToday as u8),
            store,
            sensor,
            zone,
        }
    }

    pub fn current(&self) -> ScreenId {
        ScreenId::from_index(self.current.load(Ordering::Acquire) as usize)
    }

    /// Move exactly one step forward. Returns the new screen.
    pub fn advance(&self) -> ScreenId {
        self.step(ScreenId::next)
    }

    /// Move exactly one step back. Returns the new screen.
    pub fn retreat(&self) -> ScreenId {
        self.step(ScreenId::previous)
    }

    pub fn go_to(&self, screen: ScreenId) -> ScreenId {
        self.current.store(screen as u8, Ordering::Release);
        info!(screen = ?screen, "Switched screen");
        screen
    }

    fn step(&self, f: fn(ScreenId) -> ScreenId) -> ScreenId {
        let prev = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| {
                Some(f(ScreenId::from_index(i as usize)) as u8)
            })
            .unwrap_or_else(|i| i);
        let next = f(ScreenId::from_index(prev as usize));
        info!(
            screen = ?next,
            position = next.index() + 1,
            of = ScreenId::COUNT,
            "Switched screen"
        );
        next
    }

    pub fn render(&self) -> RenderPayload {
        self.render_at(Utc::now())
    }

    /// Render the current screen from one snapshot read.
    pub fn render_at(&self, now: DateTime<Utc>) -> RenderPayload {
        self.render_screen(self.current(), now)
    }

    /// Render `screen` regardless of which one is current.
    pub fn render_screen(&self, screen: ScreenId, now: DateTime<Utc>) -> RenderPayload {
        let snapshot = self.store.current();
        RenderPayload {
            screen,
            rendered_at: self.zone.local(now),
            zone: self.zone,
            body: screen.extract(&snapshot, &self.sensor),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Event, Task};
    use proptest::prelude::*;

    fn state() -> ScreenState {
        ScreenState::new(
            Arc::new(SharedEventStore::new()),
            Arc::new(SensorCell::new()),
            DisplayZone::utc(),
        )
    }

    #[test]
    fn starts_on_events_today() {
        assert_eq!(state().current(), ScreenId::EventsToday);
    }

    #[test]
    fn four_presses_return_to_events_today() {
        let s = state();
        assert_eq!(s.advance(), ScreenId::EventsTomorrow);
        assert_eq!(s.advance(), ScreenId::Tasks);
        assert_eq!(s.advance(), ScreenId::SensorReading);
        assert_eq!(s.advance(), ScreenId::EventsToday);
    }

    #[test]
    fn retreat_wraps_backwards() {
        let s = state();
        assert_eq!(s.retreat(), ScreenId::SensorReading);
        assert_eq!(s.retreat(), ScreenId::Tasks);
    }

    #[test]
    fn go_to_jumps_directly() {
        let s = state();
        s.go_to(ScreenId::Tasks);
        assert_eq!(s.current(), ScreenId::Tasks);
        assert_eq!(s.advance(), ScreenId::SensorReading);
    }

    proptest! {
        #[test]
        fn advance_n_times_lands_on_n_mod_4(n in 0usize..200) {
            let s = state();
            for _ in 0..n {
                s.advance();
            }
            prop_assert_eq!(s.current(), ScreenId::from_index(n % ScreenId::COUNT));
        }
    }

    #[test]
    fn concurrent_advances_are_never_lost() {
        let s = Arc::new(state());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&s);
                std::thread::spawn(move || {
                    for _ in 0..101 {
                        s.advance();
                        let _ = s.render();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(s.current(), ScreenId::from_index(8 * 101));
    }

    #[test]
    fn render_dispatches_on_current_screen() {
        let store = Arc::new(SharedEventStore::new());
        let now = Utc::now();
        store.publish(EventSnapshot::new(
            vec![Event::timed("a", "Today", now, None)],
            vec![Event::timed("b", "Tomorrow", now, None)],
            vec![Task::new("c", "Task")],
            now,
        ));
        let s = ScreenState::new(store, Arc::new(SensorCell::new()), DisplayZone::utc());

        match s.render().body {
            ScreenBody::Events { events } => assert_eq!(events[0].id, "a"),
            other => panic!("unexpected body {other:?}"),
        }
        s.advance();
        match s.render().body {
            ScreenBody::Events { events } => assert_eq!(events[0].id, "b"),
            other => panic!("unexpected body {other:?}"),
        }
        s.advance();
        match s.render().body {
            ScreenBody::Tasks { tasks } => assert_eq!(tasks[0].id, "c"),
            other => panic!("unexpected body {other:?}"),
        }
        s.advance();
        let payload = s.render();
        assert_eq!(payload.screen, ScreenId::SensorReading);
        assert_eq!(payload.lines()[1], "Sensor unavailable");
    }
}
