//! Calendar, task and sensor data shared between the flows.
//!
//! Everything here is plain data. The refresh loop builds an
//! [`EventSnapshot`] wholesale and hands it to the store; readers only ever
//! see it behind an `Arc`, so a snapshot is never mutated after publication.

mod window;

pub use window::{normalize_events, Day, DayWindow, DisplayZone};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A calendar event.
///
/// `start` is always present; ordering and notification use it. For
/// all-day events `start` is local midnight of the first day and `end`, if
/// set, is local midnight of the last day covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_day: bool,
}

impl Event {
    pub fn timed(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            all_day: false,
        }
    }

    pub fn all_day(id: impl Into<String>, title: impl Into<String>, start: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end: None,
            all_day: true,
        }
    }
}

/// A to-do item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    /// Due dates carry no time of day, so they are never shifted by zone.
    #[serde(default)]
    pub due: Option<NaiveDate>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            due: None,
            completed: false,
            notes: None,
        }
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }
}

/// One successful temperature/humidity measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity in percent.
    pub humidity: f64,
    pub captured_at: DateTime<Utc>,
}

/// Latest known state of the sensor.
///
/// A failed poll replaces any earlier reading with `Unavailable`, so an old
/// value is never shown as if it were current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SensorSample {
    /// No poll has completed yet.
    Pending,
    Reading(SensorReading),
    Unavailable {
        reason: String,
        at: DateTime<Utc>,
    },
}

impl SensorSample {
    pub fn reading(&self) -> Option<&SensorReading> {
        match self {
            SensorSample::Reading(r) => Some(r),
            _ => None,
        }
    }
}

/// Immutable bundle of everything the screens and the notifier read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub today: Vec<Event>,
    pub tomorrow: Vec<Event>,
    pub tasks: Vec<Task>,
    pub captured_at: DateTime<Utc>,
}

impl EventSnapshot {
    pub fn new(
        today: Vec<Event>,
        tomorrow: Vec<Event>,
        tasks: Vec<Task>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            today,
            tomorrow,
            tasks,
            captured_at,
        }
    }

    /// The snapshot visible before the first successful refresh.
    pub fn empty() -> Self {
        Self {
            today: Vec::new(),
            tomorrow: Vec::new(),
            tasks: Vec::new(),
            captured_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }

    /// True until a refresh has published real data.
    pub fn is_initial(&self) -> bool {
        self.captured_at == DateTime::<Utc>::UNIX_EPOCH
    }
}

impl Default for EventSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
