//! Local calendar-day windows.
//!
//! Remote calendars return everything overlapping the requested range, which
//! includes multi-day events that started earlier. A day window decides
//! which of those belong on the "today" or "tomorrow" screen.

use std::fmt;

use chrono::{
    DateTime, Days, Duration, FixedOffset, Local, NaiveDate, NaiveTime, Offset, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use super::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Today,
    Tomorrow,
}

impl Day {
    fn offset_days(self) -> u64 {
        match self {
            Day::Today => 0,
            Day::Tomorrow => 1,
        }
    }
}

/// Half-open `[start, end)` range covering one local calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day: Day,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Window for `day` relative to `now` in the given zone.
    pub fn for_day(day: Day, now: DateTime<Utc>, zone: DisplayZone) -> Self {
        let local_date = zone.local(now).date_naive();
        let date = local_date
            .checked_add_days(Days::new(day.offset_days()))
            .unwrap_or(local_date);
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);

        Self {
            day,
            start: zone.midnight(date),
            end: zone.midnight(next),
        }
    }

    pub fn today(now: DateTime<Utc>, zone: DisplayZone) -> Self {
        Self::for_day(Day::Today, now, zone)
    }

    pub fn tomorrow(now: DateTime<Utc>, zone: DisplayZone) -> Self {
        Self::for_day(Day::Tomorrow, now, zone)
    }

    /// An event belongs to the day if it starts inside the window, or
    /// started earlier and is still running when the day begins.
    ///
    /// A timed event without an end is open-ended. An all-day event without
    /// an end covers its start day only.
    pub fn contains(&self, event: &Event) -> bool {
        if event.start >= self.start && event.start < self.end {
            return true;
        }
        let end = match (event.end, event.all_day) {
            (Some(end), _) => end,
            (None, true) => event.start,
            (None, false) => return event.start < self.start,
        };
        event.start < self.start && end >= self.start
    }
}

/// Keep the events belonging to `window`, ordered by start then title.
pub fn normalize_events(events: Vec<Event>, window: &DayWindow) -> Vec<Event> {
    let mut kept: Vec<Event> = events.into_iter().filter(|e| window.contains(e)).collect();
    kept.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.title.cmp(&b.title)));
    kept
}

/// Zone used for day boundaries and displayed times.
///
/// `Local` follows the system zone and is resolved at every use, so day
/// windows and rendered times stay correct across DST changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayZone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl DisplayZone {
    /// An explicit UTC offset in minutes, or the system zone when unset.
    /// Out of range offsets fall back to UTC.
    pub fn from_config(configured_minutes: Option<i32>) -> Self {
        match configured_minutes {
            Some(minutes) => DisplayZone::Fixed(
                minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .unwrap_or_else(|| Utc.fix()),
            ),
            None => DisplayZone::Local,
        }
    }

    pub fn utc() -> Self {
        DisplayZone::Fixed(Utc.fix())
    }

    /// Offset in effect at `at`.
    pub fn offset_at(&self, at: DateTime<Utc>) -> FixedOffset {
        match self {
            DisplayZone::Local => at.with_timezone(&Local).offset().fix(),
            DisplayZone::Fixed(offset) => *offset,
        }
    }

    pub fn local(&self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        at.with_timezone(&self.offset_at(at))
    }

    /// Start of `date` in this zone. A midnight skipped by a DST change
    /// resolves to the first instant of the day that exists.
    pub fn midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN);
        let resolved = match self {
            DisplayZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .or_else(|| Local.from_local_datetime(&(naive + Duration::hours(1))).earliest())
                .map(|dt| dt.with_timezone(&Utc)),
            DisplayZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        resolved.unwrap_or_else(|| naive.and_utc())
    }
}

impl From<FixedOffset> for DisplayZone {
    fn from(offset: FixedOffset) -> Self {
        DisplayZone::Fixed(offset)
    }
}

impl fmt::Display for DisplayZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayZone::Local => write!(f, "local"),
            DisplayZone::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}
