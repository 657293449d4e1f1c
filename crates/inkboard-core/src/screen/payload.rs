//! What a screen hands to the display sink.
//!
//! Payloads carry extracted data, not pixels. [`RenderPayload::lines`]
//! flattens one into plain text for sinks that only show text.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use super::ScreenId;
use crate::data::{DisplayZone, Event, SensorSample, Task};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScreenBody {
    Events { events: Vec<Event> },
    Tasks { tasks: Vec<Task> },
    Sensor { sample: SensorSample },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderPayload {
    pub screen: ScreenId,
    /// Render time in the display zone.
    pub rendered_at: DateTime<FixedOffset>,
    pub body: ScreenBody,
    /// Zone used by [`Self::lines`] for event times.
    #[serde(skip)]
    pub zone: DisplayZone,
}

impl RenderPayload {
    fn clock(&self, at: DateTime<Utc>) -> String {
        self.zone.local(at).format("%H:%M").to_string()
    }

    pub fn lines(&self) -> Vec<String> {
        let mut out = vec![self.screen.title().to_string()];

        match &self.body {
            ScreenBody::Events { events } => {
                if events.is_empty() {
                    out.push(match self.screen {
                        ScreenId::EventsTomorrow => "No events tomorrow".to_string(),
                        _ => "No events today".to_string(),
                    });
                }
                let (all_day, timed): (Vec<&Event>, Vec<&Event>) =
                    events.iter().partition(|e| e.all_day);
                if !all_day.is_empty() {
                    out.push("All Day:".to_string());
                    out.extend(all_day.iter().map(|e| format!("• {}", e.title)));
                }
                if !timed.is_empty() {
                    out.push("Timed:".to_string());
                    for e in timed {
                        out.push(format!("• {}", e.title));
                        let start = self.clock(e.start);
                        match e.end {
                            Some(end) => out.push(format!("  {start} - {}", self.clock(end))),
                            None => out.push(format!("  {start}")),
                        }
                    }
                }
            }
            ScreenBody::Tasks { tasks } => {
                if tasks.is_empty() {
                    out.push("No tasks".to_string());
                }
                for task in tasks {
                    out.push(format!("• {}", task.title));
                    if let Some(due) = task.due {
                        out.push(format!("  Due: {}", due.format("%Y-%m-%d")));
                    }
                    if let Some(notes) = task.notes.as_deref().filter(|n| !n.trim().is_empty()) {
                        out.push(format!("  {}", notes.trim()));
                    }
                }
            }
            ScreenBody::Sensor { sample } => match sample.reading() {
                Some(r) => {
                    out.push("Temperature:".to_string());
                    out.push(format!("  {:.1} °C", r.temperature));
                    out.push("Humidity:".to_string());
                    out.push(format!("  {:.1} %", r.humidity));
                }
                None => out.push("Sensor unavailable".to_string()),
            },
        }

        out.push(format!("Updated {}", self.rendered_at.format("%H:%M")));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::SensorReading;
    use chrono::{NaiveDate, TimeZone};

    fn plus_one() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<FixedOffset> {
        plus_one().with_ymd_and_hms(2025, 3, 10, h, m, 0).unwrap()
    }

    fn payload(screen: ScreenId, body: ScreenBody) -> RenderPayload {
        RenderPayload {
            screen,
            rendered_at: at(8, 0),
            body,
            zone: plus_one().into(),
        }
    }

    #[test]
    fn events_render_all_day_before_timed_in_local_time() {
        let start = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let payload = payload(
            ScreenId::EventsToday,
            ScreenBody::Events {
                events: vec![
                    Event::timed("1", "Standup", start, Some(start + chrono::Duration::minutes(15))),
                    Event::all_day("2", "Holiday", start),
                ],
            },
        );
        assert_eq!(
            payload.lines(),
            vec![
                "TODAY'S EVENTS",
                "All Day:",
                "• Holiday",
                "Timed:",
                "• Standup",
                "  10:00 - 10:15",
                "Updated 08:00",
            ]
        );
    }

    #[test]
    fn empty_lists_say_so() {
        let tomorrow = payload(ScreenId::EventsTomorrow, ScreenBody::Events { events: vec![] });
        assert_eq!(tomorrow.lines()[1], "No events tomorrow");

        let tasks = payload(ScreenId::Tasks, ScreenBody::Tasks { tasks: vec![] });
        assert_eq!(tasks.lines()[1], "No tasks");
    }

    #[test]
    fn tasks_show_due_date_and_notes() {
        let due = NaiveDate::from_ymd_opt(2025, 3, 12).unwrap();
        let mut task = Task::new("t1", "Buy milk").with_due(due);
        task.notes = Some("2 liters".into());
        let lines = payload(ScreenId::Tasks, ScreenBody::Tasks { tasks: vec![task] }).lines();
        assert_eq!(lines[1], "• Buy milk");
        assert_eq!(lines[2], "  Due: 2025-03-12");
        assert_eq!(lines[3], "  2 liters");
    }

    #[test]
    fn due_date_is_shown_as_given_west_of_utc() {
        let task = Task::new("t1", "Pay rent").with_due(NaiveDate::from_ymd_opt(2025, 3, 12).unwrap());
        let mut west = payload(ScreenId::Tasks, ScreenBody::Tasks { tasks: vec![task] });
        west.zone = DisplayZone::from_config(Some(-300));
        assert_eq!(west.lines()[2], "  Due: 2025-03-12");
    }

    #[test]
    fn sensor_reading_and_unavailable() {
        let reading = payload(
            ScreenId::SensorReading,
            ScreenBody::Sensor {
                sample: SensorSample::Reading(SensorReading {
                    temperature: 21.46,
                    humidity: 48.0,
                    captured_at: Utc::now(),
                }),
            },
        );
        assert_eq!(reading.lines()[2], "  21.5 °C");
        assert_eq!(reading.lines()[4], "  48.0 %");

        let missing = payload(
            ScreenId::SensorReading,
            ScreenBody::Sensor {
                sample: SensorSample::Pending,
            },
        );
        assert_eq!(missing.lines()[1], "Sensor unavailable");
    }
}
