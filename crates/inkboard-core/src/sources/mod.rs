//! Collaborator interfaces and their concrete adapters.
//!
//! Data sources are synchronous and `Send + Sync`: the refresh loop and the
//! sensor poller call them on blocking workers, so a slow network or a slow
//! sensor never occupies an async worker. Sinks (display, indicator) are
//! owned by exactly one flow and take `&mut self`.

pub mod button;
pub mod frame_dir;
pub mod google;
pub mod mock;
pub mod sysfs;

pub use button::{press_channel, PressDelivery, PressEvent, PressReceiver, PressSender};
pub use frame_dir::FrameDirSink;
pub use google::GoogleSource;
pub use sysfs::{IioSensor, SysfsIndicator};

use chrono::{DateTime, Utc};

use crate::data::{DayWindow, DisplayZone, Event, SensorReading, Task};
use crate::error::{AdapterError, RenderError, SensorUnavailable};
use crate::screen::RenderPayload;

/// Remote calendar.
pub trait CalendarSource: Send + Sync {
    /// Short identifier used in logs (e.g. "google-calendar").
    fn name(&self) -> &str;

    /// Events overlapping `window`. Callers filter and sort the result.
    fn fetch_events(&self, window: DayWindow) -> Result<Vec<Event>, AdapterError>;

    fn fetch_today_events(
        &self,
        now: DateTime<Utc>,
        zone: DisplayZone,
    ) -> Result<Vec<Event>, AdapterError> {
        self.fetch_events(DayWindow::today(now, zone))
    }

    fn fetch_tomorrow_events(
        &self,
        now: DateTime<Utc>,
        zone: DisplayZone,
    ) -> Result<Vec<Event>, AdapterError> {
        self.fetch_events(DayWindow::tomorrow(now, zone))
    }
}

/// Remote task list.
pub trait TaskSource: Send + Sync {
    fn name(&self) -> &str;

    /// Open tasks in display order.
    fn fetch_tasks(&self) -> Result<Vec<Task>, AdapterError>;
}

/// Temperature/humidity sensor.
pub trait Sensor: Send + Sync {
    fn read_sensor(&self) -> Result<SensorReading, SensorUnavailable>;
}

/// Physical display.
pub trait DisplaySink: Send {
    fn render(&mut self, payload: &RenderPayload) -> Result<(), RenderError>;

    /// Blank the panel before shutdown.
    fn clear(&mut self) -> Result<(), RenderError> {
        Ok(()) // default no-op
    }
}

/// On/off indicator light. Fire-and-forget.
pub trait Indicator: Send {
    fn set(&mut self, on: bool);
}
