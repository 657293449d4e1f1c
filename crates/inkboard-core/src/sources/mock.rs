//! In-memory collaborators for mock mode and tests.
//!
//! Every mock is `Clone` and shares its state through `Arc`, so a test can
//! keep one handle to inspect or toggle failures while the controller owns
//! the other. Recorded frames and indicator calls are capped, so a long mock
//! session keeps only the most recent ones.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::{CalendarSource, DisplaySink, Indicator, Sensor, TaskSource};
use crate::data::{DayWindow, DisplayZone, Event, SensorReading, Task};
use crate::error::{AdapterError, RenderError, SensorUnavailable};
use crate::screen::RenderPayload;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn mock_id() -> String {
    Uuid::new_v4().to_string()
}

/// Default number of frames or indicator calls a recorder keeps.
pub const DEFAULT_RECORD_LIMIT: usize = 256;

fn push_bounded<T>(buf: &mut VecDeque<T>, limit: usize, item: T) {
    if buf.len() >= limit {
        buf.pop_front();
    }
    buf.push_back(item);
}

#[derive(Debug, Default)]
struct AgendaState {
    events: Vec<Event>,
    tasks: Vec<Task>,
    fail_calendar: bool,
    fail_tasks: bool,
    calendar_calls: usize,
    task_calls: usize,
    delay: Option<Duration>,
}

/// Calendar and task list held in memory.
#[derive(Debug, Clone, Default)]
pub struct MockAgenda {
    state: Arc<Mutex<AgendaState>>,
}

impl MockAgenda {
    /// Empty agenda.
    pub fn new() -> Self {
        Self::default()
    }

    /// Agenda with a fixed set of events and tasks.
    pub fn with_data(events: Vec<Event>, tasks: Vec<Task>) -> Self {
        let agenda = Self::new();
        agenda.set_events(events);
        agenda.set_tasks(tasks);
        agenda
    }

    /// Demo agenda anchored at `now`: a standup starting in eight minutes
    /// (so the indicator lights shortly after startup), a few more events
    /// today and tomorrow, and three open tasks.
    pub fn sample(now: DateTime<Utc>, zone: DisplayZone) -> Self {
        let today = DayWindow::today(now, zone).start;
        let tomorrow = DayWindow::tomorrow(now, zone).start;
        let minutes = ChronoDuration::minutes;
        let hours = ChronoDuration::hours;

        let events = vec![
            Event::timed(mock_id(), "Morning standup", now + minutes(8), Some(now + minutes(23))),
            Event::timed(mock_id(), "Lunch with Sam", now + hours(2), Some(now + hours(3))),
            Event {
                end: Some(today + ChronoDuration::days(1)),
                ..Event::all_day(mock_id(), "Team offsite", today - ChronoDuration::days(1))
            },
            Event::timed(mock_id(), "Dentist", tomorrow + hours(9), Some(tomorrow + hours(10))),
            Event::timed(mock_id(), "Project review", tomorrow + hours(14), None),
            Event::all_day(mock_id(), "Mom's birthday", tomorrow),
        ];
        let tasks = vec![
            Task::new(mock_id(), "Water the plants"),
            Task::new(mock_id(), "Renew passport")
                .with_due((zone.local(now) + hours(72)).date_naive()),
            Task {
                notes: Some("Oat milk, eggs, coffee".into()),
                ..Task::new(mock_id(), "Groceries")
            },
        ];
        Self::with_data(events, tasks)
    }

    pub fn set_events(&self, events: Vec<Event>) {
        lock(&self.state).events = events;
    }

    pub fn set_tasks(&self, tasks: Vec<Task>) {
        lock(&self.state).tasks = tasks;
    }

    pub fn fail_calendar(&self, fail: bool) {
        lock(&self.state).fail_calendar = fail;
    }

    pub fn fail_tasks(&self, fail: bool) {
        lock(&self.state).fail_tasks = fail;
    }

    /// Make every fetch block the calling thread for `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }

    pub fn calendar_calls(&self) -> usize {
        lock(&self.state).calendar_calls
    }

    pub fn task_calls(&self) -> usize {
        lock(&self.state).task_calls
    }

    fn pause(&self) {
        let delay = lock(&self.state).delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
    }
}

impl CalendarSource for MockAgenda {
    fn name(&self) -> &str {
        "mock-calendar"
    }

    fn fetch_events(&self, window: DayWindow) -> Result<Vec<Event>, AdapterError> {
        self.pause();
        let mut state = lock(&self.state);
        state.calendar_calls += 1;
        if state.fail_calendar {
            return Err(AdapterError::Unavailable("mock-calendar".into()));
        }
        Ok(state
            .events
            .iter()
            .filter(|e| window.contains(e))
            .cloned()
            .collect())
    }
}

impl TaskSource for MockAgenda {
    fn name(&self) -> &str {
        "mock-tasks"
    }

    fn fetch_tasks(&self) -> Result<Vec<Task>, AdapterError> {
        self.pause();
        let mut state = lock(&self.state);
        state.task_calls += 1;
        if state.fail_tasks {
            return Err(AdapterError::Unavailable("mock-tasks".into()));
        }
        Ok(state.tasks.iter().filter(|t| !t.completed).cloned().collect())
    }
}

/// Sensor returning a jittered room climate, or a fixed reading.
#[derive(Debug, Clone, Default)]
pub struct MockSensor {
    fixed: Option<(f64, f64)>,
    failing: Arc<AtomicBool>,
    reads: Arc<AtomicUsize>,
}

impl MockSensor {
    /// 22 °C ± 2, 50 % ± 5.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fixed(temperature: f64, humidity: f64) -> Self {
        Self {
            fixed: Some((temperature, humidity)),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl Sensor for MockSensor {
    fn read_sensor(&self) -> Result<SensorReading, SensorUnavailable> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SensorUnavailable::new("mock sensor failure"));
        }
        let (temperature, humidity) = self.fixed.unwrap_or_else(|| {
            let mut rng = rand::thread_rng();
            (
                22.0 + rng.gen_range(-2.0..=2.0),
                50.0 + rng.gen_range(-5.0..=5.0),
            )
        });
        Ok(SensorReading {
            temperature,
            humidity,
            captured_at: Utc::now(),
        })
    }
}

#[derive(Debug)]
struct DisplayState {
    frames: VecDeque<RenderPayload>,
    limit: usize,
    rendered: usize,
    fail_next: usize,
    attempts: usize,
    clears: usize,
    delay: Option<Duration>,
}

/// Display that logs each frame and keeps the most recent ones.
#[derive(Debug, Clone)]
pub struct RecordingDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl Default for RecordingDisplay {
    fn default() -> Self {
        Self::with_limit(DEFAULT_RECORD_LIMIT)
    }
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `limit` frames (at least one).
    pub fn with_limit(limit: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(DisplayState {
                frames: VecDeque::new(),
                limit: limit.max(1),
                rendered: 0,
                fail_next: 0,
                attempts: 0,
                clears: 0,
                delay: None,
            })),
        }
    }

    /// Retained frames, oldest first.
    pub fn frames(&self) -> Vec<RenderPayload> {
        lock(&self.state).frames.iter().cloned().collect()
    }

    pub fn last_frame(&self) -> Option<RenderPayload> {
        lock(&self.state).frames.back().cloned()
    }

    /// Successful renders, including frames no longer retained.
    pub fn rendered(&self) -> usize {
        lock(&self.state).rendered
    }

    /// Render calls including failed ones.
    pub fn attempts(&self) -> usize {
        lock(&self.state).attempts
    }

    pub fn clears(&self) -> usize {
        lock(&self.state).clears
    }

    /// Fail the next `n` render calls.
    pub fn fail_next(&self, n: usize) {
        lock(&self.state).fail_next = n;
    }

    /// Make every render block the calling thread for `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        lock(&self.state).delay = delay;
    }
}

impl DisplaySink for RecordingDisplay {
    fn render(&mut self, payload: &RenderPayload) -> Result<(), RenderError> {
        let delay = lock(&self.state).delay;
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }

        let mut state = lock(&self.state);
        state.attempts += 1;
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(RenderError::Device("mock display refused frame".into()));
        }
        info!(screen = ?payload.screen, "[display] {}", payload.lines().join(" | "));
        state.rendered += 1;
        let limit = state.limit;
        push_bounded(&mut state.frames, limit, payload.clone());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        lock(&self.state).clears += 1;
        info!("[display] cleared");
        Ok(())
    }
}

#[derive(Debug, Default)]
struct IndicatorState {
    on: bool,
    history: VecDeque<bool>,
}

/// Indicator that logs and records its most recent calls.
#[derive(Debug, Clone, Default)]
pub struct RecordingIndicator {
    state: Arc<Mutex<IndicatorState>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        lock(&self.state).on
    }

    /// The last values passed to `set`, in call order.
    pub fn history(&self) -> Vec<bool> {
        lock(&self.state).history.iter().copied().collect()
    }
}

impl Indicator for RecordingIndicator {
    fn set(&mut self, on: bool) {
        let mut state = lock(&self.state);
        state.on = on;
        push_bounded(&mut state.history, DEFAULT_RECORD_LIMIT, on);
        info!("[indicator] {}", if on { "ON" } else { "OFF" });
    }
}
