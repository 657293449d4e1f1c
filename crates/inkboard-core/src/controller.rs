//! Wires the flows together and owns the render loop.
//!
//! The controller starts the refresh loop, the sensor poller and the
//! notifier as independent tasks, then renders the current screen whenever
//! a button press arrives, the render tick fires, or data behind the
//! current screen changes. Renders run on a blocking worker so the loop
//! never stalls the runtime.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::IntervalsConfig;
use crate::data::DisplayZone;
use crate::error::{CoreError, RenderError};
use crate::notifier::Notifier;
use crate::refresh::RefreshLoop;
use crate::screen::{RenderPayload, ScreenId, ScreenState};
use crate::sensor::SensorPoller;
use crate::shutdown::ShutdownSignal;
use crate::sources::{CalendarSource, DisplaySink, Indicator, PressReceiver, Sensor, TaskSource};
use crate::store::{SensorCell, SharedEventStore};

type SharedDisplay = Arc<Mutex<Box<dyn DisplaySink>>>;

/// Every collaborator the controller needs.
pub struct Devices {
    pub calendar: Arc<dyn CalendarSource>,
    pub tasks: Arc<dyn TaskSource>,
    pub sensor: Arc<dyn Sensor>,
    pub display: Box<dyn DisplaySink>,
    pub indicator: Box<dyn Indicator>,
}

pub struct Controller {
    devices: Devices,
    intervals: IntervalsConfig,
    zone: DisplayZone,
    store: Arc<SharedEventStore>,
    sensor_cell: Arc<SensorCell>,
    screens: Arc<ScreenState>,
}

impl Controller {
    pub fn new(devices: Devices, intervals: IntervalsConfig, zone: DisplayZone) -> Self {
        let store = Arc::new(SharedEventStore::new());
        let sensor_cell = Arc::new(SensorCell::new());
        let screens = Arc::new(ScreenState::new(
            Arc::clone(&store),
            Arc::clone(&sensor_cell),
            zone,
        ));
        Self {
            devices,
            intervals,
            zone,
            store,
            sensor_cell,
            screens,
        }
    }

    pub fn store(&self) -> Arc<SharedEventStore> {
        Arc::clone(&self.store)
    }

    pub fn sensor_cell(&self) -> Arc<SensorCell> {
        Arc::clone(&self.sensor_cell)
    }

    pub fn screens(&self) -> Arc<ScreenState> {
        Arc::clone(&self.screens)
    }

    /// Run until `shutdown` fires, then join the background tasks and
    /// blank the display.
    pub async fn run(self, mut presses: PressReceiver, shutdown: ShutdownSignal) {
        let Controller {
            devices,
            intervals,
            zone,
            store,
            sensor_cell,
            screens,
        } = self;

        let refresh = RefreshLoop::new(
            devices.calendar,
            devices.tasks,
            Arc::clone(&store),
            zone,
            intervals.refresh(),
        );
        let poller = SensorPoller::new(devices.sensor, Arc::clone(&sensor_cell), intervals.sensor_poll());
        let notifier = Notifier::new(
            Arc::clone(&store),
            devices.indicator,
            intervals.notify_lead(),
            intervals.notify_poll(),
        );

        let background = vec![
            ("refresh", tokio::spawn(refresh.run(shutdown.clone()))),
            ("sensor", tokio::spawn(poller.run(shutdown.clone()))),
            ("notifier", tokio::spawn(notifier.run(shutdown.clone()))),
        ];
        info!("Controller started");

        let display: SharedDisplay = Arc::new(Mutex::new(devices.display));
        render_loop(&screens, &store, &sensor_cell, &display, &mut presses, &intervals, shutdown).await;

        for (name, handle) in background {
            if let Err(e) = join_task(name, handle).await {
                error!("{e}");
            }
        }

        let cleared = tokio::task::spawn_blocking(move || clear_locked(&display)).await;
        match cleared {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to clear display: {e}"),
            Err(e) => warn!("Display clear worker failed: {e}"),
        }
        info!("Controller stopped");
    }
}

async fn render_loop(
    screens: &Arc<ScreenState>,
    store: &SharedEventStore,
    sensor_cell: &SensorCell,
    display: &SharedDisplay,
    presses: &mut PressReceiver,
    intervals: &IntervalsConfig,
    mut shutdown: ShutdownSignal,
) {
    let mut snapshots = store.subscribe();
    let mut samples = sensor_cell.subscribe();
    snapshots.borrow_and_update();
    samples.borrow_and_update();

    let period = intervals.render_tick();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut presses_open = true;

    render_current(screens, display).await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.triggered() => break,
            press = presses.recv(), if presses_open => match press {
                Some(press) => {
                    screens.advance();
                    render_current(screens, display).await;
                    debug!(latency_ms = press.at.elapsed().as_millis() as u64, "Press handled");
                }
                None => {
                    debug!("Button source closed");
                    presses_open = false;
                }
            },
            // The store outlives this loop, so the sender side never closes.
            Ok(()) = snapshots.changed() => {
                if screens.current().reads_snapshot() {
                    render_current(screens, display).await;
                }
            }
            Ok(()) = samples.changed() => {
                if screens.current() == ScreenId::SensorReading {
                    render_current(screens, display).await;
                }
            }
            _ = ticker.tick() => render_current(screens, display).await,
        }
    }
}

fn lock_display(display: &SharedDisplay) -> std::sync::MutexGuard<'_, Box<dyn DisplaySink>> {
    display.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render_locked(display: &SharedDisplay, payload: &RenderPayload) -> Result<(), RenderError> {
    lock_display(display).render(payload)
}

fn clear_locked(display: &SharedDisplay) -> Result<(), RenderError> {
    lock_display(display).clear()
}

async fn render_on_worker(display: &SharedDisplay, payload: RenderPayload) -> Result<(), RenderError> {
    let display = Arc::clone(display);
    tokio::task::spawn_blocking(move || render_locked(&display, &payload)).await?
}

/// Render the current screen, retrying once. A second failure is logged
/// and the frame dropped; the next tick tries again.
pub(crate) async fn render_current(screens: &ScreenState, display: &SharedDisplay) {
    let payload = screens.render();
    let screen = payload.screen;

    if let Err(first) = render_on_worker(display, payload.clone()).await {
        warn!(?screen, "Render failed, retrying: {first}");
        if let Err(second) = render_on_worker(display, payload).await {
            warn!(?screen, "Render failed again, waiting for next tick: {second}");
        }
    }
}

async fn join_task(name: &'static str, handle: JoinHandle<()>) -> Result<(), CoreError> {
    handle.await.map_err(|e| CoreError::Join {
        task: name,
        message: e.to_string(),
    })?;
    debug!(task = name, "Task joined");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::screen::ScreenBody;
    use crate::sources::mock::RecordingDisplay;

    fn screens() -> ScreenState {
        ScreenState::new(
            Arc::new(SharedEventStore::new()),
            Arc::new(SensorCell::new()),
            DisplayZone::utc(),
        )
    }

    fn shared(display: &RecordingDisplay) -> SharedDisplay {
        let sink: Box<dyn DisplaySink> = Box::new(display.clone());
        Arc::new(Mutex::new(sink))
    }

    #[tokio::test]
    async fn render_retries_once_after_failure() {
        let display = RecordingDisplay::new();
        display.fail_next(1);
        render_current(&screens(), &shared(&display)).await;
        assert_eq!(display.attempts(), 2);
        assert_eq!(display.frames().len(), 1);
    }

    #[tokio::test]
    async fn render_gives_up_after_second_failure() {
        let display = RecordingDisplay::new();
        display.fail_next(5);
        render_current(&screens(), &shared(&display)).await;
        assert_eq!(display.attempts(), 2);
        assert!(display.frames().is_empty());
    }

    #[tokio::test]
    async fn render_uses_current_screen() {
        let display = RecordingDisplay::new();
        let s = screens();
        s.go_to(ScreenId::Tasks);
        render_current(&s, &shared(&display)).await;
        let frame = display.last_frame().unwrap();
        assert_eq!(frame.screen, ScreenId::Tasks);
        assert!(matches!(frame.body, ScreenBody::Tasks { .. }));
    }

    #[tokio::test]
    async fn panicking_task_is_reported_on_join() {
        let handle = tokio::spawn(async { panic!("boom") });
        match join_task("refresh", handle).await {
            Err(CoreError::Join { task, .. }) => assert_eq!(task, "refresh"),
            other => panic!("expected join error, got {other:?}"),
        }
    }
}
