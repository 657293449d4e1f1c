//! Periodic sensor polling into the [`SensorCell`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::data::SensorSample;
use crate::shutdown::ShutdownSignal;
use crate::sources::Sensor;
use crate::store::SensorCell;

pub struct SensorPoller {
    sensor: Arc<dyn Sensor>,
    cell: Arc<SensorCell>,
    interval: Duration,
}

impl SensorPoller {
    pub fn new(sensor: Arc<dyn Sensor>, cell: Arc<SensorCell>, interval: Duration) -> Self {
        Self {
            sensor,
            cell,
            interval,
        }
    }

    /// Read once and publish the result. A failure replaces any earlier
    /// reading with `Unavailable`.
    pub async fn poll_once(&self) -> SensorSample {
        let sensor = Arc::clone(&self.sensor);
        let sample = match tokio::task::spawn_blocking(move || sensor.read_sensor()).await {
            Ok(Ok(reading)) => {
                debug!(
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    "Sensor read"
                );
                SensorSample::Reading(reading)
            }
            Ok(Err(e)) => {
                warn!("{e}");
                SensorSample::Unavailable {
                    reason: e.reason,
                    at: Utc::now(),
                }
            }
            Err(e) => {
                warn!("Sensor worker failed: {e}");
                SensorSample::Unavailable {
                    reason: e.to_string(),
                    at: Utc::now(),
                }
            }
        };
        self.cell.publish(sample.clone());
        sample
    }

    pub async fn run(self, mut shutdown: ShutdownSignal) {
        info!("Sensor poller started (interval: {}s)", self.interval.as_secs());
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.triggered() => break,
                _ = ticker.tick() => {}
            }
            self.poll_once().await;
        }

        info!("Sensor poller stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::shutdown_channel;
    use crate::sources::mock::MockSensor;

    #[tokio::test]
    async fn reading_is_published() {
        let cell = Arc::new(SensorCell::new());
        let poller = SensorPoller::new(
            Arc::new(MockSensor::fixed(21.0, 40.0)),
            Arc::clone(&cell),
            Duration::from_secs(60),
        );
        let sample = poller.poll_once().await;
        assert_eq!(sample.reading().map(|r| r.temperature), Some(21.0));
        assert_eq!(*cell.current(), sample);
    }

    #[tokio::test]
    async fn failure_replaces_previous_reading() {
        let cell = Arc::new(SensorCell::new());
        let sensor = MockSensor::fixed(21.0, 40.0);
        let poller = SensorPoller::new(
            Arc::new(sensor.clone()),
            Arc::clone(&cell),
            Duration::from_secs(60),
        );
        poller.poll_once().await;

        sensor.set_failing(true);
        for _ in 0..2 {
            let sample = poller.poll_once().await;
            assert!(matches!(sample, SensorSample::Unavailable { .. }));
            assert!(cell.current().reading().is_none());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_polls_on_interval() {
        let cell = Arc::new(SensorCell::new());
        let sensor = MockSensor::fixed(21.0, 40.0);
        let (trigger, signal) = shutdown_channel();
        let poller = SensorPoller::new(
            Arc::new(sensor.clone()),
            Arc::clone(&cell),
            Duration::from_secs(60),
        );
        let handle = tokio::spawn(poller.run(signal));

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(sensor.reads(), 3);

        trigger.trigger();
        handle.await.unwrap();
    }
}
