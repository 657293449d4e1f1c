//! sysfs-backed peripherals: indicator LED and IIO humidity/temperature sensor.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use super::{Indicator, Sensor};
use crate::data::SensorReading;
use crate::error::SensorUnavailable;

/// LED driven through a GPIO `value` or LED `brightness` file.
#[derive(Debug)]
pub struct SysfsIndicator {
    path: PathBuf,
}

impl SysfsIndicator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Indicator for SysfsIndicator {
    fn set(&mut self, on: bool) {
        let value = if on { "1" } else { "0" };
        match std::fs::write(&self.path, value) {
            Ok(()) => debug!(on, "Indicator set"),
            Err(e) => warn!(path = %self.path.display(), "Failed to set indicator: {e}"),
        }
    }
}

/// DHT11-class sensor exposed by the IIO subsystem.
///
/// The driver reports millidegrees Celsius and milli-percent relative
/// humidity. Reads of a DHT11 fail routinely (checksum, timing), so a
/// failure is reported as unavailable rather than retried here.
#[derive(Debug)]
pub struct IioSensor {
    temperature_path: PathBuf,
    humidity_path: PathBuf,
}

impl IioSensor {
    pub fn new(temperature_path: impl Into<PathBuf>, humidity_path: impl Into<PathBuf>) -> Self {
        Self {
            temperature_path: temperature_path.into(),
            humidity_path: humidity_path.into(),
        }
    }
}

fn read_milli(path: &Path) -> Result<f64, SensorUnavailable> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| SensorUnavailable::new(format!("{}: {e}", path.display())))?;
    let milli: i64 = raw
        .trim()
        .parse()
        .map_err(|_| SensorUnavailable::new(format!("{}: bad value '{}'", path.display(), raw.trim())))?;
    Ok(milli as f64 / 1000.0)
}

impl Sensor for IioSensor {
    fn read_sensor(&self) -> Result<SensorReading, SensorUnavailable> {
        let temperature = read_milli(&self.temperature_path)?;
        let humidity = read_milli(&self.humidity_path)?;
        if !(0.0..=100.0).contains(&humidity) {
            return Err(SensorUnavailable::new(format!(
                "humidity out of range: {humidity}"
            )));
        }
        Ok(SensorReading {
            temperature,
            humidity,
            captured_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indicator_writes_one_and_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brightness");
        let mut led = SysfsIndicator::new(&path);

        led.set(true);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1");
        led.set(false);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0");
    }

    #[test]
    fn indicator_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let mut led = SysfsIndicator::new(dir.path().join("missing").join("value"));
        led.set(true);
    }

    #[test]
    fn iio_sensor_scales_milli_units() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("in_temp_input");
        let hum = dir.path().join("in_humidityrelative_input");
        std::fs::write(&temp, "21500\n").unwrap();
        std::fs::write(&hum, "48000\n").unwrap();

        let reading = IioSensor::new(&temp, &hum).read_sensor().unwrap();
        assert!((reading.temperature - 21.5).abs() < f64::EPSILON);
        assert!((reading.humidity - 48.0).abs() < f64::EPSILON);
    }

    #[test]
    fn iio_sensor_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join("in_temp_input");
        let hum = dir.path().join("in_humidityrelative_input");

        assert!(IioSensor::new(&temp, &hum).read_sensor().is_err());

        std::fs::write(&temp, "garbage").unwrap();
        std::fs::write(&hum, "48000").unwrap();
        let err = IioSensor::new(&temp, &hum).read_sensor().unwrap_err();
        assert!(err.reason.contains("bad value"));

        std::fs::write(&temp, "20000").unwrap();
        std::fs::write(&hum, "150000").unwrap();
        assert!(IioSensor::new(&temp, &hum).read_sensor().is_err());
    }
}
