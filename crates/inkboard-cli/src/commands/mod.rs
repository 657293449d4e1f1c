pub mod config;
pub mod preview;
pub mod run;

use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use inkboard_core::sources::mock::{MockAgenda, MockSensor, RecordingDisplay, RecordingIndicator};
use inkboard_core::sources::{
    DisplaySink, FrameDirSink, GoogleSource, IioSensor, SysfsIndicator,
};
use inkboard_core::{Config, ConfigError, Devices, DisplayZone};

/// Load and validate the config; `--mock` overrides the file.
pub(crate) fn load_config(mock: bool) -> Result<Config, ConfigError> {
    let mut config = Config::load()?;
    if mock {
        config.mock = true;
    }
    config.validate()?;
    Ok(config)
}

fn required<'a>(value: &'a Option<String>, key: &str) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
}

/// Build real or mock collaborators from the config.
pub(crate) fn build_devices(
    config: &Config,
    zone: DisplayZone,
) -> Result<Devices, Box<dyn Error>> {
    let hw = &config.hardware;

    if config.mock {
        let agenda = MockAgenda::sample(Utc::now(), zone);
        // A configured frame dir still receives frames in mock mode.
        let display: Box<dyn DisplaySink> = match hw.frame_dir.as_deref() {
            Some(dir) if !dir.is_empty() => {
                Box::new(FrameDirSink::with_history(dir, hw.frame_history))
            }
            _ => Box::new(RecordingDisplay::new()),
        };
        return Ok(Devices {
            calendar: Arc::new(agenda.clone()),
            tasks: Arc::new(agenda),
            sensor: Arc::new(MockSensor::new()),
            display,
            indicator: Box::new(RecordingIndicator::new()),
        });
    }

    let google = Arc::new(GoogleSource::from_config(&config.google, zone)?);
    Ok(Devices {
        calendar: google.clone(),
        tasks: google,
        sensor: Arc::new(IioSensor::new(
            required(&hw.temperature_path, "hardware.temperature_path")?,
            required(&hw.humidity_path, "hardware.humidity_path")?,
        )),
        display: Box::new(FrameDirSink::with_history(
            required(&hw.frame_dir, "hardware.frame_dir")?,
            hw.frame_history,
        )),
        indicator: Box::new(SysfsIndicator::new(required(&hw.led_path, "hardware.led_path")?)),
    })
}
