use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use inkboard_core::sources::button::{spawn_gpio_button, spawn_stdin_button};
use inkboard_core::sources::press_channel;
use inkboard_core::{shutdown_channel, Controller, DisplayZone};
use tracing::info;

use super::{build_devices, load_config};

pub fn run(mock: bool) -> Result<(), Box<dyn Error>> {
    let config = load_config(mock)?;
    let zone = DisplayZone::from_config(config.utc_offset_minutes);
    let runtime = tokio::runtime::Runtime::new()?;

    let result = runtime.block_on(async move {
        let devices = build_devices(&config, zone)?;
        let (presses, press_rx) = press_channel();
        let button = match config.hardware.button_path.as_deref() {
            Some(path) if !config.mock => spawn_gpio_button(PathBuf::from(path), presses),
            _ => spawn_stdin_button(presses),
        };

        let (trigger, signal) = shutdown_channel();
        let controller = Controller::new(devices, config.intervals.clone(), zone);
        let handle = tokio::spawn(controller.run(press_rx, signal));
        info!(mock = config.mock, zone = %zone, "Inkboard running, Ctrl-C to stop");

        tokio::signal::ctrl_c().await?;
        info!("Shutdown requested");
        trigger.trigger();
        handle.await?;
        button.abort();
        Ok::<(), Box<dyn Error>>(())
    });

    // A pending stdin read would otherwise keep the runtime alive.
    runtime.shutdown_timeout(Duration::from_millis(500));
    result
}
