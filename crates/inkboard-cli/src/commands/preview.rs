use std::error::Error;
use std::sync::Arc;

use chrono::Utc;
use inkboard_core::{
    DisplayZone, RefreshLoop, RefreshOutcome, RenderPayload, ScreenId, ScreenState, SensorCell,
    SensorPoller, SharedEventStore,
};

use super::{build_devices, load_config};

/// One refresh and one sensor read, then every screen rendered once.
pub fn run(mock: bool, json: bool) -> Result<(), Box<dyn Error>> {
    let config = load_config(mock)?;
    let zone = DisplayZone::from_config(config.utc_offset_minutes);
    let runtime = tokio::runtime::Runtime::new()?;

    let payloads = runtime.block_on(async {
        let devices = build_devices(&config, zone)?;
        let store = Arc::new(SharedEventStore::new());
        let cell = Arc::new(SensorCell::new());

        let refresh = RefreshLoop::new(
            devices.calendar,
            devices.tasks,
            Arc::clone(&store),
            zone,
            config.intervals.refresh(),
        );
        if let RefreshOutcome::Skipped { adapter, error } = refresh.refresh_once().await {
            eprintln!("warning: refresh failed ({adapter}): {error}");
        }
        SensorPoller::new(devices.sensor, Arc::clone(&cell), config.intervals.sensor_poll())
            .poll_once()
            .await;

        let screens = ScreenState::new(store, cell, zone);
        let now = Utc::now();
        let payloads: Vec<RenderPayload> = ScreenId::all()
            .into_iter()
            .map(|screen| screens.render_screen(screen, now))
            .collect();
        Ok::<_, Box<dyn Error>>(payloads)
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&payloads)?);
        return Ok(());
    }
    for payload in &payloads {
        for line in payload.lines() {
            println!("{line}");
        }
        println!();
    }
    Ok(())
}
