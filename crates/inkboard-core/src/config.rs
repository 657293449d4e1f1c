//! TOML-based application configuration.
//!
//! Stores:
//! - Refresh, notification, sensor and render intervals
//! - Mock mode and display time zone
//! - Google Calendar/Tasks adapter settings
//! - sysfs paths for the button, LED, sensor and frame output
//!
//! Configuration is stored at `~/.config/inkboard/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Upper bound for every interval and timeout, one week.
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Timing of the background flows and the render loop, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntervalsConfig {
    #[serde(default = "default_refresh_secs")]
    pub refresh_secs: u64,
    #[serde(default = "default_notify_poll_secs")]
    pub notify_poll_secs: u64,
    /// How long before an event starts the indicator turns on.
    #[serde(default = "default_notify_lead_secs")]
    pub notify_lead_secs: u64,
    #[serde(default = "default_sensor_poll_secs")]
    pub sensor_poll_secs: u64,
    /// Idle re-render of the current screen.
    #[serde(default = "default_render_tick_secs")]
    pub render_tick_secs: u64,
}

/// Google Calendar + Tasks adapter configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Environment variable holding the OAuth access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_calendar_id")]
    pub calendar_id: String,
    #[serde(default = "default_task_list")]
    pub task_list: String,
    #[serde(default = "default_calendar_base_url")]
    pub calendar_base_url: String,
    #[serde(default = "default_tasks_base_url")]
    pub tasks_base_url: String,
    /// Per-request timeout. Must stay below `intervals.refresh_secs`.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// sysfs paths of the device peripherals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HardwareConfig {
    /// GPIO value file of the button (active low).
    #[serde(default)]
    pub button_path: Option<String>,
    /// GPIO value file or LED brightness file of the indicator.
    #[serde(default)]
    pub led_path: Option<String>,
    /// IIO temperature file, millidegrees Celsius.
    #[serde(default)]
    pub temperature_path: Option<String>,
    /// IIO relative humidity file, milli-percent.
    #[serde(default)]
    pub humidity_path: Option<String>,
    /// Directory receiving rendered frames.
    #[serde(default)]
    pub frame_dir: Option<String>,
    /// Timestamped frames kept next to `current.txt`; older ones are removed.
    #[serde(default = "default_frame_history")]
    pub frame_history: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/inkboard/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Substitute in-memory fakes for every peripheral and remote service.
    #[serde(default)]
    pub mock: bool,
    /// Display zone as minutes east of UTC. Unset uses the system zone.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    #[serde(default)]
    pub intervals: IntervalsConfig,
    #[serde(default)]
    pub google: GoogleConfig,
    #[serde(default)]
    pub hardware: HardwareConfig,
}

// Default functions
fn default_refresh_secs() -> u64 {
    300
}
fn default_notify_poll_secs() -> u64 {
    30
}
fn default_notify_lead_secs() -> u64 {
    600
}
fn default_sensor_poll_secs() -> u64 {
    60
}
fn default_render_tick_secs() -> u64 {
    60
}
fn default_token_env() -> String {
    "INKBOARD_GOOGLE_TOKEN".into()
}
fn default_calendar_id() -> String {
    "primary".into()
}
fn default_task_list() -> String {
    "@default".into()
}
fn default_calendar_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".into()
}
fn default_tasks_base_url() -> String {
    "https://tasks.googleapis.com/tasks/v1".into()
}
fn default_request_timeout_secs() -> u64 {
    20
}
fn default_frame_history() -> usize {
    crate::sources::frame_dir::DEFAULT_FRAME_HISTORY
}

impl Default for IntervalsConfig {
    fn default() -> Self {
        Self {
            refresh_secs: default_refresh_secs(),
            notify_poll_secs: default_notify_poll_secs(),
            notify_lead_secs: default_notify_lead_secs(),
            sensor_poll_secs: default_sensor_poll_secs(),
            render_tick_secs: default_render_tick_secs(),
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            calendar_id: default_calendar_id(),
            task_list: default_task_list(),
            calendar_base_url: default_calendar_base_url(),
            tasks_base_url: default_tasks_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            button_path: None,
            led_path: None,
            temperature_path: None,
            humidity_path: None,
            frame_dir: None,
            frame_history: default_frame_history(),
        }
    }
}

impl GoogleConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mock: false,
            utc_offset_minutes: None,
            intervals: IntervalsConfig::default(),
            google: GoogleConfig::default(),
            hardware: HardwareConfig::default(),
        }
    }
}

impl IntervalsConfig {
    pub fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    pub fn notify_poll(&self) -> Duration {
        Duration::from_secs(self.notify_poll_secs)
    }

    /// Saturates instead of panicking on values `validate` would reject.
    pub fn notify_lead(&self) -> chrono::Duration {
        i64::try_from(self.notify_lead_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    pub fn sensor_poll(&self) -> Duration {
        Duration::from_secs(self.sensor_poll_secs)
    }

    pub fn render_tick(&self) -> Duration {
        Duration::from_secs(self.render_tick_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(ConfigError::MissingKey("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Unset optional: infer the type from the input.
                    serde_json::Value::Null => {
                        if value.is_empty() || value == "none" {
                            serde_json::Value::Null
                        } else if let Ok(n) = value.parse::<i64>() {
                            serde_json::Value::Number(n.into())
                        } else {
                            serde_json::Value::String(value.into())
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::MissingKey(key.to_string()))?;
        }

        Err(ConfigError::MissingKey(key.to_string()))
    }

    /// Default location of the config file.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`, writing defaults there if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Update a value by dot-separated key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the result fails validation.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate_intervals()?;
        *self = updated;
        Ok(())
    }

    /// Set a value by key and save to the default location.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    fn validate_intervals(&self) -> Result<(), ConfigError> {
        let checks = [
            ("intervals.refresh_secs", self.intervals.refresh_secs),
            ("intervals.notify_poll_secs", self.intervals.notify_poll_secs),
            ("intervals.notify_lead_secs", self.intervals.notify_lead_secs),
            ("intervals.sensor_poll_secs", self.intervals.sensor_poll_secs),
            ("intervals.render_tick_secs", self.intervals.render_tick_secs),
        ];
        for (key, secs) in checks {
            if secs == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "must be greater than zero".into(),
                });
            }
            if secs > MAX_INTERVAL_SECS {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: format!("must be at most {MAX_INTERVAL_SECS} seconds"),
                });
            }
        }

        let timeout = self.google.request_timeout_secs;
        if timeout == 0 || timeout >= self.intervals.refresh_secs {
            return Err(ConfigError::InvalidValue {
                key: "google.request_timeout_secs".to_string(),
                message: format!(
                    "must be between 1 and {} (below intervals.refresh_secs)",
                    self.intervals.refresh_secs.saturating_sub(1)
                ),
            });
        }
        Ok(())
    }

    /// Startup validation. Outside mock mode every peripheral path must be set.
    ///
    /// # Errors
    ///
    /// Returns the first invalid interval or missing hardware key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_intervals()?;
        if self.mock {
            return Ok(());
        }
        let hw = &self.hardware;
        let required = [
            ("hardware.button_path", &hw.button_path),
            ("hardware.led_path", &hw.led_path),
            ("hardware.temperature_path", &hw.temperature_path),
            ("hardware.humidity_path", &hw.humidity_path),
            ("hardware.frame_dir", &hw.frame_dir),
        ];
        for (key, value) in required {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingKey(key.to_string()));
            }
        }
        Ok(())
    }
}

/// Returns `~/.config/inkboard[-dev]/` based on INKBOARD_ENV.
///
/// Set INKBOARD_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("INKBOARD_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("inkboard-dev")
    } else {
        base_dir.join("inkboard")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::SaveFailed {
        path: dir.clone(),
        message: e.to_string(),
    })?;
    Ok(dir)
}
