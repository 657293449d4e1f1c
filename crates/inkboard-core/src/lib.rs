//! # Inkboard Core Library
//!
//! This library provides the coordination engine of the Inkboard e-ink
//! device: a small panel that cycles through today's events, tomorrow's
//! events, open tasks and the room climate on a button press, while
//! calendar data refreshes in the background and an indicator lights up
//! shortly before the next event.
//!
//! ## Architecture
//!
//! - **Store**: a single-writer snapshot store shared by every flow
//! - **Refresh Loop**: periodically re-pulls calendar and task data and
//!   replaces the snapshot as a unit
//! - **Notifier**: scans today's events and drives the indicator
//! - **Screens**: a cyclic state machine producing render payloads
//! - **Controller**: owns the render loop and the background tasks
//! - **Sources**: collaborator traits plus Google, sysfs, frame directory
//!   and in-memory adapters
//!
//! ## Key Components
//!
//! - [`SharedEventStore`]: Latest calendar/task snapshot
//! - [`ScreenState`]: Current screen and rendering
//! - [`Notifier`]: Event-proximity indicator logic
//! - [`Controller`]: Runs everything until shutdown
//! - [`Config`]: Application configuration management

pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod notifier;
pub mod refresh;
pub mod screen;
pub mod sensor;
pub mod shutdown;
pub mod sources;
pub mod store;

pub use config::Config;
pub use controller::{Controller, Devices};
pub use data::{DayWindow, DisplayZone, Event, EventSnapshot, SensorReading, SensorSample, Task};
pub use error::{AdapterError, ConfigError, CoreError, RenderError, SensorUnavailable};
pub use notifier::{NotificationState, NotificationStatus, Notifier, ScanOutcome};
pub use refresh::{RefreshLoop, RefreshOutcome};
pub use screen::{RenderPayload, ScreenBody, ScreenId, ScreenState};
pub use sensor::SensorPoller;
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
pub use store::{SensorCell, SharedEventStore};
