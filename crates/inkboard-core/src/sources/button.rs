//! Button press delivery.
//!
//! Presses travel over a channel with room for exactly one pending press.
//! While the render loop is busy, the first press waits in the slot and any
//! further presses are coalesced into it, so a burst turns into a single
//! advance once the current render finishes.

use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// GPIO poll period; doubles as the debounce time.
const GPIO_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub struct PressEvent {
    pub at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressDelivery {
    Queued,
    /// A press was already pending; this one merged into it.
    Coalesced,
    /// The render loop is gone.
    Closed,
}

/// Producer side of the button channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PressSender {
    tx: mpsc::Sender<PressEvent>,
}

pub type PressReceiver = mpsc::Receiver<PressEvent>;

pub fn press_channel() -> (PressSender, PressReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (PressSender { tx }, rx)
}

impl PressSender {
    /// Never blocks.
    pub fn press(&self) -> PressDelivery {
        match self.tx.try_send(PressEvent { at: Instant::now() }) {
            Ok(()) => PressDelivery::Queued,
            Err(TrySendError::Full(_)) => {
                debug!("Button press coalesced into pending press");
                PressDelivery::Coalesced
            }
            Err(TrySendError::Closed(_)) => PressDelivery::Closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Falling-edge detector for an active-low button with pull-up.
#[derive(Debug, Clone, Copy)]
pub struct EdgeDetector {
    last_high: bool,
}

impl EdgeDetector {
    pub fn new() -> Self {
        Self { last_high: true }
    }

    /// Feed the latest level; true on a high-to-low transition.
    pub fn update(&mut self, high: bool) -> bool {
        let pressed = self.last_high && !high;
        self.last_high = high;
        pressed
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Each line on stdin counts as one press. Ends on EOF.
pub fn spawn_stdin_button(sender: PressSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Mock button: press Enter to switch screens");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    if sender.press() == PressDelivery::Closed {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed, mock button stopped");
                    break;
                }
                Err(e) => {
                    warn!("Failed to read stdin: {e}");
                    break;
                }
            }
        }
    })
}

/// Poll a sysfs GPIO value file and report falling edges as presses.
/// Stops once the receiving side is dropped.
pub fn spawn_gpio_button(path: PathBuf, sender: PressSender) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(path = %path.display(), "GPIO button started");
        let mut edges = EdgeDetector::new();
        let mut ticker = tokio::time::interval(GPIO_POLL);
        let mut read_failed = false;
        while !sender.is_closed() {
            ticker.tick().await;
            match std::fs::read_to_string(&path) {
                Ok(raw) => {
                    read_failed = false;
                    if edges.update(raw.trim() != "0") {
                        sender.press();
                    }
                }
                Err(e) => {
                    // Log once per outage, not every 50 ms.
                    if !read_failed {
                        warn!(path = %path.display(), "Failed to read button: {e}");
                    }
                    read_failed = true;
                }
            }
        }
        debug!("GPIO button stopped");
    })
}
