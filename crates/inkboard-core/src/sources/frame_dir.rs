//! Display sink that writes each frame as a text file.
//!
//! The panel driver on the device watches `current.txt` and pushes it to
//! the e-ink panel. Each frame is also kept as a timestamped file for
//! debugging; only the newest `history` of those survive.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::DisplaySink;
use crate::error::RenderError;
use crate::screen::RenderPayload;

pub const CURRENT_FRAME: &str = "current.txt";
const BLANK_FRAME: &str = "frame-blank.txt";
pub const DEFAULT_FRAME_HISTORY: usize = 20;

#[derive(Debug)]
pub struct FrameDirSink {
    dir: PathBuf,
    history: usize,
    sequence: u64,
}

impl FrameDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_history(dir, DEFAULT_FRAME_HISTORY)
    }

    /// Keep at most `history` timestamped frames. Zero keeps only
    /// `current.txt`.
    pub fn with_history(dir: impl Into<PathBuf>, history: usize) -> Self {
        Self {
            dir: dir.into(),
            history,
            sequence: 0,
        }
    }

    /// Replace `current.txt` without a reader ever seeing a partial frame.
    fn write_current(&self, text: &str) -> Result<(), RenderError> {
        let tmp = self.dir.join(".current.txt.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.dir.join(CURRENT_FRAME))?;
        Ok(())
    }

    fn prune(&self) -> Result<(), RenderError> {
        let mut frames: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_history_frame(path))
            .collect();
        if frames.len() <= self.history {
            return Ok(());
        }
        // Names sort by timestamp, then by zero-padded sequence.
        frames.sort();
        let excess = frames.len() - self.history;
        for path in frames.into_iter().take(excess) {
            if let Err(e) = fs::remove_file(&path) {
                warn!(path = %path.display(), "Failed to remove old frame: {e}");
            }
        }
        Ok(())
    }
}

fn is_history_frame(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("frame-") && n.ends_with(".txt") && n != BLANK_FRAME)
}

impl DisplaySink for FrameDirSink {
    fn render(&mut self, payload: &RenderPayload) -> Result<(), RenderError> {
        fs::create_dir_all(&self.dir)?;
        let mut text = payload.lines().join("\n");
        text.push('\n');
        self.write_current(&text)?;

        if self.history > 0 {
            self.sequence += 1;
            let name = format!(
                "frame-{}-{:06}.txt",
                payload.rendered_at.format("%Y%m%d-%H%M%S"),
                self.sequence
            );
            fs::write(self.dir.join(&name), &text)?;
        }
        self.prune()?;
        debug!(dir = %self.dir.display(), screen = ?payload.screen, "Frame written");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), RenderError> {
        fs::create_dir_all(&self.dir)?;
        self.write_current("")?;
        fs::write(self.dir.join(BLANK_FRAME), "")?;
        info!("Display cleared");
        Ok(())
    }
}
