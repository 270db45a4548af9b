use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::IoFailure;
use crate::event::TrackChangeEvent;

/// Append-only played-tracks log. One `"<started> <path>"` line per event.
#[derive(Debug, Clone, Default)]
pub struct FileSink {
    path: Option<PathBuf>,
}

impl FileSink {
    /// `path` must already be expanded. `None` makes every write a no-op.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends the event's line, creating the file if needed, and syncs it
    /// to disk before returning. Targets that cannot be synced (`/dev/null`,
    /// FIFOs, pipes) count as delivered once the write succeeds.
    pub fn write(&self, event: &TrackChangeEvent) -> Result<(), IoFailure> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let wrap = |source| IoFailure {
            path: path.clone(),
            source,
        };

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(wrap)?;
        file.write_all(event.log_line().as_bytes()).map_err(wrap)?;
        file.flush().map_err(wrap)?;
        match file.sync_data() {
            Err(e) if e.kind() == ErrorKind::InvalidInput => Ok(()),
            other => other.map_err(wrap),
        }
    }
}
