//! Drains stream events from a channel into a stream log.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tracing::{info, warn};
use xts_core::StreamEvent;

use crate::writer::CsvLogWriter;

/// Appends every received [`StreamEvent`] to one stream log as it arrives.
pub struct StreamRecorder {
    writer: CsvLogWriter,
    path: PathBuf,
}

impl StreamRecorder {
    pub fn new(writer: CsvLogWriter, path: impl Into<PathBuf>) -> Self {
        Self {
            writer,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run until every sender is dropped. Returns the number of events
    /// written.
    ///
    /// A failed append is logged and the recorder keeps draining.
    pub async fn run(self, mut rx: mpsc::Receiver<StreamEvent>) -> u64 {
        let mut written = 0u64;
        while let Some(event) = rx.recv().await {
            match self.writer.append_event(&self.path, &event) {
                Ok(()) => written += 1,
                Err(e) => {
                    warn!(
                        error = %e,
                        event_type = %event.event_type,
                        path = %self.path.display(),
                        "Failed to append stream event"
                    );
                }
            }
        }
        info!(events = written, path = %self.path.display(), "Stream recorder stopped");
        written
    }
}
